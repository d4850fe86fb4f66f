use auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore, USE_FILE_STORE_ENV};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    Keyring,
    File,
    Memory,
}

impl TokenStoreKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "keyring" => Some(TokenStoreKind::Keyring),
            "file" => Some(TokenStoreKind::File),
            "memory" => Some(TokenStoreKind::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub base_url: String,
    pub token_store: TokenStoreKind,
    pub data_dir: PathBuf,
}

#[derive(Default)]
pub struct AppConfigOverrides {
    pub log_level: Option<String>,
    pub base_url: Option<String>,
    pub token_store: Option<TokenStoreKind>,
}

fn default_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".photoapp")
}

pub fn default_config_path() -> PathBuf {
    default_dir().join("config")
}

impl AppConfig {
    /// Layers the TOML config file (optional) under `PHOTOAPP_*` environment variables.
    pub fn load_from(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(default_config_path);
        let cfg = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix("PHOTOAPP"))
            .build()
            .unwrap_or_default();

        let log_level = cfg
            .get_string("log_level")
            .unwrap_or_else(|_| "info".to_string());
        let base_url = cfg
            .get_string("base_url")
            .unwrap_or_else(|_| api_client::DEFAULT_BASE_URL.to_string());
        let mut token_store = cfg
            .get_string("token_store")
            .ok()
            .and_then(|s| TokenStoreKind::parse(&s))
            .unwrap_or(TokenStoreKind::Keyring);
        if std::env::var(USE_FILE_STORE_ENV).as_deref() == Ok("1") {
            token_store = TokenStoreKind::File;
        }
        let data_dir = cfg
            .get_string("data_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_dir());

        Self {
            log_level,
            base_url,
            token_store,
            data_dir,
        }
    }

    pub fn apply_overrides(mut self, ov: &AppConfigOverrides) -> Self {
        if let Some(l) = &ov.log_level {
            self.log_level = l.clone();
        }
        if let Some(u) = &ov.base_url {
            self.base_url = u.clone();
        }
        if let Some(t) = ov.token_store {
            self.token_store = t;
        }
        self
    }

    pub fn save_to(&self, path: Option<PathBuf>) -> std::io::Result<PathBuf> {
        let path = path.unwrap_or_else(default_config_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = toml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(&path, data)?;
        Ok(path)
    }

    /// The keyring falls back to a token file in `data_dir` when it cannot be opened.
    pub fn build_token_store(&self) -> Box<dyn TokenStore> {
        match self.token_store {
            TokenStoreKind::Keyring => match KeyringTokenStore::new() {
                Ok(store) => Box::new(store),
                Err(e) => {
                    tracing::warn!(error = %e, "Keyring unavailable, using token file");
                    Box::new(FileTokenStore::in_dir(&self.data_dir))
                }
            },
            TokenStoreKind::File => Box::new(FileTokenStore::in_dir(&self.data_dir)),
            TokenStoreKind::Memory => Box::new(MemoryTokenStore::new()),
        }
    }
}

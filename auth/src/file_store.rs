use crate::{AuthError, TokenStore, TOKEN_STORAGE_KEY};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const TOKEN_FILE_NAME: &str = "token.json";

#[derive(Serialize, Deserialize)]
struct StoredToken {
    token: String,
}

/// Token persisted as `{"token": "..."}` in a JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTokenStore { path: path.into() }
    }

    /// `<dir>/token.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(TOKEN_FILE_NAME))
    }

    /// `~/.photoapp/token.json`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".photoapp")
            .join(TOKEN_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, AuthError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Io(e.to_string())),
        };
        let stored: StoredToken = serde_json::from_str(&data)
            .map_err(|e| AuthError::Serialization(format!("{} ({})", e, TOKEN_STORAGE_KEY)))?;
        Ok(Some(stored.token).filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AuthError::Io(e.to_string()))?;
        }
        let data = serde_json::to_string(&StoredToken {
            token: token.to_string(),
        })
        .map_err(|e| AuthError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, data).map_err(|e| AuthError::Io(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| AuthError::Io(e.to_string()))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Io(e.to_string())),
        }
    }
}

//! Authentication module: bearer-token persistence and the login session.

use keyring::Entry;
use std::sync::Mutex;
use thiserror::Error;

mod session;

pub use session::{LoginError, Session, SessionManager};

#[cfg(feature = "file-store")]
mod file_store;
#[cfg(feature = "file-store")]
pub use file_store::FileTokenStore;

const KEYRING_SERVICE_NAME: &str = "PhotoApp";

/// Key under which the bearer token is persisted.
pub const TOKEN_STORAGE_KEY: &str = "token";

/// Set to "1" to make front ends prefer the file store over the keyring.
pub const USE_FILE_STORE_ENV: &str = "USE_FILE_STORE";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Keyring error: {0}")]
    Keyring(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Other error: {0}")]
    Other(String),
}

impl From<keyring::Error> for AuthError {
    fn from(e: keyring::Error) -> Self {
        AuthError::Keyring(e.to_string())
    }
}

/// Persistent home of the bearer token between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, AuthError>;
    fn save(&self, token: &str) -> Result<(), AuthError>;
    /// Removing a token that was never stored is not an error.
    fn clear(&self) -> Result<(), AuthError>;
}

pub struct KeyringTokenStore {
    entry: Entry,
}

impl KeyringTokenStore {
    pub fn new() -> Result<Self, AuthError> {
        Ok(KeyringTokenStore {
            entry: Entry::new(KEYRING_SERVICE_NAME, TOKEN_STORAGE_KEY)?,
        })
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<String>, AuthError> {
        match self.entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), AuthError> {
        self.entry.set_password(token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match self.entry.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the token for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        MemoryTokenStore {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, AuthError> {
        let guard = self.token.lock().map_err(|e| AuthError::Other(e.to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, token: &str) -> Result<(), AuthError> {
        let mut guard = self.token.lock().map_err(|e| AuthError::Other(e.to_string()))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        let mut guard = self.token.lock().map_err(|e| AuthError::Other(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

impl<T: TokenStore + ?Sized> TokenStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<String>, AuthError> {
        (**self).load()
    }

    fn save(&self, token: &str) -> Result<(), AuthError> {
        (**self).save(token)
    }

    fn clear(&self) -> Result<(), AuthError> {
        (**self).clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyring::mock;
    use serial_test::serial;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save("abc").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc"));
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    #[serial]
    fn test_keyring_store_with_mock_backend() {
        keyring::set_default_credential_builder(mock::default_credential_builder());
        let store = KeyringTokenStore::new().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.save("key_token").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("key_token"));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }
}

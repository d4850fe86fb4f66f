use crate::TokenStore;
use api_client::{ApiClient, LoginResponse};
use std::fmt;
use thiserror::Error;

/// Why a login attempt did not produce a session. Displays as user-facing text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Network error, please try again")]
    Network { detail: String },
}

/// The client's belief about whether it holds a valid bearer token.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    is_authenticated: bool,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    fn authenticate(&mut self, token: String) {
        self.token = Some(token);
        self.is_authenticated = true;
    }

    fn clear(&mut self) {
        self.token = None;
        self.is_authenticated = false;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("is_authenticated", &self.is_authenticated)
            .finish()
    }
}

/// Holds the session and keeps the persisted token in step with it.
pub struct SessionManager {
    store: Box<dyn TokenStore>,
    session: Session,
    login_error: Option<LoginError>,
}

impl SessionManager {
    pub fn new(store: Box<dyn TokenStore>) -> Self {
        SessionManager {
            store,
            session: Session::default(),
            login_error: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Text of the last failed login, cleared by the next successful one.
    pub fn login_error(&self) -> Option<&LoginError> {
        self.login_error.as_ref()
    }

    /// Verifies a persisted token against the backend. No token means no request.
    /// A token the backend does not accept, for whatever reason, is discarded.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, api)))]
    pub async fn restore_session(&mut self, api: &ApiClient) -> bool {
        let token = match self.store.load() {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!("No persisted token");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted token");
                return false;
            }
        };

        match api.verify(&token).await {
            Ok(()) => {
                tracing::info!("Restored session from persisted token");
                self.session.authenticate(token);
                true
            }
            Err(e) => {
                tracing::info!(error = %e, "Persisted token rejected, clearing it");
                self.forget_token();
                false
            }
        }
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, api, password)))]
    pub async fn login(&mut self, api: &ApiClient, username: &str, password: &str) -> Result<(), LoginError> {
        let result = match api.login(username, password).await {
            Ok(LoginResponse {
                access_token: Some(token),
            }) => {
                if let Err(e) = self.store.save(&token) {
                    tracing::warn!(error = %e, "Failed to persist token; session lasts for this run only");
                }
                self.session.authenticate(token);
                tracing::info!(username, "Logged in");
                Ok(())
            }
            Ok(_) => {
                tracing::info!(username, "Login response carried no access token");
                Err(LoginError::InvalidCredentials)
            }
            // transport failures and unreadable bodies both land here
            Err(e) => {
                tracing::error!(error = %e, "Login request failed");
                Err(LoginError::Network { detail: e.to_string() })
            }
        };
        self.login_error = result.as_ref().err().cloned();
        result
    }

    pub fn logout(&mut self) {
        self.forget_token();
        self.login_error = None;
        tracing::info!("Logged out");
    }

    fn forget_token(&mut self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear persisted token");
        }
        self.session.clear();
    }
}

//! Keeps the local photo mirror in step with the backend across login,
//! upload, delete and logout.

use api_client::ApiClient;
use auth::{LoginError, Session, SessionManager};
use thiserror::Error;

mod gallery;
mod mediator;

pub use gallery::Gallery;
pub use mediator::{UploadDraft, UploadStatus};

/// Shown when the backend greeting cannot be fetched.
pub const BACKEND_UNREACHABLE: &str = "Error connecting to backend";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("No file selected")]
    NoFileSelected,
    #[error("Server did not return an image URL")]
    MissingImageUrl,
    #[error("API Client Error: {0}")]
    ApiClientError(String),
    #[error("IO Error: {0}")]
    Io(String),
}

fn bearer(sessions: &SessionManager) -> Result<&str, SyncError> {
    match sessions.token() {
        Some(token) if sessions.is_authenticated() => Ok(token),
        _ => Err(SyncError::NotAuthenticated),
    }
}

/// Session, photo mirror and status text for one client.
///
/// Every operation takes `&mut self`, so the owner decides the order in
/// which they run. Mutations are always followed by a full gallery refresh.
pub struct PhotoApp {
    api: ApiClient,
    sessions: SessionManager,
    gallery: Gallery,
    upload_status: Option<UploadStatus>,
    last_upload_url: Option<String>,
    backend_message: Option<String>,
}

impl PhotoApp {
    pub fn new(api: ApiClient, sessions: SessionManager) -> Self {
        PhotoApp {
            api,
            sessions,
            gallery: Gallery::new(),
            upload_status: None,
            last_upload_url: None,
            backend_message: None,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &Session {
        self.sessions.session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.sessions.is_authenticated()
    }

    pub fn login_error(&self) -> Option<&LoginError> {
        self.sessions.login_error()
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn upload_status(&self) -> Option<&UploadStatus> {
        self.upload_status.as_ref()
    }

    pub fn last_upload_url(&self) -> Option<&str> {
        self.last_upload_url.as_deref()
    }

    pub fn backend_message(&self) -> Option<&str> {
        self.backend_message.as_deref()
    }

    /// Picks up a persisted token and, if the backend still accepts it,
    /// loads the gallery.
    pub async fn restore_session(&mut self) -> bool {
        let restored = self.sessions.restore_session(&self.api).await;
        if restored {
            self.refresh_quietly().await;
        }
        restored
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), LoginError> {
        self.sessions.login(&self.api, username, password).await?;
        self.refresh_quietly().await;
        Ok(())
    }

    /// Drops the token everywhere and empties the mirror so nothing from this
    /// account is shown after the next login.
    pub fn logout(&mut self) {
        self.sessions.logout();
        self.gallery.clear();
    }

    /// Replaces the mirror with the server's list. Failures leave the mirror
    /// untouched and are returned for logging only.
    pub async fn refresh_gallery(&mut self) -> Result<usize, SyncError> {
        let token = bearer(&self.sessions)?;
        self.gallery.refresh(&self.api, token).await
    }

    async fn refresh_quietly(&mut self) {
        if let Err(e) = self.refresh_gallery().await {
            tracing::warn!(error = %e, "Gallery refresh skipped, keeping previous photos");
        }
    }

    /// Fetches the backend greeting, or the connection error text on failure.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn check_backend(&mut self) -> String {
        let message = match self.api.health().await {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, base_url = self.api.base_url(), "Backend health check failed");
                BACKEND_UNREACHABLE.to_string()
            }
        };
        self.backend_message = Some(message.clone());
        message
    }
}

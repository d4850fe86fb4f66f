use crate::{bearer, PhotoApp, SyncError};
use api_client::{PhotoId, UploadRequest, UploadResponse};
use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;

/// Upload form contents. Submitting borrows the draft and leaves it as it was.
#[derive(Debug, Clone, Default)]
pub struct UploadDraft {
    pub file: Option<PathBuf>,
    pub title: String,
    pub caption: String,
    pub date: Option<NaiveDate>,
}

impl UploadDraft {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        UploadDraft {
            file: Some(file.into()),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Outcome of the most recent upload, shown to the user as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    NoFileSelected,
    LoginRequired,
    Uploading,
    Succeeded { image_url: String },
    MissingUrl,
    FileUnreadable { detail: String },
    Failed { detail: String },
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UploadStatus::NoFileSelected => write!(f, "Please select a file"),
            UploadStatus::LoginRequired => write!(f, "Please log in first"),
            UploadStatus::Uploading => write!(f, "Uploading..."),
            UploadStatus::Succeeded { .. } => write!(f, "Upload successful!"),
            UploadStatus::MissingUrl => write!(f, "Upload failed: server did not return an image URL"),
            UploadStatus::FileUnreadable { .. } => write!(f, "Upload failed: could not read the file"),
            UploadStatus::Failed { .. } => write!(f, "Upload failed: network error"),
        }
    }
}

impl PhotoApp {
    /// Uploads the drafted file with its metadata, then refreshes the gallery
    /// on success. Without a file nothing is sent.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, draft), fields(file = ?draft.file)))]
    pub async fn upload(&mut self, draft: &UploadDraft) -> Result<String, SyncError> {
        let Some(path) = draft.file.as_deref() else {
            self.upload_status = Some(UploadStatus::NoFileSelected);
            return Err(SyncError::NoFileSelected);
        };
        let token = match bearer(&self.sessions) {
            Ok(token) => token.to_string(),
            Err(e) => {
                self.upload_status = Some(UploadStatus::LoginRequired);
                return Err(e);
            }
        };

        self.upload_status = Some(UploadStatus::Uploading);
        tracing::info!(file = %path.display(), title = %draft.title, "Uploading photo");

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, file = %path.display(), "Failed to read upload file");
                self.upload_status = Some(UploadStatus::FileUnreadable { detail: e.to_string() });
                return Err(SyncError::Io(e.to_string()));
            }
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let request = UploadRequest {
            file_name,
            bytes,
            title: draft.title.clone(),
            caption: draft.caption.clone(),
            date: draft.date,
        };

        match self.api.upload_photo(&token, request).await {
            Ok(UploadResponse {
                image_url: Some(image_url),
            }) => {
                tracing::info!(%image_url, "Upload accepted");
                self.upload_status = Some(UploadStatus::Succeeded {
                    image_url: image_url.clone(),
                });
                self.last_upload_url = Some(image_url.clone());
                self.refresh_quietly().await;
                Ok(image_url)
            }
            Ok(_) => {
                tracing::warn!("Upload response carried no image URL");
                self.upload_status = Some(UploadStatus::MissingUrl);
                Err(SyncError::MissingImageUrl)
            }
            Err(e) => {
                tracing::error!(error = %e, "Upload request failed");
                self.upload_status = Some(UploadStatus::Failed { detail: e.to_string() });
                Err(SyncError::ApiClientError(e.to_string()))
            }
        }
    }

    /// Sends one delete and then one gallery refresh, whatever the server said.
    /// The delete outcome is only logged.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn delete_photo(&mut self, id: &PhotoId) -> Result<(), SyncError> {
        let token = bearer(&self.sessions)?.to_string();

        match self.api.delete_photo(&token, id).await {
            Ok(status) if status.is_success() => {
                tracing::info!(%id, %status, "Delete request accepted");
            }
            // TODO: surface rejected deletes once the backend documents its error body
            Ok(status) => {
                tracing::warn!(%id, %status, "Delete request not accepted by server");
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "Delete request failed");
            }
        }

        self.refresh_quietly().await;
        Ok(())
    }
}

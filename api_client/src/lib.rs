//! API client module for the photo-sharing backend.

use chrono::{DateTime, NaiveDate};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Backend used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://photo-backend-u62f.onrender.com";

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("Request Error: {0}")]
    RequestError(String),
    #[error("Server Error ({status}): {body}")]
    ServerError { status: u16, body: String },
    #[error("Unexpected Response: {0}")]
    UnexpectedResponse(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Server-assigned photo identifier. The backend may send it as a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhotoId(String);

impl PhotoId {
    pub fn new(id: impl Into<String>) -> Self {
        PhotoId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PhotoId {
    fn from(id: &str) -> Self {
        PhotoId(id.to_string())
    }
}

impl<'de> Deserialize<'de> for PhotoId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => PhotoId(s),
            RawId::Number(n) => PhotoId(n.to_string()),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Photo {
    pub id: PhotoId,
    pub url: String,
    #[serde(default, deserialize_with = "non_empty_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "non_empty_text")]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
}

fn non_empty_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

// Unparseable dates are dropped rather than failing the whole photo list.
fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(parse_date))
}

/// Parses `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            raw.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default, deserialize_with = "non_empty_text")]
    pub access_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default, deserialize_with = "non_empty_text")]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    message: String,
}

/// File contents and metadata for `POST /upload`.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub title: String,
    pub caption: String,
    pub date: Option<NaiveDate>,
}

impl UploadRequest {
    fn into_form(self) -> Form {
        let date = self
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        Form::new()
            .part("file", Part::bytes(self.bytes).file_name(self.file_name))
            .text("title", self.title)
            .text("caption", self.caption)
            .text("date", date)
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(ApiClient {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    /// Like `new`, but every request gives up after `timeout`. Requests never
    /// time out otherwise.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;
        Ok(ApiClient {
            client,
            ..Self::new(base_url)?
        })
    }

    pub fn default_backend() -> Result<Self, ApiClientError> {
        Self::new(DEFAULT_BASE_URL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn health(&self) -> Result<String, ApiClientError> {
        let response = self
            .client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        let health = response
            .json::<HealthResponse>()
            .await
            .map_err(|e| ApiClientError::UnexpectedResponse(e.to_string()))?;
        Ok(health.message)
    }

    /// Posts credentials. The HTTP status is not inspected: a rejected login is a
    /// JSON body without `access_token`. A body that is not JSON at all is an error.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, password)))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiClientError> {
        let url = self.endpoint(&["login"])?;
        let response = self
            .client
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(%status, error = %e, "Login response was not JSON");
            ApiClientError::UnexpectedResponse(format!("{} ({})", e, status))
        })
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn verify(&self, token: &str) -> Result<(), ApiClientError> {
        let url = self.endpoint(&["me"])?;
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, Self::bearer(token))
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::ServerError { status, body });
        }
        Ok(())
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn list_photos(&self, token: &str) -> Result<Vec<Photo>, ApiClientError> {
        let url = self.endpoint(&["photos"])?;
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, Self::bearer(token))
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::ServerError { status, body });
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|e| ApiClientError::UnexpectedResponse(e.to_string()))?;
        parse_photo_list(payload)
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token, request), fields(file = %request.file_name)))]
    pub async fn upload_photo(&self, token: &str, request: UploadRequest) -> Result<UploadResponse, ApiClientError> {
        let url = self.endpoint(&["upload"])?;
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, Self::bearer(token))
            .multipart(request.into_form())
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;

        let status = response.status();
        let upload = response
            .json::<UploadResponse>()
            .await
            .map_err(|e| ApiClientError::UnexpectedResponse(format!("{} ({})", e, status)))?;
        Ok(upload)
    }

    /// Sends the delete and hands back whatever status the server answered with.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn delete_photo(&self, token: &str, id: &PhotoId) -> Result<StatusCode, ApiClientError> {
        let url = self.endpoint(&["photo", id.as_str()])?;
        let response = self
            .client
            .delete(url)
            .header(AUTHORIZATION, Self::bearer(token))
            .send()
            .await
            .map_err(|e| ApiClientError::RequestError(e.to_string()))?;
        Ok(response.status())
    }
}

fn parse_photo_list(mut payload: Value) -> Result<Vec<Photo>, ApiClientError> {
    let photos = match payload.get_mut("photos").map(Value::take) {
        Some(list @ Value::Array(_)) => list,
        Some(other) => {
            return Err(ApiClientError::UnexpectedResponse(format!(
                "`photos` is not a list: {}",
                other
            )))
        }
        None => {
            return Err(ApiClientError::UnexpectedResponse(
                "missing `photos` field".to_string(),
            ))
        }
    };
    serde_json::from_value(photos).map_err(|e| ApiClientError::UnexpectedResponse(e.to_string()))
}

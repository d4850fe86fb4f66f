use crate::SyncError;
use api_client::{ApiClient, Photo, PhotoId};
use chrono::{DateTime, Utc};

/// Local mirror of the server's photo list, in server order.
///
/// The list is only ever replaced wholesale after a successful fetch; it is
/// never patched after an upload or delete.
#[derive(Debug, Default, Clone)]
pub struct Gallery {
    photos: Vec<Photo>,
    last_refreshed: Option<DateTime<Utc>>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn get(&self, id: &PhotoId) -> Option<&Photo> {
        self.photos.iter().find(|p| &p.id == id)
    }

    /// When the mirror was last replaced by a successful fetch.
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    pub fn replace_all(&mut self, photos: Vec<Photo>) {
        self.photos = photos;
        self.last_refreshed = Some(Utc::now());
    }

    pub fn clear(&mut self) {
        self.photos.clear();
        self.last_refreshed = None;
    }

    /// Fetches the photo list and replaces the mirror. On any failure the
    /// current contents stay as they are.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, api, token)))]
    pub async fn refresh(&mut self, api: &ApiClient, token: &str) -> Result<usize, SyncError> {
        let photos = api.list_photos(token).await.map_err(|e| {
            tracing::warn!(error = %e, kept = self.photos.len(), "Photo list fetch failed");
            SyncError::ApiClientError(e.to_string())
        })?;
        let count = photos.len();
        self.replace_all(photos);
        tracing::info!(count, "Gallery refreshed");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocks::{backend, expect_photos, photo_json};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    async fn seeded(api: &ApiClient, server: &wiremock::MockServer) -> Gallery {
        expect_photos(
            server,
            "tok",
            vec![
                photo_json("1", "https://x/1.jpg", Some("First")),
                photo_json("2", "https://x/2.jpg", None),
            ],
        )
        .await;
        let mut gallery = Gallery::new();
        assert_eq!(gallery.refresh(api, "tok").await.unwrap(), 2);
        server.reset().await;
        gallery
    }

    #[tokio::test]
    async fn test_refresh_replaces_whole_list() {
        let server = backend().await;
        let api = ApiClient::new(&server.uri()).unwrap();
        let mut gallery = seeded(&api, &server).await;
        assert!(gallery.last_refreshed().is_some());

        expect_photos(&server, "tok", vec![photo_json("3", "https://x/3.jpg", None)]).await;
        assert_eq!(gallery.refresh(&api, "tok").await.unwrap(), 1);
        let ids: Vec<&str> = gallery.photos().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[tokio::test]
    async fn test_refresh_missing_field_keeps_mirror() {
        let server = backend().await;
        let api = ApiClient::new(&server.uri()).unwrap();
        let mut gallery = seeded(&api, &server).await;
        let before = gallery.photos().to_vec();
        let stamp = gallery.last_refreshed();

        Mock::given(method("GET"))
            .and(path("/photos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "odd"})))
            .mount(&server)
            .await;
        assert!(gallery.refresh(&api, "tok").await.is_err());
        assert_eq!(gallery.photos(), before.as_slice());
        assert_eq!(gallery.last_refreshed(), stamp);
    }

    #[tokio::test]
    async fn test_refresh_unauthorized_keeps_mirror() {
        let server = backend().await;
        let api = ApiClient::new(&server.uri()).unwrap();
        let mut gallery = seeded(&api, &server).await;

        Mock::given(method("GET"))
            .and(path("/photos"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        assert!(gallery.refresh(&api, "tok").await.is_err());
        assert_eq!(gallery.len(), 2);
        assert_eq!(
            gallery.get(&PhotoId::from("1")).and_then(|p| p.title.as_deref()),
            Some("First")
        );
    }

    #[test]
    fn test_clear_empties_mirror() {
        let mut gallery = Gallery::new();
        gallery.replace_all(vec![Photo {
            id: PhotoId::from("9"),
            url: "https://x/9.jpg".into(),
            title: None,
            caption: None,
            date: None,
        }]);
        assert!(!gallery.is_empty());
        gallery.clear();
        assert!(gallery.is_empty());
        assert!(gallery.last_refreshed().is_none());
    }
}

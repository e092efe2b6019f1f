//! Object storage client for listing images.
//!
//! Two distinct concerns live here:
//!
//! - **URL resolution** ([`StorageClient::resolve`]): a pure string transform
//!   that turns a stored image reference into a publicly fetchable URL. Every
//!   view goes through it, so it must be stable and cheap to call per render.
//!   A reference that resolves but 404s at fetch time is the client's problem
//!   (placeholder image), not the resolver's.
//! - **Bucket I/O** ([`StorageClient::upload`], [`StorageClient::list`]):
//!   best-effort HTTP calls against the storage service, single attempt, no
//!   retry.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::StorageConfig;

/// Errors that can occur when talking to the storage service.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage service returned an error response.
    #[error("storage error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Writes require a service key that was not configured.
    #[error("storage writes are not configured (missing service key)")]
    WritesNotConfigured,
}

/// Client for the listing-image bucket.
#[derive(Debug, Clone)]
pub struct StorageClient {
    client: reqwest::Client,
    /// Public base URL of the storage service, no trailing slash.
    base: String,
    bucket: String,
    has_service_key: bool,
}

impl StorageClient {
    /// Create a new storage client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build (only possible with
    /// a malformed service key).
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut headers = HeaderMap::new();
        let has_service_key = config.service_key.is_some();

        if let Some(key) = &config.service_key {
            let auth_value = format!("Bearer {}", key.expose_secret());
            let mut value = HeaderValue::from_str(&auth_value).map_err(|_| StorageError::Api {
                status: 0,
                message: "invalid service key format".to_string(),
            })?;
            value.set_sensitive(true);
            headers.insert("Authorization", value);
        }

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base: config.public_url.as_str().trim_end_matches('/').to_owned(),
            bucket: config.bucket.clone(),
            has_service_key,
        })
    }

    /// The public URL for a storage-relative key.
    ///
    /// Pure string computation: `{base}/object/public/{bucket}/{key}`. No
    /// network round-trip, no check that the object exists.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.base,
            self.bucket,
            key.trim_start_matches('/')
        )
    }

    /// Resolve a stored image reference into a fetchable URL.
    ///
    /// Absent or empty references resolve to `None`. References that already
    /// carry an HTTP scheme are returned unchanged; anything else is treated
    /// as a key into the configured bucket. Same input, same output.
    #[must_use]
    pub fn resolve(&self, reference: Option<&str>) -> Option<String> {
        let reference = reference?.trim();
        if reference.is_empty() {
            return None;
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Some(reference.to_owned());
        }
        Some(self.public_url(reference))
    }

    /// Upload an object into the bucket.
    ///
    /// Single best-effort attempt; the caller has already validated content
    /// type and size.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WritesNotConfigured`] without a service key,
    /// [`StorageError::Http`] on transport failure, or [`StorageError::Api`]
    /// when the service rejects the upload.
    pub async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if !self.has_service_key {
            return Err(StorageError::WritesNotConfigured);
        }

        let url = format!(
            "{}/object/{}/{}",
            self.base,
            self.bucket,
            key.trim_start_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// List object keys in the bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Http`] on transport failure or
    /// [`StorageError::Api`] on a non-success response.
    pub async fn list(&self) -> Result<Vec<String>, StorageError> {
        if !self.has_service_key {
            return Err(StorageError::WritesNotConfigured);
        }

        let url = format!("{}/object/list/{}", self.base, self.bucket);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "prefix": "" }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let entries: Vec<ObjectEntry> = response.json().await?;
        Ok(entries.into_iter().map(|e| e.name).collect())
    }
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn client() -> StorageClient {
        StorageClient::new(&StorageConfig {
            public_url: Url::parse("https://cdn.tackroom.dk/storage/v1").expect("valid url"),
            bucket: "listing-images".to_string(),
            service_key: None,
        })
        .expect("client builds")
    }

    #[test]
    fn test_resolve_absent_reference() {
        let storage = client();
        assert_eq!(storage.resolve(None), None);
        assert_eq!(storage.resolve(Some("")), None);
        assert_eq!(storage.resolve(Some("   ")), None);
    }

    #[test]
    fn test_resolve_absolute_url_unchanged() {
        let storage = client();
        let input = "https://elsewhere.example/photo.jpg";
        let resolved = storage.resolve(Some(input)).expect("resolves");
        assert_eq!(resolved, input);
        // Resolving the output again yields the same string (idempotent).
        assert_eq!(storage.resolve(Some(&resolved)).as_deref(), Some(input));
    }

    #[test]
    fn test_resolve_relative_key_deterministic() {
        let storage = client();
        let first = storage.resolve(Some("saddles/abc.jpg")).expect("resolves");
        let second = storage.resolve(Some("saddles/abc.jpg")).expect("resolves");
        assert_eq!(first, second);
        assert_eq!(
            first,
            "https://cdn.tackroom.dk/storage/v1/object/public/listing-images/saddles/abc.jpg"
        );
    }

    #[test]
    fn test_resolve_strips_leading_slash() {
        let storage = client();
        assert_eq!(
            storage.resolve(Some("/bridles/x.png")).expect("resolves"),
            "https://cdn.tackroom.dk/storage/v1/object/public/listing-images/bridles/x.png"
        );
    }

    #[tokio::test]
    async fn test_upload_without_service_key_rejected() {
        let storage = client();
        let result = storage.upload("k", vec![1, 2, 3], "image/png").await;
        assert!(matches!(result, Err(StorageError::WritesNotConfigured)));
    }
}

//! Slide image storage on S3-compatible object storage
//!
//! Images are written under `<uuid>_<original file name>` and served either
//! through a public URL prefix or through short-lived presigned URLs.

use bytes::Bytes;
use opendal::{services, Operator};
use std::time::Duration;
use tracing::{info, trace, warn};

use crate::{config::StorageConfig, Error, Result};

#[derive(Clone)]
pub struct ImageStore {
    operator: Operator,
    public_url_prefix: String,
    presign_expires: Duration,
}

impl std::fmt::Debug for ImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStore")
            .field("scheme", &self.operator.info().scheme())
            .field("bucket", &self.operator.info().name())
            .field("presign_expires", &self.presign_expires)
            .finish()
    }
}

impl ImageStore {
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let operator = match config.backend.as_str() {
            "memory" => Operator::new(services::Memory::default())?.finish(),
            "s3" => {
                info!(
                    bucket = %config.bucket,
                    endpoint = %config.endpoint,
                    "Initializing S3 image storage"
                );

                let mut builder = services::S3::default()
                    .bucket(&config.bucket)
                    .region(&config.region);
                if !config.endpoint.is_empty() {
                    builder = builder.endpoint(&config.endpoint);
                }
                if !config.access_key_id.is_empty() {
                    builder = builder
                        .access_key_id(&config.access_key_id)
                        .secret_access_key(&config.secret_access_key);
                }

                Operator::new(builder)?.finish()
            }
            other => {
                return Err(Error::InvalidInput(format!(
                    "Unsupported storage backend: {other}"
                )))
            }
        };

        Ok(Self {
            operator,
            public_url_prefix: config.public_url_prefix.clone(),
            presign_expires: Duration::from_secs(config.presign_expires_seconds),
        })
    }

    /// In-memory store serving URLs under `public_url_prefix`
    pub fn memory(public_url_prefix: &str) -> Result<Self> {
        Ok(Self {
            operator: Operator::new(services::Memory::default())?.finish(),
            public_url_prefix: public_url_prefix.to_string(),
            presign_expires: Duration::from_secs(600),
        })
    }

    /// Object key for an uploaded file: a random UUID, an underscore, then
    /// the file name with path separators replaced
    #[must_use]
    pub fn object_key(file_name: &str) -> String {
        let safe_name: String = file_name
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        format!("{}_{safe_name}", uuid::Uuid::new_v4())
    }

    /// Store an image and return its object key
    pub async fn upload(&self, file_name: &str, data: Bytes) -> Result<String> {
        let key = Self::object_key(file_name);
        let size = data.len();

        self.operator.write(&key, data).await?;

        trace!(key = %key, size, "Stored image");
        Ok(key)
    }

    /// URL a browser can fetch the image from
    pub async fn url(&self, key: &str) -> Result<String> {
        if !self.public_url_prefix.is_empty() {
            return Ok(format!("{}{key}", self.public_url_prefix));
        }

        let request = self.operator.presign_read(key, self.presign_expires).await?;
        Ok(request.uri().to_string())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidInput("MISSING_FILE_NAME".to_string()));
        }

        self.operator.delete(key).await?;

        trace!(key = %key, "Deleted image");
        Ok(())
    }

    /// Delete several images, logging failures instead of returning them.
    /// Returns how many deletions succeeded.
    pub async fn delete_best_effort(&self, keys: &[String]) -> usize {
        let mut deleted = 0;
        for key in keys {
            match self.delete(key).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!(key = %key, error = %e, "Failed to delete image"),
            }
        }
        deleted
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.operator.exists(key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_layout() {
        let key = ImageStore::object_key("photo.jpg");
        let (uuid, name) = key.split_once('_').unwrap();
        assert!(uuid::Uuid::parse_str(uuid).is_ok());
        assert_eq!(name, "photo.jpg");

        let key = ImageStore::object_key("../etc/passwd");
        assert!(!key.contains('/'));
    }

    #[tokio::test]
    async fn test_upload_url_delete() {
        let store = ImageStore::memory("https://cdn.example.com/").unwrap();

        let key = store
            .upload("slide.png", Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap();
        assert!(key.ends_with("_slide.png"));
        assert!(store.exists(&key).await.unwrap());

        let url = store.url(&key).await.unwrap();
        assert_eq!(url, format!("https://cdn.example.com/{key}"));

        store.delete(&key).await.unwrap();
        assert!(!store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_requires_name() {
        let store = ImageStore::memory("").unwrap();
        let err = store.delete("").await.unwrap_err();
        assert_eq!(err.client_message(), "MISSING_FILE_NAME");
    }

    #[tokio::test]
    async fn test_delete_best_effort_counts() {
        let store = ImageStore::memory("").unwrap();
        let key = store.upload("a.jpg", Bytes::from_static(b"a")).await.unwrap();

        let deleted = store
            .delete_best_effort(&[key, String::new()])
            .await;
        assert_eq!(deleted, 1);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let config = StorageConfig {
            backend: "ftp".to_string(),
            ..StorageConfig::default()
        };
        assert!(ImageStore::from_config(&config).is_err());
    }
}

//! Image hosting for profile, plant and collection pictures.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::{CloudinaryConfig, Config};
use crate::error::LeafError;

/// Where uploaded images live; urls returned by `upload` are what the
/// entities store.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, LeafError>;
    async fn delete(&self, url: &str) -> Result<(), LeafError>;
}

fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(3)
        .with_jitter()
}

/// Cloudinary public id: the last path segment without its extension.
pub fn public_id_from_url(image_url: &str) -> Option<String> {
    let parsed = Url::parse(image_url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let id = last.rsplit_once('.').map_or(last, |(stem, _)| stem);
    (!id.is_empty()).then(|| id.to_string())
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

pub struct CloudinaryImageStore {
    client: reqwest::Client,
    cfg: CloudinaryConfig,
    base: String,
}

impl CloudinaryImageStore {
    pub fn new(client: reqwest::Client, cfg: CloudinaryConfig) -> Self {
        Self::with_base(client, cfg, "https://api.cloudinary.com")
    }

    pub fn with_base(client: reqwest::Client, cfg: CloudinaryConfig, base: &str) -> Self {
        Self {
            client,
            cfg,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    async fn post_upload(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let endpoint = format!("{}/v1_1/{}/image/upload", self.base, self.cfg.cloud_name);
        (|| async {
            let part =
                reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string());
            let form = reqwest::multipart::Form::new()
                .text("upload_preset", self.cfg.upload_preset.clone())
                .part("file", part);
            let resp = self.client.post(&endpoint).multipart(form).send().await?;
            if resp.status().is_server_error() {
                let status = resp.status();
                warn!(%status, "image host server error (will retry)");
                return resp.error_for_status();
            }
            Ok(resp)
        })
        .retry(default_retry_policy())
        .await
    }
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, LeafError> {
        let resp = self.post_upload(&bytes, filename).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LeafError::ImageHost(format!("upload rejected ({status}): {body}")));
        }
        let body: UploadResponse = resp.json().await?;
        let url = body
            .secure_url
            .or(body.url)
            .ok_or_else(|| LeafError::ImageHost("upload response carries no url".to_string()))?;
        info!(%url, "image uploaded");
        Ok(url)
    }

    async fn delete(&self, image_url: &str) -> Result<(), LeafError> {
        let Some(public_id) = public_id_from_url(image_url) else {
            debug!(url = %image_url, "not a hosted image, nothing to delete");
            return Ok(());
        };
        let endpoint = format!(
            "{}/v1_1/{}/resources/image/upload",
            self.base, self.cfg.cloud_name
        );
        let resp = (|| async {
            let resp = self
                .client
                .delete(&endpoint)
                .basic_auth(&self.cfg.api_key, Some(&self.cfg.api_secret))
                .query(&[("public_ids[]", public_id.as_str())])
                .send()
                .await?;
            if resp.status().is_server_error() {
                warn!(status = %resp.status(), "image host server error (will retry)");
                return resp.error_for_status();
            }
            Ok(resp)
        })
        .retry(default_retry_policy())
        .await?;
        if !resp.status().is_success() {
            return Err(LeafError::ImageHost(format!(
                "delete of {public_id} rejected ({})",
                resp.status()
            )));
        }
        info!(%public_id, "image deleted");
        Ok(())
    }
}

/// Keeps images on local disk, served under `/uploads`.
pub struct LocalImageStore {
    dir: PathBuf,
}

const LOCAL_PREFIX: &str = "/uploads/";

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn extension(filename: &str) -> String {
        filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string())
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, LeafError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let name = format!("{}.{}", Uuid::new_v4(), Self::extension(filename));
        tokio::fs::write(self.dir.join(&name), bytes).await?;
        debug!(%name, "image stored locally");
        Ok(format!("{LOCAL_PREFIX}{name}"))
    }

    async fn delete(&self, image_url: &str) -> Result<(), LeafError> {
        let Some(name) = image_url.strip_prefix(LOCAL_PREFIX) else {
            debug!(url = %image_url, "not a local image, nothing to delete");
            return Ok(());
        };
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return Ok(());
        }
        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Cloudinary when every credential is configured, local disk otherwise.
pub fn from_config(cfg: &Config, client: reqwest::Client) -> std::sync::Arc<dyn ImageStore> {
    match cfg.cloudinary() {
        Some(cloudinary) => {
            info!(cloud = %cloudinary.cloud_name, "using cloudinary image host");
            std::sync::Arc::new(CloudinaryImageStore::new(client, cloudinary))
        }
        None => {
            info!(dir = %cfg.upload_dir.display(), "using local image store");
            std::sync::Arc::new(LocalImageStore::new(cfg.upload_dir.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_id_strips_path_and_extension() {
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/image/upload/v1700000000/abc123.jpg"),
            Some("abc123".to_string())
        );
        assert_eq!(public_id_from_url("not a url"), None);
    }

    #[tokio::test]
    async fn local_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());
        let url = store.upload(b"png".to_vec(), "Leaf.PNG").await.unwrap();
        assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

        let file = dir.path().join(url.trim_start_matches("/uploads/"));
        assert!(file.exists());
        store.delete(&url).await.unwrap();
        assert!(!file.exists());
        // second delete is fine
        store.delete(&url).await.unwrap();
    }

    #[tokio::test]
    async fn local_store_ignores_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());
        store.delete("/uploads/../Cargo.toml").await.unwrap();
        store.delete("https://elsewhere.test/x.jpg").await.unwrap();
    }
}

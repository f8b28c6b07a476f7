//! Image hosting for admin product uploads.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::config::CloudinaryConfig;
use crate::{EcommerceError, Result};

/// Largest accepted upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    #[serde(default)]
    pub public_id: Option<String>,
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, content_type: String) -> Result<UploadedImage>;
}

/// `data:` URI the way upload bodies are encoded.
pub fn data_uri(bytes: &[u8], content_type: &str) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(bytes))
}

/// Signed upload to Cloudinary's image endpoint.
pub struct CloudinaryHost {
    config: CloudinaryConfig,
    client: reqwest::Client,
    api_base: String,
}

#[derive(Deserialize)]
struct CloudinaryResponse {
    secure_url: String,
    #[serde(default)]
    public_id: Option<String>,
}

impl CloudinaryHost {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(60)).build()
            .map_err(|e| EcommerceError::ImageHost(e.to_string()))?;
        Ok(Self { config, client, api_base: "https://api.cloudinary.com".into() })
    }

    /// Hex SHA-256 of the sorted parameters followed by the API secret.
    fn sign(&self, timestamp: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("timestamp={timestamp}{}", self.config.api_secret));
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, bytes: Vec<u8>, content_type: String) -> Result<UploadedImage> {
        let timestamp = chrono::Utc::now().timestamp();
        let form = [
            ("file", data_uri(&bytes, &content_type)),
            ("api_key", self.config.api_key.clone()),
            ("timestamp", timestamp.to_string()),
            ("signature_algorithm", "sha256".to_string()),
            ("signature", self.sign(timestamp)),
        ];
        let response = self.client
            .post(format!("{}/v1_1/{}/image/upload", self.api_base, self.config.cloud_name))
            .form(&form)
            .send()
            .await
            .map_err(|e| EcommerceError::ImageHost(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %body, "image upload rejected");
            return Err(EcommerceError::ImageHost(format!("upload failed ({status})")));
        }
        let uploaded: CloudinaryResponse = response.json().await.map_err(|e| EcommerceError::ImageHost(e.to_string()))?;
        info!(public_id = ?uploaded.public_id, "image uploaded");
        Ok(UploadedImage { url: uploaded.secure_url, public_id: uploaded.public_id })
    }
}

/// Fallback when no image host is configured: hands the image back inline.
pub struct InlineImageHost;

#[async_trait]
impl ImageHost for InlineImageHost {
    async fn upload(&self, bytes: Vec<u8>, content_type: String) -> Result<UploadedImage> {
        Ok(UploadedImage { url: data_uri(&bytes, &content_type), public_id: None })
    }
}

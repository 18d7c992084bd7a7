//! Avatar image handling: downscale + PNG re-encode, the local cache
//! file, and the blob store the compressed image is pushed to.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::RwLock;

use async_trait::async_trait;
use image::{GenericImageView, ImageFormat};
use reqwest::Client;

use crate::error::AppError;
use crate::firestore::FirebaseConfig;

/// Avatars are downscaled to fit this bound before upload.
pub const AVATAR_MAX_DIM: u32 = 256;

/// Decode arbitrary image bytes, downscale to the avatar bound while
/// keeping aspect ratio (never upscaling), and re-encode as PNG.
pub fn compress_avatar(source_bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    if source_bytes.is_empty() {
        return Err(AppError::BadRequest("Avatar image is empty".to_string()));
    }

    let source = image::load_from_memory(source_bytes)
        .map_err(|e| AppError::BadRequest(format!("Failed to decode avatar image: {}", e)))?;

    let (width, height) = source.dimensions();
    let resized = if width <= AVATAR_MAX_DIM && height <= AVATAR_MAX_DIM {
        source
    } else {
        source.thumbnail(AVATAR_MAX_DIM, AVATAR_MAX_DIM)
    };

    let mut cursor = Cursor::new(Vec::new());
    resized
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| AppError::BadRequest(format!("Failed to encode avatar PNG: {}", e)))?;

    Ok(cursor.into_inner())
}

/// Remote blob storage for the single per-user avatar file.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, blob_path: &str, bytes: Vec<u8>) -> Result<(), AppError>;
    async fn download(&self, blob_path: &str) -> Result<Vec<u8>, AppError>;
}

pub struct FirebaseStorageClient {
    client: Client,
    config: FirebaseConfig,
}

impl FirebaseStorageClient {
    pub fn new(config: FirebaseConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn object_url(&self, blob_path: &str) -> String {
        // Object names are a single URL segment on this API.
        format!(
            "https://firebasestorage.googleapis.com/v0/b/{}/o/{}",
            self.config.storage_bucket,
            blob_path.replace('/', "%2F")
        )
    }
}

#[async_trait]
impl BlobStore for FirebaseStorageClient {
    async fn upload(&self, blob_path: &str, bytes: Vec<u8>) -> Result<(), AppError> {
        let url = format!(
            "https://firebasestorage.googleapis.com/v0/b/{}/o?uploadType=media&name={}",
            self.config.storage_bucket,
            blob_path.replace('/', "%2F")
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "image/png")
            .body(bytes)
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!(
                "Storage upload error {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn download(&self, blob_path: &str) -> Result<Vec<u8>, AppError> {
        let url = format!("{}?alt=media", self.object_url(blob_path));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote(format!(
                "Storage download error {}: {}",
                status, body
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|_| AppError::InternalServerError)?;
        Ok(bytes.to_vec())
    }
}

/// In-process blob store used by tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, blob_path: &str, bytes: Vec<u8>) -> Result<(), AppError> {
        let mut blobs = self.blobs.write().expect("blob store lock poisoned");
        blobs.insert(blob_path.to_string(), bytes);
        Ok(())
    }

    async fn download(&self, blob_path: &str) -> Result<Vec<u8>, AppError> {
        let blobs = self.blobs.read().expect("blob store lock poisoned");
        blobs
            .get(blob_path)
            .cloned()
            .ok_or(AppError::NotFound)
    }
}

// src/services/storage.rs
//! Resume file storage: local directory by default, S3 when configured.
//!
//! Storage is deliberately dumb: store bytes under a key, delete by key.
//! An S3 failure on upload falls back to local storage so a provider outage
//! never loses a user's resume.

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 credentials not configured")]
    NotConfigured,

    #[error("S3 operation failed: {0}")]
    S3Error(String),

    #[error("Local file operation failed: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
struct S3Config {
    access_key_id: String,
    secret_access_key: String,
    region: String,
    bucket: String,
}

impl S3Config {
    fn from_env() -> Option<Self> {
        let access_key_id = env::var("AWS_ACCESS_KEY_ID").ok().filter(|v| !v.is_empty())?;
        let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY")
            .ok()
            .filter(|v| !v.is_empty())?;
        let bucket = env::var("AWS_S3_BUCKET_NAME").ok().filter(|v| !v.is_empty())?;
        let region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        Some(Self {
            access_key_id,
            secret_access_key,
            region,
            bucket,
        })
    }
}

/// Where a stored file ended up; persisted on the resume row so download
/// and delete know which backend to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredFile {
    Local(PathBuf),
    S3 { key: String },
}

impl StoredFile {
    pub fn location(&self) -> String {
        match self {
            StoredFile::Local(path) => format!("local:{}", path.display()),
            StoredFile::S3 { key } => format!("s3:{}", key),
        }
    }
}

#[derive(Debug)]
pub struct StorageService {
    resumes_dir: PathBuf,
    s3: Option<S3Config>,
    use_s3: bool,
}

impl StorageService {
    pub fn new(resumes_dir: PathBuf, use_s3: bool) -> Self {
        let s3 = S3Config::from_env();
        if use_s3 && s3.is_none() {
            warn!("STORAGE_TYPE=s3 but S3 credentials are incomplete, using local storage");
        }

        Self {
            resumes_dir,
            s3,
            use_s3,
        }
    }

    /// Reads `RESUMES_DIR` and `STORAGE_TYPE` (`local` default, `s3` opt-in).
    pub fn from_env() -> Self {
        let resumes_dir = env::var("RESUMES_DIR").unwrap_or_else(|_| "./uploads/resumes".to_string());
        let storage_type = env::var("STORAGE_TYPE").unwrap_or_else(|_| "local".to_string());

        Self::new(PathBuf::from(resumes_dir), storage_type.starts_with("s3"))
    }

    async fn s3_client(&self) -> Result<(S3Client, String), StorageError> {
        let config = self.s3.as_ref().ok_or(StorageError::NotConfigured)?;

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "env",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        Ok((S3Client::new(&aws_config), config.bucket.clone()))
    }

    /// Stores resume bytes under `filename`, preferring S3 when enabled and
    /// falling back to the local directory on S3 failure.
    pub async fn store_resume(
        &self,
        data: &[u8],
        filename: &str,
    ) -> Result<StoredFile, StorageError> {
        if self.use_s3 && self.s3.is_some() {
            let key = format!("resumes/{}", filename);
            match self.upload_to_s3(data, &key).await {
                Ok(()) => {
                    info!(key = %key, "Resume uploaded to S3");
                    return Ok(StoredFile::S3 { key });
                }
                Err(e) => {
                    warn!(error = %e, key = %key, "S3 upload failed, falling back to local storage");
                }
            }
        }

        let path = self.resumes_dir.join(filename);
        tokio::fs::write(&path, data).await?;
        info!(path = %path.display(), "Resume stored locally");
        Ok(StoredFile::Local(path))
    }

    async fn upload_to_s3(&self, data: &[u8], key: &str) -> Result<(), StorageError> {
        let (client, bucket) = self.s3_client().await?;

        client
            .put_object()
            .bucket(&bucket)
            .key(key)
            .body(ByteStream::from(Bytes::copy_from_slice(data)))
            .content_type("application/pdf")
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, key = %key, "Failed to upload file to S3");
                StorageError::S3Error(format!("Upload failed: {}", e))
            })?;

        Ok(())
    }

    /// Deletes a stored resume file. Missing local files are a no-op: the
    /// row is already gone or was never written, either way there is
    /// nothing to clean up.
    pub async fn delete_resume(&self, location: &str) -> Result<(), StorageError> {
        if let Some(key) = location.strip_prefix("s3:") {
            let (client, bucket) = self.s3_client().await?;
            client
                .delete_object()
                .bucket(&bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| StorageError::S3Error(format!("Delete failed: {}", e)))?;
            return Ok(());
        }

        let path = location.strip_prefix("local:").unwrap_or(location);
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }
}

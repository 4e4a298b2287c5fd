//! Pluggable file storage for avatars and story covers.
//!
//! [`StorageProvider`] is implemented by [`DriveStorage`] (Google Drive
//! REST API with an OAuth refresh token) and [`S3Storage`] (any
//! S3-compatible bucket). [`StorageConfig::from_env`] picks one from
//! `STORAGE_PROVIDER`.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Trait and shared types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Storage provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("S3 error: {0}")]
    S3(String),
}

/// A file persisted by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Provider-specific identifier used for deletion.
    pub file_id: String,
    /// Publicly readable URL.
    pub url: String,
}

#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Upload `bytes` under a display `name` and make it publicly readable.
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredFile, StorageError>;

    /// Delete a previously uploaded file. Missing files are not an error.
    async fn delete(&self, file_id: &str) -> Result<(), StorageError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

/// Build a unique object name keeping the original extension.
pub fn object_name(prefix: &str, original_name: &str) -> String {
    let extension = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("{prefix}-{}.{ext}", uuid::Uuid::now_v7()),
        None => format!("{prefix}-{}", uuid::Uuid::now_v7()),
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which provider to build, with its settings.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Drive(DriveConfig),
    S3(S3Config),
}

#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Folder uploads are moved into, if set.
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2).
    pub endpoint: Option<String>,
    /// Base URL for public object links; defaults to the AWS virtual-host URL.
    pub public_base_url: Option<String>,
}

fn required(name: &str) -> Result<String, StorageError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StorageError::Config(format!("{name} must be set")))
}

impl StorageConfig {
    /// Load from the environment.
    ///
    /// `STORAGE_PROVIDER=drive` reads `GOOGLE_DRIVE_CLIENT_ID`,
    /// `GOOGLE_DRIVE_CLIENT_SECRET`, `GOOGLE_DRIVE_REFRESH_TOKEN` and
    /// optionally `GOOGLE_DRIVE_FOLDER_ID`. `STORAGE_PROVIDER=s3` reads
    /// `S3_BUCKET`, `S3_REGION`, `S3_ACCESS_KEY_ID`, `S3_SECRET_ACCESS_KEY`
    /// and optionally `S3_ENDPOINT` and `S3_PUBLIC_URL`.
    ///
    /// Returns `Ok(None)` when `STORAGE_PROVIDER` is unset.
    pub fn from_env() -> Result<Option<Self>, StorageError> {
        let Some(provider) = std::env::var("STORAGE_PROVIDER").ok().filter(|p| !p.is_empty())
        else {
            return Ok(None);
        };

        match provider.to_ascii_lowercase().as_str() {
            "drive" => Ok(Some(Self::Drive(DriveConfig {
                client_id: required("GOOGLE_DRIVE_CLIENT_ID")?,
                client_secret: required("GOOGLE_DRIVE_CLIENT_SECRET")?,
                refresh_token: required("GOOGLE_DRIVE_REFRESH_TOKEN")?,
                folder_id: std::env::var("GOOGLE_DRIVE_FOLDER_ID").ok().filter(|v| !v.is_empty()),
            }))),
            "s3" => Ok(Some(Self::S3(S3Config {
                bucket: required("S3_BUCKET")?,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key_id: required("S3_ACCESS_KEY_ID")?,
                secret_access_key: required("S3_SECRET_ACCESS_KEY")?,
                endpoint: std::env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),
                public_base_url: std::env::var("S3_PUBLIC_URL").ok().filter(|v| !v.is_empty()),
            }))),
            other => Err(StorageError::Config(format!(
                "Unknown STORAGE_PROVIDER '{other}' (expected drive or s3)"
            ))),
        }
    }

    /// Construct the configured provider.
    pub async fn build(self) -> Result<Box<dyn StorageProvider>, StorageError> {
        match self {
            Self::Drive(config) => Ok(Box::new(DriveStorage::new(config)?)),
            Self::S3(config) => Ok(Box::new(S3Storage::new(config).await)),
        }
    }
}

// ---------------------------------------------------------------------------
// Google Drive
// ---------------------------------------------------------------------------

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files?uploadType=media";

/// Tokens are refreshed this long before Google's stated expiry.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Public view URL for a Drive file id.
pub fn drive_public_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?export=view&id={file_id}")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Google Drive storage using an offline OAuth refresh token.
pub struct DriveStorage {
    http: reqwest::Client,
    config: DriveConfig,
    token: Mutex<Option<CachedToken>>,
}

impl DriveStorage {
    pub fn new(config: DriveConfig) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    /// Return a valid access token, exchanging the refresh token if needed.
    async fn access_token(&self) -> Result<String, StorageError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Utc::now()) {
            return Ok(token.access_token.clone());
        }

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", self.config.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let token: TokenResponse = check(response).await?.json().await?;

        let expires_at = Utc::now()
            + chrono::Duration::seconds((token.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0));
        tracing::debug!(%expires_at, "Refreshed Google Drive access token");
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }
}

/// Turn a non-success response into [`StorageError::Provider`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Provider {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl StorageProvider for DriveStorage {
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredFile, StorageError> {
        let token = self.access_token().await?;

        // 1. Media upload creates an untitled file.
        let response = self
            .http
            .post(UPLOAD_URL)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        let file: DriveFile = check(response).await?.json().await?;

        // 2. Name it and move it into the configured folder.
        let mut metadata_url = format!("{FILES_URL}/{}", file.id);
        if let Some(folder) = &self.config.folder_id {
            metadata_url.push_str(&format!("?addParents={folder}"));
        }
        let response = self
            .http
            .patch(&metadata_url)
            .bearer_auth(&token)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        check(response).await?;

        // 3. Anyone with the link may read it.
        let response = self
            .http
            .post(format!("{FILES_URL}/{}/permissions", file.id))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;
        check(response).await?;

        tracing::info!(file_id = %file.id, name, "Uploaded file to Google Drive");
        Ok(StoredFile {
            url: drive_public_url(&file.id),
            file_id: file.id,
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), StorageError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .delete(format!("{FILES_URL}/{file_id}"))
            .bearer_auth(&token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(file_id, "Drive file already gone");
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "drive"
    }
}

// ---------------------------------------------------------------------------
// S3
// ---------------------------------------------------------------------------

/// S3 (or S3-compatible) bucket storage. Objects are addressed by key.
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3Storage {
    pub async fn new(config: S3Config) -> Self {
        let credentials = aws_credential_types::Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "chatstory-env",
        );
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let public_base_url = config.public_base_url.unwrap_or_else(|| {
            format!("https://{}.s3.{}.amazonaws.com", config.bucket, config.region)
        });

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket,
            public_base_url,
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl StorageProvider for S3Storage {
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredFile, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::S3(aws_sdk_s3::error::DisplayErrorContext(e).to_string()))?;

        tracing::info!(bucket = %self.bucket, key = name, "Uploaded object to S3");
        Ok(StoredFile {
            file_id: name.to_string(),
            url: self.object_url(name),
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(file_id)
            .send()
            .await
            .map_err(|e| StorageError::S3(aws_sdk_s3::error::DisplayErrorContext(e).to_string()))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn drive_url_uses_export_view() {
        assert_eq!(
            drive_public_url("abc123"),
            "https://drive.google.com/uc?export=view&id=abc123"
        );
    }

    #[test]
    fn object_name_keeps_safe_extension() {
        let name = object_name("cover", "My Photo.PNG");
        assert!(name.starts_with("cover-"));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn object_name_drops_odd_extension() {
        let name = object_name("avatar", "archive.tar.gz?x=1");
        assert!(!name.contains('?'));
        let bare = object_name("avatar", "noext");
        assert!(!bare.contains('.'));
    }

    #[test]
    fn object_names_are_unique() {
        assert_ne!(object_name("a", "x.jpg"), object_name("a", "x.jpg"));
    }

    #[test]
    fn provider_error_display() {
        let err = StorageError::Provider {
            status: 403,
            body: "forbidden".into(),
        };
        assert_eq!(err.to_string(), "Storage provider returned 403: forbidden");
    }

    #[test]
    fn from_env_handles_unset_and_unknown_provider() {
        std::env::remove_var("STORAGE_PROVIDER");
        assert_matches!(StorageConfig::from_env(), Ok(None));

        std::env::set_var("STORAGE_PROVIDER", "ftp");
        assert_matches!(StorageConfig::from_env(), Err(StorageError::Config(_)));
        std::env::remove_var("STORAGE_PROVIDER");
    }
}

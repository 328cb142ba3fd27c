//! Storage for the raw caller-audio capture.
//!
//! Each completed call produces exactly one object holding the caller audio
//! exactly as it arrived (still G.711 encoded, no container). Storage is any
//! `object_store` backend: the local filesystem by default, S3 when a bucket
//! is configured.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::{ObjectStore, path::Path as ObjectPath};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ServerConfig;

/// File name of the capture object inside its stream directory.
pub const CAPTURE_FILE_NAME: &str = "audio.raw";

/// Errors writing a capture.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The object key is not a valid storage path
    #[error("Invalid object key {key:?}: {message}")]
    InvalidKey { key: String, message: String },

    /// The storage backend rejected the write
    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),

    /// The backend could not be set up
    #[error("Storage configuration error: {0}")]
    Configuration(String),

    /// Local directory creation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for a finished call's capture.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Store `audio` under `key`. Called once per call.
    async fn write(&self, key: &str, audio: Bytes) -> Result<(), SinkError>;
}

fn is_valid_stream_id(stream_id: &str) -> bool {
    !stream_id.is_empty() && !stream_id.contains("..") && !stream_id.contains('/')
}

/// Build the capture key for a call.
///
/// Uses the stream id when one started and is safe to embed in a path,
/// otherwise the session id.
pub fn capture_key(stream_id: Option<&str>, session_id: &str) -> String {
    let id = stream_id
        .filter(|id| is_valid_stream_id(id))
        .unwrap_or(session_id);
    format!("{}/{}", id, CAPTURE_FILE_NAME)
}

/// [`AudioSink`] over an `object_store` backend.
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
    prefix: Option<String>,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<String>) -> Self {
        let prefix = prefix
            .map(|p| p.trim().trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
        Self { store, prefix }
    }

    /// Build the sink described by the server configuration.
    ///
    /// Returns `Ok(None)` when recording is disabled.
    pub fn from_config(config: &ServerConfig) -> Result<Option<Self>, SinkError> {
        if !config.recording_enabled {
            return Ok(None);
        }

        let store: Arc<dyn ObjectStore> = match &config.recording_s3_bucket {
            Some(bucket) => {
                let mut builder = AmazonS3Builder::new().with_bucket_name(bucket);
                if let Some(region) = &config.recording_s3_region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &config.recording_s3_endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                if let Some(access_key) = &config.recording_s3_access_key {
                    builder = builder.with_access_key_id(access_key);
                }
                if let Some(secret_key) = &config.recording_s3_secret_key {
                    builder = builder.with_secret_access_key(secret_key);
                }
                let store = builder
                    .build()
                    .map_err(|e| SinkError::Configuration(e.to_string()))?;
                info!("Recording captures to S3 bucket {}", bucket);
                Arc::new(store)
            }
            None => {
                std::fs::create_dir_all(&config.recording_path)?;
                let store = LocalFileSystem::new_with_prefix(&config.recording_path)
                    .map_err(|e| SinkError::Configuration(e.to_string()))?;
                info!("Recording captures to {}", config.recording_path.display());
                Arc::new(store)
            }
        };

        Ok(Some(Self::new(store, config.recording_s3_prefix.clone())))
    }

    fn object_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl AudioSink for ObjectStoreSink {
    async fn write(&self, key: &str, audio: Bytes) -> Result<(), SinkError> {
        let object_key = self.object_key(key);
        let path = ObjectPath::parse(&object_key).map_err(|e| SinkError::InvalidKey {
            key: object_key.clone(),
            message: e.to_string(),
        })?;

        debug!("Writing {} bytes of capture to {}", audio.len(), object_key);
        self.store.put(&path, audio.into()).await?;
        Ok(())
    }
}

//! Storage abstraction trait
//!
//! This module defines the ObjectBackend trait that all storage backends must implement.
//! Keys handed to a backend are already normalized by the facade.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use filestore_core::{FileMetadataRecord, PathError};
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWrite;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error(transparent)]
    UnsupportedPath(#[from] PathError),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "storage-gcs")]
    #[error(transparent)]
    ObjectStore(#[from] object_store::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Writable stream bound to one object. Must be shut down to commit the object.
pub type ObjectWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Per-upload options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Serve the object with `Content-Disposition: attachment`
    pub content_disposition_attachment: bool,
    /// Stream the upload in parts instead of one request
    pub resumable: bool,
}

impl UploadOptions {
    pub fn attachment(content_disposition_attachment: bool) -> Self {
        Self {
            content_disposition_attachment,
            ..Default::default()
        }
    }
}

/// Backend adapter trait
///
/// Each implementation is a thin pass-through to one object storage service.
/// Errors from the underlying service are returned as-is.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Upload in-memory data to `key` in a single request.
    async fn put(&self, key: &str, data: Bytes, options: UploadOptions) -> StorageResult<()>;

    /// Upload a local file to `key`.
    async fn put_file(&self, key: &str, source: &Path, options: UploadOptions)
        -> StorageResult<()>;

    /// Open a writer bound to `key`.
    async fn writer(&self, key: &str, options: UploadOptions) -> StorageResult<ObjectWriter>;

    /// Download the full object.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Download the object into a local file at `destination`.
    async fn download_to(&self, key: &str, destination: &Path) -> StorageResult<()>;

    /// List objects whose key starts with `prefix`, in key order.
    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<FileMetadataRecord>>;

    /// Check for an object at exactly `key`.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Server-side copy within the bucket.
    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()>;

    /// Generate a time-limited read URL.
    async fn signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

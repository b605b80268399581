//! Upload storage engine bound to one bucket
//!
//! Each accepted file is streamed chunk by chunk into
//! [`FileStorage::get_write_stream`]; nothing is buffered in full.

use crate::error::UploadError;
use crate::strategy::{
    join_key, DestinationStrategy, FileInfo, FilenameStrategy, RandomHexFilename,
    StaticDestination,
};
use bytes::Bytes;
use filestore_core::clean_file_path;
use filestore_storage::{FileStorage, StorageError};
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;

/// A file written by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub field_name: String,
    pub original_name: String,
    pub mimetype: String,
    pub bucket: String,
    pub destination: String,
    pub filename: String,
    /// Object key the file was written to.
    pub path: String,
    pub size: u64,
}

#[derive(Clone)]
pub struct StorageEngine {
    storage: Arc<FileStorage>,
    destination: Arc<dyn DestinationStrategy>,
    filename: Arc<dyn FilenameStrategy>,
    uniform_bucket_level_access: bool,
}

impl StorageEngine {
    pub fn new(storage: Arc<FileStorage>) -> Self {
        Self {
            storage,
            destination: Arc::new(StaticDestination::default()),
            filename: Arc::new(RandomHexFilename),
            uniform_bucket_level_access: true,
        }
    }

    pub fn with_destination(mut self, destination: impl DestinationStrategy + 'static) -> Self {
        self.destination = Arc::new(destination);
        self
    }

    pub fn with_filename(mut self, filename: impl FilenameStrategy + 'static) -> Self {
        self.filename = Arc::new(filename);
        self
    }

    pub fn bucket(&self) -> &str {
        self.storage.bucket_name()
    }

    pub fn project_id(&self) -> &str {
        self.storage.project_id()
    }

    /// Objects carry no per-object ACLs; access is governed by the bucket.
    pub fn uniform_bucket_level_access(&self) -> bool {
        self.uniform_bucket_level_access
    }

    pub fn storage(&self) -> &Arc<FileStorage> {
        &self.storage
    }

    /// Stream `data` into the bucket under the key chosen by the strategies.
    pub async fn store<S, E>(&self, info: FileInfo, data: S) -> Result<StoredFile, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let start = Instant::now();
        let destination = self.destination.destination(&info);
        let filename = self
            .filename
            .filename(&info)
            .map_err(|e| UploadError::Filename(e.to_string()))?;
        let raw_key = join_key(&destination, &filename);
        let key = clean_file_path(Some(&raw_key), false)
            .map_err(StorageError::from)?
            .unwrap_or(raw_key);

        let mut writer = self.storage.get_write_stream(&key, false).await?;
        let mut data = std::pin::pin!(data);
        let mut size = 0u64;

        while let Some(chunk) = data.next().await {
            let chunk = chunk.map_err(|e| UploadError::Stream(e.to_string()))?;
            writer.write_all(&chunk).await.map_err(StorageError::from)?;
            size += chunk.len() as u64;
        }
        writer.shutdown().await.map_err(StorageError::from)?;

        tracing::info!(
            bucket = %self.bucket(),
            key = %key,
            field = %info.field_name,
            size_bytes = size,
            duration_ms = start.elapsed().as_millis(),
            "Upload stored"
        );

        Ok(StoredFile {
            field_name: info.field_name,
            original_name: info.original_name,
            mimetype: info.mimetype,
            bucket: self.bucket().to_string(),
            destination,
            filename,
            path: key,
            size,
        })
    }
}

/// Builds upload engines from a shared facade.
pub trait StorageEngineExt {
    /// Engine writing under `destination` with the default random-hex filenames.
    fn storage_engine(&self, destination: impl DestinationStrategy + 'static) -> StorageEngine;
}

impl StorageEngineExt for Arc<FileStorage> {
    fn storage_engine(&self, destination: impl DestinationStrategy + 'static) -> StorageEngine {
        StorageEngine::new(Arc::clone(self)).with_destination(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyError;
    use filestore_core::StorageIdentity;
    use filestore_storage::LocalStorage;
    use std::io;
    use tempfile::TempDir;

    async fn local_engine() -> (TempDir, StorageEngine) {
        let dir = TempDir::new().unwrap();
        let backend = LocalStorage::new(dir.path().to_path_buf(), None)
            .await
            .unwrap();
        let storage = Arc::new(FileStorage::with_backend(
            StorageIdentity::new("proj", "bucket"),
            Arc::new(backend),
        ));
        (dir, storage.storage_engine(StaticDestination::new("uploads")))
    }

    fn info(name: &str) -> FileInfo {
        FileInfo {
            field_name: "file".to_string(),
            original_name: name.to_string(),
            mimetype: "text/plain".to_string(),
        }
    }

    #[tokio::test]
    async fn streams_chunks_into_bucket() {
        let (_dir, engine) = local_engine().await;
        let chunks = futures::stream::iter(vec![
            Ok::<_, io::Error>(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]);

        let stored = engine.store(info("greeting.txt"), chunks).await.unwrap();

        assert_eq!(stored.size, 11);
        assert_eq!(stored.bucket, "bucket");
        assert!(stored.path.starts_with("uploads/"));
        assert!(stored.filename.ends_with(".txt"));
        assert_eq!(
            engine.storage().read_file(&stored.path).await.unwrap(),
            "hello world"
        );
    }

    #[tokio::test]
    async fn custom_filename_strategy_is_used() {
        let (_dir, engine) = local_engine().await;
        let engine = engine.with_filename(|file: &FileInfo| {
            Ok::<_, StrategyError>(format!("copy-{}", file.original_name))
        });
        let chunks = futures::stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(b"x"))]);

        let stored = engine.store(info("a.txt"), chunks).await.unwrap();
        assert_eq!(stored.path, "uploads/copy-a.txt");
        assert!(engine.storage().exists(Some("uploads/copy-a.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn stream_errors_abort_the_upload() {
        let (_dir, engine) = local_engine().await;
        let chunks = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::other("connection reset")),
        ]);

        let result = engine.store(info("a.txt"), chunks).await;
        assert!(matches!(result, Err(UploadError::Stream(ref msg)) if msg.contains("connection reset")));

        let listed = engine.storage().list_files(Some("uploads/")).await.unwrap();
        assert!(listed.is_empty(), "partial upload was committed: {:?}", listed);
    }

    #[tokio::test]
    async fn filename_strategy_errors_fail_before_writing() {
        let (_dir, engine) = local_engine().await;
        let engine = engine.with_filename(|file: &FileInfo| -> Result<String, StrategyError> {
            Err(format!("no name for {}", file.original_name).into())
        });
        let chunks = futures::stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(b"x"))]);

        let result = engine.store(info("a.txt"), chunks).await;
        assert!(matches!(result, Err(UploadError::Filename(ref msg)) if msg == "no name for a.txt"));
        assert!(engine.storage().list_files(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exposes_bucket_identity() {
        let (_dir, engine) = local_engine().await;
        assert_eq!(engine.bucket(), "bucket");
        assert_eq!(engine.project_id(), "proj");
        assert!(engine.uniform_bucket_level_access());
    }
}

use crate::traits::{ObjectBackend, ObjectWriter, StorageError, StorageResult, UploadOptions};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use filestore_core::fs_util::get_file_list;
use filestore_core::FileMetadataRecord;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Directory under the root holding writes that have not been committed yet.
/// Never addressable as a key and never listed.
const STAGING_DIR: &str = ".filestore-staging";

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Local filesystem storage implementation
///
/// Objects live under `base_path`, one file per key. Content-disposition and
/// upload mode have no meaning on disk and are ignored.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for objects (created if missing)
    /// * `base_url` - Prefix for generated URLs; defaults to a `file://` URL of the root
    pub async fn new(base_path: impl Into<PathBuf>, base_url: Option<String>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let base_url = base_url.unwrap_or_else(|| format!("file://{}", base_path.display()));

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys that could escape the base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty() {
            return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
        }
        if storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(format!(
                "Storage key contains invalid characters: {}",
                storage_key
            )));
        }

        if storage_key == STAGING_DIR || storage_key.starts_with(&format!("{}/", STAGING_DIR)) {
            return Err(StorageError::InvalidKey(format!(
                "Storage key is reserved: {}",
                storage_key
            )));
        }

        let path = self.base_path.join(storage_key);

        if let (Ok(base_canonical), Ok(canonical)) =
            (self.base_path.canonicalize(), path.canonicalize())
        {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn path_to_key(relative: &Path) -> String {
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let name = format!(
            "{}-{}.part",
            std::process::id(),
            STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        self.base_path.join(STAGING_DIR).join(name)
    }

    async fn require_existing(&self, storage_key: &str) -> StorageResult<PathBuf> {
        let path = self.key_to_path(storage_key)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }
        Ok(path)
    }
}

#[async_trait]
impl ObjectBackend for LocalStorage {
    async fn put(&self, key: &str, data: Bytes, _options: UploadOptions) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();
        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        options: UploadOptions,
    ) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if options.resumable {
            let mut reader = fs::File::open(source).await?;
            self.ensure_parent_dir(&path).await?;
            let mut file = fs::File::create(&path).await?;
            let bytes_copied = tokio::io::copy(&mut reader, &mut file).await?;
            file.sync_all().await?;

            tracing::info!(
                source = %source.display(),
                key = %key,
                size_bytes = bytes_copied,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Local storage stream upload successful"
            );
            Ok(())
        } else {
            let data = fs::read(source).await?;
            self.put(key, Bytes::from(data), options).await
        }
    }

    async fn writer(&self, key: &str, _options: UploadOptions) -> StorageResult<ObjectWriter> {
        let target = self.key_to_path(key)?;
        self.ensure_parent_dir(&target).await?;

        let staging = self.staging_path();
        self.ensure_parent_dir(&staging).await?;
        let file = fs::File::create(&staging).await?;

        Ok(Box::pin(StagedWriter {
            file,
            staging,
            target,
            commit: None,
            committed: false,
        }))
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.require_existing(key).await?;
        let data = fs::read(&path).await?;

        tracing::debug!(
            key = %key,
            size_bytes = data.len(),
            "Local storage download successful"
        );

        Ok(Bytes::from(data))
    }

    async fn download_to(&self, key: &str, destination: &Path) -> StorageResult<()> {
        let path = self.require_existing(key).await?;
        let size = fs::copy(&path, destination).await?;

        tracing::info!(
            key = %key,
            destination = %destination.display(),
            size_bytes = size,
            "Local storage download to file successful"
        );

        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<FileMetadataRecord>> {
        let prefix = prefix.unwrap_or("");
        let mut records = Vec::new();

        for relative in get_file_list(&self.base_path, true, true).await? {
            let key = Self::path_to_key(&relative);
            if key.starts_with(STAGING_DIR) || !key.starts_with(prefix) {
                continue;
            }

            let meta = fs::metadata(self.base_path.join(&relative)).await?;
            let updated_at: DateTime<Utc> = meta.modified()?.into();
            let created_at: DateTime<Utc> = meta
                .created()
                .map(DateTime::<Utc>::from)
                .unwrap_or(updated_at);

            records.push(FileMetadataRecord {
                name: key,
                created_at,
                updated_at,
            });
        }

        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        let from_path = self.require_existing(from_key).await?;
        let to_path = self.key_to_path(to_key)?;

        self.ensure_parent_dir(&to_path).await?;
        fs::copy(&from_path, &to_path).await?;

        tracing::info!(
            from_key = %from_key,
            to_key = %to_key,
            "Local storage copy successful"
        );

        Ok(())
    }

    async fn signed_url(&self, key: &str, _expires_in: Duration) -> StorageResult<String> {
        self.key_to_path(key)?;
        Ok(self.generate_url(key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

type CommitFuture = Pin<Box<dyn Future<Output = io::Result<()>> + Send>>;

/// Writes into a staging file and renames it onto the object path on
/// shutdown. Dropped before shutdown, the staging file is removed and the
/// object is left untouched.
struct StagedWriter {
    file: fs::File,
    staging: PathBuf,
    target: PathBuf,
    commit: Option<CommitFuture>,
    committed: bool,
}

impl AsyncWrite for StagedWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.file).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.committed {
            return Poll::Ready(Ok(()));
        }

        if this.commit.is_none() {
            ready!(Pin::new(&mut this.file).poll_shutdown(cx))?;
            let staging = this.staging.clone();
            let target = this.target.clone();
            this.commit = Some(Box::pin(async move { fs::rename(staging, target).await }));
        }

        let Some(commit) = this.commit.as_mut() else {
            return Poll::Ready(Ok(()));
        };
        let result = ready!(commit.as_mut().poll(cx));
        this.commit = None;
        this.committed = result.is_ok();
        Poll::Ready(result)
    }
}

impl Drop for StagedWriter {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.staging);
        }
    }
}

//! File storage facade
//!
//! [`FileStorage`] owns one bucket identity and one backend. Every method
//! normalizes its path arguments, delegates to the backend, and reports
//! failures through the configured [`ErrorObserver`].

use crate::factory::create_backend;
use crate::observe::{observed, ErrorObserver, TracingObserver};
use crate::traits::{ObjectBackend, ObjectWriter, StorageError, StorageResult, UploadOptions};
use crate::StorageBackend;
use bytes::Bytes;
use filestore_core::constants::{DEFAULT_SIGNED_URL_EXPIRY_SECS, OK_RESPONSE_TEXT};
use filestore_core::{clean_file_path, FileMetadataRecord, StorageConfig, StorageIdentity};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

/// What to remove from the local disk after a successful upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeleteSource {
    #[default]
    Keep,
    /// Remove the uploaded source file
    File,
    /// Remove this directory tree, but only if it directly contains the source file.
    ///
    /// Paths are compared lexically after dropping `.` components, so `./job`
    /// matches `job/out.txt`. No symlinks are resolved and `..` is kept as-is.
    /// A directory that reduces to nothing (`.` or `""`) is never removed.
    Directory(PathBuf),
}

fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Whether `dir` is the directory that immediately contains `source`.
fn is_parent_dir(dir: &Path, source: &Path) -> bool {
    let dir = lexical(dir);
    if dir.as_os_str().is_empty() {
        return false;
    }
    source.parent().map(lexical) == Some(dir)
}

/// Options for [`FileStorage::write_file_from_path`]
#[derive(Debug, Clone, Default)]
pub struct WriteFromPathOptions {
    pub delete_source: DeleteSource,
    pub content_disposition_attachment: bool,
    /// Use a resumable (multipart) upload
    pub large_file: bool,
}

/// Storage facade bound to one bucket.
#[derive(Clone)]
pub struct FileStorage {
    identity: StorageIdentity,
    backend: Arc<dyn ObjectBackend>,
    observer: Arc<dyn ErrorObserver>,
    signed_url_expiry: Duration,
}

impl FileStorage {
    /// Build the backend described by `config` and bind a facade to it.
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        config
            .validate()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        let backend = create_backend(&config).await?;

        tracing::info!(
            project_id = %config.project_id,
            bucket = %config.bucket_name,
            backend = %config.backend,
            "File storage initialized"
        );

        Ok(Self::with_backend(config.identity(), backend)
            .with_signed_url_expiry(config.signed_url_expiry()))
    }

    /// Bind a facade to an existing backend.
    pub fn with_backend(identity: StorageIdentity, backend: Arc<dyn ObjectBackend>) -> Self {
        Self {
            identity,
            backend,
            observer: Arc::new(TracingObserver),
            signed_url_expiry: Duration::from_secs(DEFAULT_SIGNED_URL_EXPIRY_SECS),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ErrorObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_signed_url_expiry(mut self, expiry: Duration) -> Self {
        self.signed_url_expiry = expiry;
        self
    }

    pub fn identity(&self) -> &StorageIdentity {
        &self.identity
    }

    pub fn bucket_name(&self) -> &str {
        &self.identity.bucket_name
    }

    pub fn project_id(&self) -> &str {
        &self.identity.project_id
    }

    pub fn backend_type(&self) -> StorageBackend {
        self.backend.backend_type()
    }

    fn key(path: &str) -> StorageResult<String> {
        Ok(clean_file_path(Some(path), false)?.unwrap_or_default())
    }

    async fn observe<T, F>(&self, operation: &'static str, fut: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        observed(
            self.observer.as_ref(),
            operation,
            &self.identity.bucket_name,
            fut,
        )
        .await
    }

    /// List objects under `directory` (the whole bucket for `None`).
    pub async fn list_files(
        &self,
        directory: Option<&str>,
    ) -> StorageResult<Vec<FileMetadataRecord>> {
        self.observe("list_files", async {
            let prefix = directory.map(Self::key).transpose()?;
            self.backend.list(prefix.as_deref()).await
        })
        .await
    }

    /// Upload a local file, then optionally clean up the source.
    pub async fn write_file_from_path(
        &self,
        source: impl AsRef<Path>,
        destination: &str,
        options: WriteFromPathOptions,
    ) -> StorageResult<&'static str> {
        let source = source.as_ref();
        self.observe("write_file_from_path", async {
            let key = Self::key(destination)?;
            let upload = UploadOptions {
                content_disposition_attachment: options.content_disposition_attachment,
                resumable: options.large_file,
            };
            self.backend.put_file(&key, source, upload).await?;

            match &options.delete_source {
                DeleteSource::Keep => {}
                DeleteSource::File => fs::remove_file(source).await?,
                DeleteSource::Directory(dir) => {
                    if is_parent_dir(dir, source) {
                        fs::remove_dir_all(dir).await?;
                    } else {
                        tracing::warn!(
                            source = %source.display(),
                            directory = %dir.display(),
                            "Refusing to delete directory that is not the source file's parent"
                        );
                    }
                }
            }

            Ok(OK_RESPONSE_TEXT)
        })
        .await
    }

    /// Upload bytes or a string.
    pub async fn write_file_from_buffer(
        &self,
        data: impl Into<Bytes>,
        destination: &str,
        content_disposition_attachment: bool,
    ) -> StorageResult<&'static str> {
        let data = data.into();
        self.observe("write_file_from_buffer", async {
            let key = Self::key(destination)?;
            self.backend
                .put(&key, data, UploadOptions::attachment(content_disposition_attachment))
                .await?;
            Ok(OK_RESPONSE_TEXT)
        })
        .await
    }

    /// Open a writer for `file_path`. The caller must shut it down to commit.
    pub async fn get_write_stream(
        &self,
        file_path: &str,
        content_disposition_attachment: bool,
    ) -> StorageResult<ObjectWriter> {
        self.observe("get_write_stream", async {
            let key = Self::key(file_path)?;
            self.backend
                .writer(&key, UploadOptions::attachment(content_disposition_attachment))
                .await
        })
        .await
    }

    /// Check for an object at exactly `file_path`.
    pub async fn exists(&self, file_path: Option<&str>) -> StorageResult<bool> {
        self.observe("exists", async {
            let file_path = file_path.ok_or_else(|| {
                StorageError::MissingArgument("exists: file_path is None".to_string())
            })?;
            let key = Self::key(file_path)?;
            self.backend.exists(&key).await
        })
        .await
    }

    /// Server-side copy within the bucket.
    pub async fn copy(&self, source: &str, destination: &str) -> StorageResult<&'static str> {
        self.observe("copy", async {
            let from = Self::key(source)?;
            let to = Self::key(destination)?;
            self.backend.copy(&from, &to).await?;
            Ok(OK_RESPONSE_TEXT)
        })
        .await
    }

    /// Read an object as UTF-8 text. Invalid sequences are replaced.
    pub async fn read_file(&self, file_path: &str) -> StorageResult<String> {
        self.observe("read_file", async {
            let key = Self::key(file_path)?;
            let data = self.backend.get(&key).await?;
            Ok(String::from_utf8_lossy(&data).into_owned())
        })
        .await
    }

    /// Download an object to a local file.
    pub async fn download_file(
        &self,
        source: &str,
        destination: impl AsRef<Path>,
    ) -> StorageResult<&'static str> {
        let destination = destination.as_ref();
        self.observe("download_file", async {
            let key = Self::key(source)?;
            tracing::debug!(key = %key, destination = %destination.display(), "Downloading file");
            self.backend.download_to(&key, destination).await?;
            Ok(OK_RESPONSE_TEXT)
        })
        .await
    }

    /// Time-limited read URL for `file_path`.
    pub async fn get_signed_url(&self, file_path: &str) -> StorageResult<String> {
        self.observe("get_signed_url", async {
            let key = Self::key(file_path)?;
            self.backend.signed_url(&key, self.signed_url_expiry).await
        })
        .await
    }
}

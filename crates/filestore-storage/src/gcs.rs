use crate::traits::{ObjectBackend, ObjectWriter, StorageError, StorageResult, UploadOptions};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use filestore_core::{FileMetadataRecord, StorageIdentity};
use futures::{StreamExt, TryStreamExt};
use http::Method;
use object_store::buffered::BufWriter;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectMeta, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
};
use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Google Cloud Storage implementation
///
/// Keys are passed to the store verbatim; a key `object_store` cannot
/// represent exactly is rejected with [`StorageError::InvalidKey`].
#[derive(Clone)]
pub struct GcsStorage {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    bucket: String,
    project_id: String,
}

impl GcsStorage {
    /// Create a new GcsStorage instance
    ///
    /// Credentials come from the environment (`GOOGLE_*` variables or the
    /// metadata server) unless `credentials_path` points at a service account
    /// key file.
    pub fn new(identity: &StorageIdentity, credentials_path: Option<&str>) -> StorageResult<Self> {
        let mut builder =
            GoogleCloudStorageBuilder::from_env().with_bucket_name(identity.bucket_name.clone());

        if let Some(path) = credentials_path {
            builder = builder.with_service_account_path(path);
        }

        let store = Arc::new(
            builder
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?,
        );

        Ok(GcsStorage {
            store: store.clone(),
            signer: Some(store),
            bucket: identity.bucket_name.clone(),
            project_id: identity.project_id.clone(),
        })
    }

    /// Bind to an already-built store. Signed URLs are unavailable.
    pub fn with_store(identity: &StorageIdentity, store: Arc<dyn ObjectStore>) -> Self {
        GcsStorage {
            store,
            signer: None,
            bucket: identity.bucket_name.clone(),
            project_id: identity.project_id.clone(),
        }
    }

    /// Object location for `key`, refusing anything `object_store` would rewrite
    /// (empty, `.` or `..` segments, leading or trailing `/`).
    fn location(key: &str) -> StorageResult<Path> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
        }
        let location = Path::parse(key)
            .map_err(|e| StorageError::InvalidKey(format!("{}: {}", key, e)))?;
        if location.as_ref() != key {
            return Err(StorageError::InvalidKey(format!(
                "{}: not representable as an object name",
                key
            )));
        }
        Ok(location)
    }

    fn attributes(options: UploadOptions) -> Attributes {
        let mut attributes = Attributes::new();
        if options.content_disposition_attachment {
            attributes.insert(Attribute::ContentDisposition, "attachment".into());
        }
        attributes
    }

    fn buffered_writer(&self, key: &str, options: UploadOptions) -> StorageResult<BufWriter> {
        let location = Self::location(key)?;
        Ok(BufWriter::new(self.store.clone(), location).with_attributes(Self::attributes(options)))
    }

    fn to_record(meta: ObjectMeta) -> FileMetadataRecord {
        // object_store only surfaces the last modification time
        FileMetadataRecord {
            name: meta.location.to_string(),
            created_at: meta.last_modified,
            updated_at: meta.last_modified,
        }
    }
}

#[async_trait]
impl ObjectBackend for GcsStorage {
    async fn put(&self, key: &str, data: Bytes, options: UploadOptions) -> StorageResult<()> {
        let size = data.len() as u64;
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        let opts = PutOptions {
            attributes: Self::attributes(options),
            ..Default::default()
        };
        self.store
            .put_opts(&location, PutPayload::from(data), opts)
            .await?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS upload successful"
        );

        Ok(())
    }

    async fn put_file(
        &self,
        key: &str,
        source: &FsPath,
        options: UploadOptions,
    ) -> StorageResult<()> {
        if !options.resumable {
            let data = fs::read(source).await?;
            return self.put(key, Bytes::from(data), options).await;
        }

        let start = std::time::Instant::now();
        let mut reader = fs::File::open(source).await?;
        let mut writer = self.buffered_writer(key, options)?;

        let copied = tokio::io::copy(&mut reader, &mut writer).await;
        let bytes_copied = match copied {
            Ok(n) => n,
            Err(e) => {
                writer.abort().await?;
                return Err(e.into());
            }
        };
        writer.shutdown().await?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            source = %source.display(),
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS resumable upload successful"
        );

        Ok(())
    }

    async fn writer(&self, key: &str, options: UploadOptions) -> StorageResult<ObjectWriter> {
        tracing::debug!(bucket = %self.bucket, key = %key, "Opening GCS write stream");
        Ok(Box::pin(self.buffered_writer(key, options)?))
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let start = std::time::Instant::now();
        let location = Self::location(key)?;

        let bytes = self.store.get(&location).await?.bytes().await?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS download successful"
        );

        Ok(bytes)
    }

    async fn download_to(&self, key: &str, destination: &FsPath) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Self::location(key)?;

        let mut stream = self.store.get(&location).await?.into_stream();
        let mut file = fs::File::create(destination).await?;
        let mut size = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            size += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.sync_all().await?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            destination = %destination.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS download to file successful"
        );

        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<FileMetadataRecord>> {
        let prefix = prefix.unwrap_or("");

        // object_store lists whole path segments; GCS prefixes are plain string
        // prefixes, so list the enclosing directory and filter.
        let directory = prefix.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let location = if directory.is_empty() {
            None
        } else {
            Some(Self::location(directory)?)
        };

        let objects: Vec<ObjectMeta> = self
            .store
            .list(location.as_ref())
            .try_collect()
            .await?;

        let mut records: Vec<FileMetadataRecord> = objects
            .into_iter()
            .map(Self::to_record)
            .filter(|record| record.name.starts_with(prefix))
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!(
            bucket = %self.bucket,
            project_id = %self.project_id,
            prefix = %prefix,
            count = records.len(),
            "GCS list successful"
        );

        Ok(records)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let location = Self::location(key)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let from = Self::location(from_key)?;
        let to = Self::location(to_key)?;

        self.store.copy(&from, &to).await?;

        tracing::info!(
            bucket = %self.bucket,
            from_key = %from_key,
            to_key = %to_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS copy successful"
        );

        Ok(())
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let location = Self::location(key)?;
        let signer = self.signer.as_ref().ok_or_else(|| {
            StorageError::Unsupported("signed URLs need a GCS-backed store".to_string())
        })?;
        let url = signer.signed_url(Method::GET, &location, expires_in).await?;

        Ok(url.to_string())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Gcs
    }
}

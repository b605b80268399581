#[cfg(feature = "storage-gcs")]
use crate::GcsStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{ObjectBackend, StorageBackend, StorageError, StorageResult};
use filestore_core::StorageConfig;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_backend(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectBackend>> {
    match config.backend {
        #[cfg(feature = "storage-gcs")]
        StorageBackend::Gcs => {
            let storage = GcsStorage::new(&config.identity(), config.credentials_path.as_deref())?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-gcs"))]
        StorageBackend::Gcs => Err(StorageError::ConfigError(
            "GCS storage backend not available (storage-gcs feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            let storage =
                LocalStorage::new(base_path, config.local_storage_base_url.clone()).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn creates_local_backend() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::local("p", "b", dir.path().to_string_lossy().to_string());

        let backend = create_backend(&config).await.unwrap();
        assert_eq!(backend.backend_type(), StorageBackend::Local);
    }

    #[tokio::test]
    async fn local_backend_without_path_fails() {
        let mut config = StorageConfig::local("p", "b", "unused");
        config.local_storage_path = None;

        let result = create_backend(&config).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}

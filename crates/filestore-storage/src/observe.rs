//! Error observation hook
//!
//! Facade operations report failures here exactly once, then hand the original
//! error back to the caller.

use crate::traits::{StorageError, StorageResult};
use std::future::Future;

/// Receives every failed facade operation.
pub trait ErrorObserver: Send + Sync {
    fn on_error(&self, operation: &'static str, bucket: &str, error: &StorageError);
}

/// Default observer: one `tracing` error event per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ErrorObserver for TracingObserver {
    fn on_error(&self, operation: &'static str, bucket: &str, error: &StorageError) {
        tracing::error!(
            error = %error,
            operation = operation,
            bucket = %bucket,
            "File storage operation failed"
        );
    }
}

/// Run `fut`, reporting an error to `observer` before returning it unchanged.
pub async fn observed<T, F>(
    observer: &dyn ErrorObserver,
    operation: &'static str,
    bucket: &str,
    fut: F,
) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    let result = fut.await;
    if let Err(ref e) = result {
        observer.on_error(operation, bucket, e);
    }
    result
}

//! Filestore Storage Library
//!
//! This crate provides the [`FileStorage`] facade and the backends behind it:
//! Google Cloud Storage through `object_store`, and a local directory backend
//! for development and tests.
//!
//! # Object keys
//!
//! Every path handed to the facade goes through
//! [`filestore_core::clean_file_path`] with `keep_leading_slash = false`, so
//! `./a/b.txt`, `/a/b.txt` and `a/b.txt` all address the object `a/b.txt`.
//! No other escaping or validation is applied to keys.

pub mod facade;
pub mod factory;
#[cfg(feature = "storage-gcs")]
pub mod gcs;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod observe;
pub mod traits;

// Re-export commonly used types
pub use facade::{DeleteSource, FileStorage, WriteFromPathOptions};
pub use factory::create_backend;
pub use filestore_core::StorageBackend;
#[cfg(feature = "storage-gcs")]
pub use gcs::GcsStorage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use observe::{ErrorObserver, TracingObserver};
pub use traits::{ObjectBackend, ObjectWriter, StorageError, StorageResult, UploadOptions};

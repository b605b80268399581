//! Filestore Upload Library
//!
//! Multipart upload adapter over [`filestore_storage::FileStorage`]: a storage
//! engine with pluggable destination and filename strategies, a file-type
//! filter, and an axum handler running the engine in single, array or any
//! mode.

pub mod engine;
pub mod error;
pub mod filter;
pub mod handler;
pub mod strategy;

pub use engine::{StorageEngine, StorageEngineExt, StoredFile};
pub use error::{ErrorResponse, UploadError, BAD_UPLOAD};
pub use filter::{FileFilter, UploadType};
pub use handler::{process_multipart, routes, upload_handler, UploadMode, UploadOutcome, UploadState};
pub use strategy::{
    extension_of, DestinationStrategy, FileInfo, FilenameStrategy, RandomHexFilename,
    StaticDestination, StrategyError,
};

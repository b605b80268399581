//! Filestore Core Library
//!
//! This crate provides the pieces shared by every filestore component: the
//! storage path normalizer, configuration, identity and metadata models, and
//! small filesystem helpers.

pub mod config;
pub mod constants;
pub mod fs_util;
pub mod models;
pub mod path;
pub mod storage_types;

// Re-export commonly used types
pub use config::StorageConfig;
pub use models::{FileMetadataRecord, StorageIdentity};
pub use path::{clean_file_path, PathError};
pub use storage_types::StorageBackend;

//! Identity and metadata models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project and bucket a facade is bound to. Fixed for the facade's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageIdentity {
    pub project_id: String,
    pub bucket_name: String,
}

impl StorageIdentity {
    pub fn new(project_id: impl Into<String>, bucket_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            bucket_name: bucket_name.into(),
        }
    }
}

/// One entry of a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadataRecord {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

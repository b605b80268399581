//! Multipart upload handler

use crate::engine::{StorageEngine, StoredFile};
use crate::error::UploadError;
use crate::filter::FileFilter;
use crate::strategy::FileInfo;
use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which file fields a request may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadMode {
    /// Exactly one file field with this name, at most one file.
    Single(String),
    /// Up to `max_count` files under one field name.
    Array { field: String, max_count: usize },
    /// Any file field, any number of files.
    Any,
}

impl UploadMode {
    pub fn single(field: impl Into<String>) -> Self {
        UploadMode::Single(field.into())
    }

    pub fn array(field: impl Into<String>, max_count: usize) -> Self {
        UploadMode::Array {
            field: field.into(),
            max_count,
        }
    }

    /// Check one more file for `field` against the mode, given how many files
    /// the request already carried.
    fn admit(&self, field: &str, seen: usize) -> Result<(), UploadError> {
        let allowed = match self {
            UploadMode::Single(name) => name == field && seen < 1,
            UploadMode::Array { field: name, max_count } => name == field && seen < *max_count,
            UploadMode::Any => true,
        };
        if allowed {
            Ok(())
        } else {
            Err(UploadError::UnexpectedField(field.to_string()))
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct UploadOutcome {
    pub files: Vec<StoredFile>,
    /// Non-file form fields, as text.
    pub fields: BTreeMap<String, String>,
}

/// Drive a multipart body through `engine`.
///
/// Files the filter rejects are skipped; files the mode does not admit fail
/// the whole request. Files stored before a failure stay in the bucket.
pub async fn process_multipart(
    engine: &StorageEngine,
    mode: &UploadMode,
    filter: Option<&FileFilter>,
    mut multipart: Multipart,
) -> Result<UploadOutcome, UploadError> {
    let mut outcome = UploadOutcome::default();
    let mut seen = 0usize;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();

        let Some(original_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await?;
            outcome.fields.insert(field_name, value);
            continue;
        };

        mode.admit(&field_name, seen)?;
        seen += 1;

        let info = FileInfo {
            field_name,
            mimetype: field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string(),
            original_name,
        };

        if let Some(filter) = filter {
            if !filter.accepts(&info) {
                tracing::debug!(
                    field = %info.field_name,
                    filename = %info.original_name,
                    mimetype = %info.mimetype,
                    upload_type = %filter.upload_type(),
                    "Skipping file rejected by filter"
                );
                continue;
            }
        }

        let stored = engine.store(info, field).await?;
        outcome.files.push(stored);
    }

    Ok(outcome)
}

#[derive(Clone)]
pub struct UploadState {
    pub engine: StorageEngine,
    pub mode: UploadMode,
    pub filter: Option<FileFilter>,
}

impl UploadState {
    pub fn new(engine: StorageEngine, mode: UploadMode) -> Self {
        Self {
            engine,
            mode,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

pub async fn upload_handler(
    State(state): State<Arc<UploadState>>,
    multipart: Multipart,
) -> Result<Json<UploadOutcome>, UploadError> {
    let outcome =
        process_multipart(&state.engine, &state.mode, state.filter.as_ref(), multipart).await?;
    tracing::info!(
        bucket = %state.engine.bucket(),
        files = outcome.files.len(),
        fields = outcome.fields.len(),
        "Upload request completed"
    );
    Ok(Json(outcome))
}

/// Router with a single POST route at `path` running [`upload_handler`].
pub fn routes(state: UploadState, path: &str) -> Router {
    Router::new()
        .route(path, post(upload_handler))
        .with_state(Arc::new(state))
}

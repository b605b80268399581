//! Configuration module
//!
//! A [`StorageConfig`] is resolved once, from explicit arguments first and
//! the process environment second, then handed to the storage factory. Nothing
//! here is global: two facades can run side by side with different buckets.

use std::env;
use std::time::Duration;

use crate::constants::{DEFAULT_SIGNED_URL_EXPIRY_SECS, ENV_BUCKET_NAME, ENV_PROJECT_ID};
use crate::models::StorageIdentity;
use crate::storage_types::StorageBackend;

/// Storage configuration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub project_id: String,
    pub bucket_name: String,
    pub backend: StorageBackend,
    // Service account key file; falls back to ambient credentials when unset
    pub credentials_path: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub signed_url_expiry_secs: u64,
}

impl StorageConfig {
    /// Resolve everything from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::resolve(None, None)
    }

    /// Resolve with explicit identity values taking precedence over the environment.
    pub fn resolve(
        project_id: Option<String>,
        bucket_name: Option<String>,
    ) -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::resolve_with(project_id, bucket_name, |key| env::var(key).ok())
    }

    /// Same as [`StorageConfig::resolve`] but reads variables through `lookup`.
    pub fn resolve_with<F>(
        project_id: Option<String>,
        bucket_name: Option<String>,
        lookup: F,
    ) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let project_id = non_empty(project_id)
            .or_else(|| non_empty(lookup(ENV_PROJECT_ID)))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "neither project_id is given to the FileStorage constructor, nor is env var {} set",
                    ENV_PROJECT_ID
                )
            })?;

        let bucket_name = non_empty(bucket_name)
            .or_else(|| non_empty(lookup(ENV_BUCKET_NAME)))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "neither bucket_name is given to the FileStorage constructor, nor is env var {} set",
                    ENV_BUCKET_NAME
                )
            })?;

        let backend = match non_empty(lookup("STORAGE_BACKEND")) {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::default(),
        };

        let signed_url_expiry_secs = lookup("SIGNED_URL_EXPIRY_SECS")
            .unwrap_or_else(|| DEFAULT_SIGNED_URL_EXPIRY_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(DEFAULT_SIGNED_URL_EXPIRY_SECS);

        let config = StorageConfig {
            project_id,
            bucket_name,
            backend,
            credentials_path: non_empty(lookup("GOOGLE_APPLICATION_CREDENTIALS")),
            local_storage_path: non_empty(lookup("LOCAL_STORAGE_PATH")),
            local_storage_base_url: non_empty(lookup("LOCAL_STORAGE_BASE_URL")),
            signed_url_expiry_secs,
        };

        config.validate()?;
        Ok(config)
    }

    /// Build a config for a local directory, bypassing the environment.
    pub fn local(
        project_id: impl Into<String>,
        bucket_name: impl Into<String>,
        root: impl Into<String>,
    ) -> Self {
        StorageConfig {
            project_id: project_id.into(),
            bucket_name: bucket_name.into(),
            backend: StorageBackend::Local,
            credentials_path: None,
            local_storage_path: Some(root.into()),
            local_storage_base_url: None,
            signed_url_expiry_secs: DEFAULT_SIGNED_URL_EXPIRY_SECS,
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.project_id.trim().is_empty() {
            anyhow::bail!("project_id must not be empty");
        }
        if self.bucket_name.trim().is_empty() {
            anyhow::bail!("bucket_name must not be empty");
        }
        if self.backend == StorageBackend::Local && self.local_storage_path.is_none() {
            anyhow::bail!("LOCAL_STORAGE_PATH is required when STORAGE_BACKEND=local");
        }
        if self.signed_url_expiry_secs == 0 {
            anyhow::bail!("SIGNED_URL_EXPIRY_SECS must be greater than zero");
        }
        Ok(())
    }

    pub fn identity(&self) -> StorageIdentity {
        StorageIdentity::new(self.project_id.clone(), self.bucket_name.clone())
    }

    pub fn signed_url_expiry(&self) -> Duration {
        Duration::from_secs(self.signed_url_expiry_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn explicit_values_win_over_environment() {
        let lookup = env_of(&[(ENV_PROJECT_ID, "env-project"), (ENV_BUCKET_NAME, "env-bucket")]);
        let config = StorageConfig::resolve_with(
            Some("my-project".to_string()),
            Some("my-bucket".to_string()),
            lookup,
        )
        .unwrap();

        assert_eq!(config.identity(), StorageIdentity::new("my-project", "my-bucket"));
        assert_eq!(config.backend, StorageBackend::Gcs);
        assert_eq!(config.signed_url_expiry(), Duration::from_secs(600));
    }

    #[test]
    fn falls_back_to_environment() {
        let lookup = env_of(&[
            (ENV_PROJECT_ID, "env-project"),
            (ENV_BUCKET_NAME, "env-bucket"),
            ("SIGNED_URL_EXPIRY_SECS", "120"),
        ]);
        let config = StorageConfig::resolve_with(None, None, lookup).unwrap();

        assert_eq!(config.project_id, "env-project");
        assert_eq!(config.bucket_name, "env-bucket");
        assert_eq!(config.signed_url_expiry_secs, 120);
    }

    #[test]
    fn missing_project_fails() {
        let lookup = env_of(&[(ENV_BUCKET_NAME, "env-bucket")]);
        let err = StorageConfig::resolve_with(None, None, lookup).unwrap_err();
        assert!(err.to_string().contains("project_id"));
    }

    #[test]
    fn missing_bucket_fails() {
        let lookup = env_of(&[]);
        let err = StorageConfig::resolve_with(Some("p".to_string()), Some(String::new()), lookup)
            .unwrap_err();
        assert!(err.to_string().contains("bucket_name"));
    }

    #[test]
    fn local_backend_requires_path() {
        let lookup = env_of(&[("STORAGE_BACKEND", "local")]);
        let err = StorageConfig::resolve_with(Some("p".to_string()), Some("b".to_string()), lookup)
            .unwrap_err();
        assert!(err.to_string().contains("LOCAL_STORAGE_PATH"));
    }

    #[test]
    fn invalid_backend_is_rejected() {
        let lookup = env_of(&[("STORAGE_BACKEND", "ftp")]);
        assert!(
            StorageConfig::resolve_with(Some("p".to_string()), Some("b".to_string()), lookup)
                .is_err()
        );
    }
}

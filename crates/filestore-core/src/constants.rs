/// Success marker returned by mutating storage operations.
pub const OK_RESPONSE_TEXT: &str = "OK";

/// Default lifetime of a signed read URL.
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 600;

/// Environment variable holding the project identifier.
pub const ENV_PROJECT_ID: &str = "GCP_PROJECT_ID";

/// Environment variable holding the bucket name.
pub const ENV_BUCKET_NAME: &str = "GCS_FILE_STORAGE_BUCKET_NAME";

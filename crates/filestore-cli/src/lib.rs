use anyhow::Context;
use filestore_upload::UploadMode;
use serde::Serialize;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Build an upload mode from its command-line name.
pub fn parse_upload_mode(mode: &str, field: &str, max_count: usize) -> anyhow::Result<UploadMode> {
    match mode.to_lowercase().as_str() {
        "single" => Ok(UploadMode::single(field)),
        "array" => {
            anyhow::ensure!(max_count > 0, "--max-count must be at least 1");
            Ok(UploadMode::array(field, max_count))
        }
        "any" => Ok(UploadMode::Any),
        other => anyhow::bail!("Unknown upload mode: {} (expected single, array or any)", other),
    }
}

/// Object key and content for the `index`th seeded file.
pub fn seed_object(prefix: &str, index: usize) -> (String, String) {
    let prefix = prefix.trim_end_matches('/');
    let key = if prefix.is_empty() {
        format!("file_{}.txt", index)
    } else {
        format!("{}/file_{}.txt", prefix, index)
    };
    (key, format!("seeded file {}", index))
}

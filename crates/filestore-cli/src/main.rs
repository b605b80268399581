//! Filestore CLI: command-line driver for the file storage facade.
//!
//! Identity comes from GCP_PROJECT_ID and GCS_FILE_STORAGE_BUCKET_NAME unless
//! --project-id / --bucket are given. Set STORAGE_BACKEND=local with
//! LOCAL_STORAGE_PATH to work against a directory instead of GCS.

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use clap::{Parser, Subcommand};
use filestore_cli::{init_tracing, parse_upload_mode, print_json, seed_object};
use filestore_core::{fs_util::get_file_list, StorageConfig};
use filestore_storage::{DeleteSource, FileStorage, WriteFromPathOptions};
use filestore_upload::{
    routes, FileFilter, StaticDestination, StorageEngineExt, UploadState, UploadType,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

#[derive(Parser)]
#[command(name = "filestore", about = "Bucket file storage CLI")]
struct Cli {
    /// Project id (overrides GCP_PROJECT_ID)
    #[arg(long, global = true)]
    project_id: Option<String>,
    /// Bucket name (overrides GCS_FILE_STORAGE_BUCKET_NAME)
    #[arg(long, global = true)]
    bucket: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether an object exists
    Exists { path: String },
    /// Print an object as text
    Read { path: String },
    /// Download an object to a local file
    Download { source: String, destination: PathBuf },
    /// Upload a local file
    Write {
        source: PathBuf,
        destination: String,
        /// Delete the local file after a successful upload
        #[arg(long, conflicts_with = "delete_dir")]
        delete_source: bool,
        /// Delete this directory after upload, if it directly contains the file
        #[arg(long)]
        delete_dir: Option<PathBuf>,
        /// Serve with Content-Disposition: attachment
        #[arg(long)]
        attachment: bool,
        /// Use a resumable upload
        #[arg(long)]
        large: bool,
    },
    /// Write text content to an object
    Put {
        destination: String,
        content: String,
        #[arg(long)]
        attachment: bool,
    },
    /// List objects under a prefix
    List { prefix: Option<String> },
    /// Copy an object within the bucket
    Copy { source: String, destination: String },
    /// Issue a signed read URL
    SignedUrl { path: String },
    /// Write a batch of small text files, one after another
    Seed {
        #[arg(long, default_value = "30")]
        count: usize,
        #[arg(long, default_value = "test")]
        prefix: String,
    },
    /// Upload every file under a local directory
    UploadDir {
        dir: PathBuf,
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long)]
        recursive: bool,
    },
    /// Run an HTTP upload endpoint
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: String,
        #[arg(long, default_value = "/upload")]
        route: String,
        /// Upload mode: single, array or any
        #[arg(long, default_value = "single")]
        mode: String,
        /// File field name for single and array modes
        #[arg(long, default_value = "file")]
        field: String,
        #[arg(long, default_value = "10")]
        max_count: usize,
        /// File type filter: image, model or any
        #[arg(long, default_value = "any")]
        filter: UploadType,
        /// Destination prefix for uploaded objects
        #[arg(long, default_value = "uploads")]
        destination: String,
        /// Maximum request body size in megabytes
        #[arg(long, default_value = "100")]
        max_body_mb: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = StorageConfig::resolve(cli.project_id, cli.bucket)
        .context("Failed to resolve storage configuration")?;
    let storage = FileStorage::new(config)
        .await
        .context("Failed to create file storage")?;

    match cli.command {
        Commands::Exists { path } => {
            let exists = storage.exists(Some(path.as_str())).await?;
            print_json(&serde_json::json!({ "path": path, "exists": exists }))?;
        }
        Commands::Read { path } => {
            let content = storage.read_file(&path).await?;
            println!("{}", content);
        }
        Commands::Download {
            source,
            destination,
        } => {
            let status = storage.download_file(&source, &destination).await?;
            print_json(&serde_json::json!({ "status": status, "destination": destination }))?;
        }
        Commands::Write {
            source,
            destination,
            delete_source,
            delete_dir,
            attachment,
            large,
        } => {
            let delete_source = match (delete_source, delete_dir) {
                (_, Some(dir)) => DeleteSource::Directory(dir),
                (true, None) => DeleteSource::File,
                (false, None) => DeleteSource::Keep,
            };
            let options = WriteFromPathOptions {
                delete_source,
                content_disposition_attachment: attachment,
                large_file: large,
            };
            let status = storage
                .write_file_from_path(&source, &destination, options)
                .await?;
            print_json(&serde_json::json!({ "status": status, "destination": destination }))?;
        }
        Commands::Put {
            destination,
            content,
            attachment,
        } => {
            let status = storage
                .write_file_from_buffer(content, &destination, attachment)
                .await?;
            print_json(&serde_json::json!({ "status": status, "destination": destination }))?;
        }
        Commands::List { prefix } => {
            let files = storage.list_files(prefix.as_deref()).await?;
            print_json(&files)?;
        }
        Commands::Copy {
            source,
            destination,
        } => {
            let status = storage.copy(&source, &destination).await?;
            print_json(&serde_json::json!({ "status": status, "destination": destination }))?;
        }
        Commands::SignedUrl { path } => {
            let url = storage.get_signed_url(&path).await?;
            print_json(&serde_json::json!({ "path": path, "url": url }))?;
        }
        Commands::Seed { count, prefix } => {
            let mut written = Vec::with_capacity(count);
            for index in 0..count {
                let (key, content) = seed_object(&prefix, index);
                storage.write_file_from_buffer(content, &key, false).await?;
                written.push(key);
            }
            tracing::info!(count, prefix = %prefix, "Seeded files");
            print_json(&written)?;
        }
        Commands::UploadDir {
            dir,
            prefix,
            recursive,
        } => {
            let files = get_file_list(&dir, recursive, true)
                .await
                .with_context(|| format!("Failed to list {}", dir.display()))?;

            let mut uploaded = Vec::with_capacity(files.len());
            for relative in files {
                let relative_key = relative.to_string_lossy().replace('\\', "/");
                let key = match prefix.trim_end_matches('/') {
                    "" => relative_key,
                    prefix => format!("{}/{}", prefix, relative_key),
                };
                storage
                    .write_file_from_path(dir.join(&relative), &key, WriteFromPathOptions::default())
                    .await?;
                uploaded.push(key);
            }
            print_json(&uploaded)?;
        }
        Commands::Serve {
            addr,
            route,
            mode,
            field,
            max_count,
            filter,
            destination,
            max_body_mb,
        } => {
            let mode = parse_upload_mode(&mode, &field, max_count)?;
            let storage = Arc::new(storage);
            let engine = storage.storage_engine(StaticDestination::new(destination));
            let state = UploadState::new(engine, mode).with_filter(FileFilter::new(filter));

            let app = routes(state, &route)
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_body_mb * 1024 * 1024))
                .layer(TraceLayer::new_for_http());
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            tracing::info!(
                addr = %addr,
                route = %route,
                bucket = %storage.bucket_name(),
                upload_type = %filter,
                max_body_mb,
                "Upload server ready and accepting connections"
            );

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down gracefully...");
}

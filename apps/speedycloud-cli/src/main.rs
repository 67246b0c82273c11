//! `speedycloud` - command-line access to the SpeedyCloud APIs.
//!
//! # Usage
//!
//! ```text
//! speedycloud upload sdk 50Mb.file ./50Mb.file --acl public-read
//! speedycloud get /api/v1/products/cloud_servers/ page=1
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SPEEDYCLOUD_ACCESS_KEY` | *(required)* | Access key |
//! | `SPEEDYCLOUD_SECRET_KEY` | *(required)* | Secret key |
//! | `SPEEDYCLOUD_OBJECT_STORAGE_HOST` | `osc.speedycloud.net` | Object-storage host |
//! | `SPEEDYCLOUD_PRODUCT_API_HOST` | `api.speedycloud.cn` | Product-API host |
//! | `SPEEDYCLOUD_PROTOCOL` | `http` | `http` or `https` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use speedycloud_core::{Acl, ClientConfig, Credentials, RequestParams};
use speedycloud_http::PoolRegistry;
use speedycloud_product::ProductApiClient;
use speedycloud_storage::{MultipartCoordinator, ObjectStorageClient};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "speedycloud", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a local file as a multipart object.
    Upload {
        /// Target bucket.
        bucket: String,
        /// Object key.
        key: String,
        /// File to upload.
        file: PathBuf,
        /// Canned ACL for the object.
        #[arg(long)]
        acl: Option<Acl>,
        /// Content type recorded for the object.
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Call a product-API path with GET and print the JSON result.
    Get {
        /// API path, e.g. `/api/v1/products/cloud_servers/`.
        path: String,
        /// Query fields as `name=value`.
        fields: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    init_tracing(&config.log_level)?;

    let credentials = credentials_from_env()?;
    let registry = PoolRegistry::from_config(&config).context("failed to set up connection pools")?;

    let result = run(cli.command, &registry, &config, credentials).await;
    registry.shutdown();
    result
}

async fn run(
    command: Command,
    registry: &PoolRegistry,
    config: &ClientConfig,
    credentials: Credentials,
) -> Result<()> {
    match command {
        Command::Upload {
            bucket,
            key,
            file,
            acl,
            content_type,
        } => {
            let client = ObjectStorageClient::new(registry, config, credentials)?;
            let coordinator = MultipartCoordinator::new(client);

            let mut params = RequestParams::new();
            params.acl = acl;
            params.content_type = content_type;

            let started = Instant::now();
            let response = coordinator
                .upload_file(&bucket, &key, &file, params)
                .await
                .with_context(|| format!("failed to upload {}", file.display()))?;
            info!(
                bucket = %bucket,
                key = %key,
                status = response.status.as_u16(),
                elapsed_ms = started.elapsed().as_millis(),
                "upload finished"
            );
        }
        Command::Get { path, fields } => {
            let client = ProductApiClient::new(registry, config, credentials)?;
            let params = parse_fields(&fields)?;
            let value: serde_json::Value = client.get(&path, &params).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

/// Initialize the tracing subscriber from `RUST_LOG` or the configured level.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn credentials_from_env() -> Result<Credentials> {
    let access_key = std::env::var("SPEEDYCLOUD_ACCESS_KEY")
        .context("SPEEDYCLOUD_ACCESS_KEY is not set")?;
    let secret_key = std::env::var("SPEEDYCLOUD_SECRET_KEY")
        .context("SPEEDYCLOUD_SECRET_KEY is not set")?;
    Ok(Credentials::new(access_key, secret_key))
}

fn parse_fields(fields: &[String]) -> Result<RequestParams> {
    let mut params = RequestParams::new();
    for field in fields {
        let Some((name, value)) = field.split_once('=') else {
            bail!("field {field:?} is not of the form name=value");
        };
        params = params.with_field(name, value);
    }
    Ok(params)
}

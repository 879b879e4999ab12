//! Vodmirror CLI — run one mirror invocation from the command line.
//!
//! Storage backend selection comes from the environment (STORAGE_BACKEND,
//! S3_BUCKET / S3_REGION or LOCAL_STORAGE_PATH); `-b` overrides the bucket.
//! The report — or a structured failure — is printed as JSON so the same
//! output can drive scripts that re-invoke until completion.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use vodmirror_cli::init_tracing;
use vodmirror_core::config::DEFAULT_WORKER_COUNT;
use vodmirror_core::models::MirrorRequest;
use vodmirror_core::MirrorConfig;
use vodmirror_engine::mirror;
use vodmirror_storage::create_store;

#[derive(Parser)]
#[command(name = "vodmirror", about = "Mirror a packaged VOD asset into object storage")]
struct Cli {
    /// Origin URL of the master manifest (.m3u8 or .mpd)
    #[arg(short = 'i', long)]
    source_url: String,

    /// Destination S3 bucket (overrides S3_BUCKET)
    #[arg(short = 'b', long)]
    bucket: Option<String>,

    /// Destination path (asset prefix) inside the store
    #[arg(short = 'd', long)]
    destination_path: String,

    /// Packaging configuration label passed through to the report
    #[arg(short = 'p', long)]
    packaging_config: Option<String>,

    /// CDN auth headers as a JSON object of name/value pairs
    #[arg(long)]
    auth_headers: Option<String>,

    /// Number of transfer workers
    #[arg(short = 't', long, default_value_t = DEFAULT_WORKER_COUNT)]
    workers: usize,

    /// Origin admission limit in requests per second (0 = unlimited)
    #[arg(short = 'r', long, default_value_t = 0.0)]
    rps_limit: f64,

    /// Wall-clock budget for this invocation, in seconds
    #[arg(long)]
    time_budget_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = MirrorConfig::from_env();
    if let Some(bucket) = cli.bucket {
        config.s3_bucket = Some(bucket);
    }

    let store = create_store(&config)
        .await
        .context("Failed to initialize destination store")?;

    let auth_headers = match &cli.auth_headers {
        Some(raw) => Some(parse_auth_headers(raw)?),
        None => None,
    };

    let mut request = MirrorRequest::new(cli.source_url, cli.destination_path);
    request.auth_headers = auth_headers;
    request.packaging_config = cli.packaging_config;
    request.worker_count = cli.workers;
    request.origin_rate_limit = cli.rps_limit;
    request.time_budget = cli.time_budget_secs.map(Duration::from_secs);

    match mirror(&request, store, &config).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(err) => {
            let failure = serde_json::json!({
                "status": "FAILED",
                "code": err.error_code(),
                "message": err.to_string(),
                "retryable": err.is_retryable(),
            });
            println!("{}", serde_json::to_string_pretty(&failure)?);
            std::process::exit(1);
        }
    }
}

fn parse_auth_headers(raw: &str) -> anyhow::Result<HashMap<String, String>> {
    serde_json::from_str(raw).context("--auth-headers must be a JSON object of string pairs")
}

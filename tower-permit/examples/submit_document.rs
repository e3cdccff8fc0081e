//! Submits one or more copies of a document through a gated client.
//!
//! ```text
//! RUST_LOG=tower_permit=debug cargo run --example submit_document -- \
//!     --signature "$SIGNATURE" --document document.json --limit 2 --period 500ms --copies 5
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::task::JoinSet;
use tower_permit::ClientConfig;
use tower_permit::Document;
use tower_permit::GatedClient;
use tower_permit::config::DEFAULT_ENDPOINT;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Submit signed documents without exceeding the request rate")]
struct Args {
    /// Endpoint that creates documents
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Signature token sent with every request
    #[arg(long)]
    signature: String,

    /// Requests allowed per period
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Window length, e.g. `1s` or `250ms`
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
    period: Duration,

    /// Per-request timeout
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// JSON document to submit, in the endpoint's camelCase format
    #[arg(long)]
    document: PathBuf,

    /// How many copies to submit concurrently
    #[arg(long, default_value_t = 1)]
    copies: usize,
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let document: Document = serde_json::from_slice(&tokio::fs::read(&args.document).await?)?;
    info!(doc_id = document.doc_id, products = document.products.len(), "document loaded");

    let config = ClientConfig {
        endpoint: args.endpoint,
        limit: args.limit,
        period_ms: args.period.as_millis().try_into()?,
        initial_delay_ms: None,
        request_timeout_ms: args.timeout.as_millis().try_into()?,
    };
    let client = GatedClient::new(&config)?;

    let mut tasks = JoinSet::new();
    for copy in 0..args.copies {
        let client = client.clone();
        let document = document.clone();
        let signature = args.signature.clone();
        tasks.spawn(async move {
            (
                copy,
                client.submit_document(&document, signature).await,
            )
        });
    }

    while let Some(task) = tasks.join_next().await {
        match task? {
            (copy, Ok(response)) => info!(
                copy,
                status = %response.status,
                body = %String::from_utf8_lossy(&response.body),
                "document submitted"
            ),
            (copy, Err(err)) => error!(copy, %err, kind = err.kind(), "submission failed"),
        }
    }

    client.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ABOUTME: CLI binary for the platform ingestion pipeline.
// ABOUTME: Imports a platform from a URL, or picks a logo for a category, and prints JSON.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use platform_ingest::{ClientBuilder, ErrorResponse, ExtractRequest, LogoRequest};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Import business platform data from a website URL")]
struct Args {
    /// Allow fetching from private/local networks
    #[arg(long = "allow-private-networks", global = true)]
    allow_private_networks: bool,

    /// Page fetch timeout in seconds
    #[arg(long = "timeout-secs", global = true, default_value_t = 10)]
    timeout_secs: u64,

    /// User-Agent sent to target sites
    #[arg(long = "user-agent", global = true)]
    user_agent: Option<String>,

    /// Output compact JSON instead of pretty
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a URL and print the extracted platform draft
    Extract {
        /// Website URL (http or https)
        url: String,

        /// Sort order for the resulting platform
        #[arg(long = "sort-order")]
        sort_order: Option<i32>,
    },
    /// Pick a representative image for a category
    Logo {
        #[arg(long)]
        category: String,

        #[arg(long)]
        name: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> ExitCode {
    match to_json(value, compact) {
        Ok(out) => {
            println!("{}", out);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize output: {}", e);
            ExitCode::from(1)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    let mut builder = ClientBuilder::from_env()
        .allow_private_networks(args.allow_private_networks)
        .timeout(Duration::from_secs(args.timeout_secs));
    if let Some(ua) = &args.user_agent {
        builder = builder.user_agent(ua);
    }
    let client = builder.build();

    match args.command {
        Command::Extract { url, sort_order } => {
            let request = ExtractRequest { url, sort_order };
            match client.extract(&request).await {
                Ok(draft) => print_json(&draft, args.compact),
                Err(e) => {
                    tracing::debug!(error = %e, status = e.status_hint(), "extraction failed");
                    eprintln!("error: {}", e.user_message());
                    // stdout carries the same body a route would return
                    let _ = print_json(&ErrorResponse::from(&e), args.compact);
                    ExitCode::from(1)
                }
            }
        }
        Command::Logo { category, name } => {
            let response = client.generate_logo(&LogoRequest { category, name }).await;
            print_json(&response, args.compact)
        }
    }
}

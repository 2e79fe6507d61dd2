//! prism - Multi-provider LLM chat relay over Server-Sent Events
//!
//! A server that accepts a chat prompt over HTTP, resolves the requested
//! model to an upstream provider, and relays the provider's streaming
//! output to the client one SSE frame per chunk.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prism::relay::run_server;
use prism::Config;

#[derive(Parser)]
#[command(name = "prism")]
#[command(about = "Multi-provider LLM chat relay over Server-Sent Events")]
#[command(version)]
struct Cli {
    /// Override listen address (e.g., "127.0.0.1:3000")
    #[arg(short, long)]
    listen: Option<String>,

    /// Load environment variables from this file before reading config
    #[arg(long)]
    env_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_filename(path)?;
        }
        None => {
            // A missing .env is fine; the environment may be set directly.
            dotenvy::dotenv().ok();
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prism=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()?;
    if let Some(addr) = cli.listen {
        tracing::info!(listen = %addr, "Override listen address");
        config.server.listen = addr;
    }

    run_server(config).await
}

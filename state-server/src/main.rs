//! StagePass - Shared-State Dev Server
//!
//! An in-memory stand-in for the managed document backend, for developing
//! the live viewer locally: serves the per-event playback-state documents
//! over HTTP, with a terminal dashboard.
//!
//! Usage:
//!   cargo run --release
//!   cargo run --release -- --no-dashboard  # Plain logging mode

mod dashboard;
mod http;
mod metrics;
mod store;

use std::sync::Arc;

use clap::Parser;
use parking_lot::RwLock;

/// StagePass shared-state dev server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// listen address
    #[arg(short, long, default_value = "127.0.0.1:8090")]
    listen_addr: String,

    /// run with plain logging instead of the terminal dashboard
    #[arg(long)]
    no_dashboard: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Shared metrics state
    let metrics = Arc::new(RwLock::new(metrics::Metrics::new()));
    let store = Arc::new(store::DocumentStore::new(Arc::clone(&metrics)));

    if args.no_dashboard {
        // Plain logging mode
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("stagepass_state_server=debug".parse().unwrap()),
            )
            .init();

        http::serve(&args.listen_addr, store, metrics).await?;
        Ok(())
    } else {
        // Run with TUI dashboard
        dashboard::run(args.listen_addr, metrics, store).await
    }
}

mod backend;
mod error;
mod health;
mod routes;

use audit_core::{AuditLog, MemoryStore};
use audit_storage::SledStore;
use backend::Backend;
use clap::Parser;
use health::{spawn_monitor, HttpHealthCheck};
use routes::{router, AppState};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Data directory for sled
    #[arg(long, default_value = "./data")]
    data_dir: String,

    /// Keep the audit log in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Base URL of the classification service
    #[arg(long, default_value = "http://localhost:8000")]
    classifier_url: String,

    /// Seconds between classifier health checks
    #[arg(long, default_value_t = 10)]
    health_interval_secs: u64,

    /// Substitute "Unknown"/0 for missing result fields instead of rejecting
    #[arg(long)]
    lenient: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let backend = if args.ephemeral {
        info!("using in-memory store, nothing will be persisted");
        Backend::Memory(MemoryStore::new())
    } else {
        Backend::Sled(SledStore::open(&args.data_dir)?)
    };
    let log = AuditLog::open(Arc::new(backend));

    let checker = HttpHealthCheck::new(&args.classifier_url, Duration::from_secs(5))?;
    let poll = Duration::from_secs(args.health_interval_secs.max(1));
    let classifier_online = spawn_monitor(checker, poll);

    let app = router(AppState::new(log, classifier_online, args.lenient));

    let addr: SocketAddr = args.listen.parse()?;
    info!("audit-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("audit-node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use donation_core::Ledger;
use donation_storage::SledStore;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Data directory for sled
    #[arg(long, default_value = "./data")]
    data_dir: String,
}

/// Shared application state. The ledger is the process-wide single writer;
/// mutating handlers take the write lock, read handlers the read lock.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger<SledStore>>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let store = Arc::new(SledStore::open(&args.data_dir)?);
    let ledger = Ledger::open(store)?;
    let state = AppState {
        ledger: Arc::new(RwLock::new(ledger)),
    };

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/healthz", get(routes::health))
        .route("/chain/head", get(routes::chain_head))
        .route("/donations", post(routes::record_donation))
        .route("/donations/{identity}", get(routes::donation_history))
        .route("/transactions", post(routes::queue_transaction))
        .route("/mine", post(routes::mine))
        .route("/ledger", get(routes::ledger_snapshot))
        .route("/verify", get(routes::verify))
        .route("/balance/{identity}", get(routes::balance))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!("donation-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

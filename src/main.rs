//! P2P History - completed order history service
//!
//! Environment:
//!   WALLET_API_BASE_URL, P2P_HISTORY_* - see `p2p-history --help`
//!   RUST_LOG - log filter (default: p2p_history_backend=debug,tower_http=debug)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::watch};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use p2p_history_backend::{
    api::{AppState, OrdersService},
    config::{self, Args},
    server,
    supervisor::Supervisor,
};

#[tokio::main]
async fn main() -> Result<()> {
    config::load_env();
    init_tracing();

    let args = Args::parse();

    info!("🚀 P2P history backend starting");
    info!("  Bind: {}", args.bind);
    info!("  Upstream: {}", args.upstream_base_url);
    info!(
        "  Paging: {} per page, cap {}",
        args.page_limit, args.result_cap
    );
    info!(
        "  Retry: every {}ms for up to {}s per page",
        args.retry_interval_ms, args.retry_budget_secs
    );

    let orders = OrdersService::new(Arc::new(args.connector()?), args.aggregator()?);
    let state = AppState::new(orders);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let supervisor =
        Supervisor::new(args.restart_policy()).with_artifact_cleanup(args.legacy_token_path.clone());

    let bind = args.bind.clone();
    let restarts = supervisor
        .run(move || {
            let app = server::router(state.clone());
            let bind = bind.clone();
            let mut stop = shutdown_rx.clone();
            async move {
                let listener = TcpListener::bind(&bind)
                    .await
                    .with_context(|| format!("Failed to bind {}", bind))?;
                server::serve(listener, app, async move {
                    let _ = stop.wait_for(|stopping| *stopping).await;
                })
                .await
            }
        })
        .await?;

    info!(restarts, "P2P history backend stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "p2p_history_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

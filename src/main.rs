use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use signal_bridge::audit::{AuditLog, NullAuditLog, RestAuditLog};
use signal_bridge::bitget::{BitgetClient, BitgetConfig};
use signal_bridge::execution::{ExecutionConfig, ExecutionEvent, Orchestrator};
use signal_bridge::{api, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port to run the webhook server on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Leverage set before each entry order
    #[arg(short, long, env = "LEVERAGE", default_value = "20")]
    leverage: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("signal_bridge=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    info!("Starting signal-bridge webhook server");
    info!("Port: {}", args.port);
    info!("Leverage: {}x", args.leverage);

    let audit: Arc<dyn AuditLog> = match RestAuditLog::from_env() {
        Some(log) => {
            info!("Audit store configured");
            Arc::new(log)
        }
        None => {
            warn!("SUPABASE_URL/SUPABASE_KEY not set - audit rows will be discarded");
            Arc::new(NullAuditLog)
        }
    };

    let bitget_config = BitgetConfig::from_env()?;
    info!(
        "Bitget environment: {} ({})",
        bitget_config.base_url,
        if bitget_config.demo { "demo" } else { "live" }
    );
    let gateway = Arc::new(BitgetClient::new(bitget_config, audit.clone()));

    let execution_config = ExecutionConfig {
        leverage: args.leverage,
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(gateway, execution_config);

    // Surface execution events as log lines
    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::LeverageSet { signal_id, ok } if !ok => {
                    warn!("Leverage call failed (signal {})", signal_id)
                }
                ExecutionEvent::LegRejected {
                    signal_id,
                    role,
                    message,
                } => warn!("{} leg rejected (signal {}): {}", role, signal_id, message),
                ExecutionEvent::ExecutionFinished {
                    signal_id,
                    failed_calls,
                } if failed_calls > 0 => {
                    warn!(
                        "Execution for signal {} finished with {} failed call(s)",
                        signal_id, failed_calls
                    )
                }
                _ => {}
            }
        }
    });

    let state = Arc::new(AppState {
        orchestrator,
        audit,
        last_signal: RwLock::new(None),
    });

    // Build router
    let app = Router::new()
        .route("/order", post(api::post_order))
        .route("/health", get(api::get_health))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Webhook server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Credit-gated inference relay - Entry point.

use anyhow::{Context, Result};
use credit_ledger::{ContractLedger, ContractTimeouts};
use relay_server::{
    api::{cors_layer, create_router_with_layers, AppState, RateLimitState},
    build_provider_chain,
    config::Config,
    RelayCoordinator, RelaySettings,
};
use secrecy::SecretString;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.log.level);

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    info!("Starting credit-gated inference relay");

    let rpc_url = config.ledger.rpc_url.clone().unwrap_or_default();
    let private_key = config
        .ledger
        .private_key
        .clone()
        .unwrap_or_else(|| SecretString::new(String::new()));

    let ledger = ContractLedger::connect(
        &rpc_url,
        &private_key,
        &config.ledger.contract_address,
        ContractTimeouts {
            read: config.ledger.read_timeout,
            confirmation: config.ledger.confirmation_timeout,
        },
    )
    .await
    .context("Failed to connect to credit ledger")?;

    let providers = build_provider_chain(&config)?;
    if providers.is_empty() {
        anyhow::bail!("No completion backend could be configured");
    }

    let relay = RelayCoordinator::new(
        Arc::new(ledger),
        providers,
        RelaySettings {
            context: config.relay.context.clone(),
            usage_mode: config.relay.usage_mode,
        },
    );
    info!(usage_mode = ?config.relay.usage_mode, "Relay coordinator ready");

    let origins = config.server.allowed_origins();
    if origins.is_empty() {
        warn!("No allowed origins configured; CORS accepts any origin");
    }

    let app = create_router_with_layers(
        AppState::new(relay),
        RateLimitState::new(config.rate_limit.per_minute),
        cors_layer(&origins),
    );

    // Bind to address
    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .with_context(|| format!("Invalid listen address: {}", config.server.listen_addr))?,
        config.server.port,
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

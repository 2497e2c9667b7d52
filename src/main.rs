use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use kycgate::api::routes::{create_router, AppState};
use kycgate::config::Config;
use kycgate::ledger::{
    AccountLedger, AccountStore, JournaledStore, MemoryAccountStore, PostgresAccountStore,
};
use kycgate::observability::{init_tracing, install_recorder};
use kycgate::provisioning::Provisioner;
use kycgate::registry::{load_registry, IdentityRegistry, RegistryAdapter};
use kycgate::tier::{load_tiers, TierTable};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Initialize tracing
    init_tracing(&config.log_level, config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting kycgate onboarding engine"
    );

    let metrics = match install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to install metrics recorder, /metrics disabled");
            None
        }
    };

    // Identity registry
    let registry = load_registry(&config.registry_path).with_context(|| {
        format!(
            "loading identity registry from {}",
            config.registry_path.display()
        )
    })?;
    info!(
        path = %config.registry_path.display(),
        records = registry.record_count(),
        "Identity registry loaded"
    );

    // Tier table
    let tiers = match &config.tiers_path {
        Some(path) => load_tiers(path)
            .with_context(|| format!("loading tier table from {}", path.display()))?,
        None => TierTable::standard(),
    };
    info!(tiers = tiers.tiers().len(), "Tier table loaded");

    let store = open_store(&config).await?;

    let provisioner = Provisioner::new(
        RegistryAdapter::new(Arc::new(registry), config.registry_timeout()),
        AccountLedger::new(store),
        Arc::new(tiers),
    )
    .with_geofence(config.geofence())
    .with_gating(config.upgrade_gating());

    // Create application state
    let state = Arc::new(AppState {
        provisioner,
        metrics,
        start_time: Instant::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        latency_budget_ms: config.latency_budget_ms,
    });

    // Create router
    let app = create_router(state);

    // Parse listen address
    let addr: SocketAddr = config.listen_addr.parse()?;

    info!(addr = %addr, "Starting HTTP server");

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    if config.graceful_shutdown {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        axum::serve(listener, app).await?;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Pick the account store: PostgreSQL, then the journal, then memory.
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn AccountStore>> {
    if let Some(url) = &config.database_url {
        let store = PostgresAccountStore::connect(
            url,
            config.db_min_connections,
            config.db_max_connections,
        )
        .await
        .context("connecting to PostgreSQL")?;
        store.run_migrations().await?;
        info!("Account store: PostgreSQL");
        return Ok(Arc::new(store));
    }

    if let Some(path) = &config.journal_path {
        let (store, stats) = JournaledStore::open(path)
            .with_context(|| format!("opening account journal {}", path.display()))?;
        if stats.errors > 0 {
            warn!(
                errors = stats.errors,
                "Skipped unreadable journal entries during replay"
            );
        }
        info!(path = %path.display(), accounts = stats.accounts, "Account store: journal");
        return Ok(Arc::new(store));
    }

    info!("Account store: in-memory (accounts are lost on restart)");
    Ok(Arc::new(MemoryAccountStore::new()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}

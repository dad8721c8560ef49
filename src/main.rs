//! Arena Host - tick-driven lifecycle host for concurrent minigame arenas
//!
//! This is the main entry point for the host process. It handles:
//! - Loading and validating arena instance definitions
//! - Driving every arena's lifecycle state machine on a fixed tick
//! - Fanning lifecycle notifications out to collaborators

mod arena;
mod config;
mod hooks;
mod util;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::arena::{ArenaRegistry, Scheduler};
use crate::config::arenas::ArenasConfig;
use crate::config::Config;
use crate::hooks::{BaseGameLogic, Hooks};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Arena Host");
    info!("Arenas document: {}", config.arenas_file.display());

    // Wire collaborators and the registry
    let hooks = Arc::new(Hooks::logging());
    let registry = Arc::new(ArenaRegistry::new(hooks.clone()));

    // One-shot instance registration, before any arena is ticked
    let mut arenas_config = ArenasConfig::load(&config.arenas_file)?;
    let summary = registry.load_all(&mut arenas_config);
    arenas_config.save(&config.arenas_file)?;
    info!(
        registered = summary.registered,
        ready = summary.ready,
        failed = summary.failed,
        "Registry populated"
    );

    // Fan lifecycle notifications to the log until real collaborators attach
    let mut events = registry.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(?event, "lifecycle event"),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged = n, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Run the lifecycle driver until a shutdown signal arrives
    let scheduler = Scheduler::new(
        registry,
        config.timing.clone(),
        hooks,
        Arc::new(BaseGameLogic),
        Duration::from_millis(config.tick_interval_ms),
    );

    tokio::select! {
        _ = scheduler.run() => {}
        _ = shutdown_signal() => {}
    }

    info!("Arena host shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}

//! Scepter service binary.
//!
//! This is the main entry point that wires together the rotation
//! scheduler, the simulated world clock and roster, the privilege
//! registry, and the Observer API server, then runs the scheduler loop
//! until shutdown.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `scepter-config.yaml`
//! 3. Construct the rotation scheduler
//! 4. Create the simulated host (world clock + seed roster)
//! 5. Start the Observer API server
//! 6. Hook Ctrl-C into the command queue's shutdown flag
//! 7. Run the scheduler loop
//! 8. Log the result

mod bridge;
mod error;
mod host;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scepter_core::commands::CommandQueue;
use scepter_core::config::ScepterConfig;
use scepter_core::runner;
use scepter_core::scheduler::RotationScheduler;
use scepter_observer::{AppState, ServerConfig};

use crate::bridge::ObserverBridge;
use crate::host::{PrivilegeRegistry, SimHost};

/// Application entry point for the Scepter service.
///
/// Initializes all subsystems and runs the scheduler loop.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("scepter-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        service = config.service.name,
        seed = config.service.seed,
        tick_interval_ms = config.service.tick_interval_ms,
        ticks_per_day = config.clock.ticks_per_day,
        duration_days = config.rotation.duration_days,
        days_between_cycles = config.rotation.days_between_cycles,
        autostart = config.rotation.autostart_enabled,
        "Configuration loaded"
    );

    // 3. Construct the scheduler.
    let mut scheduler = RotationScheduler::new(&config).map_err(error::EngineError::from)?;
    info!("Rotation scheduler initialized");

    // 4. Create the simulated host.
    let sim_host = Arc::new(SimHost::new(
        config.clock.ticks_per_poll,
        &config.roster.participants,
    ));
    info!(
        seed_participants = config.roster.participants.len(),
        ticks_per_poll = config.clock.ticks_per_poll,
        "Simulated host created"
    );

    let mut registry = PrivilegeRegistry::new();
    let queue = Arc::new(CommandQueue::new());

    // 5. Start the Observer API server.
    let host_control: Arc<dyn scepter_core::host::HostControl> = sim_host.clone();
    let app_state = Arc::new(AppState::with_host(
        Arc::clone(&queue),
        host_control,
    ));
    let server_config = ServerConfig {
        host: config.observer.host.clone(),
        port: config.observer.port,
    };
    let _observer_handle =
        scepter_observer::spawn_observer(&server_config, Arc::clone(&app_state))
            .await
            .map_err(error::EngineError::from)?;
    info!(port = server_config.port, "Observer API server started");

    // 6. Ctrl-C requests a clean loop shutdown.
    {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received; requesting shutdown");
                queue.request_shutdown();
            } else {
                warn!("Failed to listen for Ctrl-C");
            }
        });
    }

    // 7. Run the scheduler loop.
    let mut sink = ObserverBridge::new(Arc::clone(&app_state));
    let report = runner::run_rotation(
        &mut scheduler,
        &*sim_host,
        &*sim_host,
        &mut registry,
        &queue,
        &mut sink,
        &config,
    )
    .await;

    // 8. Log results.
    info!(
        end_reason = ?report.end_reason,
        total_polls = report.total_polls,
        "scepter-engine shutdown complete"
    );

    Ok(())
}

/// Load the service configuration from `scepter-config.yaml`.
///
/// Looks for the config file relative to the current working directory
/// and falls back to defaults when it is absent.
fn load_config() -> Result<ScepterConfig, error::EngineError> {
    let config_path = Path::new("scepter-config.yaml");
    if config_path.exists() {
        let config = ScepterConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!("Config file not found, using defaults");
        Ok(ScepterConfig::default())
    }
}

use tracing_subscriber::EnvFilter;

use mazetank_server::config::ServerConfig;
use mazetank_server::{Broadcast, spawn_simulation, spawn_stdin_console};

#[tokio::main]
async fn main() {
    let json = std::env::var("MAZETANK_LOG_JSON").is_ok_and(|v| !v.is_empty() && v != "0");
    let subscriber = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::info!("Mazetank server starting");

    let config = ServerConfig::load();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {e}");
        std::process::exit(1);
    }
    let console_enabled = config.console.enabled;

    let (sim, mut broadcasts, loop_handle) = spawn_simulation(config);
    if console_enabled {
        spawn_stdin_console(sim.clone());
    }

    let mut events: u64 = 0;
    let mut snapshots: u64 = 0;
    loop {
        tokio::select! {
            msg = broadcasts.recv() => match msg {
                Some(Broadcast::Event(_)) => events += 1,
                Some(Broadcast::Snapshot(_)) => snapshots += 1,
                Some(Broadcast::Stopped) | None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                sim.stop();
            }
        }
    }

    if let Err(e) = loop_handle.await {
        tracing::error!(error = %e, "Simulation task failed");
    }
    tracing::info!(events, snapshots, "Mazetank server stopped");
}

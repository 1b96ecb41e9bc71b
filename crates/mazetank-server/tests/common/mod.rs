use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use mazetank_server::game_loop::SimHandle;
use mazetank_server::protocol::{ServerMessage, decode_server_message};
use mazetank_server::{Broadcast, ServerConfig, spawn_simulation};
use mazetank_sim::{GameEvent, SimConfig, Snapshot};

pub struct TestSim {
    pub handle: SimHandle,
    pub rx: mpsc::UnboundedReceiver<Broadcast>,
    pub task: JoinHandle<()>,
}

impl TestSim {
    /// Fast, wall-free, seeded simulation with a snapshot every tick.
    pub fn new() -> Self {
        Self::from_config(test_config())
    }

    pub fn from_config(config: ServerConfig) -> Self {
        let (handle, rx, task) = spawn_simulation(config);
        Self { handle, rx, task }
    }

    /// Next broadcast, failing the test if none arrives in time.
    pub async fn next(&mut self) -> Broadcast {
        tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("timed out waiting for broadcast")
            .expect("broadcast channel closed")
    }

    /// Read broadcasts until an event satisfies `pred`.
    pub async fn wait_for_event(&mut self, mut pred: impl FnMut(&GameEvent) -> bool) -> GameEvent {
        loop {
            if let Broadcast::Event(data) = self.next().await
                && let ServerMessage::Event(event) = decode_server_message(&data).unwrap()
                && pred(&event)
            {
                return event;
            }
        }
    }

    /// Read broadcasts until a snapshot satisfies `pred`.
    pub async fn wait_for_snapshot(&mut self, mut pred: impl FnMut(&Snapshot) -> bool) -> Snapshot {
        loop {
            if let Broadcast::Snapshot(data) = self.next().await
                && let ServerMessage::Snapshot(snapshot) = decode_server_message(&data).unwrap()
                && pred(&snapshot)
            {
                return snapshot;
            }
        }
    }
}

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.scheduler.tick_rate_hz = 240.0;
    config.scheduler.snapshot_every = 1;
    config.console.enabled = false;
    config.sim = SimConfig {
        wall_probability: 0.0,
        seed: Some(2024),
        ..SimConfig::default()
    };
    config
}

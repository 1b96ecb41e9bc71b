use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use mazetank_sim::player::sanitize_name;
use mazetank_sim::{GameEvent, PlayerId, Simulation};

use crate::config::{SchedulerConfig, ServerConfig};
use crate::protocol::{ServerMessage, encode_server_message};

/// Commands sent from the outside world to the simulation loop.
///
/// They are queued and applied between ticks, never while a tick runs.
#[derive(Debug)]
pub enum SimCommand {
    Join {
        name: String,
        reply: oneshot::Sender<PlayerId>,
    },
    Move {
        player_id: PlayerId,
        angle: Option<f32>,
        moving: Option<bool>,
        rotating: Option<i8>,
    },
    Fire {
        player_id: PlayerId,
    },
    ChangeName {
        player_id: PlayerId,
        name: String,
    },
    Disconnect {
        player_id: PlayerId,
    },
    Restart,
    Reset,
    SpawnCrystal {
        x: f32,
        y: f32,
    },
    KillPlayer {
        player_id: PlayerId,
    },
    SpawnBullet {
        x: f32,
        y: f32,
        angle: f32,
    },
    SpawnBot {
        name: String,
        reply: oneshot::Sender<PlayerId>,
    },
    ListPlayers {
        reply: oneshot::Sender<Vec<PlayerSummary>>,
    },
    Stop,
}

/// Messages sent from the simulation loop to observers.
#[derive(Debug, Clone)]
pub enum Broadcast {
    /// Encoded `ServerMessage::Event`.
    Event(Bytes),
    /// Encoded `ServerMessage::Snapshot`.
    Snapshot(Bytes),
    /// The loop has exited.
    Stopped,
}

/// Roster line returned by [`SimHandle::players`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
    pub is_bot: bool,
    pub wins: u32,
}

/// Cloneable front door to a running simulation.
///
/// Every command is validated here; malformed input is dropped with a
/// warning and never reaches the loop.
#[derive(Debug, Clone)]
pub struct SimHandle {
    tx: mpsc::UnboundedSender<SimCommand>,
}

impl SimHandle {
    fn send(&self, cmd: SimCommand) -> bool {
        self.tx.send(cmd).is_ok()
    }

    /// Add a player; resolves to the id assigned by the simulation.
    pub async fn join(&self, name: &str) -> Option<PlayerId> {
        let (reply, rx) = oneshot::channel();
        let name = sanitize_name(name);
        if !self.send(SimCommand::Join { name, reply }) {
            return None;
        }
        rx.await.ok()
    }

    pub fn move_player(
        &self,
        player_id: PlayerId,
        angle: Option<f32>,
        moving: Option<bool>,
        rotating: Option<i8>,
    ) -> bool {
        if angle.is_some_and(|a| !a.is_finite()) {
            tracing::warn!(player_id, "Dropping move with non-finite angle");
            return false;
        }
        if let Some(r) = rotating
            && !(-1..=1).contains(&r)
        {
            tracing::warn!(player_id, rotating = r, "Dropping move with bad rotation intent");
            return false;
        }
        self.send(SimCommand::Move {
            player_id,
            angle,
            moving,
            rotating,
        })
    }

    pub fn fire(&self, player_id: PlayerId) -> bool {
        self.send(SimCommand::Fire { player_id })
    }

    pub fn change_name(&self, player_id: PlayerId, name: &str) -> bool {
        self.send(SimCommand::ChangeName {
            player_id,
            name: sanitize_name(name),
        })
    }

    pub fn disconnect(&self, player_id: PlayerId) -> bool {
        self.send(SimCommand::Disconnect { player_id })
    }

    /// Reset the arena and zero every tally.
    pub fn restart(&self) -> bool {
        self.send(SimCommand::Restart)
    }

    /// Reset the arena, keeping tallies.
    pub fn reset(&self) -> bool {
        self.send(SimCommand::Reset)
    }

    pub fn spawn_crystal(&self, x: f32, y: f32) -> bool {
        if !x.is_finite() || !y.is_finite() {
            tracing::warn!(x, y, "Dropping crystal spawn with non-finite position");
            return false;
        }
        self.send(SimCommand::SpawnCrystal { x, y })
    }

    pub fn kill_player(&self, player_id: PlayerId) -> bool {
        self.send(SimCommand::KillPlayer { player_id })
    }

    pub fn spawn_bullet(&self, x: f32, y: f32, angle: f32) -> bool {
        if !x.is_finite() || !y.is_finite() || !angle.is_finite() {
            tracing::warn!(x, y, angle, "Dropping bullet spawn with non-finite input");
            return false;
        }
        self.send(SimCommand::SpawnBullet { x, y, angle })
    }

    pub async fn spawn_bot(&self, name: &str) -> Option<PlayerId> {
        let (reply, rx) = oneshot::channel();
        let name = sanitize_name(name);
        if !self.send(SimCommand::SpawnBot { name, reply }) {
            return None;
        }
        rx.await.ok()
    }

    pub async fn players(&self) -> Option<Vec<PlayerSummary>> {
        let (reply, rx) = oneshot::channel();
        if !self.send(SimCommand::ListPlayers { reply }) {
            return None;
        }
        rx.await.ok()
    }

    /// Ask the loop to exit after the current tick.
    pub fn stop(&self) -> bool {
        self.send(SimCommand::Stop)
    }
}

/// Spawn the fixed-tick simulation loop as a tokio task.
/// Returns the command handle and the broadcast receiver.
pub fn spawn_simulation(
    config: ServerConfig,
) -> (
    SimHandle,
    mpsc::UnboundedReceiver<Broadcast>,
    JoinHandle<()>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();

    let ServerConfig {
        scheduler,
        bots,
        mut sim,
        ..
    } = config;
    sim.tick_rate = scheduler.tick_rate_hz;
    let mut simulation = Simulation::new(sim);

    let handle = tokio::spawn(async move {
        for name in &bots {
            simulation.spawn_bot(name);
        }
        run_simulation_loop(&mut simulation, &scheduler, cmd_rx, broadcast_tx).await;
    });

    (SimHandle { tx: cmd_tx }, broadcast_rx, handle)
}

/// The server-authoritative tick loop.
async fn run_simulation_loop(
    sim: &mut Simulation,
    scheduler: &SchedulerConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<SimCommand>,
    broadcast_tx: mpsc::UnboundedSender<Broadcast>,
) {
    let tick_interval = Duration::from_secs_f32(1.0 / scheduler.tick_rate_hz);
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let snapshot_every = u64::from(scheduler.snapshot_every.max(1));
    let start = tokio::time::Instant::now();

    tracing::info!(
        tick_rate = scheduler.tick_rate_hz,
        snapshot_every,
        "Simulation loop started"
    );

    'running: loop {
        interval.tick().await;

        // Apply everything queued since the last tick
        loop {
            match cmd_rx.try_recv() {
                Ok(SimCommand::Stop) | Err(TryRecvError::Disconnected) => break 'running,
                Ok(cmd) => apply_command(sim, cmd),
                Err(TryRecvError::Empty) => break,
            }
        }

        let now = start.elapsed().as_secs_f64();
        for event in sim.tick(now) {
            send_event(&broadcast_tx, event);
        }

        let tick = sim.tick_count();
        if tick % snapshot_every == 0 {
            match encode_server_message(&ServerMessage::Snapshot(sim.snapshot())) {
                Ok(data) => {
                    let _ = broadcast_tx.send(Broadcast::Snapshot(Bytes::from(data)));
                },
                Err(e) => tracing::error!(tick, error = %e, "Failed to encode snapshot"),
            }
        }
    }

    tracing::info!(ticks = sim.tick_count(), "Simulation loop stopped");
    let _ = broadcast_tx.send(Broadcast::Stopped);
}

fn apply_command(sim: &mut Simulation, cmd: SimCommand) {
    match cmd {
        SimCommand::Join { name, reply } => {
            let id = sim.join(&name);
            let _ = reply.send(id);
        },
        SimCommand::Move {
            player_id,
            angle,
            moving,
            rotating,
        } => {
            sim.move_player(player_id, angle, moving, rotating);
        },
        SimCommand::Fire { player_id } => {
            sim.fire(player_id);
        },
        SimCommand::ChangeName { player_id, name } => {
            sim.change_name(player_id, &name);
        },
        SimCommand::Disconnect { player_id } => {
            sim.disconnect(player_id);
        },
        SimCommand::Restart => sim.restart(),
        SimCommand::Reset => sim.reset(),
        SimCommand::SpawnCrystal { x, y } => {
            sim.spawn_crystal(x, y);
        },
        SimCommand::KillPlayer { player_id } => {
            if !sim.kill_player(player_id) {
                tracing::warn!(player_id, "Kill ignored: no such living player");
            }
        },
        SimCommand::SpawnBullet { x, y, angle } => {
            sim.spawn_bullet(x, y, angle);
        },
        SimCommand::SpawnBot { name, reply } => {
            let id = sim.spawn_bot(&name);
            let _ = reply.send(id);
        },
        SimCommand::ListPlayers { reply } => {
            let roster = sim
                .players()
                .values()
                .map(|p| PlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                    alive: p.alive,
                    is_bot: p.is_bot,
                    wins: sim.wins().get(&p.id).copied().unwrap_or(0),
                })
                .collect();
            let _ = reply.send(roster);
        },
        SimCommand::Stop => {},
    }
}

fn send_event(broadcast_tx: &mpsc::UnboundedSender<Broadcast>, event: GameEvent) {
    let kind = event.kind();
    match encode_server_message(&ServerMessage::Event(event)) {
        Ok(data) => {
            tracing::trace!(kind, "Broadcasting event");
            let _ = broadcast_tx.send(Broadcast::Event(Bytes::from(data)));
        },
        Err(e) => tracing::error!(kind, error = %e, "Failed to encode event"),
    }
}

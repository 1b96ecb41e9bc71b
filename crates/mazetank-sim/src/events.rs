use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::arena::MazeInfo;
use crate::collision::Rect;
use crate::player::{PlayerColor, PlayerId};

/// Discrete outcome produced by a simulation step or operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEvent {
    PlayerJoined {
        player_id: PlayerId,
        name: String,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    PlayerKilled {
        player_id: PlayerId,
        x: f32,
        y: f32,
        /// `None` for console kills and ownerless bullets.
        killer: Option<PlayerId>,
    },
    NameChanged {
        player_id: PlayerId,
        old_name: String,
        new_name: String,
        color: PlayerColor,
    },
    CrystalSpawned {
        x: f32,
        y: f32,
    },
    CrystalCollected {
        player_id: PlayerId,
        x: f32,
        y: f32,
    },
    GameStarted {
        players: usize,
    },
    GameOver {
        winner: PlayerId,
        winner_name: String,
        wins: BTreeMap<PlayerId, u32>,
    },
    RoundDrawn,
    GameReset {
        walls: Vec<Rect>,
        maze: MazeInfo,
        wins: BTreeMap<PlayerId, u32>,
    },
    WaitingForPlayers {
        count: usize,
    },
    /// Current roster, sent whenever someone joins or leaves.
    PlayerCount {
        count: usize,
        names: Vec<String>,
    },
}

impl GameEvent {
    /// Short machine-readable label, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::PlayerKilled { .. } => "player_killed",
            Self::NameChanged { .. } => "name_changed",
            Self::CrystalSpawned { .. } => "crystal_spawned",
            Self::CrystalCollected { .. } => "crystal_collected",
            Self::GameStarted { .. } => "game_started",
            Self::GameOver { .. } => "game_over",
            Self::RoundDrawn => "round_drawn",
            Self::GameReset { .. } => "game_reset",
            Self::WaitingForPlayers { .. } => "waiting_for_players",
            Self::PlayerCount { .. } => "player_count",
        }
    }
}

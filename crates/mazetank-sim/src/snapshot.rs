use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::player::{PlayerColor, PlayerId};

/// Periodic world state sent to observers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub players: BTreeMap<PlayerId, PlayerSnapshot>,
    pub bullets: Vec<BulletSnapshot>,
    pub crystals: Vec<CrystalSnapshot>,
    pub lasers: Vec<LaserSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub alive: bool,
    pub color: PlayerColor,
    pub name: String,
    pub has_laser_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulletSnapshot {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrystalSnapshot {
    pub x: f32,
    pub y: f32,
    pub spawn_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserSnapshot {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub reflected_points: Vec<(f32, f32)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn laser_points_serialize_as_pairs() {
        let laser = LaserSnapshot {
            x: 1.0,
            y: 2.0,
            angle: 0.0,
            reflected_points: vec![(986.0, 2.0), (500.0, 2.0)],
        };
        let json = serde_json::to_value(&laser).unwrap();
        assert_eq!(json["reflected_points"], serde_json::json!([[986.0, 2.0], [500.0, 2.0]]));
    }

    #[test]
    fn empty_snapshot_has_every_collection() {
        let json = serde_json::to_value(Snapshot::default()).unwrap();
        for key in ["players", "bullets", "crystals", "lasers"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["tick"], 0);
    }
}

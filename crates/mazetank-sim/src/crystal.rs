use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::collision::circle_clear;
use crate::config::SimConfig;

/// Power-up that grants a laser window on pickup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crystal {
    pub x: f32,
    pub y: f32,
    pub spawned_at: f64,
}

impl Crystal {
    pub fn is_expired(&self, now: f64, lifetime: f64) -> bool {
        now - self.spawned_at >= lifetime
    }

    /// Whether a tank centred at `(x, y)` is close enough to collect it.
    pub fn in_reach(&self, x: f32, y: f32, config: &SimConfig) -> bool {
        let reach = config.tank_width / 2.0 + config.crystal_radius;
        (self.x - x).hypot(self.y - y) < reach
    }
}

/// Find a crystal position clear of walls and away from every tank.
///
/// Returns `None` when the sampling budget runs out; the caller retries on a
/// later tick.
pub fn place_crystal(
    arena: &Arena,
    tanks: &[(f32, f32)],
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Option<(f32, f32)> {
    let bounds = arena.maze.bounds();
    let (min_x, max_x) = (bounds.x, bounds.right() - config.crystal_radius);
    let (min_y, max_y) = (bounds.y, bounds.bottom() - config.crystal_radius);
    if min_x >= max_x || min_y >= max_y {
        return None;
    }

    for _ in 0..config.spawn_attempts {
        let x = rng.random_range(min_x..max_x).floor();
        let y = rng.random_range(min_y..max_y).floor();
        if !circle_clear(x, y, config.crystal_radius, &arena.walls) {
            continue;
        }
        let crowded = tanks
            .iter()
            .any(|&(tx, ty)| (tx - x).hypot(ty - y) < config.crystal_min_player_distance);
        if !crowded {
            return Some((x, y));
        }
    }
    None
}

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::collision::{Rect, circle_clear};

/// Unique identifier for a connected tank.
pub type PlayerId = u64;

/// Longest display name kept after sanitizing.
pub const MAX_NAME_LEN: usize = 16;

/// Name given to players who supply an empty one.
pub const DEFAULT_NAME: &str = "Tank";

/// Tank body color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PlayerColor {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            r: rng.random(),
            g: rng.random(),
            b: rng.random(),
        }
    }

    /// `#rrggbb` form used by renderers.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A tank and its control intents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub alive: bool,
    pub color: PlayerColor,
    /// Forward thrust held.
    pub moving: bool,
    /// -1 counter-clockwise, 0 none, 1 clockwise.
    pub rotating: i8,
    /// Simulation time until which shots are lasers.
    pub laser_until: Option<f64>,
    pub is_bot: bool,
}

impl PlayerState {
    pub fn new(id: PlayerId, name: String, color: PlayerColor, x: f32, y: f32) -> Self {
        Self {
            id,
            name,
            x,
            y,
            angle: 0.0,
            alive: true,
            color,
            moving: false,
            rotating: 0,
            laser_until: None,
            is_bot: false,
        }
    }

    /// Whether the laser empowerment is active at `now`.
    pub fn has_laser(&self, now: f64) -> bool {
        self.laser_until.is_some_and(|until| now <= until)
    }

    /// Axis-aligned body box used for hit tests.
    pub fn body(&self, width: f32, height: f32) -> Rect {
        Rect::centered(self.x, self.y, width, height)
    }

    /// Put the tank back on the field with fresh intents.
    pub fn respawn(&mut self, x: f32, y: f32, angle: f32) {
        self.x = x;
        self.y = y;
        self.angle = angle;
        self.alive = true;
        self.moving = false;
        self.rotating = 0;
        self.laser_until = None;
    }
}

/// Trim, drop control characters and cap the length of a display name.
pub fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_end().to_string();
    if cleaned.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        cleaned
    }
}

/// Pick a spawn position whose collision circle is clear of every wall.
///
/// Rejection-samples inside the maze box, then falls back to a shuffled
/// list of cell centres, and finally to the maze centre.
pub fn find_spawn_point(
    arena: &Arena,
    radius: f32,
    attempts: u32,
    rng: &mut impl Rng,
) -> (f32, f32) {
    let bounds = arena.maze.bounds();
    let (min_x, max_x) = (bounds.x + radius, bounds.right() - radius);
    let (min_y, max_y) = (bounds.y + radius, bounds.bottom() - radius);

    if min_x < max_x && min_y < max_y {
        for _ in 0..attempts {
            let x = rng.random_range(min_x..max_x);
            let y = rng.random_range(min_y..max_y);
            if circle_clear(x, y, radius, &arena.walls) {
                return (x, y);
            }
        }
    }

    let mut cells: Vec<(usize, usize)> = (0..arena.maze.rows)
        .flat_map(|row| (0..arena.maze.cols).map(move |col| (col, row)))
        .collect();
    cells.shuffle(rng);
    for (col, row) in cells {
        let (x, y) = arena.maze.cell_center(col, row);
        if circle_clear(x, y, radius, &arena.walls) {
            tracing::debug!(col, row, "Spawn sampling exhausted, using cell centre");
            return (x, y);
        }
    }

    tracing::warn!("No clear spawn position found, using maze centre");
    arena.maze.center()
}

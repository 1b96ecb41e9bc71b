use std::f32::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use crate::collision::{Rect, Sweep, circle_rect_collision, sweep_circle};
use crate::player::PlayerId;

/// Orientation of a thin wall strip, used to pick its reflection normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallOrientation {
    /// Wider than tall; normal points along +y.
    Horizontal,
    /// Taller than wide (or square); normal points along +x.
    Vertical,
}

impl WallOrientation {
    pub fn of(rect: &Rect) -> Self {
        if rect.width > rect.height {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }

    pub fn normal(self) -> (f32, f32) {
        match self {
            Self::Horizontal => (0.0, 1.0),
            Self::Vertical => (1.0, 0.0),
        }
    }
}

/// Wrap an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU { 0.0 } else { a }
}

/// Reflect direction `(dx, dy)` about unit normal `(nx, ny)`.
pub fn reflect_vector(dx: f32, dy: f32, nx: f32, ny: f32) -> (f32, f32) {
    let dot = dx * nx + dy * ny;
    (dx - 2.0 * dot * nx, dy - 2.0 * dot * ny)
}

/// Closed-form angle reflection off an axis-aligned wall.
pub fn reflect_angle(angle: f32, orientation: WallOrientation) -> f32 {
    match orientation {
        WallOrientation::Horizontal => normalize_angle(TAU - angle),
        WallOrientation::Vertical => normalize_angle(PI - angle),
    }
}

/// A ballistic shot that ricochets off walls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    /// Heading in radians, kept in `[0, 2π)`.
    pub angle: f32,
    /// Units per second.
    pub speed: f32,
    /// `None` for shots injected from the operator console.
    pub owner: Option<PlayerId>,
    pub bounces: u8,
}

impl Bullet {
    pub fn new(id: u64, x: f32, y: f32, angle: f32, speed: f32, owner: Option<PlayerId>) -> Self {
        Self {
            id,
            x,
            y,
            angle: normalize_angle(angle),
            speed,
            owner,
            bounces: 0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.angle.is_finite()
    }

    /// Advance one frame through `walls` using a swept circle of `radius`.
    ///
    /// On contact the bullet stops at the last free sub-point and its heading
    /// is reflected about the touched wall's normal. Returns `true` on bounce.
    pub fn advance(&mut self, dt: f32, radius: f32, steps: u32, walls: &[Rect]) -> bool {
        let distance = self.speed * dt;
        let (dir_x, dir_y) = (self.angle.cos(), self.angle.sin());

        match sweep_circle(
            self.x,
            self.y,
            dir_x * distance,
            dir_y * distance,
            radius,
            steps,
            walls,
        ) {
            Sweep::Clear { x, y } => {
                self.x = x;
                self.y = y;
                false
            },
            Sweep::Blocked { x, y, wall } => {
                self.x = x;
                self.y = y;
                let (nx, ny) = WallOrientation::of(&walls[wall]).normal();
                let (rx, ry) = reflect_vector(dir_x, dir_y, nx, ny);
                self.angle = normalize_angle(ry.atan2(rx));
                self.bounces = self.bounces.saturating_add(1);
                true
            },
        }
    }
}

/// Whether a bullet of `hit_radius` at `(x, y)` touches the tank box.
pub fn bullet_hits_tank(x: f32, y: f32, hit_radius: f32, tank: &Rect) -> bool {
    circle_rect_collision(x, y, hit_radius, tank)
}

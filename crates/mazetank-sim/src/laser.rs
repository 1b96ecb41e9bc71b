use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::collision::{Rect, ray_rect_intersection, segment_rect_intersects};
use crate::player::PlayerId;
use crate::projectile::{WallOrientation, normalize_angle, reflect_angle};

/// Reflection points along a laser, excluding its origin.
pub type LaserPath = SmallVec<[(f32, f32); 4]>;

/// A precomputed, instant-hit laser beam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Laser {
    pub id: u64,
    pub owner: Option<PlayerId>,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Simulation time the beam was fired.
    pub created_at: f64,
    pub reflected_points: LaserPath,
}

impl Laser {
    /// Origin followed by every reflection point.
    pub fn polyline(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        std::iter::once((self.x, self.y)).chain(self.reflected_points.iter().copied())
    }

    pub fn is_expired(&self, now: f64, lifetime: f64) -> bool {
        now - self.created_at >= lifetime
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self
                .reflected_points
                .iter()
                .all(|(x, y)| x.is_finite() && y.is_finite())
    }

    /// Whether any beam segment crosses `target`.
    pub fn hits(&self, target: &Rect) -> bool {
        let mut points = self.polyline();
        let Some(mut prev) = points.next() else {
            return false;
        };
        for next in points {
            if segment_rect_intersects(prev.0, prev.1, next.0, next.1, target) {
                return true;
            }
            prev = next;
        }
        false
    }
}

/// Thin rectangles hugging the outside of the canvas so every ray terminates.
pub fn arena_bounds(width: f32, height: f32) -> [Rect; 4] {
    [
        Rect::new(-1.0, -1.0, width + 2.0, 1.0),
        Rect::new(-1.0, height, width + 2.0, 1.0),
        Rect::new(-1.0, -1.0, 1.0, height + 2.0),
        Rect::new(width, -1.0, 1.0, height + 2.0),
    ]
}

/// Trace a beam from `(x, y)` reflecting off the nearest surface each time.
///
/// Produces at most `max_reflections` points. Tracing stops early if the ray
/// escapes every surface, which only happens when it starts outside the
/// bounds.
pub fn trace_beam(
    x: f32,
    y: f32,
    angle: f32,
    walls: &[Rect],
    bounds: &[Rect],
    max_reflections: usize,
) -> LaserPath {
    let mut points = LaserPath::new();
    let (mut ox, mut oy) = (x, y);
    let mut angle = normalize_angle(angle);

    for _ in 0..max_reflections {
        let (dx, dy) = (angle.cos(), angle.sin());
        let nearest = walls
            .iter()
            .chain(bounds)
            .filter_map(|rect| ray_rect_intersection(ox, oy, dx, dy, rect).map(|t| (t, rect)))
            .min_by(|a, b| a.0.total_cmp(&b.0));

        let Some((t, rect)) = nearest else {
            break;
        };
        ox += dx * t;
        oy += dy * t;
        points.push((ox, oy));
        angle = reflect_angle(angle, WallOrientation::of(rect));
    }

    points
}

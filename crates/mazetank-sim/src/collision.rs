use serde::{Deserialize, Serialize};

/// Rays must travel at least this far before an intersection counts.
/// Keeps a reflected ray from re-hitting the surface it just left.
const RAY_EPSILON: f32 = 1e-3;

/// Axis-aligned rectangle, `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centred on `(cx, cy)`.
    pub fn centered(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}

/// Circle vs rectangle overlap test.
///
/// Clamps the circle centre onto the rectangle to find the nearest point and
/// compares squared distances, so touching counts as a collision.
pub fn circle_rect_collision(cx: f32, cy: f32, radius: f32, rect: &Rect) -> bool {
    let nearest_x = cx.clamp(rect.x, rect.right());
    let nearest_y = cy.clamp(rect.y, rect.bottom());
    let dx = cx - nearest_x;
    let dy = cy - nearest_y;
    dx * dx + dy * dy <= radius * radius
}

/// Index of the first wall the circle overlaps, if any.
pub fn first_circle_hit(cx: f32, cy: f32, radius: f32, walls: &[Rect]) -> Option<usize> {
    walls
        .iter()
        .position(|wall| circle_rect_collision(cx, cy, radius, wall))
}

/// Whether a circle clears every wall.
pub fn circle_clear(cx: f32, cy: f32, radius: f32, walls: &[Rect]) -> bool {
    first_circle_hit(cx, cy, radius, walls).is_none()
}

/// Slab test for the parametric line `o + t * d`.
/// Returns the `(t_enter, t_exit)` interval inside the rectangle.
fn slab_interval(ox: f32, oy: f32, dx: f32, dy: f32, rect: &Rect) -> Option<(f32, f32)> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;

    for (origin, dir, lo, hi) in [
        (ox, dx, rect.x, rect.right()),
        (oy, dy, rect.y, rect.bottom()),
    ] {
        if dir.abs() < 1e-8 {
            // Parallel to this slab: must already be inside it
            if origin < lo || origin > hi {
                return None;
            }
            continue;
        }
        let t1 = (lo - origin) / dir;
        let t2 = (hi - origin) / dir;
        let (near, far) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        t_enter = t_enter.max(near);
        t_exit = t_exit.min(far);
        if t_enter > t_exit {
            return None;
        }
    }

    Some((t_enter, t_exit))
}

/// Distance along the ray `o + t * d` at which it enters `rect`.
///
/// Rays starting inside or on the rectangle do not report it; this is what
/// lets a reflected laser leave the wall it bounced off.
pub fn ray_rect_intersection(ox: f32, oy: f32, dx: f32, dy: f32, rect: &Rect) -> Option<f32> {
    let (t_enter, _) = slab_interval(ox, oy, dx, dy, rect)?;
    (t_enter > RAY_EPSILON).then_some(t_enter)
}

/// Whether the segment `(x1, y1)-(x2, y2)` touches `rect` anywhere,
/// including when it starts or ends inside it.
pub fn segment_rect_intersects(x1: f32, y1: f32, x2: f32, y2: f32, rect: &Rect) -> bool {
    segment_interval(x1, y1, x2, y2, rect).is_some()
}

/// First point where the segment `(x1, y1)-(x2, y2)` touches `rect`.
/// A segment starting inside the rectangle reports its start point.
pub fn segment_intersection(x1: f32, y1: f32, x2: f32, y2: f32, rect: &Rect) -> Option<(f32, f32)> {
    let (t_enter, _) = segment_interval(x1, y1, x2, y2, rect)?;
    let t = t_enter.max(0.0);
    Some((x1 + (x2 - x1) * t, y1 + (y2 - y1) * t))
}

fn segment_interval(x1: f32, y1: f32, x2: f32, y2: f32, rect: &Rect) -> Option<(f32, f32)> {
    let (t_enter, t_exit) = slab_interval(x1, y1, x2 - x1, y2 - y1, rect)?;
    (t_exit >= 0.0 && t_enter <= 1.0).then_some((t_enter, t_exit))
}

/// Outcome of moving a circle through the walls in sub-steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sweep {
    /// The whole displacement is free; `(x, y)` is the destination.
    Clear { x: f32, y: f32 },
    /// A sub-step touched `walls[wall]`; `(x, y)` is the last free sub-point.
    Blocked { x: f32, y: f32, wall: usize },
}

/// Sub-stepped (swept) circle movement.
///
/// The displacement is split into `steps` equal parts and each intermediate
/// point is tested, so a fast circle cannot skip over a thin wall between two
/// frames.
pub fn sweep_circle(
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
    radius: f32,
    steps: u32,
    walls: &[Rect],
) -> Sweep {
    let steps = steps.max(1);
    let mut free_x = x;
    let mut free_y = y;

    for i in 1..=steps {
        let f = i as f32 / steps as f32;
        let sx = x + dx * f;
        let sy = y + dy * f;
        if let Some(wall) = first_circle_hit(sx, sy, radius, walls) {
            return Sweep::Blocked {
                x: free_x,
                y: free_y,
                wall,
            };
        }
        free_x = sx;
        free_y = sy;
    }

    Sweep::Clear {
        x: x + dx,
        y: y + dy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_touching_edge_collides() {
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(circle_rect_collision(5.0, 20.0, 5.0, &rect));
        assert!(!circle_rect_collision(4.9, 20.0, 5.0, &rect));
    }

    #[test]
    fn circle_near_corner_uses_euclidean_distance() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        // Corner at (10, 10); point (13, 14) is exactly 5 away
        assert!(circle_rect_collision(13.0, 14.0, 5.0, &rect));
        assert!(!circle_rect_collision(13.0, 14.0, 4.9, &rect));
    }

    #[test]
    fn circle_inside_rect_collides() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(circle_rect_collision(50.0, 50.0, 0.5, &rect));
    }

    #[test]
    fn ray_hits_rect_ahead() {
        let rect = Rect::new(50.0, -5.0, 4.0, 10.0);
        let t = ray_rect_intersection(0.0, 0.0, 1.0, 0.0, &rect).unwrap();
        assert!((t - 50.0).abs() < 1e-4);
    }

    #[test]
    fn ray_ignores_rect_behind() {
        let rect = Rect::new(-54.0, -5.0, 4.0, 10.0);
        assert!(ray_rect_intersection(0.0, 0.0, 1.0, 0.0, &rect).is_none());
    }

    #[test]
    fn ray_from_surface_does_not_rehit() {
        let rect = Rect::new(50.0, -5.0, 4.0, 10.0);
        // Sitting on the left face, heading away from the wall
        assert!(ray_rect_intersection(50.0, 0.0, -1.0, 0.0, &rect).is_none());
    }

    #[test]
    fn parallel_ray_outside_slab_misses() {
        let rect = Rect::new(0.0, 10.0, 100.0, 4.0);
        assert!(ray_rect_intersection(-10.0, 0.0, 1.0, 0.0, &rect).is_none());
    }

    #[test]
    fn segment_crossing_rect_intersects() {
        let rect = Rect::new(10.0, 10.0, 10.0, 10.0);
        assert!(segment_rect_intersects(0.0, 15.0, 30.0, 15.0, &rect));
        assert!(!segment_rect_intersects(0.0, 25.0, 30.0, 25.0, &rect));
        // Stops short of the rectangle
        assert!(!segment_rect_intersects(0.0, 15.0, 9.0, 15.0, &rect));
    }

    #[test]
    fn segment_starting_inside_intersects_at_start() {
        let rect = Rect::new(10.0, 10.0, 10.0, 10.0);
        let p = segment_intersection(15.0, 15.0, 40.0, 15.0, &rect).unwrap();
        assert_eq!(p, (15.0, 15.0));
    }

    #[test]
    fn segment_intersection_reports_entry_point() {
        let rect = Rect::new(10.0, 10.0, 10.0, 10.0);
        let (x, y) = segment_intersection(0.0, 0.0, 30.0, 30.0, &rect).unwrap();
        assert!((x - 10.0).abs() < 1e-4);
        assert!((y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn sweep_stops_before_thin_wall() {
        // 4-unit wall that a 10-unit jump would skip with an endpoint-only test
        let walls = [Rect::new(105.0, 0.0, 4.0, 200.0)];
        let result = sweep_circle(100.0, 100.0, 12.0, 0.0, 1.0, 6, &walls);
        match result {
            Sweep::Blocked { x, wall, .. } => {
                assert_eq!(wall, 0);
                assert!(x + 1.0 < 105.0);
            },
            Sweep::Clear { .. } => panic!("thin wall was tunnelled through"),
        }
    }

    #[test]
    fn sweep_in_open_space_reaches_destination() {
        let result = sweep_circle(0.0, 0.0, 3.0, 4.0, 1.0, 5, &[]);
        assert_eq!(result, Sweep::Clear { x: 3.0, y: 4.0 });
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Minimum distance from a point to a rectangle by dense sampling.
        fn brute_force_distance(px: f32, py: f32, rect: &Rect) -> f32 {
            const SAMPLES: usize = 200;
            let mut best = f32::INFINITY;
            for i in 0..=SAMPLES {
                for j in 0..=SAMPLES {
                    let sx = rect.x + rect.width * i as f32 / SAMPLES as f32;
                    let sy = rect.y + rect.height * j as f32 / SAMPLES as f32;
                    let d = ((px - sx).powi(2) + (py - sy).powi(2)).sqrt();
                    best = best.min(d);
                }
            }
            best
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn circle_rect_matches_brute_force(
                cx in -50.0f32..150.0,
                cy in -50.0f32..150.0,
                r in 0.5f32..60.0,
                x in 0.0f32..80.0,
                y in 0.0f32..80.0,
                w in 1.0f32..40.0,
                h in 1.0f32..40.0,
            ) {
                let rect = Rect::new(x, y, w, h);
                let dist = brute_force_distance(cx, cy, &rect);
                // Sampling resolution bounds the reference error
                let tolerance = (w.max(h) / 200.0) + 1e-3;
                prop_assume!((dist - r).abs() > tolerance);
                prop_assert_eq!(circle_rect_collision(cx, cy, r, &rect), dist <= r);
            }

            #[test]
            fn ray_entry_point_lies_on_rect(
                ox in -100.0f32..-1.0,
                oy in 0.0f32..100.0,
                angle in -1.2f32..1.2,
            ) {
                let rect = Rect::new(0.0, 0.0, 50.0, 100.0);
                if let Some(t) = ray_rect_intersection(ox, oy, angle.cos(), angle.sin(), &rect) {
                    let hx = ox + angle.cos() * t;
                    let hy = oy + angle.sin() * t;
                    prop_assert!(circle_rect_collision(hx, hy, 1e-2, &rect));
                }
            }
        }
    }
}

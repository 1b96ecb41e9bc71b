use std::collections::BTreeMap;
use std::f32::consts::{PI, TAU};

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::config::BotConfig;
use crate::player::{PlayerId, PlayerState};
use crate::projectile::Bullet;

/// Behaviour a bot is currently committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotMode {
    Roaming,
    Attacking { target: PlayerId },
    Evading,
}

/// Control intents a bot wants applied this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BotIntent {
    pub moving: bool,
    pub rotating: i8,
    pub fire: bool,
}

/// Signed angle from `from` to `to`, in `(-π, π]`.
pub fn shortest_angle_diff(from: f32, to: f32) -> f32 {
    let d = (to - from).rem_euclid(TAU);
    if d > PI { d - TAU } else { d }
}

/// Per-bot state machine.
#[derive(Debug, Clone)]
pub struct BotBrain {
    pub player_id: PlayerId,
    pub mode: BotMode,
    /// Ticks left before the mode is re-rolled.
    pub timer: u32,
}

impl BotBrain {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            mode: BotMode::Roaming,
            timer: 0,
        }
    }

    /// Decide this tick's intents. Returns `None` if the bot is dead or gone.
    pub fn think(
        &mut self,
        players: &BTreeMap<PlayerId, PlayerState>,
        bullets: &[Bullet],
        config: &BotConfig,
        rng: &mut impl Rng,
    ) -> Option<BotIntent> {
        let me = players.get(&self.player_id).filter(|p| p.alive)?;

        self.timer = self.timer.saturating_sub(1);
        if self.timer == 0 {
            self.reroll(players, config, rng);
        }

        if let BotMode::Attacking { target } = self.mode
            && !players.get(&target).is_some_and(|t| t.alive)
        {
            self.reroll(players, config, rng);
        }

        let intent = match self.mode {
            BotMode::Roaming => roam(rng),
            BotMode::Attacking { target } => match players.get(&target) {
                Some(t) if t.alive => {
                    let bearing = (t.y - me.y).atan2(t.x - me.x);
                    BotIntent {
                        moving: true,
                        rotating: steer(me.angle, bearing, config.aim_tolerance),
                        fire: rng.random_bool(config.fire_probability.clamp(0.0, 1.0)),
                    }
                },
                _ => roam(rng),
            },
            BotMode::Evading => match nearest_threat(me, bullets) {
                Some(bullet) => {
                    let bearing = (bullet.y - me.y).atan2(bullet.x - me.x) + PI;
                    BotIntent {
                        moving: true,
                        rotating: steer(me.angle, bearing, config.aim_tolerance),
                        fire: false,
                    }
                },
                None => roam(rng),
            },
        };
        Some(intent)
    }

    fn reroll(
        &mut self,
        players: &BTreeMap<PlayerId, PlayerState>,
        config: &BotConfig,
        rng: &mut impl Rng,
    ) {
        let min = config.min_state_ticks.max(1);
        let max = config.max_state_ticks.max(min);
        self.timer = rng.random_range(min..=max);

        let weights = config.weights;
        let total = weights.total();
        if total == 0 {
            self.mode = BotMode::Roaming;
            return;
        }
        let roll = rng.random_range(0..total);
        self.mode = if roll < weights.roaming {
            BotMode::Roaming
        } else if roll < weights.roaming + weights.attacking {
            let targets: Vec<PlayerId> = players
                .values()
                .filter(|p| p.alive && p.id != self.player_id)
                .map(|p| p.id)
                .collect();
            match targets.choose(rng) {
                Some(&target) => BotMode::Attacking { target },
                None => BotMode::Roaming,
            }
        } else {
            BotMode::Evading
        };
        tracing::trace!(bot = self.player_id, mode = ?self.mode, timer = self.timer, "Bot re-rolled");
    }
}

fn roam(rng: &mut impl Rng) -> BotIntent {
    BotIntent {
        moving: rng.random_bool(0.5),
        rotating: rng.random_range(-1..=1),
        fire: false,
    }
}

fn steer(current: f32, desired: f32, tolerance: f32) -> i8 {
    let diff = shortest_angle_diff(current, desired);
    if diff.abs() <= tolerance {
        0
    } else if diff > 0.0 {
        1
    } else {
        -1
    }
}

/// Closest bullet not fired by `me`.
fn nearest_threat<'a>(me: &PlayerState, bullets: &'a [Bullet]) -> Option<&'a Bullet> {
    bullets
        .iter()
        .filter(|b| b.owner != Some(me.id))
        .min_by(|a, b| {
            let da = (a.x - me.x).hypot(a.y - me.y);
            let db = (b.x - me.x).hypot(b.y - me.y);
            da.total_cmp(&db)
        })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::StateWeights;
    use crate::player::PlayerColor;

    fn tank(id: PlayerId, x: f32, y: f32) -> PlayerState {
        PlayerState::new(id, format!("p{id}"), PlayerColor { r: 1, g: 2, b: 3 }, x, y)
    }

    fn roster(tanks: Vec<PlayerState>) -> BTreeMap<PlayerId, PlayerState> {
        tanks.into_iter().map(|p| (p.id, p)).collect()
    }

    fn only(roaming: u32, attacking: u32, evading: u32) -> BotConfig {
        BotConfig {
            weights: StateWeights {
                roaming,
                attacking,
                evading,
            },
            ..BotConfig::default()
        }
    }

    #[test]
    fn angle_diff_takes_short_way_round() {
        assert!((shortest_angle_diff(0.1, TAU - 0.1) + 0.2).abs() < 1e-5);
        assert!((shortest_angle_diff(TAU - 0.1, 0.1) - 0.2).abs() < 1e-5);
        assert!((shortest_angle_diff(0.0, PI) - PI).abs() < 1e-6);
    }

    #[test]
    fn evading_without_bullets_matches_roaming() {
        let players = roster(vec![tank(1, 100.0, 100.0), tank(2, 300.0, 300.0)]);
        let config = BotConfig::default();

        let mut evading = BotBrain {
            player_id: 1,
            mode: BotMode::Evading,
            timer: 100,
        };
        let mut roaming = BotBrain {
            player_id: 1,
            mode: BotMode::Roaming,
            timer: 100,
        };

        let mut rng_a = StdRng::seed_from_u64(77);
        let mut rng_b = StdRng::seed_from_u64(77);
        for _ in 0..20 {
            let a = evading.think(&players, &[], &config, &mut rng_a);
            let b = roaming.think(&players, &[], &config, &mut rng_b);
            assert_eq!(a, b);
            assert!(!a.unwrap().fire);
        }
    }

    #[test]
    fn attacking_turns_toward_target_and_drives() {
        // Target is straight below; facing right means turning clockwise (+)
        let players = roster(vec![tank(1, 100.0, 100.0), tank(2, 100.0, 300.0)]);
        let mut brain = BotBrain {
            player_id: 1,
            mode: BotMode::Attacking { target: 2 },
            timer: 100,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let intent = brain
            .think(&players, &[], &BotConfig::default(), &mut rng)
            .unwrap();
        assert!(intent.moving);
        assert_eq!(intent.rotating, 1);
    }

    #[test]
    fn attacking_holds_heading_when_aligned() {
        let players = roster(vec![tank(1, 100.0, 100.0), tank(2, 300.0, 100.0)]);
        let mut brain = BotBrain {
            player_id: 1,
            mode: BotMode::Attacking { target: 2 },
            timer: 100,
        };
        let config = BotConfig {
            fire_probability: 1.0,
            ..BotConfig::default()
        };
        let intent = brain
            .think(&players, &[], &config, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(intent.rotating, 0);
        assert!(intent.fire);
    }

    #[test]
    fn attacking_without_living_opponent_falls_back_to_roaming() {
        let players = roster(vec![tank(1, 100.0, 100.0)]);
        let mut brain = BotBrain::new(1);
        let mut rng = StdRng::seed_from_u64(5);
        brain.think(&players, &[], &only(0, 1, 0), &mut rng);
        assert_eq!(brain.mode, BotMode::Roaming);
    }

    #[test]
    fn lost_target_triggers_reroll() {
        let mut players = roster(vec![tank(1, 100.0, 100.0), tank(2, 200.0, 100.0), tank(3, 100.0, 200.0)]);
        players.get_mut(&2).unwrap().alive = false;
        let mut brain = BotBrain {
            player_id: 1,
            mode: BotMode::Attacking { target: 2 },
            timer: 100,
        };
        brain.think(&players, &[], &only(0, 1, 0), &mut StdRng::seed_from_u64(9));
        assert_eq!(brain.mode, BotMode::Attacking { target: 3 });
    }

    #[test]
    fn evading_turns_away_and_ignores_own_bullets() {
        let players = roster(vec![tank(1, 100.0, 100.0)]);
        // Hostile bullet to the left means fleeing right (angle 0, already facing)
        let bullets = vec![
            Bullet::new(1, 60.0, 100.0, 0.0, 300.0, Some(2)),
            Bullet::new(2, 105.0, 100.0, 0.0, 300.0, Some(1)),
        ];
        let mut brain = BotBrain {
            player_id: 1,
            mode: BotMode::Evading,
            timer: 100,
        };
        let intent = brain
            .think(&players, &bullets, &BotConfig::default(), &mut StdRng::seed_from_u64(2))
            .unwrap();
        assert!(intent.moving);
        assert_eq!(intent.rotating, 0);
        assert!(!intent.fire);
    }

    #[test]
    fn dead_bot_does_nothing() {
        let mut players = roster(vec![tank(1, 100.0, 100.0)]);
        players.get_mut(&1).unwrap().alive = false;
        let mut brain = BotBrain::new(1);
        assert!(
            brain
                .think(&players, &[], &BotConfig::default(), &mut StdRng::seed_from_u64(0))
                .is_none()
        );
    }

    #[test]
    fn reroll_timer_stays_in_window() {
        let players = roster(vec![tank(1, 100.0, 100.0), tank(2, 300.0, 300.0)]);
        let config = BotConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let mut brain = BotBrain::new(1);
            brain.think(&players, &[], &config, &mut rng);
            // One tick has not yet elapsed on the fresh timer
            assert!((config.min_state_ticks..=config.max_state_ticks).contains(&brain.timer));
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn angle_diff_in_half_open_range(from in -20.0f32..20.0, to in -20.0f32..20.0) {
                let d = shortest_angle_diff(from, to);
                prop_assert!(d > -PI - 1e-5 && d <= PI + 1e-5);
                // Rotating by d lands on the target heading
                let landed = from + d;
                prop_assert!((landed.cos() - to.cos()).abs() < 1e-3);
                prop_assert!((landed.sin() - to.sin()).abs() < 1e-3);
            }
        }
    }
}

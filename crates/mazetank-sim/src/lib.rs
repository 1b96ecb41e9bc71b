pub mod arena;
pub mod bot;
pub mod collision;
pub mod config;
pub mod crystal;
pub mod events;
pub mod laser;
pub mod player;
pub mod projectile;
pub mod snapshot;

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use arena::{Arena, generate_arena};
use bot::BotBrain;
use collision::{Rect, Sweep, circle_clear, sweep_circle};
use crystal::{Crystal, place_crystal};
use laser::{Laser, arena_bounds, trace_beam};
use player::{PlayerColor, PlayerState, find_spawn_point, sanitize_name};
use projectile::{Bullet, bullet_hits_tank, normalize_angle};
use snapshot::{BulletSnapshot, CrystalSnapshot, LaserSnapshot, PlayerSnapshot};

pub use config::{BotConfig, SimConfig, StateWeights};
pub use events::GameEvent;
pub use player::PlayerId;
pub use snapshot::Snapshot;

/// Where the match is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchPhase {
    /// Fewer than two participants; physics runs but nothing is tallied.
    Waiting,
    Running,
    /// A round just ended; the arena resets at `reset_at`.
    RoundOver { reset_at: f64 },
}

/// The whole arena world, advanced one fixed step at a time.
///
/// All mutation goes through the operations below. Operations that happen
/// between ticks (join, fire, disconnect, ...) queue their events, which are
/// handed out by the next [`Simulation::tick`] or [`Simulation::drain_events`].
pub struct Simulation {
    config: SimConfig,
    rng: StdRng,
    arena: Arena,
    bounds: [Rect; 4],
    players: BTreeMap<PlayerId, PlayerState>,
    bots: BTreeMap<PlayerId, BotBrain>,
    bullets: Vec<Bullet>,
    lasers: Vec<Laser>,
    crystal: Option<Crystal>,
    wins: BTreeMap<PlayerId, u32>,
    phase: MatchPhase,
    last_crystal_spawn: f64,
    pending_fires: Vec<PlayerId>,
    events: Vec<GameEvent>,
    next_player_id: PlayerId,
    next_projectile_id: u64,
    tick: u64,
    now: f64,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let arena = generate_arena(&config, &mut rng);
        let bounds = arena_bounds(config.arena_width, config.arena_height);
        Self {
            config,
            rng,
            arena,
            bounds,
            players: BTreeMap::new(),
            bots: BTreeMap::new(),
            bullets: Vec::new(),
            lasers: Vec::new(),
            crystal: None,
            wins: BTreeMap::new(),
            phase: MatchPhase::Waiting,
            last_crystal_spawn: 0.0,
            pending_fires: Vec::new(),
            events: Vec::new(),
            next_player_id: 1,
            next_projectile_id: 1,
            tick: 0,
            now: 0.0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn players(&self) -> &BTreeMap<PlayerId, PlayerState> {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    pub fn wins(&self) -> &BTreeMap<PlayerId, u32> {
        &self.wins
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn lasers(&self) -> &[Laser] {
        &self.lasers
    }

    pub fn crystal(&self) -> Option<&Crystal> {
        self.crystal.as_ref()
    }

    /// Simulation time of the last tick, in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Take events produced by operations since the last tick.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- Operations ----

    /// Add a tank to the arena and return its id.
    pub fn join(&mut self, name: &str) -> PlayerId {
        self.add_player(name, false)
    }

    /// Add an AI-driven tank.
    pub fn spawn_bot(&mut self, name: &str) -> PlayerId {
        let id = self.add_player(name, true);
        self.bots.insert(id, BotBrain::new(id));
        id
    }

    fn add_player(&mut self, name: &str, is_bot: bool) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let name = sanitize_name(name);
        let color = PlayerColor::random(&mut self.rng);
        let (x, y) = find_spawn_point(
            &self.arena,
            self.config.tank_radius(),
            self.config.spawn_attempts,
            &mut self.rng,
        );
        let mut player = PlayerState::new(id, name.clone(), color, x, y);
        player.angle = self.rng.random_range(0.0..TAU);
        player.is_bot = is_bot;
        self.players.insert(id, player);
        self.wins.entry(id).or_insert(0);

        tracing::info!(player_id = id, %name, is_bot, "Player joined");
        self.events.push(GameEvent::PlayerJoined {
            player_id: id,
            name,
        });
        self.push_roster();
        self.refresh_phase();
        id
    }

    /// Update a tank's control intents. Absent fields keep their value.
    ///
    /// Returns `false` for unknown ids and non-finite angles.
    pub fn move_player(
        &mut self,
        id: PlayerId,
        angle: Option<f32>,
        moving: Option<bool>,
        rotating: Option<i8>,
    ) -> bool {
        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };
        if angle.is_some_and(|a| !a.is_finite()) {
            tracing::warn!(player_id = id, "Rejected non-finite heading");
            return false;
        }
        if let Some(angle) = angle {
            player.angle = normalize_angle(angle);
        }
        if let Some(moving) = moving {
            player.moving = moving;
        }
        if let Some(rotating) = rotating {
            player.rotating = rotating.signum();
        }
        true
    }

    /// Queue a shot; it leaves the barrel on the next tick.
    pub fn fire(&mut self, id: PlayerId) -> bool {
        if !self.players.get(&id).is_some_and(|p| p.alive) {
            return false;
        }
        self.pending_fires.push(id);
        true
    }

    /// Rename a tank. A new random colour comes with the new name.
    pub fn change_name(&mut self, id: PlayerId, name: &str) -> bool {
        let new_name = sanitize_name(name);
        let color = PlayerColor::random(&mut self.rng);
        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };
        let old_name = std::mem::replace(&mut player.name, new_name.clone());
        player.color = color;
        tracing::info!(player_id = id, %old_name, %new_name, "Player renamed");
        self.events.push(GameEvent::NameChanged {
            player_id: id,
            old_name,
            new_name,
            color,
        });
        true
    }

    /// Remove a tank along with its tally entry.
    pub fn disconnect(&mut self, id: PlayerId) -> bool {
        if self.players.remove(&id).is_none() {
            return false;
        }
        self.bots.remove(&id);
        self.wins.remove(&id);
        self.pending_fires.retain(|&p| p != id);
        tracing::info!(player_id = id, "Player left");
        self.events.push(GameEvent::PlayerLeft { player_id: id });
        self.push_roster();
        self.refresh_phase();
        true
    }

    fn push_roster(&mut self) {
        let names: Vec<String> = self.players.values().map(|p| p.name.clone()).collect();
        self.events.push(GameEvent::PlayerCount {
            count: names.len(),
            names,
        });
    }

    /// Regenerate the arena and respawn everyone, keeping tallies.
    pub fn reset(&mut self) {
        self.reset_round();
    }

    /// Reset and clear every win tally.
    pub fn restart(&mut self) {
        for wins in self.wins.values_mut() {
            *wins = 0;
        }
        tracing::info!("Match restarted");
        self.reset_round();
    }

    /// Place a crystal, replacing any existing one.
    pub fn spawn_crystal(&mut self, x: f32, y: f32) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        self.put_crystal(x, y);
        true
    }

    /// Destroy a tank outright.
    pub fn kill_player(&mut self, id: PlayerId) -> bool {
        if !self.kill(id, None) {
            return false;
        }
        self.evaluate_round();
        true
    }

    /// Inject an ownerless bullet.
    pub fn spawn_bullet(&mut self, x: f32, y: f32, angle: f32) -> bool {
        if !x.is_finite() || !y.is_finite() || !angle.is_finite() {
            return false;
        }
        let id = self.next_projectile_id();
        self.bullets
            .push(Bullet::new(id, x, y, angle, self.config.bullet_speed, None));
        true
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            players: self
                .players
                .iter()
                .map(|(&id, p)| {
                    (
                        id,
                        PlayerSnapshot {
                            x: p.x,
                            y: p.y,
                            angle: p.angle,
                            alive: p.alive,
                            color: p.color,
                            name: p.name.clone(),
                            has_laser_active: p.has_laser(self.now),
                        },
                    )
                })
                .collect(),
            bullets: self
                .bullets
                .iter()
                .map(|b| BulletSnapshot {
                    x: b.x,
                    y: b.y,
                    angle: b.angle,
                    speed: b.speed,
                })
                .collect(),
            crystals: self
                .crystal
                .iter()
                .map(|c| CrystalSnapshot {
                    x: c.x,
                    y: c.y,
                    spawn_time: c.spawned_at,
                })
                .collect(),
            lasers: self
                .lasers
                .iter()
                .map(|l| LaserSnapshot {
                    x: l.x,
                    y: l.y,
                    angle: l.angle,
                    reflected_points: l.reflected_points.to_vec(),
                })
                .collect(),
        }
    }

    // ---- Tick ----

    /// Advance the world by one fixed step at simulation time `now`.
    pub fn tick(&mut self, now: f64) -> Vec<GameEvent> {
        self.now = now;
        self.tick += 1;
        let dt = self.config.tick_dt();

        if let MatchPhase::RoundOver { reset_at } = self.phase
            && now >= reset_at
        {
            self.reset_round();
        }
        if self.phase == MatchPhase::Running {
            self.update_crystal();
        }

        self.run_bots();
        self.move_players(dt);
        self.collect_crystal();
        self.resolve_fires();

        let mut victims = self.update_bullets(dt);
        victims.extend(self.update_lasers());
        let any_kill = victims
            .into_iter()
            .fold(false, |acc, (victim, killer)| self.kill(victim, killer) || acc);
        if any_kill {
            self.evaluate_round();
        }

        std::mem::take(&mut self.events)
    }

    fn update_crystal(&mut self) {
        if let Some(crystal) = self.crystal
            && crystal.is_expired(self.now, self.config.crystal_lifetime)
        {
            tracing::debug!(x = crystal.x, y = crystal.y, "Crystal expired");
            self.crystal = None;
        }

        if self.crystal.is_none()
            && self.now - self.last_crystal_spawn >= self.config.crystal_spawn_interval
        {
            let tanks: Vec<(f32, f32)> = self.players.values().map(|p| (p.x, p.y)).collect();
            match place_crystal(&self.arena, &tanks, &self.config, &mut self.rng) {
                Some((x, y)) => self.put_crystal(x, y),
                None => tracing::debug!("No room for a crystal this tick"),
            }
        }
    }

    fn put_crystal(&mut self, x: f32, y: f32) {
        self.crystal = Some(Crystal {
            x,
            y,
            spawned_at: self.now,
        });
        self.last_crystal_spawn = self.now;
        tracing::debug!(x, y, "Crystal spawned");
        self.events.push(GameEvent::CrystalSpawned { x, y });
    }

    fn run_bots(&mut self) {
        for brain in self.bots.values_mut() {
            let Some(intent) =
                brain.think(&self.players, &self.bullets, &self.config.bot, &mut self.rng)
            else {
                continue;
            };
            if let Some(player) = self.players.get_mut(&brain.player_id) {
                player.moving = intent.moving;
                player.rotating = intent.rotating.signum();
            }
            if intent.fire {
                self.pending_fires.push(brain.player_id);
            }
        }
    }

    fn move_players(&mut self, dt: f32) {
        let radius = self.config.tank_radius();
        let turn = self.config.rotation_speed * dt;
        let step = self.config.tank_speed * dt;
        let walls = &self.arena.walls;

        for player in self.players.values_mut().filter(|p| p.alive) {
            if player.rotating != 0 {
                player.angle = normalize_angle(player.angle + f32::from(player.rotating) * turn);
            }
            if player.moving {
                let nx = player.x + player.angle.cos() * step;
                let ny = player.y + player.angle.sin() * step;
                if nx.is_finite() && ny.is_finite() && circle_clear(nx, ny, radius, walls) {
                    player.x = nx;
                    player.y = ny;
                }
            }
        }
    }

    fn collect_crystal(&mut self) {
        let Some(crystal) = self.crystal else {
            return;
        };
        let Some(player) = self
            .players
            .values_mut()
            .find(|p| p.alive && crystal.in_reach(p.x, p.y, &self.config))
        else {
            return;
        };

        player.laser_until = Some(self.now + self.config.laser_duration);
        let player_id = player.id;
        self.crystal = None;
        tracing::debug!(player_id, "Crystal collected");
        self.events.push(GameEvent::CrystalCollected {
            player_id,
            x: crystal.x,
            y: crystal.y,
        });
    }

    fn resolve_fires(&mut self) {
        for id in std::mem::take(&mut self.pending_fires) {
            let Some(player) = self.players.get(&id).filter(|p| p.alive) else {
                continue;
            };
            let (x, y) = self.muzzle(player);
            let angle = player.angle;

            if player.has_laser(self.now) {
                let reflected_points = trace_beam(
                    x,
                    y,
                    angle,
                    &self.arena.walls,
                    &self.bounds,
                    self.config.max_laser_reflections,
                );
                let laser = Laser {
                    id: self.next_projectile_id(),
                    owner: Some(id),
                    x,
                    y,
                    angle,
                    created_at: self.now,
                    reflected_points,
                };
                if laser.is_finite() {
                    self.lasers.push(laser);
                } else {
                    tracing::warn!(player_id = id, "Dropped non-finite laser");
                }
            } else {
                let bullet_id = self.next_projectile_id();
                self.bullets.push(Bullet::new(
                    bullet_id,
                    x,
                    y,
                    angle,
                    self.config.bullet_speed,
                    Some(id),
                ));
            }
        }
    }

    /// Point where a shot from `player` appears.
    ///
    /// Normally the barrel tip. When the barrel pokes into a wall the shot
    /// starts at the last point short of it, so the wall still deflects it.
    fn muzzle(&self, player: &PlayerState) -> (f32, f32) {
        let barrel = self.config.barrel_length();
        match sweep_circle(
            player.x,
            player.y,
            player.angle.cos() * barrel,
            player.angle.sin() * barrel,
            self.config.bullet_radius,
            self.config.effective_sweep_steps(),
            &self.arena.walls,
        ) {
            Sweep::Clear { x, y } | Sweep::Blocked { x, y, .. } => (x, y),
        }
    }

    /// Move every bullet and return `(victim, killer)` pairs.
    fn update_bullets(&mut self, dt: f32) -> Vec<(PlayerId, Option<PlayerId>)> {
        let config = &self.config;
        let walls = &self.arena.walls;
        let players = &self.players;
        let arena = &self.arena;
        let steps = config.effective_sweep_steps();
        let mut victims: Vec<(PlayerId, Option<PlayerId>)> = Vec::new();

        self.bullets.retain_mut(|bullet| {
            bullet.advance(dt, config.bullet_radius, steps, walls);
            if !bullet.is_finite() {
                tracing::warn!(bullet_id = bullet.id, "Dropped non-finite bullet");
                return false;
            }

            let hit = players.values().find(|p| {
                p.alive
                    && (config.bullet_self_hit || bullet.owner != Some(p.id))
                    && !victims.iter().any(|&(v, _)| v == p.id)
                    && bullet_hits_tank(
                        bullet.x,
                        bullet.y,
                        config.bullet_hit_radius,
                        &p.body(config.tank_width, config.tank_height),
                    )
            });
            if let Some(target) = hit {
                victims.push((target.id, bullet.owner));
                return false;
            }

            if bullet.bounces >= config.max_bullet_bounces {
                tracing::debug!(bullet_id = bullet.id, "Bullet exhausted its bounces");
                return false;
            }
            arena.in_bounds(bullet.x, bullet.y)
        });

        victims
    }

    /// Apply laser hits and drop expired beams.
    fn update_lasers(&mut self) -> Vec<(PlayerId, Option<PlayerId>)> {
        let mut victims = Vec::new();
        for laser in &self.lasers {
            for player in self.players.values() {
                if !player.alive || laser.owner == Some(player.id) {
                    continue;
                }
                let body = player.body(self.config.tank_width, self.config.tank_height);
                if laser.hits(&body) && !victims.iter().any(|&(v, _)| v == player.id) {
                    victims.push((player.id, laser.owner));
                }
            }
        }
        let (now, lifetime) = (self.now, self.config.laser_lifetime);
        self.lasers.retain(|l| !l.is_expired(now, lifetime));
        victims
    }

    fn kill(&mut self, id: PlayerId, killer: Option<PlayerId>) -> bool {
        let Some(player) = self.players.get_mut(&id).filter(|p| p.alive) else {
            return false;
        };
        player.alive = false;
        let (x, y) = (player.x, player.y);
        tracing::debug!(player_id = id, ?killer, "Player killed");
        self.events.push(GameEvent::PlayerKilled {
            player_id: id,
            x,
            y,
            killer,
        });
        true
    }

    // ---- Match state ----

    /// Re-evaluate the phase after the roster changed.
    fn refresh_phase(&mut self) {
        match self.players.len() {
            0 => {
                self.reset_round();
            },
            1 => {
                if self.phase != MatchPhase::Waiting {
                    tracing::info!("Match paused, waiting for players");
                }
                self.phase = MatchPhase::Waiting;
                self.events.push(GameEvent::WaitingForPlayers { count: 1 });
            },
            n => {
                if self.phase == MatchPhase::Waiting {
                    tracing::info!(players = n, "Match started");
                    self.events.push(GameEvent::GameStarted { players: n });
                    self.reset_round();
                } else {
                    self.evaluate_round();
                }
            },
        }
    }

    /// End the round if exactly one participant survives, or none do.
    fn evaluate_round(&mut self) {
        if self.phase != MatchPhase::Running || self.players.len() < 2 {
            return;
        }
        let mut alive = self.players.values().filter(|p| p.alive);
        let first = alive.next().map(|p| (p.id, p.name.clone()));
        let more = alive.next().is_some();

        match (first, more) {
            (Some((winner, winner_name)), false) => {
                *self.wins.entry(winner).or_insert(0) += 1;
                tracing::info!(winner, %winner_name, "Round won");
                self.events.push(GameEvent::GameOver {
                    winner,
                    winner_name,
                    wins: self.wins.clone(),
                });
                self.end_round();
            },
            (None, _) => {
                tracing::info!("Round drawn");
                self.events.push(GameEvent::RoundDrawn);
                self.end_round();
            },
            _ => {}
        }
    }

    fn end_round(&mut self) {
        self.phase = MatchPhase::RoundOver {
            reset_at: self.now + self.config.round_reset_delay,
        };
    }

    fn reset_round(&mut self) {
        self.arena = generate_arena(&self.config, &mut self.rng);
        self.bullets.clear();
        self.lasers.clear();
        self.crystal = None;
        self.pending_fires.clear();
        self.last_crystal_spawn = self.now;

        let radius = self.config.tank_radius();
        for player in self.players.values_mut() {
            let (x, y) = find_spawn_point(
                &self.arena,
                radius,
                self.config.spawn_attempts,
                &mut self.rng,
            );
            let angle = self.rng.random_range(0.0..TAU);
            player.respawn(x, y, angle);
        }

        self.phase = if self.players.len() > 1 {
            MatchPhase::Running
        } else {
            MatchPhase::Waiting
        };
        tracing::info!(players = self.players.len(), "Arena reset");
        self.events.push(GameEvent::GameReset {
            walls: self.arena.walls.clone(),
            maze: self.arena.maze,
            wins: self.wins.clone(),
        });
    }

    fn next_projectile_id(&mut self) -> u64 {
        let id = self.next_projectile_id;
        self.next_projectile_id += 1;
        id
    }
}

use serde::{Deserialize, Serialize};

/// Data-driven configuration for the arena simulation.
///
/// Speeds are expressed per second; the scheduler advances the simulation in
/// fixed steps of `1 / tick_rate` seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Canvas width. The maze is centred inside it.
    pub arena_width: f32,
    /// Canvas height.
    pub arena_height: f32,
    /// Maze columns.
    pub maze_cols: usize,
    /// Maze rows.
    pub maze_rows: usize,
    /// Edge length of one maze cell.
    pub grid_size: f32,
    /// Thickness of the wall strips emitted for each wall cell.
    pub wall_thickness: f32,
    /// Probability that a cell starts out as a wall.
    pub wall_probability: f64,
    pub tank_width: f32,
    pub tank_height: f32,
    /// Extra margin added to the tank's half-extent for wall collisions.
    pub tank_clearance: f32,
    /// Linear tank speed (units/s).
    pub tank_speed: f32,
    /// Angular tank speed (rad/s) applied while a rotation intent is held.
    pub rotation_speed: f32,
    /// Distance past the tank's half-extent at which shots are spawned.
    pub barrel_offset: f32,
    /// Bullet speed (units/s).
    pub bullet_speed: f32,
    /// Radius used when testing bullets against walls.
    pub bullet_radius: f32,
    /// Radius used when testing bullets against tanks.
    pub bullet_hit_radius: f32,
    pub max_bullet_bounces: u8,
    /// Sub-steps per frame for swept bullet collision (clamped to at least 5).
    pub sweep_steps: u32,
    /// Whether a bullet can destroy the tank that fired it.
    pub bullet_self_hit: bool,
    pub max_laser_reflections: usize,
    /// How long a fired laser stays lethal (seconds).
    pub laser_lifetime: f64,
    /// Empowerment window granted by a crystal (seconds).
    pub laser_duration: f64,
    /// Minimum idle time between crystal spawns (seconds).
    pub crystal_spawn_interval: f64,
    /// Time an uncollected crystal stays on the field (seconds).
    pub crystal_lifetime: f64,
    pub crystal_radius: f32,
    /// Crystals never spawn closer than this to any tank.
    pub crystal_min_player_distance: f32,
    /// Rejection-sampling budget for tank and crystal placement.
    pub spawn_attempts: u32,
    /// Pause between game over and the automatic round reset (seconds).
    pub round_reset_delay: f64,
    /// Simulation tick rate in Hz.
    pub tick_rate: f32,
    /// Fixed RNG seed. `None` seeds from the OS.
    pub seed: Option<u64>,
    pub bot: BotConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena_width: 1200.0,
            arena_height: 800.0,
            maze_cols: 13,
            maze_rows: 9,
            grid_size: 60.0,
            wall_thickness: 4.0,
            wall_probability: 0.3,
            tank_width: 20.0,
            tank_height: 20.0,
            tank_clearance: 2.0,
            tank_speed: 90.0,
            rotation_speed: 3.0,
            barrel_offset: 5.0,
            bullet_speed: 300.0,
            bullet_radius: 2.0,
            bullet_hit_radius: 3.0,
            max_bullet_bounces: 10,
            sweep_steps: 5,
            bullet_self_hit: true,
            max_laser_reflections: 3,
            laser_lifetime: 0.1,
            laser_duration: 10.0,
            crystal_spawn_interval: 10.0,
            crystal_lifetime: 5.0,
            crystal_radius: 15.0,
            crystal_min_player_distance: 100.0,
            spawn_attempts: 200,
            round_reset_delay: 3.0,
            tick_rate: 60.0,
            seed: None,
            bot: BotConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("MAZETANK_SIM_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
        {
            match toml::from_str::<Self>(&contents) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(%path, error = %e, "Ignoring unparseable sim config"),
            }
        }
        if let Ok(contents) = std::fs::read_to_string("config/sim.toml")
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        Self::default()
    }

    /// Collision radius of a tank against walls.
    pub fn tank_radius(&self) -> f32 {
        self.tank_width.max(self.tank_height) / 2.0 + self.tank_clearance
    }

    /// Distance from a tank's centre to the point where its shots appear.
    pub fn barrel_length(&self) -> f32 {
        self.tank_width.max(self.tank_height) / 2.0 + self.barrel_offset
    }

    /// Fixed simulation step in seconds.
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Number of sweep sub-steps, never fewer than five.
    pub fn effective_sweep_steps(&self) -> u32 {
        self.sweep_steps.max(5)
    }
}

/// Relative likelihood of each AI state when a bot re-rolls its behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateWeights {
    pub roaming: u32,
    pub attacking: u32,
    pub evading: u32,
}

impl Default for StateWeights {
    fn default() -> Self {
        Self {
            roaming: 1,
            attacking: 1,
            evading: 1,
        }
    }
}

impl StateWeights {
    pub fn total(&self) -> u32 {
        self.roaming + self.attacking + self.evading
    }
}

/// Tuning for the bot state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub weights: StateWeights,
    /// Shortest time (ticks) a bot keeps a state before re-rolling.
    pub min_state_ticks: u32,
    /// Longest time (ticks) a bot keeps a state before re-rolling.
    pub max_state_ticks: u32,
    /// Chance per tick that an attacking bot pulls the trigger.
    pub fire_probability: f64,
    /// Heading error (rad) below which a bot stops turning.
    pub aim_tolerance: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            weights: StateWeights::default(),
            min_state_ticks: 50,
            max_state_ticks: 150,
            fire_probability: 0.1,
            aim_tolerance: 0.1,
        }
    }
}

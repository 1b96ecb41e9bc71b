use serde::Deserialize;

use mazetank_sim::SimConfig;

/// Top-level host configuration, loaded from `mazetank.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub scheduler: SchedulerConfig,
    pub console: ConsoleConfig,
    /// Names of bots spawned when the simulation starts.
    pub bots: Vec<String>,
    pub sim: SimConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            console: ConsoleConfig::default(),
            bots: Vec::new(),
            sim: SimConfig::default(),
        }
    }
}

/// Tick cadence of the simulation loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_rate_hz: f32,
    /// Broadcast a snapshot every N ticks.
    pub snapshot_every: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            snapshot_every: 3,
        }
    }
}

/// Operator console on stdin.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// A configuration value that cannot be run with.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    TickRate(f32),
    SnapshotEvery,
    ZeroField(&'static str),
    BotTimerWindow { min: u32, max: u32 },
    Probability { field: &'static str, value: f64 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TickRate(rate) => write!(f, "scheduler.tick_rate_hz must be > 0 (got {rate})"),
            Self::SnapshotEvery => write!(f, "scheduler.snapshot_every must be > 0"),
            Self::ZeroField(field) => write!(f, "{field} must be > 0"),
            Self::BotTimerWindow { min, max } => write!(
                f,
                "sim.bot.min_state_ticks ({min}) must not exceed max_state_ticks ({max})"
            ),
            Self::Probability { field, value } => {
                write!(f, "{field} must be within 0..=1 (got {value})")
            },
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Check the values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.scheduler.tick_rate_hz;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::TickRate(rate));
        }
        if self.scheduler.snapshot_every == 0 {
            return Err(ConfigError::SnapshotEvery);
        }

        let sim = &self.sim;
        if sim.maze_cols == 0 {
            return Err(ConfigError::ZeroField("sim.maze_cols"));
        }
        if sim.maze_rows == 0 {
            return Err(ConfigError::ZeroField("sim.maze_rows"));
        }
        if sim.grid_size <= 0.0 {
            return Err(ConfigError::ZeroField("sim.grid_size"));
        }
        if sim.arena_width <= 0.0 || sim.arena_height <= 0.0 {
            return Err(ConfigError::ZeroField("sim.arena_width/arena_height"));
        }
        if !(0.0..=1.0).contains(&sim.wall_probability) {
            return Err(ConfigError::Probability {
                field: "sim.wall_probability",
                value: sim.wall_probability,
            });
        }
        if !(0.0..=1.0).contains(&sim.bot.fire_probability) {
            return Err(ConfigError::Probability {
                field: "sim.bot.fire_probability",
                value: sim.bot.fire_probability,
            });
        }
        if sim.bot.min_state_ticks > sim.bot.max_state_ticks {
            return Err(ConfigError::BotTimerWindow {
                min: sim.bot.min_state_ticks,
                max: sim.bot.max_state_ticks,
            });
        }

        let maze_width = sim.maze_cols as f32 * sim.grid_size;
        let maze_height = sim.maze_rows as f32 * sim.grid_size;
        if maze_width > sim.arena_width || maze_height > sim.arena_height {
            tracing::warn!(
                maze_width,
                maze_height,
                "Maze is larger than the arena canvas; bullets leaving the canvas are dropped"
            );
        }
        Ok(())
    }

    /// Load config from `MAZETANK_CONFIG` or `mazetank.toml`, then apply env var overrides.
    ///
    /// Without a host config file the simulation settings come from
    /// [`SimConfig::load`].
    pub fn load() -> Self {
        let path = std::env::var("MAZETANK_CONFIG")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "mazetank.toml".to_string());

        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(%path, "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(%path, "Failed to parse config: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(%path, "No config file found, using defaults");
                ServerConfig {
                    sim: SimConfig::load(),
                    ..ServerConfig::default()
                }
            },
        };

        if let Ok(val) = std::env::var("MAZETANK_TICK_RATE")
            && let Ok(rate) = val.parse::<f32>()
        {
            config.scheduler.tick_rate_hz = rate;
        }
        if let Ok(val) = std::env::var("MAZETANK_SNAPSHOT_EVERY")
            && let Ok(n) = val.parse::<u32>()
        {
            config.scheduler.snapshot_every = n;
        }
        if let Ok(val) = std::env::var("MAZETANK_SEED")
            && let Ok(seed) = val.parse::<u64>()
        {
            config.sim.seed = Some(seed);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.scheduler.tick_rate_hz, 60.0);
        assert_eq!(cfg.scheduler.snapshot_every, 3);
        assert!(cfg.console.enabled);
        assert!(cfg.bots.is_empty());
        assert_eq!(cfg.sim.maze_cols, 13);
    }

    #[test]
    fn validate_accepts_defaults() {
        assert_eq!(ServerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
bots = ["Rusty", "Clanky"]

[scheduler]
tick_rate_hz = 30.0
snapshot_every = 2

[console]
enabled = false

[sim]
maze_cols = 11
seed = 99

[sim.bot]
min_state_ticks = 20
max_state_ticks = 40
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.bots, vec!["Rusty".to_string(), "Clanky".to_string()]);
        assert_eq!(cfg.scheduler.tick_rate_hz, 30.0);
        assert_eq!(cfg.scheduler.snapshot_every, 2);
        assert!(!cfg.console.enabled);
        assert_eq!(cfg.sim.maze_cols, 11);
        assert_eq!(cfg.sim.maze_rows, 9);
        assert_eq!(cfg.sim.seed, Some(99));
        assert_eq!(cfg.sim.bot.min_state_ticks, 20);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_tick_rate() {
        let cfg = ServerConfig {
            scheduler: SchedulerConfig {
                tick_rate_hz: 0.0,
                ..SchedulerConfig::default()
            },
            ..ServerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::TickRate(0.0)));
    }

    #[test]
    fn validate_rejects_zero_snapshot_cadence() {
        let cfg = ServerConfig {
            scheduler: SchedulerConfig {
                snapshot_every: 0,
                ..SchedulerConfig::default()
            },
            ..ServerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::SnapshotEvery));
    }

    #[test]
    fn validate_rejects_inverted_bot_window() {
        let mut cfg = ServerConfig::default();
        cfg.sim.bot.min_state_ticks = 200;
        cfg.sim.bot.max_state_ticks = 100;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::BotTimerWindow { min: 200, max: 100 })
        );
    }

    #[test]
    fn validate_rejects_bad_probability() {
        let mut cfg = ServerConfig::default();
        cfg.sim.wall_probability = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Probability { field: "sim.wall_probability", .. })
        ));
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: ServerConfig = toml::from_str("bots = []").unwrap();
        assert_eq!(cfg.scheduler.snapshot_every, 3);
        assert_eq!(cfg.sim.tick_rate, 60.0);
    }
}

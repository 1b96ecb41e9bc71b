use mazetank_sim::PlayerId;

use crate::game_loop::SimHandle;

/// An operator command typed on the server console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    SpawnCrystal { x: f32, y: f32 },
    KillPlayer { player_id: PlayerId },
    SpawnBullet { x: f32, y: f32, angle: f32 },
    SpawnBot { name: String },
    Restart,
    Reset,
    Players,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleError {
    Empty,
    NotACommand(String),
    UnknownCommand(String),
    WrongArity {
        command: &'static str,
        usage: &'static str,
    },
    InvalidNumber {
        argument: &'static str,
        value: String,
    },
    SimulationStopped,
}

impl std::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::NotACommand(line) => write!(f, "commands start with '/': {line}"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            Self::WrongArity { command, usage } => write!(f, "usage: {command} {usage}"),
            Self::InvalidNumber { argument, value } => {
                write!(f, "invalid {argument}: {value:?}")
            },
            Self::SimulationStopped => write!(f, "simulation is not running"),
        }
    }
}

impl std::error::Error for ConsoleError {}

fn number(argument: &'static str, value: &str) -> Result<f32, ConsoleError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConsoleError::InvalidNumber {
            argument,
            value: value.to_string(),
        })
}

fn arity(
    args: &[&str],
    n: usize,
    command: &'static str,
    usage: &'static str,
) -> Result<(), ConsoleError> {
    if args.len() == n {
        Ok(())
    } else {
        Err(ConsoleError::WrongArity { command, usage })
    }
}

impl ConsoleCommand {
    /// Parse one console line, e.g. `/spawnbullet 400 300 1.57`.
    pub fn parse(line: &str) -> Result<Self, ConsoleError> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(ConsoleError::Empty);
        };
        let args: Vec<&str> = parts.collect();
        let Some(name) = head.strip_prefix('/') else {
            return Err(ConsoleError::NotACommand(line.trim().to_string()));
        };

        match name {
            "spawncrystal" => {
                arity(&args, 2, "/spawncrystal", "<x> <y>")?;
                Ok(Self::SpawnCrystal {
                    x: number("x", args[0])?,
                    y: number("y", args[1])?,
                })
            },
            "killplayer" => {
                arity(&args, 1, "/killplayer", "<player id>")?;
                let player_id =
                    args[0]
                        .parse::<PlayerId>()
                        .map_err(|_| ConsoleError::InvalidNumber {
                            argument: "player id",
                            value: args[0].to_string(),
                        })?;
                Ok(Self::KillPlayer { player_id })
            },
            "spawnbullet" => {
                arity(&args, 3, "/spawnbullet", "<x> <y> <angle>")?;
                Ok(Self::SpawnBullet {
                    x: number("x", args[0])?,
                    y: number("y", args[1])?,
                    angle: number("angle", args[2])?,
                })
            },
            "spawnbot" => {
                arity(&args, 1, "/spawnbot", "<name>")?;
                Ok(Self::SpawnBot {
                    name: args[0].to_string(),
                })
            },
            "restart" => {
                arity(&args, 0, "/restart", "")?;
                Ok(Self::Restart)
            },
            "reset" => {
                arity(&args, 0, "/reset", "")?;
                Ok(Self::Reset)
            },
            "players" => {
                arity(&args, 0, "/players", "")?;
                Ok(Self::Players)
            },
            _ => Err(ConsoleError::UnknownCommand(head.to_string())),
        }
    }

    /// Forward the command to the simulation.
    pub async fn apply(self, sim: &SimHandle) -> Result<(), ConsoleError> {
        let queued = match self {
            Self::SpawnCrystal { x, y } => {
                tracing::info!(x, y, "Console: spawning crystal");
                sim.spawn_crystal(x, y)
            },
            Self::KillPlayer { player_id } => {
                tracing::info!(player_id, "Console: killing player");
                sim.kill_player(player_id)
            },
            Self::SpawnBullet { x, y, angle } => {
                tracing::info!(x, y, angle, "Console: spawning bullet");
                sim.spawn_bullet(x, y, angle)
            },
            Self::SpawnBot { name } => match sim.spawn_bot(&name).await {
                Some(player_id) => {
                    tracing::info!(player_id, %name, "Console: bot spawned");
                    true
                },
                None => false,
            },
            Self::Restart => sim.restart(),
            Self::Reset => sim.reset(),
            Self::Players => match sim.players().await {
                Some(roster) => {
                    if roster.is_empty() {
                        tracing::info!("Console: no players connected");
                    }
                    for p in roster {
                        tracing::info!(
                            player_id = p.id,
                            name = %p.name,
                            alive = p.alive,
                            bot = p.is_bot,
                            wins = p.wins,
                            "Console: player"
                        );
                    }
                    true
                },
                None => false,
            },
        };
        if queued {
            Ok(())
        } else {
            Err(ConsoleError::SimulationStopped)
        }
    }
}

pub mod config;
pub mod console;
pub mod game_loop;
pub mod protocol;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;

use console::ConsoleCommand;
use game_loop::SimHandle;

pub use config::ServerConfig;
pub use game_loop::{Broadcast, SimCommand, spawn_simulation};

/// Read operator commands line by line and forward them to the simulation.
///
/// Returns when the input closes or the simulation has stopped.
pub async fn run_console<R>(input: R, sim: SimHandle)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Console input failed");
                break;
            },
        };
        if line.trim().is_empty() {
            continue;
        }
        let result = match ConsoleCommand::parse(&line) {
            Ok(cmd) => cmd.apply(&sim).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {},
            Err(console::ConsoleError::SimulationStopped) => {
                tracing::info!("Simulation stopped, closing console");
                break;
            },
            Err(e) => tracing::warn!(%line, "Console: {e}"),
        }
    }
}

/// Spawn [`run_console`] on stdin.
pub fn spawn_stdin_console(sim: SimHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        run_console(stdin, sim).await;
    })
}

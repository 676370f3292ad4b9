//! Front-end control surface.
//!
//! These functions bridge front-end requests to the game loop thread via
//! channels, the way a UI shell would call into the simulation.

use thiserror::Error;
use tracing::info;

use citadel_core::commands::PlayerCommand;
use citadel_core::error::ConfigError;
use citadel_core::state::GameStateSnapshot;
use citadel_sim::notify::EventSink;
use citadel_sim::{SimConfig, SimulationEngine};

use crate::game_loop;
use crate::state::{AppState, GameLoopCommand};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("simulation already running")]
    AlreadyRunning,
    #[error("simulation not started")]
    NotStarted,
    #[error("game loop has stopped")]
    Disconnected,
    #[error("shared state lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to spawn game loop thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Build an engine from `config`, attach `sinks`, and start the game loop
/// thread. Fails if one is already running or the config is invalid.
pub fn start_simulation(
    state: &AppState,
    config: SimConfig,
    sinks: Vec<Box<dyn EventSink>>,
) -> Result<(), HostError> {
    let mut running = state.running.lock().map_err(|_| HostError::Poisoned)?;
    if *running {
        return Err(HostError::AlreadyRunning);
    }

    let mut engine = SimulationEngine::new(config)?;
    for sink in sinks {
        engine.add_event_sink(sink);
    }
    let cmd_tx = game_loop::spawn_game_loop(engine, state.latest_snapshot.clone())?;

    let mut tx_lock = state.command_tx.lock().map_err(|_| HostError::Poisoned)?;
    *tx_lock = Some(cmd_tx);
    *running = true;
    info!("simulation started");
    Ok(())
}

/// Send a player command to the simulation.
pub fn send_command(state: &AppState, command: PlayerCommand) -> Result<(), HostError> {
    let tx_lock = state.command_tx.lock().map_err(|_| HostError::Poisoned)?;
    match tx_lock.as_ref() {
        Some(tx) => tx
            .send(GameLoopCommand::PlayerCommand(command))
            .map_err(|_| HostError::Disconnected),
        None => Err(HostError::NotStarted),
    }
}

/// Latest snapshot published by the game loop, if any.
pub fn get_snapshot(state: &AppState) -> Result<Option<GameStateSnapshot>, HostError> {
    let lock = state.latest_snapshot.lock().map_err(|_| HostError::Poisoned)?;
    Ok(lock.clone())
}

/// Ask the game loop to stop and forget its channel.
pub fn stop_simulation(state: &AppState) -> Result<(), HostError> {
    let mut running = state.running.lock().map_err(|_| HostError::Poisoned)?;
    let mut tx_lock = state.command_tx.lock().map_err(|_| HostError::Poisoned)?;
    let tx = tx_lock.take().ok_or(HostError::NotStarted)?;
    // A loop that already exited has nothing left to stop.
    let _ = tx.send(GameLoopCommand::Shutdown);
    *running = false;
    info!("simulation stopped");
    Ok(())
}

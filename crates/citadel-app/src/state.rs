//! Application state shared between the front end and the game loop thread.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use citadel_core::commands::PlayerCommand;
use citadel_core::state::GameStateSnapshot;

/// Commands sent from the front end to the game loop thread.
#[derive(Debug)]
pub enum GameLoopCommand {
    /// A player command to forward to the simulation engine.
    PlayerCommand(PlayerCommand),
    /// Shut down the game loop thread gracefully.
    Shutdown,
}

/// Shared application state.
///
/// `mpsc::Sender` is not `Sync`, so it sits behind a `Mutex`; the latest
/// snapshot is shared with the game loop thread through an `Arc`.
pub struct AppState {
    /// `None` until the simulation is started.
    pub command_tx: Mutex<Option<mpsc::Sender<GameLoopCommand>>>,
    /// Updated by the game loop thread after each tick.
    pub latest_snapshot: Arc<Mutex<Option<GameStateSnapshot>>>,
    pub running: Mutex<bool>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            command_tx: Mutex::new(None),
            latest_snapshot: Arc::new(Mutex::new(None)),
            running: Mutex::new(false),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

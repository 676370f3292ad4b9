//! Game loop thread: runs the simulation engine at 60Hz and publishes snapshots.
//!
//! The engine is built and validated by the caller, then moved into this
//! thread. Commands arrive via an `mpsc` channel; snapshots are stored in
//! shared state for polling, and events reach the engine's sinks.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use citadel_core::commands::PlayerCommand;
use citadel_core::constants::TICK_RATE;
use citadel_core::state::GameStateSnapshot;
use citadel_sim::SimulationEngine;

use crate::state::GameLoopCommand;

/// Wall-clock duration of one tick.
pub const TICK_DURATION: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE as u64);

/// Spawns the game loop in a new thread.
///
/// Returns the command sender for the front end to use.
pub fn spawn_game_loop(
    engine: SimulationEngine,
    latest_snapshot: Arc<Mutex<Option<GameStateSnapshot>>>,
) -> std::io::Result<mpsc::Sender<GameLoopCommand>> {
    let (cmd_tx, cmd_rx) = mpsc::channel::<GameLoopCommand>();

    std::thread::Builder::new()
        .name("citadel-game-loop".into())
        .spawn(move || {
            run_game_loop(engine, cmd_rx, &latest_snapshot);
        })?;

    Ok(cmd_tx)
}

/// The game loop. Runs until Shutdown command or channel disconnect.
fn run_game_loop(
    mut engine: SimulationEngine,
    cmd_rx: mpsc::Receiver<GameLoopCommand>,
    latest_snapshot: &Mutex<Option<GameStateSnapshot>>,
) {
    info!(seed = engine.seed(), "game loop started");
    let mut next_tick_time = Instant::now();

    loop {
        // 1. Drain all pending commands
        loop {
            match cmd_rx.try_recv() {
                Ok(GameLoopCommand::PlayerCommand(cmd)) => {
                    engine.queue_command(cmd);
                }
                Ok(GameLoopCommand::Shutdown) | Err(mpsc::TryRecvError::Disconnected) => {
                    info!(tick = engine.time().tick, "game loop stopped");
                    return;
                }
                Err(mpsc::TryRecvError::Empty) => break,
            }
        }

        // 2. Advance one tick (the engine handles pause semantics)
        let snapshot = engine.tick();

        // 3. Store latest snapshot for polling
        if let Ok(mut lock) = latest_snapshot.lock() {
            *lock = Some(snapshot);
        }

        // 4. Sleep until next tick
        next_tick_time += TICK_DURATION;
        let now = Instant::now();
        if next_tick_time > now {
            std::thread::sleep(next_tick_time - now);
        } else if now - next_tick_time > TICK_DURATION * 2 {
            // Too far behind, reset to avoid a catch-up spiral
            debug!("game loop fell behind; resetting tick clock");
            next_tick_time = now;
        }
    }
}

/// Run `ticks` fixed ticks as fast as possible, applying `setup` first.
/// Returns the final snapshot; events from every tick go to the engine's sinks.
pub fn run_headless(
    engine: &mut SimulationEngine,
    setup: impl IntoIterator<Item = PlayerCommand>,
    ticks: u64,
) -> GameStateSnapshot {
    engine.queue_commands(setup);
    let mut snapshot = engine.snapshot();
    for _ in 0..ticks {
        snapshot = engine.tick();
        if snapshot.status.is_terminal() {
            info!(status = ?snapshot.status, tick = snapshot.time.tick, "session finished early");
            break;
        }
    }
    snapshot
}

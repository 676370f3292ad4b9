//! CITADEL host application.
//!
//! Wires the simulation engine to a fixed-rate game loop thread and exposes
//! it to a command-line front end through channels and shared state.

pub mod control;
pub mod game_loop;
pub mod sinks;
pub mod state;

pub use citadel_core as core;
pub use citadel_sim as sim;

//! Simulation engine for CITADEL.
//!
//! Owns the entity registry, runs systems once per frame, and produces
//! GameStateSnapshots for the host.

pub mod almanac;
pub mod economy;
pub mod engine;
pub mod notify;
pub mod pool;
pub mod registry;
pub mod status;
pub mod systems;
pub mod upgrades;

pub use citadel_core as core;
pub use engine::{SimConfig, SimulationEngine};

#[cfg(test)]
mod tests;

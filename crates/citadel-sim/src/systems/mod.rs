//! Per-frame systems.
//!
//! Systems are plain functions over the entity registry. They read a
//! frame-consistent view, collect their mutations, and apply them after
//! iterating. Frame order: movement, targeting, projectiles, wave spawning.

pub mod damage;
pub mod movement;
pub mod projectiles;
pub mod snapshot;
pub mod targeting;
pub mod wave_spawner;

//! Simulation constants and tuning parameters.

/// Fixed tick rate used by `SimulationEngine::tick` (Hz).
pub const TICK_RATE: u32 = 60;

/// Seconds per tick.
pub const DT: f64 = 1.0 / TICK_RATE as f64;

// --- Movement ---

/// Divides `speed * dt` to turn speed units into path progress per second.
pub const PATH_LENGTH_SCALE: f64 = 20.0;

/// Progress at which an enemy counts as having reached the end of its path.
pub const PATH_END_THRESHOLD: f64 = 0.99;

// --- Projectiles ---

/// Distance under which a travelling projectile strikes its target.
pub const HIT_THRESHOLD: f64 = 0.3;

/// Travelling projectiles are discarded past `range * MISS_RANGE_FACTOR`.
pub const MISS_RANGE_FACTOR: f64 = 1.5;

/// Lifetime of a beam after its damage is applied (seconds).
pub const BEAM_DURATION: f64 = 0.15;

// --- Pierce ---

/// Pierce line length as a multiple of the distance to the primary target.
pub const PIERCE_EXTENSION_FACTOR: f64 = 1.5;

/// Minimum perpendicular distance at which an enemy is grazed by a pierce line.
pub const PIERCE_MIN_THRESHOLD: f64 = 0.5;

/// Enemy size multiplier for the pierce graze threshold.
pub const PIERCE_SIZE_FACTOR: f64 = 0.8;

/// Slack allowed past either end of a pierce line when projecting enemies onto it.
pub const PIERCE_LINE_TOLERANCE: f64 = 0.1;

// --- Pools ---

/// Default capacity of the travelling projectile pool.
pub const DEFAULT_MAX_PROJECTILES: usize = 500;

/// Default capacity of the beam pool.
pub const DEFAULT_MAX_BEAMS: usize = 50;

//! Fundamental geometric and simulation types.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Ground-plane position in world units. The simulation ignores height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub z: f64,
}

/// Constant velocity on the ground plane (world units per second).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub z: f64,
}

/// A path waypoint as authored in level files. `y` is carried for
/// presentation layers and ignored by the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub z: f64,
}

/// Discrete placement cell on the tower grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub z: i32,
}

/// Tower identity. Allocated by the entity registry, never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TowerId(pub u32);

/// Enemy identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyId(pub u32);

/// Projectile identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectileId(pub u32);

/// Opaque slot handed out by an instance pool for a live projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolHandle(pub u32);

/// Simulation time tracking.
///
/// The clock only advances while the game is playing, so every timer
/// that reads it (slow expiry, beam lifetime, spawn delays, countdowns)
/// is pause-invariant without further bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimTime {
    /// Number of simulated frames.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub elapsed_secs: f64,
}

impl Position {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    /// Euclidean distance on the ground plane.
    pub fn distance_to(&self, other: &Position) -> f64 {
        DVec2::from(*self).distance(DVec2::from(*other))
    }

    /// Position advanced along `velocity` for `dt` seconds.
    pub fn advanced(&self, velocity: Velocity, dt: f64) -> Position {
        Position::new(self.x + velocity.x * dt, self.z + velocity.z * dt)
    }
}

impl From<Position> for DVec2 {
    fn from(p: Position) -> Self {
        DVec2::new(p.x, p.z)
    }
}

impl From<DVec2> for Position {
    fn from(v: DVec2) -> Self {
        Position::new(v.x, v.y)
    }
}

impl Velocity {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    /// Velocity of magnitude `speed` pointing from `from` to `to`.
    /// Zero when the two points coincide.
    pub fn aimed(from: Position, to: Position, speed: f64) -> Self {
        let dir = (DVec2::from(to) - DVec2::from(from)).normalize_or_zero();
        let v = dir * speed;
        Self::new(v.x, v.y)
    }

    pub fn speed(&self) -> f64 {
        DVec2::new(self.x, self.z).length()
    }
}

impl Waypoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Ground-plane projection.
    pub fn ground(&self) -> Position {
        Position::new(self.x, self.z)
    }
}

impl GridCell {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl SimTime {
    /// Advance by one frame of `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.tick += 1;
        self.elapsed_secs += dt;
    }
}

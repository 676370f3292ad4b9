//! ECS components for hecs entities.
//!
//! Components are plain data structs with no methods.
//! Game logic lives in systems, not components.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{EnemyId, GridCell, PoolHandle, Position, ProjectileId, TowerId};

/// Tower identity and placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tower {
    pub id: TowerId,
    pub kind: TowerKind,
    pub cell: GridCell,
}

/// Slow debuff carried by a weapon and applied on hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowEffect {
    /// Speed multiplier while slowed, in (0, 1].
    pub multiplier: f64,
    /// Seconds of simulation time the debuff lasts.
    pub duration: f64,
}

/// Static weapon parameters copied from the tower config at placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    pub damage: f64,
    pub range: f64,
    /// Minimum seconds between shots.
    pub fire_rate: f64,
    pub targeting: TargetingPolicy,
    pub projectile: ProjectileKind,
    pub projectile_speed: f64,
    pub slow: Option<SlowEffect>,
    pub aoe_radius: Option<f64>,
    pub max_pierce: Option<u32>,
    /// Purchase price, used for sell refunds.
    pub cost: u32,
}

/// Simulation time of the tower's last successful shot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FireCooldown {
    pub last_fire_time: f64,
}

/// Enemy identity and per-instance stats baked at spawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EnemyId,
    pub kind: EnemyKind,
    /// Base speed before slow.
    pub speed: f64,
    /// Collision radius, also widens the pierce graze threshold.
    pub size: f64,
    pub reward: u32,
    pub health_loss: u32,
    /// Health per second, zero when the enemy does not regenerate.
    pub regeneration: f64,
    /// 0 = full slow effect, 1 = immune.
    pub slow_resistance: f64,
    pub upgrades: Vec<UpgradeId>,
    /// Set once when progress crosses the end threshold.
    pub reached_end: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: f64,
    pub max: f64,
}

/// Path assignment and progress along it (0..1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PathFollower {
    pub path_index: usize,
    pub progress: f64,
}

/// Active slow state. `multiplier == 1.0` means not slowed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlowDebuff {
    pub multiplier: f64,
    /// Simulation time at which the slow lapses.
    pub until: f64,
}

impl Default for SlowDebuff {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            until: 0.0,
        }
    }
}

/// Projectile flight data, fixed at fire time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: ProjectileId,
    pub tower_id: TowerId,
    pub tower_kind: TowerKind,
    pub kind: ProjectileKind,
    pub start: Position,
    /// Where the target was when the shot was fired.
    pub target_position: Position,
    pub target: EnemyId,
    pub damage: f64,
    pub speed: f64,
    pub range: f64,
    pub slow: Option<SlowEffect>,
    pub aoe_radius: Option<f64>,
    /// Enemies struck by a piercing beam, nearest first.
    pub pierce_targets: Vec<EnemyId>,
    pub handle: PoolHandle,
}

/// Beam lifetime. Damage is applied exactly once, guarded by `processed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BeamTimer {
    pub remaining_secs: f64,
    pub processed: bool,
}

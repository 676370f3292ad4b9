//! Enumeration types used throughout the simulation.
//!
//! Serialized in camelCase to match the keys used by the JSON config files.

use serde::{Deserialize, Serialize};

/// Buildable tower archetypes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TowerKind {
    #[default]
    Basic,
    /// Applies a slow debuff on hit.
    Slow,
    /// Splash damage around the struck enemy.
    Aoe,
    /// Instant beam, optionally piercing a line of enemies.
    Laser,
}

/// Enemy archetypes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnemyKind {
    #[default]
    Basic,
    Fast,
    Tank,
}

/// How a tower picks its target among living enemies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetingPolicy {
    /// Closest enemy overall, rejected if it lies beyond range.
    #[default]
    Nearest,
    /// Farthest enemy that is still within range.
    Furthest,
}

/// Projectile delivery model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectileKind {
    #[default]
    Single,
    Aoe,
    Beam,
}

/// Difficulty modifiers the player can opt into for the next wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeId {
    Armored,
    Swift,
    SlowImmune,
    Regenerating,
}

/// Top-level game status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    #[default]
    Menu,
    Playing,
    Paused,
    /// In-game menu opened over a running or paused session.
    GameMenu,
    GameOver,
    Won,
}

/// Why a projectile left the world without dealing damage (or after it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpiryReason {
    /// Target died or was removed before impact.
    TargetLost,
    /// Flew farther than 1.5x the tower's range.
    OutOfRange,
    /// Beam presentation window elapsed.
    BeamFinished,
}

impl GameStatus {
    /// Whether the simulation systems run in this status.
    pub fn is_running(self) -> bool {
        self == GameStatus::Playing
    }

    /// Whether the session has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::GameOver | GameStatus::Won)
    }

    /// Whether towers can be placed or sold.
    pub fn allows_building(self) -> bool {
        matches!(self, GameStatus::Playing | GameStatus::Paused)
    }
}

impl TowerKind {
    pub const ALL: [TowerKind; 4] = [
        TowerKind::Basic,
        TowerKind::Slow,
        TowerKind::Aoe,
        TowerKind::Laser,
    ];
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 3] = [EnemyKind::Basic, EnemyKind::Fast, EnemyKind::Tank];
}

impl UpgradeId {
    pub const ALL: [UpgradeId; 4] = [
        UpgradeId::Armored,
        UpgradeId::Swift,
        UpgradeId::SlowImmune,
        UpgradeId::Regenerating,
    ];
}

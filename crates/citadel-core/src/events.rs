//! Events emitted by the simulation for audio and UI feedback.
//!
//! Each frame's events are returned in the snapshot in emission order and
//! also handed to any registered sinks.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{EnemyId, GridCell, Position, ProjectileId, TowerId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    // --- Towers ---
    TowerPlaced {
        tower_id: TowerId,
        kind: TowerKind,
        cell: GridCell,
        cost: u32,
    },
    TowerSold {
        tower_id: TowerId,
        kind: TowerKind,
        cell: GridCell,
        refund: u32,
    },
    TowerFired {
        tower_id: TowerId,
        kind: TowerKind,
        projectile_id: ProjectileId,
        target: EnemyId,
    },

    // --- Projectiles ---
    ProjectileHit {
        projectile_id: ProjectileId,
        kind: ProjectileKind,
        target: EnemyId,
        position: Position,
    },
    ProjectileExpired {
        projectile_id: ProjectileId,
        reason: ExpiryReason,
    },

    // --- Enemies ---
    EnemySpawned {
        enemy_id: EnemyId,
        kind: EnemyKind,
        position: Position,
    },
    /// First time this enemy kind was ever spawned in this engine.
    EnemyDiscovered { kind: EnemyKind },
    EnemyKilled {
        enemy_id: EnemyId,
        kind: EnemyKind,
        reward: u32,
        position: Position,
    },
    EnemyReachedEnd {
        enemy_id: EnemyId,
        kind: EnemyKind,
        health_loss: u32,
        position: Position,
    },

    // --- Waves ---
    WaveStarted {
        wave: u32,
        total_enemies: u32,
        upgrades: Vec<UpgradeId>,
    },
    WaveCleared { wave: u32 },
    CountdownStarted { next_wave: u32, seconds: f64 },

    // --- Lifecycle ---
    GameStarted,
    GamePaused,
    GameResumed,
    GameMenuOpened,
    GameMenuClosed,
    GameOver { wave: u32 },
    GameWon { wave: u32 },

    /// A queued command failed validation and was ignored.
    CommandRejected { reason: String },
}

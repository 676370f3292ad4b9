//! Game state snapshot: the complete visible state handed to the host each frame.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::events::GameEvent;
use crate::types::{EnemyId, GridCell, Position, ProjectileId, SimTime, TowerId};

/// Complete game state after one `advance` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub time: SimTime,
    pub status: GameStatus,
    pub money: u32,
    pub health: u32,
    pub wave: WaveView,
    pub upgrades: UpgradeView,
    pub towers: Vec<TowerView>,
    pub enemies: Vec<EnemyView>,
    pub projectiles: Vec<ProjectileView>,
    /// Enemy kinds seen at least once, for the almanac.
    pub discovered: Vec<EnemyKind>,
    /// Everything that happened during this call, in order.
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveView {
    /// 1-based; 0 before the first wave.
    pub current: u32,
    pub total: u32,
    pub in_progress: bool,
    /// Seconds until the next wave starts, while counting down.
    pub countdown_remaining: Option<f64>,
    /// Queued spawns plus living enemies.
    pub remaining_enemies: u32,
    /// Composition of the upcoming wave, while counting down.
    pub next_wave: Vec<WaveGroupView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveGroupView {
    pub kind: EnemyKind,
    pub count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpgradeView {
    pub available: Vec<UpgradeId>,
    pub selected: Vec<UpgradeId>,
    pub max_selectable: usize,
    /// Product of the selected upgrades' reward multipliers.
    pub reward_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerView {
    pub id: TowerId,
    pub kind: TowerKind,
    pub cell: GridCell,
    pub position: Position,
    pub range: f64,
    pub last_fire_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyView {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub position: Position,
    pub health: f64,
    pub max_health: f64,
    pub path_index: usize,
    pub progress: f64,
    pub size: f64,
    pub slowed: bool,
    pub upgrades: Vec<UpgradeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileView {
    pub id: ProjectileId,
    pub tower_id: TowerId,
    pub kind: ProjectileKind,
    pub position: Position,
    pub target_position: Position,
    /// Beam lines, nearest target first. Empty for travelling projectiles.
    pub pierce_targets: Vec<EnemyId>,
}

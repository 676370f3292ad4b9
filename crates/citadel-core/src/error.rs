//! Error taxonomy.
//!
//! `ActionError` covers player intents the simulation refuses; the engine
//! treats every one of them as a no-op. `ConfigError` is fatal and surfaces
//! before an engine exists.

use std::path::PathBuf;

use thiserror::Error;

use crate::enums::{EnemyKind, GameStatus, TowerKind, UpgradeId};
use crate::types::{GridCell, TowerId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u32, available: u32 },
    #[error("cell ({}, {}) is already occupied by a tower", .0.x, .0.z)]
    CellOccupied(GridCell),
    #[error("cell ({}, {}) lies on an enemy path", .0.x, .0.z)]
    CellOnPath(GridCell),
    #[error("cell ({}, {}) is blocked by a building", .0.x, .0.z)]
    CellBlocked(GridCell),
    #[error("cell ({}, {}) is outside the grid", .0.x, .0.z)]
    CellOutOfBounds(GridCell),
    #[error("no configuration for tower kind {0:?}")]
    UnknownTowerKind(TowerKind),
    #[error("no configuration for enemy kind {0:?}")]
    UnknownEnemyKind(EnemyKind),
    #[error("path {0} does not exist")]
    UnknownPath(usize),
    #[error("tower {0:?} does not exist")]
    UnknownTower(TowerId),
    #[error("cannot {action} while {status:?}")]
    InvalidTransition {
        action: &'static str,
        status: GameStatus,
    },
    #[error("the first wave has already been started")]
    WaveAlreadyStarted,
    #[error("no inter-wave countdown is running")]
    NoCountdown,
    #[error("upgrade {0:?} is not available this wave")]
    UpgradeUnavailable(UpgradeId),
    #[error("at most {max} upgrades can be selected this wave")]
    UpgradeLimitReached { max: usize },
    #[error("upgrade {0:?} is not selected")]
    UpgradeNotSelected(UpgradeId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

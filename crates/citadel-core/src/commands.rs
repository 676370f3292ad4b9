//! Player commands sent from the host to the simulation.
//!
//! Commands are validated and applied atomically; a rejected command is a no-op.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{GridCell, TowerId};

/// All possible player actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerCommand {
    // --- Session lifecycle ---
    /// Leave the main menu and start a fresh session.
    StartGame,
    /// Reset and start over from a running or finished session.
    RestartGame,
    /// Reset and go back to the main menu.
    ReturnToMenu,
    /// Playing <-> paused.
    TogglePause,
    Pause,
    Resume,
    OpenGameMenu,
    CloseGameMenu,

    // --- Building ---
    PlaceTower { cell: GridCell, kind: TowerKind },
    SellTower { tower_id: TowerId },

    // --- Waves ---
    /// Start wave 1. Only valid before any wave has started.
    StartFirstWave,
    /// Cut the inter-wave countdown short, keeping selected upgrades.
    StartNextWaveEarly,

    // --- Difficulty upgrades ---
    SelectUpgrade { upgrade: UpgradeId },
    DeselectUpgrade { upgrade: UpgradeId },
    ToggleUpgrade { upgrade: UpgradeId },
    ClearUpgrades,
    /// Drop the selection and start the next wave immediately.
    SkipUpgrades,
}

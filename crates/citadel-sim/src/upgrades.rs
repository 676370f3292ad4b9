//! Difficulty upgrades: wave-gated availability, player selection, and the
//! stat modifiers baked into enemies at spawn time.

use citadel_core::config::{EnemyConfig, GameConfig};
use citadel_core::enums::UpgradeId;
use citadel_core::error::ActionError;

/// What the player may pick once `wave` has been reached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpgradeAvailability {
    pub available: Vec<UpgradeId>,
    pub max_selectable: usize,
}

impl UpgradeAvailability {
    pub fn for_wave(config: &GameConfig, wave: u32) -> Self {
        let Some(gate) = config.upgrade_gate(wave) else {
            return Self::default();
        };
        let available = config
            .enemy_upgrades
            .iter()
            .filter(|(_, upgrade)| upgrade.tier <= gate.max_tier)
            .map(|(id, _)| *id)
            .collect();
        Self {
            available,
            max_selectable: gate.max_selectable,
        }
    }

    pub fn contains(&self, id: UpgradeId) -> bool {
        self.available.contains(&id)
    }
}

/// Upgrades chosen for the next wave, in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpgradeSelection {
    selected: Vec<UpgradeId>,
}

impl UpgradeSelection {
    pub fn selected(&self) -> &[UpgradeId] {
        &self.selected
    }

    pub fn is_selected(&self, id: UpgradeId) -> bool {
        self.selected.contains(&id)
    }

    /// Selecting an already selected upgrade is a no-op.
    pub fn select(&mut self, id: UpgradeId, availability: &UpgradeAvailability) -> Result<(), ActionError> {
        if !availability.contains(id) {
            return Err(ActionError::UpgradeUnavailable(id));
        }
        if self.is_selected(id) {
            return Ok(());
        }
        if self.selected.len() >= availability.max_selectable {
            return Err(ActionError::UpgradeLimitReached {
                max: availability.max_selectable,
            });
        }
        self.selected.push(id);
        Ok(())
    }

    pub fn deselect(&mut self, id: UpgradeId) -> Result<(), ActionError> {
        let index = self
            .selected
            .iter()
            .position(|s| *s == id)
            .ok_or(ActionError::UpgradeNotSelected(id))?;
        self.selected.remove(index);
        Ok(())
    }

    /// Returns whether the upgrade is selected afterwards.
    pub fn toggle(&mut self, id: UpgradeId, availability: &UpgradeAvailability) -> Result<bool, ActionError> {
        if self.is_selected(id) {
            self.deselect(id)?;
            Ok(false)
        } else {
            self.select(id, availability)?;
            Ok(true)
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Hand the selection to the starting wave and empty it.
    pub fn take(&mut self) -> Vec<UpgradeId> {
        std::mem::take(&mut self.selected)
    }

    /// Product of the selected reward multipliers.
    pub fn reward_multiplier(&self, config: &GameConfig) -> f64 {
        EnemyModifiers::from_upgrades(&self.selected, config).reward
    }
}

/// Combined effect of a set of upgrades on every enemy of a wave.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyModifiers {
    pub upgrades: Vec<UpgradeId>,
    pub health: f64,
    pub speed: f64,
    pub reward: f64,
    /// Health per second, summed across upgrades.
    pub regeneration: f64,
    /// Strongest slow resistance among the upgrades, within 0..1.
    pub slow_resistance: f64,
}

impl Default for EnemyModifiers {
    fn default() -> Self {
        Self {
            upgrades: Vec::new(),
            health: 1.0,
            speed: 1.0,
            reward: 1.0,
            regeneration: 0.0,
            slow_resistance: 0.0,
        }
    }
}

/// Enemy stats after modifiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyStats {
    pub health: f64,
    pub speed: f64,
    pub reward: u32,
    pub regeneration: f64,
    pub slow_resistance: f64,
}

impl EnemyModifiers {
    /// Unknown ids contribute nothing.
    pub fn from_upgrades(ids: &[UpgradeId], config: &GameConfig) -> Self {
        ids.iter()
            .filter_map(|id| config.upgrade(*id).map(|u| (*id, u)))
            .fold(Self::default(), |mut acc, (id, upgrade)| {
                acc.upgrades.push(id);
                acc.reward *= upgrade.reward_multiplier;
                acc.health *= upgrade.health_multiplier.unwrap_or(1.0);
                acc.speed *= upgrade.speed_multiplier.unwrap_or(1.0);
                acc.regeneration += upgrade.abilities.regeneration.unwrap_or(0.0);
                let resistance = upgrade.resistances.slow.unwrap_or(0.0).clamp(0.0, 1.0);
                acc.slow_resistance = acc.slow_resistance.max(resistance);
                acc
            })
    }

    pub fn apply(&self, base: &EnemyConfig) -> EnemyStats {
        EnemyStats {
            health: base.health * self.health,
            speed: base.speed * self.speed,
            reward: (base.reward as f64 * self.reward).round() as u32,
            regeneration: self.regeneration,
            slow_resistance: self.slow_resistance,
        }
    }
}

//! Money and player health.

use citadel_core::config::GameConfig;
use citadel_core::error::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Economy {
    money: u32,
    health: u32,
    starting_money: u32,
    starting_health: u32,
}

impl Economy {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            money: config.starting_money,
            health: config.starting_health,
            starting_money: config.starting_money,
            starting_health: config.starting_health,
        }
    }

    pub fn reset(&mut self) {
        self.money = self.starting_money;
        self.health = self.starting_health;
    }

    pub fn money(&self) -> u32 {
        self.money
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.money >= cost
    }

    /// Deduct `cost`, refusing rather than going negative.
    pub fn spend(&mut self, cost: u32) -> Result<(), ActionError> {
        if !self.can_afford(cost) {
            return Err(ActionError::InsufficientFunds {
                needed: cost,
                available: self.money,
            });
        }
        self.money -= cost;
        Ok(())
    }

    pub fn earn(&mut self, amount: u32) {
        self.money = self.money.saturating_add(amount);
    }

    /// Subtract health, flooring at zero. Returns true once health is gone.
    pub fn lose_health(&mut self, amount: u32) -> bool {
        self.health = self.health.saturating_sub(amount);
        self.health == 0
    }

    pub fn is_defeated(&self) -> bool {
        self.health == 0
    }
}

/// Refund for selling a tower: `floor(cost * multiplier)`.
pub fn sell_refund(cost: u32, multiplier: f64) -> u32 {
    (cost as f64 * multiplier).floor().max(0.0) as u32
}

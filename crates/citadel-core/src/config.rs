//! Static configuration: tower, enemy and upgrade definitions plus level layout.
//!
//! Both documents are JSON with camelCase keys. Loading always validates, and
//! the engine only ever sees validated configuration.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::{SlowEffect, Weapon};
use crate::constants::{DEFAULT_MAX_BEAMS, DEFAULT_MAX_PROJECTILES};
use crate::enums::*;
use crate::error::ConfigError;
use crate::types::{GridCell, Waypoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TowerConfig {
    pub name: String,
    pub cost: u32,
    pub damage: f64,
    pub range: f64,
    /// Seconds between shots.
    pub fire_rate: f64,
    pub targeting: TargetingPolicy,
    pub projectile_type: ProjectileKind,
    #[serde(default)]
    pub projectile_speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aoe_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pierce: Option<u32>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyConfig {
    pub name: String,
    pub health: f64,
    pub speed: f64,
    pub reward: u32,
    pub size: f64,
    pub health_loss: u32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resistances {
    /// 0..1, where 1 grants immunity to slows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Abilities {
    /// Health regenerated per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regeneration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 1..=3. Higher tiers unlock in later waves.
    pub tier: u8,
    pub reward_multiplier: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_multiplier: Option<f64>,
    #[serde(default)]
    pub resistances: Resistances,
    #[serde(default)]
    pub abilities: Abilities,
}

/// Upgrade availability from `from_wave` onwards (until the next gate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeGate {
    pub from_wave: u32,
    pub max_tier: u8,
    pub max_selectable: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub starting_money: u32,
    pub starting_health: u32,
    pub tile_size: f64,
    pub path_width: f64,
    pub tower_sell_price_multiplier: f64,
    /// Seconds between clearing a wave and the next one starting.
    pub wave_delay: f64,
    pub tower_types: BTreeMap<TowerKind, TowerConfig>,
    pub enemy_types: BTreeMap<EnemyKind, EnemyConfig>,
    #[serde(default)]
    pub enemy_upgrades: BTreeMap<UpgradeId, UpgradeConfig>,
    #[serde(default = "default_upgrade_gates")]
    pub upgrade_gates: Vec<UpgradeGate>,
    #[serde(default = "default_max_projectiles")]
    pub max_projectiles: usize,
    #[serde(default = "default_max_beams")]
    pub max_beams: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveGroup {
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    pub count: u32,
    /// Delay added after each spawn of this group.
    pub spawn_interval: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveConfig {
    pub total_enemies: u32,
    pub enemies: Vec<WaveGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingConfig {
    pub grid_x: i32,
    pub grid_z: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedTowerConfig {
    #[serde(rename = "type")]
    pub kind: TowerKind,
    pub grid_x: i32,
    pub grid_z: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedEnemyConfig {
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    #[serde(default)]
    pub path_index: usize,
    #[serde(default)]
    pub path_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelConfig {
    /// Cells per side of the square placement grid.
    pub grid_size: u32,
    /// Parallel enemy paths; each enemy follows one.
    pub path_waypoints: Vec<Vec<Waypoint>>,
    pub wave_configs: Vec<WaveConfig>,
    #[serde(default)]
    pub buildings: Vec<BuildingConfig>,
    #[serde(default)]
    pub towers: Vec<PlacedTowerConfig>,
    #[serde(default)]
    pub enemies: Vec<PlacedEnemyConfig>,
}

fn default_upgrade_gates() -> Vec<UpgradeGate> {
    vec![
        UpgradeGate {
            from_wave: 4,
            max_tier: 1,
            max_selectable: 1,
        },
        UpgradeGate {
            from_wave: 7,
            max_tier: 2,
            max_selectable: 2,
        },
        UpgradeGate {
            from_wave: 11,
            max_tier: 3,
            max_selectable: 3,
        },
    ]
}

fn default_max_projectiles() -> usize {
    DEFAULT_MAX_PROJECTILES
}

fn default_max_beams() -> usize {
    DEFAULT_MAX_BEAMS
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl TowerConfig {
    /// Weapon component for a freshly placed tower of this type.
    pub fn weapon(&self) -> Weapon {
        let slow = match (self.slow_amount, self.slow_duration) {
            (Some(multiplier), Some(duration)) => Some(SlowEffect {
                multiplier,
                duration,
            }),
            _ => None,
        };
        Weapon {
            damage: self.damage,
            range: self.range,
            fire_rate: self.fire_rate,
            targeting: self.targeting,
            projectile: self.projectile_type,
            projectile_speed: self.projectile_speed,
            slow,
            aoe_radius: self.aoe_radius,
            max_pierce: self.max_pierce,
            cost: self.cost,
        }
    }

    fn validate(&self, kind: TowerKind) -> Result<(), ConfigError> {
        if !(self.fire_rate > 0.0) {
            return Err(ConfigError::invalid(format!("tower {kind:?}: fireRate must be positive")));
        }
        if !(self.range > 0.0) {
            return Err(ConfigError::invalid(format!("tower {kind:?}: range must be positive")));
        }
        if self.damage < 0.0 {
            return Err(ConfigError::invalid(format!("tower {kind:?}: damage cannot be negative")));
        }
        if self.projectile_type != ProjectileKind::Beam && !(self.projectile_speed > 0.0) {
            return Err(ConfigError::invalid(format!(
                "tower {kind:?}: travelling projectiles need a positive projectileSpeed"
            )));
        }
        if self.projectile_type == ProjectileKind::Aoe && !self.aoe_radius.is_some_and(|r| r > 0.0) {
            return Err(ConfigError::invalid(format!("tower {kind:?}: aoe projectiles need an aoeRadius")));
        }
        if self.max_pierce == Some(0) {
            return Err(ConfigError::invalid(format!("tower {kind:?}: maxPierce must be at least 1")));
        }
        match (self.slow_amount, self.slow_duration) {
            (Some(amount), Some(duration)) => {
                if !(amount > 0.0 && amount <= 1.0) || duration <= 0.0 {
                    return Err(ConfigError::invalid(format!(
                        "tower {kind:?}: slowAmount must be in (0, 1] and slowDuration positive"
                    )));
                }
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::invalid(format!(
                    "tower {kind:?}: slowAmount and slowDuration go together"
                )))
            }
        }
        Ok(())
    }
}

impl UpgradeConfig {
    fn validate(&self, id: UpgradeId) -> Result<(), ConfigError> {
        if !(1..=3).contains(&self.tier) {
            return Err(ConfigError::invalid(format!("upgrade {id:?}: tier must be 1..=3")));
        }
        let multipliers = [
            Some(self.reward_multiplier),
            self.health_multiplier,
            self.speed_multiplier,
        ];
        if multipliers.into_iter().flatten().any(|m| !(m > 0.0)) {
            return Err(ConfigError::invalid(format!("upgrade {id:?}: multipliers must be positive")));
        }
        if self.resistances.slow.is_some_and(|r| r < 0.0) {
            return Err(ConfigError::invalid(format!("upgrade {id:?}: slow resistance cannot be negative")));
        }
        if self.abilities.regeneration.is_some_and(|r| r < 0.0) {
            return Err(ConfigError::invalid(format!("upgrade {id:?}: regeneration cannot be negative")));
        }
        Ok(())
    }
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_health == 0 {
            return Err(ConfigError::invalid("startingHealth must be positive"));
        }
        if !(self.tile_size > 0.0) {
            return Err(ConfigError::invalid("tileSize must be positive"));
        }
        if self.path_width < 0.0 {
            return Err(ConfigError::invalid("pathWidth cannot be negative"));
        }
        if !(0.0..=1.0).contains(&self.tower_sell_price_multiplier) {
            return Err(ConfigError::invalid("towerSellPriceMultiplier must be within [0, 1]"));
        }
        if self.wave_delay < 0.0 {
            return Err(ConfigError::invalid("waveDelay cannot be negative"));
        }
        if self.max_projectiles == 0 || self.max_beams == 0 {
            return Err(ConfigError::invalid("projectile pools need a non-zero capacity"));
        }
        if self.tower_types.is_empty() {
            return Err(ConfigError::invalid("at least one tower type is required"));
        }
        for (kind, tower) in &self.tower_types {
            tower.validate(*kind)?;
        }
        for (kind, enemy) in &self.enemy_types {
            if !(enemy.health > 0.0) || enemy.speed < 0.0 || enemy.size < 0.0 {
                return Err(ConfigError::invalid(format!(
                    "enemy {kind:?}: health must be positive, speed and size non-negative"
                )));
            }
        }
        for (id, upgrade) in &self.enemy_upgrades {
            upgrade.validate(*id)?;
        }
        Ok(())
    }

    /// Gate governing upgrade selection once `wave` has been reached.
    /// `None` means upgrades are locked.
    pub fn upgrade_gate(&self, wave: u32) -> Option<&UpgradeGate> {
        self.upgrade_gates
            .iter()
            .filter(|gate| gate.from_wave <= wave)
            .max_by_key(|gate| gate.from_wave)
    }

    pub fn tower(&self, kind: TowerKind) -> Option<&TowerConfig> {
        self.tower_types.get(&kind)
    }

    pub fn enemy(&self, kind: EnemyKind) -> Option<&EnemyConfig> {
        self.enemy_types.get(&kind)
    }

    pub fn upgrade(&self, id: UpgradeId) -> Option<&UpgradeConfig> {
        self.enemy_upgrades.get(&id)
    }
}

impl WaveConfig {
    /// Sum of all group counts.
    pub fn group_total(&self) -> u32 {
        self.enemies.iter().map(|g| g.count).sum()
    }
}

impl BuildingConfig {
    pub fn cell(&self) -> GridCell {
        GridCell::new(self.grid_x, self.grid_z)
    }
}

impl PlacedTowerConfig {
    pub fn cell(&self) -> GridCell {
        GridCell::new(self.grid_x, self.grid_z)
    }
}

impl LevelConfig {
    /// Parse and check everything that does not depend on a game config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let level: LevelConfig = serde_json::from_str(json)?;
        level.validate_layout()?;
        Ok(level)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }

    pub fn wave_count(&self) -> u32 {
        self.wave_configs.len() as u32
    }

    /// Wave by 1-based number.
    pub fn wave(&self, number: u32) -> Option<&WaveConfig> {
        let index = number.checked_sub(1)?;
        self.wave_configs.get(index as usize)
    }

    pub fn validate_layout(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 {
            return Err(ConfigError::invalid("gridSize must be positive"));
        }
        if self.path_waypoints.is_empty() {
            return Err(ConfigError::invalid("level needs at least one path"));
        }
        if let Some(i) = self.path_waypoints.iter().position(|p| p.len() < 2) {
            return Err(ConfigError::invalid(format!("path {i} needs at least two waypoints")));
        }
        if self.wave_configs.is_empty() {
            return Err(ConfigError::invalid("level needs at least one wave"));
        }
        for (i, wave) in self.wave_configs.iter().enumerate() {
            let number = i + 1;
            if wave.total_enemies == 0 {
                return Err(ConfigError::invalid(format!("wave {number} has no enemies")));
            }
            if wave.total_enemies != wave.group_total() {
                return Err(ConfigError::invalid(format!(
                    "wave {number}: totalEnemies is {} but groups add up to {}",
                    wave.total_enemies,
                    wave.group_total()
                )));
            }
            if wave.enemies.iter().any(|g| g.spawn_interval < 0.0) {
                return Err(ConfigError::invalid(format!("wave {number}: negative spawnInterval")));
            }
        }
        let in_grid = |cell: GridCell| {
            (0..self.grid_size as i32).contains(&cell.x) && (0..self.grid_size as i32).contains(&cell.z)
        };
        let mut seen = HashSet::new();
        for tower in &self.towers {
            if !in_grid(tower.cell()) {
                return Err(ConfigError::invalid(format!("pre-placed tower at {:?} is off the grid", tower.cell())));
            }
            if !seen.insert(tower.cell()) {
                return Err(ConfigError::invalid(format!("two pre-placed towers share {:?}", tower.cell())));
            }
        }
        for enemy in &self.enemies {
            if enemy.path_index >= self.path_waypoints.len() {
                return Err(ConfigError::invalid(format!(
                    "pre-placed enemy refers to missing path {}",
                    enemy.path_index
                )));
            }
            if !(0.0..1.0).contains(&enemy.path_progress) {
                return Err(ConfigError::invalid("pre-placed enemy progress must be within [0, 1)"));
            }
        }
        Ok(())
    }

    /// Full validation, including references into the game config.
    pub fn validate(&self, game: &GameConfig) -> Result<(), ConfigError> {
        self.validate_layout()?;
        for (i, wave) in self.wave_configs.iter().enumerate() {
            if let Some(group) = wave.enemies.iter().find(|g| game.enemy(g.kind).is_none()) {
                return Err(ConfigError::invalid(format!(
                    "wave {} spawns {:?}, which has no enemy config",
                    i + 1,
                    group.kind
                )));
            }
        }
        if let Some(tower) = self.towers.iter().find(|t| game.tower(t.kind).is_none()) {
            return Err(ConfigError::invalid(format!("pre-placed tower {:?} has no config", tower.kind)));
        }
        if let Some(enemy) = self.enemies.iter().find(|e| game.enemy(e.kind).is_none()) {
            return Err(ConfigError::invalid(format!("pre-placed enemy {:?} has no config", enemy.kind)));
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        let tower_types = BTreeMap::from([
            (
                TowerKind::Basic,
                TowerConfig {
                    name: "Basic Tower".into(),
                    cost: 50,
                    damage: 10.0,
                    range: 5.0,
                    fire_rate: 1.0,
                    targeting: TargetingPolicy::Nearest,
                    projectile_type: ProjectileKind::Single,
                    projectile_speed: 10.0,
                    slow_amount: None,
                    slow_duration: None,
                    aoe_radius: None,
                    max_pierce: None,
                    description: "Reliable single-target damage.".into(),
                },
            ),
            (
                TowerKind::Slow,
                TowerConfig {
                    name: "Frost Tower".into(),
                    cost: 75,
                    damage: 4.0,
                    range: 4.0,
                    fire_rate: 1.5,
                    targeting: TargetingPolicy::Nearest,
                    projectile_type: ProjectileKind::Single,
                    projectile_speed: 8.0,
                    slow_amount: Some(0.5),
                    slow_duration: Some(2.0),
                    aoe_radius: None,
                    max_pierce: None,
                    description: "Halves enemy speed for a short time.".into(),
                },
            ),
            (
                TowerKind::Aoe,
                TowerConfig {
                    name: "Mortar".into(),
                    cost: 120,
                    damage: 15.0,
                    range: 4.5,
                    fire_rate: 2.0,
                    targeting: TargetingPolicy::Nearest,
                    projectile_type: ProjectileKind::Aoe,
                    projectile_speed: 6.0,
                    slow_amount: None,
                    slow_duration: None,
                    aoe_radius: Some(2.0),
                    max_pierce: None,
                    description: "Splashes every enemy near the impact.".into(),
                },
            ),
            (
                TowerKind::Laser,
                TowerConfig {
                    name: "Laser".into(),
                    cost: 150,
                    damage: 25.0,
                    range: 7.0,
                    fire_rate: 2.5,
                    targeting: TargetingPolicy::Nearest,
                    projectile_type: ProjectileKind::Beam,
                    projectile_speed: 0.0,
                    slow_amount: None,
                    slow_duration: None,
                    aoe_radius: None,
                    max_pierce: Some(3),
                    description: "Instant beam that pierces a line of enemies.".into(),
                },
            ),
        ]);

        let enemy_types = BTreeMap::from([
            (
                EnemyKind::Basic,
                EnemyConfig {
                    name: "Grunt".into(),
                    health: 50.0,
                    speed: 1.0,
                    reward: 10,
                    size: 0.3,
                    health_loss: 1,
                    description: String::new(),
                },
            ),
            (
                EnemyKind::Fast,
                EnemyConfig {
                    name: "Runner".into(),
                    health: 30.0,
                    speed: 2.0,
                    reward: 12,
                    size: 0.25,
                    health_loss: 1,
                    description: String::new(),
                },
            ),
            (
                EnemyKind::Tank,
                EnemyConfig {
                    name: "Juggernaut".into(),
                    health: 200.0,
                    speed: 0.6,
                    reward: 25,
                    size: 0.5,
                    health_loss: 3,
                    description: String::new(),
                },
            ),
        ]);

        let enemy_upgrades = BTreeMap::from([
            (
                UpgradeId::Armored,
                UpgradeConfig {
                    name: "Armored".into(),
                    description: "+50% health".into(),
                    tier: 1,
                    reward_multiplier: 1.3,
                    health_multiplier: Some(1.5),
                    speed_multiplier: None,
                    resistances: Resistances::default(),
                    abilities: Abilities::default(),
                },
            ),
            (
                UpgradeId::Swift,
                UpgradeConfig {
                    name: "Swift".into(),
                    description: "+30% speed".into(),
                    tier: 1,
                    reward_multiplier: 1.25,
                    health_multiplier: None,
                    speed_multiplier: Some(1.3),
                    resistances: Resistances::default(),
                    abilities: Abilities::default(),
                },
            ),
            (
                UpgradeId::SlowImmune,
                UpgradeConfig {
                    name: "Slow Immune".into(),
                    description: "Ignores slows".into(),
                    tier: 2,
                    reward_multiplier: 1.4,
                    health_multiplier: None,
                    speed_multiplier: None,
                    resistances: Resistances { slow: Some(1.0) },
                    abilities: Abilities::default(),
                },
            ),
            (
                UpgradeId::Regenerating,
                UpgradeConfig {
                    name: "Regenerating".into(),
                    description: "Heals 5 health per second".into(),
                    tier: 3,
                    reward_multiplier: 1.6,
                    health_multiplier: None,
                    speed_multiplier: None,
                    resistances: Resistances::default(),
                    abilities: Abilities {
                        regeneration: Some(5.0),
                    },
                },
            ),
        ]);

        Self {
            starting_money: 200,
            starting_health: 20,
            tile_size: 1.0,
            path_width: 1.0,
            tower_sell_price_multiplier: 0.5,
            wave_delay: 10.0,
            tower_types,
            enemy_types,
            enemy_upgrades,
            upgrade_gates: default_upgrade_gates(),
            max_projectiles: DEFAULT_MAX_PROJECTILES,
            max_beams: DEFAULT_MAX_BEAMS,
        }
    }
}

fn wave(groups: &[(EnemyKind, u32, f64)]) -> WaveConfig {
    let enemies: Vec<WaveGroup> = groups
        .iter()
        .map(|&(kind, count, spawn_interval)| WaveGroup {
            kind,
            count,
            spawn_interval,
        })
        .collect();
    WaveConfig {
        total_enemies: enemies.iter().map(|g| g.count).sum(),
        enemies,
    }
}

impl Default for LevelConfig {
    /// Two crossing lanes on a 20x20 grid, ten waves.
    fn default() -> Self {
        use EnemyKind::*;

        let path_waypoints = vec![
            vec![
                Waypoint::new(-10.0, 0.0, -5.0),
                Waypoint::new(-3.0, 0.0, -5.0),
                Waypoint::new(-3.0, 0.0, 5.0),
                Waypoint::new(10.0, 0.0, 5.0),
            ],
            vec![
                Waypoint::new(-10.0, 0.0, 7.0),
                Waypoint::new(4.0, 0.0, 7.0),
                Waypoint::new(4.0, 0.0, -7.0),
                Waypoint::new(10.0, 0.0, -7.0),
            ],
        ];

        let wave_configs = vec![
            wave(&[(Basic, 6, 1.5)]),
            wave(&[(Basic, 8, 1.2)]),
            wave(&[(Basic, 6, 1.2), (Fast, 4, 1.0)]),
            wave(&[(Basic, 8, 1.0), (Fast, 6, 0.8)]),
            wave(&[(Basic, 8, 1.0), (Fast, 6, 0.8), (Tank, 2, 3.0)]),
            wave(&[(Fast, 10, 0.6), (Tank, 4, 2.5)]),
            wave(&[(Basic, 12, 0.8), (Tank, 5, 2.5)]),
            wave(&[(Basic, 10, 0.8), (Fast, 10, 0.5), (Tank, 5, 2.0)]),
            wave(&[(Fast, 16, 0.4), (Tank, 8, 1.8)]),
            wave(&[(Basic, 15, 0.6), (Fast, 15, 0.4), (Tank, 10, 1.5)]),
        ];

        let buildings = [(1, 1), (18, 18), (10, 1)]
            .into_iter()
            .map(|(grid_x, grid_z)| BuildingConfig { grid_x, grid_z })
            .collect();

        Self {
            grid_size: 20,
            path_waypoints,
            wave_configs,
            buildings,
            towers: Vec::new(),
            enemies: Vec::new(),
        }
    }
}

//! Simulation engine: the core of the game.
//!
//! `SimulationEngine` owns the entity registry and every piece of session
//! state, processes player commands, runs all systems, and produces
//! `GameStateSnapshot`s. Completely headless, enabling deterministic testing.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use citadel_core::commands::PlayerCommand;
use citadel_core::config::{GameConfig, LevelConfig};
use citadel_core::constants::DT;
use citadel_core::enums::{EnemyKind, GameStatus, TowerKind};
use citadel_core::error::{ActionError, ConfigError};
use citadel_core::events::GameEvent;
use citadel_core::geometry::{cell_center, cell_in_bounds, is_tile_on_path, position_along_paths};
use citadel_core::state::GameStateSnapshot;
use citadel_core::types::{EnemyId, GridCell, SimTime, TowerId};

use crate::almanac::Almanac;
use crate::economy::{sell_refund, Economy};
use crate::notify::{EventDispatcher, EventSink};
use crate::pool::{InstancePool, ProjectilePools};
use crate::registry::{EnemySpawn, EntityRegistry, KillRecord};
use crate::status::StatusMachine;
use crate::systems;
use crate::systems::snapshot::SnapshotSources;
use crate::systems::wave_spawner::{WaveOutcome, WaveScheduler};
use crate::upgrades::{EnemyModifiers, UpgradeAvailability, UpgradeSelection};

/// Configuration for starting a new simulation.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same simulation.
    pub seed: u64,
    pub game: GameConfig,
    pub level: LevelConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            game: GameConfig::default(),
            level: LevelConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate()?;
        self.level.validate(&self.game)
    }
}

/// The simulation engine. Owns the registry and all sim state.
pub struct SimulationEngine {
    game: GameConfig,
    level: LevelConfig,
    registry: EntityRegistry,
    economy: Economy,
    status: StatusMachine,
    waves: WaveScheduler,
    upgrades: UpgradeSelection,
    /// Modifiers locked in when the current wave started.
    wave_modifiers: EnemyModifiers,
    almanac: Almanac,
    time: SimTime,
    seed: u64,
    rng: ChaCha8Rng,
    command_queue: VecDeque<PlayerCommand>,
    events: Vec<GameEvent>,
    pool: Box<dyn InstancePool>,
    dispatcher: EventDispatcher,
}

impl SimulationEngine {
    /// Create a new engine sitting in the main menu. Fails on invalid config.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let SimConfig { seed, game, level } = config;

        let pool = ProjectilePools::new(game.max_projectiles, game.max_beams);
        let mut engine = Self {
            economy: Economy::new(&game),
            waves: WaveScheduler::new(level.wave_count()),
            registry: EntityRegistry::new(),
            status: StatusMachine::default(),
            upgrades: UpgradeSelection::default(),
            wave_modifiers: EnemyModifiers::default(),
            almanac: Almanac::default(),
            time: SimTime::default(),
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            command_queue: VecDeque::new(),
            events: Vec::new(),
            pool: Box::new(pool),
            dispatcher: EventDispatcher::default(),
            game,
            level,
        };
        engine.reset_session();
        info!(seed, waves = engine.waves.total_waves(), "simulation engine ready");
        Ok(engine)
    }

    /// Replace the projectile instance pool. Live projectiles keep their
    /// old handles, so do this before the session starts.
    pub fn set_instance_pool(&mut self, pool: Box<dyn InstancePool>) {
        self.pool = pool;
    }

    pub fn add_event_sink(&mut self, sink: Box<dyn EventSink>) {
        self.dispatcher.add_sink(sink);
    }

    /// Queue a player command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: PlayerCommand) {
        self.command_queue.push_back(command);
    }

    /// Queue multiple commands.
    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = PlayerCommand>) {
        self.command_queue.extend(commands);
    }

    /// Advance the simulation by one fixed tick.
    pub fn tick(&mut self) -> GameStateSnapshot {
        self.advance(DT)
    }

    /// Process queued commands, then advance the simulation by `dt` seconds
    /// if the game is playing, and return the resulting snapshot.
    pub fn advance(&mut self, dt: f64) -> GameStateSnapshot {
        self.process_commands();

        if self.status.is_running() && dt > 0.0 {
            self.run_systems(dt);
        }

        let events = std::mem::take(&mut self.events);
        self.dispatcher.dispatch(&events);
        self.build_snapshot(events)
    }

    /// Current state without advancing. Carries no events.
    pub fn snapshot(&self) -> GameStateSnapshot {
        self.build_snapshot(Vec::new())
    }

    /// Apply one command immediately. Events it produces go out with the
    /// next snapshot.
    pub fn apply_command(&mut self, command: PlayerCommand) -> Result<(), ActionError> {
        match command {
            PlayerCommand::StartGame => {
                self.status.start()?;
                self.reset_session();
                self.place_fixtures();
                info!("game started");
                self.events.push(GameEvent::GameStarted);
            }
            PlayerCommand::RestartGame => {
                self.status.restart()?;
                self.reset_session();
                self.place_fixtures();
                info!("game restarted");
                self.events.push(GameEvent::GameStarted);
            }
            PlayerCommand::ReturnToMenu => {
                self.status.return_to_menu()?;
                self.reset_session();
                info!("returned to main menu");
            }
            PlayerCommand::TogglePause => match self.status.toggle_pause()? {
                GameStatus::Paused => {
                    info!(tick = self.time.tick, "game paused");
                    self.events.push(GameEvent::GamePaused);
                }
                _ => {
                    info!(tick = self.time.tick, "game resumed");
                    self.events.push(GameEvent::GameResumed);
                }
            },
            PlayerCommand::Pause => {
                self.status.pause()?;
                info!(tick = self.time.tick, "game paused");
                self.events.push(GameEvent::GamePaused);
            }
            PlayerCommand::Resume => {
                self.status.resume()?;
                info!(tick = self.time.tick, "game resumed");
                self.events.push(GameEvent::GameResumed);
            }
            PlayerCommand::OpenGameMenu => {
                self.status.open_game_menu()?;
                info!("game menu opened");
                self.events.push(GameEvent::GameMenuOpened);
            }
            PlayerCommand::CloseGameMenu => {
                let status = self.status.close_game_menu()?;
                info!(?status, "game menu closed");
                self.events.push(GameEvent::GameMenuClosed);
            }
            PlayerCommand::PlaceTower { cell, kind } => {
                self.place_tower(cell, kind)?;
            }
            PlayerCommand::SellTower { tower_id } => {
                self.sell_tower(tower_id)?;
            }
            PlayerCommand::StartFirstWave => {
                self.require_session("start a wave")?;
                let now = self.time.elapsed_secs;
                let wave = self.waves.start_first_wave(&self.level, &mut self.rng, now)?;
                self.on_wave_started(wave);
            }
            PlayerCommand::StartNextWaveEarly => {
                self.require_session("start the next wave")?;
                self.skip_countdown()?;
            }
            PlayerCommand::SelectUpgrade { upgrade } => {
                let availability = self.upgrade_window()?;
                self.upgrades.select(upgrade, &availability)?;
            }
            PlayerCommand::DeselectUpgrade { upgrade } => {
                self.upgrade_window()?;
                self.upgrades.deselect(upgrade)?;
            }
            PlayerCommand::ToggleUpgrade { upgrade } => {
                let availability = self.upgrade_window()?;
                self.upgrades.toggle(upgrade, &availability)?;
            }
            PlayerCommand::ClearUpgrades => {
                self.upgrade_window()?;
                self.upgrades.clear();
            }
            PlayerCommand::SkipUpgrades => {
                self.upgrade_window()?;
                self.upgrades.clear();
                self.skip_countdown()?;
            }
        }
        Ok(())
    }

    /// Place an enemy of `kind` on a path at `progress`, with base stats.
    /// Used for pre-placed enemies and by hosts scripting encounters.
    pub fn spawn_enemy(
        &mut self,
        kind: EnemyKind,
        path_index: usize,
        progress: f64,
    ) -> Result<EnemyId, ActionError> {
        self.spawn_with(kind, path_index, progress, false)
    }

    pub fn status(&self) -> GameStatus {
        self.status.status()
    }

    /// Get the current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Get a read-only reference to the entity registry.
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn waves(&self) -> &WaveScheduler {
        &self.waves
    }

    pub fn upgrades(&self) -> &UpgradeSelection {
        &self.upgrades
    }

    pub fn almanac(&self) -> &Almanac {
        &self.almanac
    }

    pub fn game_config(&self) -> &GameConfig {
        &self.game
    }

    pub fn level_config(&self) -> &LevelConfig {
        &self.level
    }

    #[cfg(test)]
    pub(crate) fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    /// Process all queued commands. Rejections are logged and reported as
    /// events; the queue always drains.
    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            if let Err(err) = self.apply_command(command.clone()) {
                warn!(?command, error = %err, "command rejected");
                self.events.push(GameEvent::CommandRejected {
                    reason: err.to_string(),
                });
            }
        }
    }

    /// One frame of simulation: movement, firing, projectiles, waves.
    fn run_systems(&mut self, dt: f64) {
        self.time.advance(dt);
        let now = self.time.elapsed_secs;

        // 1. Movement and leaks
        let arrivals = systems::movement::run(&mut self.registry, &self.level.path_waypoints, now, dt);
        self.resolve_arrivals(&arrivals);
        if !self.status.is_running() {
            return;
        }

        // 2. Targeting and firing
        systems::targeting::run(&mut self.registry, self.pool.as_mut(), now, &mut self.events);

        // 3. Projectile flight and damage
        let kills = systems::projectiles::run(&mut self.registry, self.pool.as_mut(), now, dt, &mut self.events);
        self.pay_kills(kills);

        // 4. Wave progression
        self.run_waves(now);
    }

    fn resolve_arrivals(&mut self, arrivals: &[EnemyId]) {
        for &id in arrivals {
            let Some(removed) = self.registry.remove_enemy(id) else {
                continue;
            };
            let health_loss = removed.enemy.health_loss;
            let defeated = self.economy.lose_health(health_loss);
            debug!(enemy = id.0, health_loss, health = self.economy.health(), "enemy reached the end");
            self.events.push(GameEvent::EnemyReachedEnd {
                enemy_id: id,
                kind: removed.enemy.kind,
                health_loss,
                position: removed.position,
            });

            if defeated && self.status.lose().is_ok() {
                let wave = self.waves.current_wave();
                info!(wave, "base destroyed");
                self.events.push(GameEvent::GameOver { wave });
            }
        }
    }

    fn pay_kills(&mut self, kills: Vec<KillRecord>) {
        for kill in kills {
            self.economy.earn(kill.reward);
            debug!(enemy = kill.enemy_id.0, reward = kill.reward, "enemy killed");
            self.events.push(GameEvent::EnemyKilled {
                enemy_id: kill.enemy_id,
                kind: kill.kind,
                reward: kill.reward,
                position: kill.position,
            });
        }
    }

    fn run_waves(&mut self, now: f64) {
        if let Some(wave) = self.waves.advance_countdown(&self.level, &mut self.rng, now) {
            self.on_wave_started(wave);
        }

        for kind in self.waves.take_due(now) {
            let path_index = self.rng.gen_range(0..self.level.path_waypoints.len());
            if let Err(err) = self.spawn_with(kind, path_index, 0.0, true) {
                warn!(?kind, error = %err, "wave spawn failed");
            }
        }

        match self.waves.check_cleared(self.registry.enemy_count(), now, self.game.wave_delay) {
            Some(WaveOutcome::Cleared {
                wave,
                next_wave,
                countdown,
            }) => {
                self.events.push(GameEvent::WaveCleared { wave });
                self.events.push(GameEvent::CountdownStarted {
                    next_wave,
                    seconds: countdown,
                });
            }
            Some(WaveOutcome::Victory { wave }) => {
                self.events.push(GameEvent::WaveCleared { wave });
                if self.status.win().is_ok() {
                    info!(wave, "all waves cleared");
                    self.events.push(GameEvent::GameWon { wave });
                }
            }
            None => {}
        }
    }

    /// Lock in the selected upgrades for the wave that just started.
    fn on_wave_started(&mut self, wave: u32) {
        let upgrades = self.upgrades.take();
        self.wave_modifiers = EnemyModifiers::from_upgrades(&upgrades, &self.game);
        let total_enemies = self.level.wave(wave).map_or(0, |w| w.total_enemies);
        info!(wave, total_enemies, ?upgrades, "wave started");
        self.events.push(GameEvent::WaveStarted {
            wave,
            total_enemies,
            upgrades,
        });
    }

    fn skip_countdown(&mut self) -> Result<(), ActionError> {
        let now = self.time.elapsed_secs;
        let wave = self.waves.skip_countdown(&self.level, &mut self.rng, now)?;
        self.on_wave_started(wave);
        Ok(())
    }

    fn spawn_with(
        &mut self,
        kind: EnemyKind,
        path_index: usize,
        progress: f64,
        with_wave_modifiers: bool,
    ) -> Result<EnemyId, ActionError> {
        let base = self.game.enemy(kind).ok_or(ActionError::UnknownEnemyKind(kind))?;
        let position = position_along_paths(&self.level.path_waypoints, path_index, progress)
            .ok_or(ActionError::UnknownPath(path_index))?;
        let modifiers = if with_wave_modifiers {
            self.wave_modifiers.clone()
        } else {
            EnemyModifiers::default()
        };
        let stats = modifiers.apply(base);

        let id = self.registry.spawn_enemy(EnemySpawn {
            kind,
            health: stats.health,
            speed: stats.speed,
            size: base.size,
            reward: stats.reward,
            health_loss: base.health_loss,
            regeneration: stats.regeneration,
            slow_resistance: stats.slow_resistance,
            upgrades: modifiers.upgrades,
            path_index,
            progress: progress.clamp(0.0, 1.0),
            position,
        });
        self.events.push(GameEvent::EnemySpawned {
            enemy_id: id,
            kind,
            position,
        });
        if self.almanac.discover(kind) {
            info!(?kind, "new enemy discovered");
            self.events.push(GameEvent::EnemyDiscovered { kind });
        }
        Ok(id)
    }

    fn place_tower(&mut self, cell: GridCell, kind: TowerKind) -> Result<TowerId, ActionError> {
        self.require_session("place a tower")?;
        if !cell_in_bounds(cell, self.level.grid_size) {
            return Err(ActionError::CellOutOfBounds(cell));
        }
        let config = self.game.tower(kind).ok_or(ActionError::UnknownTowerKind(kind))?;
        if self.registry.tower_at(cell).is_some() {
            return Err(ActionError::CellOccupied(cell));
        }
        if self.level.buildings.iter().any(|b| b.cell() == cell) {
            return Err(ActionError::CellBlocked(cell));
        }
        let center = cell_center(cell, self.level.grid_size, self.game.tile_size);
        if is_tile_on_path(center, self.game.tile_size, &self.level.path_waypoints, self.game.path_width) {
            return Err(ActionError::CellOnPath(cell));
        }
        if !self.economy.can_afford(config.cost) {
            return Err(ActionError::InsufficientFunds {
                needed: config.cost,
                available: self.economy.money(),
            });
        }

        let cost = config.cost;
        let id = self.registry.insert_tower(kind, cell, center, config.weapon())?;
        self.economy.spend(cost)?;
        debug!(tower = id.0, ?kind, x = cell.x, z = cell.z, cost, "tower placed");
        self.events.push(GameEvent::TowerPlaced {
            tower_id: id,
            kind,
            cell,
            cost,
        });
        Ok(id)
    }

    fn sell_tower(&mut self, id: TowerId) -> Result<u32, ActionError> {
        self.require_session("sell a tower")?;
        let (tower, weapon) = self.registry.remove_tower(id).ok_or(ActionError::UnknownTower(id))?;
        let refund = sell_refund(weapon.cost, self.game.tower_sell_price_multiplier);
        self.economy.earn(refund);
        debug!(tower = id.0, refund, "tower sold");
        self.events.push(GameEvent::TowerSold {
            tower_id: id,
            kind: tower.kind,
            cell: tower.cell,
            refund,
        });
        Ok(refund)
    }

    fn require_session(&self, action: &'static str) -> Result<(), ActionError> {
        let status = self.status.status();
        if status.allows_building() {
            Ok(())
        } else {
            Err(ActionError::InvalidTransition { action, status })
        }
    }

    /// Upgrades can only be chosen during the countdown before a wave.
    fn upgrade_window(&self) -> Result<UpgradeAvailability, ActionError> {
        self.require_session("choose upgrades")?;
        if !self.waves.in_countdown() {
            return Err(ActionError::NoCountdown);
        }
        Ok(UpgradeAvailability::for_wave(&self.game, self.waves.current_wave()))
    }

    /// Fresh session: empty world, starting funds, wave 0.
    fn reset_session(&mut self) {
        self.registry.clear();
        self.pool.clear();
        self.economy.reset();
        self.waves.reset();
        self.upgrades.clear();
        self.wave_modifiers = EnemyModifiers::default();
        self.time = SimTime::default();
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }

    /// Towers and enemies the level places before play. Only called when a
    /// session actually starts, so menu snapshots stay empty.
    fn place_fixtures(&mut self) {
        for placed in &self.level.towers {
            let cell = placed.cell();
            let Some(config) = self.game.tower(placed.kind) else {
                continue;
            };
            let center = cell_center(cell, self.level.grid_size, self.game.tile_size);
            if let Err(err) = self.registry.insert_tower(placed.kind, cell, center, config.weapon()) {
                warn!(error = %err, "skipping pre-placed tower");
            }
        }

        let enemies = self.level.enemies.clone();
        for placed in enemies {
            if let Err(err) = self.spawn_with(placed.kind, placed.path_index, placed.path_progress, false) {
                warn!(error = %err, "skipping pre-placed enemy");
            }
        }
    }

    fn build_snapshot(&self, events: Vec<GameEvent>) -> GameStateSnapshot {
        systems::snapshot::build_snapshot(
            SnapshotSources {
                registry: &self.registry,
                time: self.time,
                status: self.status.status(),
                economy: &self.economy,
                waves: &self.waves,
                upgrades: &self.upgrades,
                almanac: &self.almanac,
                game: &self.game,
                level: &self.level,
            },
            events,
        )
    }
}

//! Snapshot system: reads the registry and builds a complete GameStateSnapshot.
//!
//! This system is read-only; it never modifies the world.

use citadel_core::components::*;
use citadel_core::config::{GameConfig, LevelConfig};
use citadel_core::enums::GameStatus;
use citadel_core::events::GameEvent;
use citadel_core::state::*;
use citadel_core::types::{Position, SimTime};

use crate::almanac::Almanac;
use crate::economy::Economy;
use crate::registry::EntityRegistry;
use crate::systems::wave_spawner::WaveScheduler;
use crate::upgrades::{UpgradeAvailability, UpgradeSelection};

/// Everything the snapshot reads, borrowed from the engine.
pub struct SnapshotSources<'a> {
    pub registry: &'a EntityRegistry,
    pub time: SimTime,
    pub status: GameStatus,
    pub economy: &'a Economy,
    pub waves: &'a WaveScheduler,
    pub upgrades: &'a UpgradeSelection,
    pub almanac: &'a Almanac,
    pub game: &'a GameConfig,
    pub level: &'a LevelConfig,
}

pub fn build_snapshot(src: SnapshotSources<'_>, events: Vec<GameEvent>) -> GameStateSnapshot {
    let enemies = build_enemies(src.registry, src.time.elapsed_secs);
    GameStateSnapshot {
        time: src.time,
        status: src.status,
        money: src.economy.money(),
        health: src.economy.health(),
        wave: build_wave(&src, enemies.len()),
        upgrades: build_upgrades(&src),
        towers: build_towers(src.registry),
        enemies,
        projectiles: build_projectiles(src.registry),
        discovered: src.almanac.discovered(),
        events,
    }
}

fn build_wave(src: &SnapshotSources<'_>, living: usize) -> WaveView {
    let now = src.time.elapsed_secs;
    let countdown_remaining = src.waves.time_until_next_wave(now);
    let next_wave = match countdown_remaining {
        Some(_) => src
            .level
            .wave(src.waves.current_wave() + 1)
            .map(|wave| {
                wave.enemies
                    .iter()
                    .map(|g| WaveGroupView {
                        kind: g.kind,
                        count: g.count,
                    })
                    .collect()
            })
            .unwrap_or_default(),
        None => Vec::new(),
    };
    WaveView {
        current: src.waves.current_wave(),
        total: src.waves.total_waves(),
        in_progress: src.waves.in_progress(),
        countdown_remaining,
        remaining_enemies: src.waves.remaining_in_wave(living),
        next_wave,
    }
}

fn build_upgrades(src: &SnapshotSources<'_>) -> UpgradeView {
    let availability = UpgradeAvailability::for_wave(src.game, src.waves.current_wave());
    UpgradeView {
        available: availability.available,
        selected: src.upgrades.selected().to_vec(),
        max_selectable: availability.max_selectable,
        reward_multiplier: src.upgrades.reward_multiplier(src.game),
    }
}

fn build_towers(registry: &EntityRegistry) -> Vec<TowerView> {
    let mut towers: Vec<TowerView> = registry
        .world()
        .query::<(&Tower, &Weapon, &Position, &FireCooldown)>()
        .iter()
        .map(|(_, (tower, weapon, position, cooldown))| TowerView {
            id: tower.id,
            kind: tower.kind,
            cell: tower.cell,
            position: *position,
            range: weapon.range,
            last_fire_time: cooldown.last_fire_time,
        })
        .collect();
    towers.sort_by_key(|t| t.id);
    towers
}

fn build_enemies(registry: &EntityRegistry, now: f64) -> Vec<EnemyView> {
    let mut enemies: Vec<EnemyView> = registry
        .world()
        .query::<(&Enemy, &Health, &PathFollower, &SlowDebuff, &Position)>()
        .iter()
        .map(|(_, (enemy, health, follower, slow, position))| EnemyView {
            id: enemy.id,
            kind: enemy.kind,
            position: *position,
            health: health.current,
            max_health: health.max,
            path_index: follower.path_index,
            progress: follower.progress,
            size: enemy.size,
            slowed: slow.multiplier < 1.0 && slow.until > now,
            upgrades: enemy.upgrades.clone(),
        })
        .collect();
    enemies.sort_by_key(|e| e.id);
    enemies
}

fn build_projectiles(registry: &EntityRegistry) -> Vec<ProjectileView> {
    let mut projectiles: Vec<ProjectileView> = registry
        .world()
        .query::<(&Projectile, &Position)>()
        .iter()
        .map(|(_, (projectile, position))| ProjectileView {
            id: projectile.id,
            tower_id: projectile.tower_id,
            kind: projectile.kind,
            position: *position,
            target_position: projectile.target_position,
            pierce_targets: projectile.pierce_targets.clone(),
        })
        .collect();
    projectiles.sort_by_key(|p| p.id);
    projectiles
}

//! Entity registry: sole owner of towers, enemies and projectiles.
//!
//! Entities live in a hecs `World`; stable integer ids map onto hecs entities
//! through ordered indices so iteration order (and therefore targeting
//! tie-breaks) is deterministic. Occupancy and death handling are enforced
//! here rather than by callers.

use std::collections::{BTreeMap, HashMap};

use hecs::{Entity, World};

use citadel_core::components::*;
use citadel_core::constants::BEAM_DURATION;
use citadel_core::enums::{EnemyKind, ProjectileKind, TowerKind, UpgradeId};
use citadel_core::error::ActionError;
use citadel_core::types::{EnemyId, GridCell, Position, ProjectileId, TowerId, Velocity};

/// Everything needed to put an enemy into the world.
#[derive(Debug, Clone)]
pub struct EnemySpawn {
    pub kind: EnemyKind,
    pub health: f64,
    pub speed: f64,
    pub size: f64,
    pub reward: u32,
    pub health_loss: u32,
    pub regeneration: f64,
    pub slow_resistance: f64,
    pub upgrades: Vec<UpgradeId>,
    pub path_index: usize,
    pub progress: f64,
    pub position: Position,
}

/// Result of routing damage through the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum DamageOutcome {
    /// Enemy absent: already dead, leaked, or never existed.
    Missing,
    Damaged { remaining: f64 },
    /// Health crossed zero; the enemy is gone from the registry.
    Killed(KillRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KillRecord {
    pub enemy_id: EnemyId,
    pub kind: EnemyKind,
    pub reward: u32,
    pub position: Position,
}

/// Enemy data returned when it leaves the registry without dying.
#[derive(Debug, Clone)]
pub struct RemovedEnemy {
    pub enemy: Enemy,
    pub position: Position,
}

/// Frame-consistent view of a targetable enemy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCandidate {
    pub id: EnemyId,
    pub position: Position,
    pub size: f64,
}

#[derive(Default)]
pub struct EntityRegistry {
    world: World,
    towers: BTreeMap<TowerId, Entity>,
    enemies: BTreeMap<EnemyId, Entity>,
    projectiles: BTreeMap<ProjectileId, Entity>,
    occupancy: HashMap<GridCell, TowerId>,
    next_tower_id: u32,
    next_enemy_id: u32,
    next_projectile_id: u32,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entity and restart id allocation.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access for systems that update components in place.
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn tower_count(&self) -> usize {
        self.towers.len()
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies.len()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    // --- Towers ---

    /// Place a tower. Fails if the cell already holds one.
    pub fn insert_tower(
        &mut self,
        kind: TowerKind,
        cell: GridCell,
        position: Position,
        weapon: Weapon,
    ) -> Result<TowerId, ActionError> {
        if self.occupancy.contains_key(&cell) {
            return Err(ActionError::CellOccupied(cell));
        }
        self.next_tower_id += 1;
        let id = TowerId(self.next_tower_id);
        let entity = self.world.spawn((
            Tower { id, kind, cell },
            position,
            weapon,
            FireCooldown::default(),
        ));
        self.towers.insert(id, entity);
        self.occupancy.insert(cell, id);
        Ok(id)
    }

    /// Remove a tower and free its cell.
    pub fn remove_tower(&mut self, id: TowerId) -> Option<(Tower, Weapon)> {
        let entity = self.towers.remove(&id)?;
        let (tower, weapon) = self.world.remove::<(Tower, Weapon)>(entity).ok()?;
        let _ = self.world.despawn(entity);
        self.occupancy.remove(&tower.cell);
        Some((tower, weapon))
    }

    pub fn tower_at(&self, cell: GridCell) -> Option<TowerId> {
        self.occupancy.get(&cell).copied()
    }

    pub fn tower_ids(&self) -> Vec<TowerId> {
        self.towers.keys().copied().collect()
    }

    pub fn last_fire_time(&self, id: TowerId) -> Option<f64> {
        let entity = *self.towers.get(&id)?;
        self.world
            .get::<&FireCooldown>(entity)
            .ok()
            .map(|c| c.last_fire_time)
    }

    /// Record a successful shot. The fire time never moves backwards.
    pub fn record_fire(&mut self, id: TowerId, now: f64) {
        let Some(&entity) = self.towers.get(&id) else {
            return;
        };
        if let Ok(mut cooldown) = self.world.get::<&mut FireCooldown>(entity) {
            if now > cooldown.last_fire_time {
                cooldown.last_fire_time = now;
            }
        }
    }

    // --- Enemies ---

    pub fn spawn_enemy(&mut self, spawn: EnemySpawn) -> EnemyId {
        self.next_enemy_id += 1;
        let id = EnemyId(self.next_enemy_id);
        let entity = self.world.spawn((
            Enemy {
                id,
                kind: spawn.kind,
                speed: spawn.speed,
                size: spawn.size,
                reward: spawn.reward,
                health_loss: spawn.health_loss,
                regeneration: spawn.regeneration,
                slow_resistance: spawn.slow_resistance,
                upgrades: spawn.upgrades,
                reached_end: false,
            },
            Health {
                current: spawn.health,
                max: spawn.health,
            },
            PathFollower {
                path_index: spawn.path_index,
                progress: spawn.progress,
            },
            SlowDebuff::default(),
            spawn.position,
        ));
        self.enemies.insert(id, entity);
        id
    }

    pub fn contains_enemy(&self, id: EnemyId) -> bool {
        self.enemies.contains_key(&id)
    }

    pub fn enemy_ids(&self) -> Vec<EnemyId> {
        self.enemies.keys().copied().collect()
    }

    pub fn enemy_position(&self, id: EnemyId) -> Option<Position> {
        let entity = *self.enemies.get(&id)?;
        self.world.get::<&Position>(entity).ok().map(|p| *p)
    }

    pub fn enemy_health(&self, id: EnemyId) -> Option<Health> {
        let entity = *self.enemies.get(&id)?;
        self.world.get::<&Health>(entity).ok().map(|h| *h)
    }

    pub fn enemy_slow(&self, id: EnemyId) -> Option<SlowDebuff> {
        let entity = *self.enemies.get(&id)?;
        self.world.get::<&SlowDebuff>(entity).ok().map(|s| *s)
    }

    pub fn enemy_progress(&self, id: EnemyId) -> Option<PathFollower> {
        let entity = *self.enemies.get(&id)?;
        self.world.get::<&PathFollower>(entity).ok().map(|f| *f)
    }

    /// Living enemies in id order.
    pub fn living_enemies(&self) -> Vec<TargetCandidate> {
        self.enemies
            .iter()
            .filter_map(|(&id, &entity)| {
                let mut query = self
                    .world
                    .query_one::<(&Enemy, &Health, &Position)>(entity)
                    .ok()?;
                let (enemy, health, position) = query.get()?;
                (health.current > 0.0 && !enemy.reached_end).then_some(TargetCandidate {
                    id,
                    position: *position,
                    size: enemy.size,
                })
            })
            .collect()
    }

    /// The only path by which enemy health goes down. An enemy whose health
    /// reaches zero is despawned before this returns, so `Killed` is reported
    /// exactly once per enemy and later calls see `Missing`.
    pub fn damage_enemy(&mut self, id: EnemyId, amount: f64) -> DamageOutcome {
        let Some(&entity) = self.enemies.get(&id) else {
            return DamageOutcome::Missing;
        };
        let remaining = match self.world.get::<&mut Health>(entity) {
            Ok(mut health) => {
                health.current = (health.current - amount.max(0.0)).max(0.0);
                health.current
            }
            Err(_) => return DamageOutcome::Missing,
        };
        if remaining > 0.0 {
            return DamageOutcome::Damaged { remaining };
        }

        match self.remove_enemy(id) {
            Some(removed) => DamageOutcome::Killed(KillRecord {
                enemy_id: id,
                kind: removed.enemy.kind,
                reward: removed.enemy.reward,
                position: removed.position,
            }),
            None => DamageOutcome::Missing,
        }
    }

    /// Heal up to max health. Dead or missing enemies are ignored.
    pub fn heal_enemy(&mut self, id: EnemyId, amount: f64) {
        let Some(&entity) = self.enemies.get(&id) else {
            return;
        };
        if let Ok(mut health) = self.world.get::<&mut Health>(entity) {
            if health.current > 0.0 {
                health.current = (health.current + amount).min(health.max);
            }
        }
    }

    /// Apply a slow, scaled by the enemy's resistance. Returns whether a
    /// slow took effect; fully resistant enemies are unaffected.
    pub fn slow_enemy(&mut self, id: EnemyId, effect: SlowEffect, now: f64) -> bool {
        let Some(&entity) = self.enemies.get(&id) else {
            return false;
        };
        let Ok((enemy, slow)) = self
            .world
            .query_one_mut::<(&Enemy, &mut SlowDebuff)>(entity)
        else {
            return false;
        };
        let resistance = enemy.slow_resistance.clamp(0.0, 1.0);
        if resistance >= 1.0 {
            return false;
        }
        slow.multiplier = 1.0 - (1.0 - effect.multiplier) * (1.0 - resistance);
        slow.until = now + effect.duration * (1.0 - resistance);
        true
    }

    /// Take an enemy out of the world without paying for it.
    pub fn remove_enemy(&mut self, id: EnemyId) -> Option<RemovedEnemy> {
        let entity = self.enemies.remove(&id)?;
        let (enemy, position) = self.world.remove::<(Enemy, Position)>(entity).ok()?;
        let _ = self.world.despawn(entity);
        Some(RemovedEnemy { enemy, position })
    }

    // --- Projectiles ---

    pub fn next_projectile_id(&mut self) -> ProjectileId {
        self.next_projectile_id += 1;
        ProjectileId(self.next_projectile_id)
    }

    /// Add a projectile whose id came from `next_projectile_id`. Beams carry a
    /// timer instead of a velocity.
    pub fn insert_projectile(&mut self, projectile: Projectile, velocity: Velocity) -> ProjectileId {
        let id = projectile.id;
        let position = projectile.start;
        let entity = if projectile.kind == ProjectileKind::Beam {
            self.world.spawn((
                projectile,
                position,
                BeamTimer {
                    remaining_secs: BEAM_DURATION,
                    processed: false,
                },
            ))
        } else {
            self.world.spawn((projectile, position, velocity))
        };
        self.projectiles.insert(id, entity);
        id
    }

    pub fn remove_projectile(&mut self, id: ProjectileId) -> Option<Projectile> {
        let entity = self.projectiles.remove(&id)?;
        let projectile = self.world.remove_one::<Projectile>(entity).ok();
        let _ = self.world.despawn(entity);
        projectile
    }

    pub fn projectile_ids(&self) -> Vec<ProjectileId> {
        self.projectiles.keys().copied().collect()
    }

    pub(crate) fn projectile_entity(&self, id: ProjectileId) -> Option<Entity> {
        self.projectiles.get(&id).copied()
    }
}

//! Damage application for the three projectile kinds.
//!
//! Everything routes through `EntityRegistry::damage_enemy`, which despawns an
//! enemy the moment its health reaches zero. A second hit on the same enemy in
//! the same pass therefore sees it as missing, so each death is reported once.

use citadel_core::components::SlowEffect;
use citadel_core::types::{EnemyId, Position};

use crate::registry::{DamageOutcome, EntityRegistry, KillRecord};

/// Single-target hit, optionally slowing a survivor.
pub fn apply_single(
    registry: &mut EntityRegistry,
    target: EnemyId,
    damage: f64,
    slow: Option<SlowEffect>,
    now: f64,
    kills: &mut Vec<KillRecord>,
) {
    strike(registry, target, damage, kills);
    if let Some(effect) = slow {
        registry.slow_enemy(target, effect, now);
    }
}

/// Damage every living enemy within `radius` of `center`, the struck enemy included.
pub fn apply_area(
    registry: &mut EntityRegistry,
    center: Position,
    radius: f64,
    damage: f64,
    kills: &mut Vec<KillRecord>,
) -> Vec<EnemyId> {
    let victims: Vec<EnemyId> = registry
        .living_enemies()
        .into_iter()
        .filter(|c| c.position.distance_to(&center) <= radius)
        .map(|c| c.id)
        .collect();
    for id in &victims {
        strike(registry, *id, damage, kills);
    }
    victims
}

/// Damage each enemy on a beam's pierce list once.
pub fn apply_pierce(registry: &mut EntityRegistry, targets: &[EnemyId], damage: f64, kills: &mut Vec<KillRecord>) {
    let mut seen = Vec::with_capacity(targets.len());
    for id in targets {
        if seen.contains(id) {
            continue;
        }
        seen.push(*id);
        strike(registry, *id, damage, kills);
    }
}

fn strike(registry: &mut EntityRegistry, id: EnemyId, damage: f64, kills: &mut Vec<KillRecord>) {
    if let DamageOutcome::Killed(record) = registry.damage_enemy(id, damage) {
        kills.push(record);
    }
}

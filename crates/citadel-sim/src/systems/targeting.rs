//! Targeting and firing. Picks a target per ready tower and launches a projectile.

use glam::DVec2;
use tracing::trace;

use citadel_core::components::{FireCooldown, Projectile, Tower, Weapon};
use citadel_core::constants::*;
use citadel_core::enums::{ProjectileKind, TargetingPolicy};
use citadel_core::events::GameEvent;
use citadel_core::types::{EnemyId, Position, Velocity};

use crate::pool::InstancePool;
use crate::registry::{EntityRegistry, TargetCandidate};

/// Where a tower is about to shoot.
#[derive(Debug, Clone, PartialEq)]
pub struct Aim {
    pub target: EnemyId,
    pub target_position: Position,
    /// Every enemy a beam will strike, nearest first.
    pub pierce: Vec<EnemyId>,
}

/// Fire every tower whose cooldown has elapsed and that has a target.
///
/// Targets come from a snapshot taken before any tower fires, so enemies
/// spawned later this frame are never eligible. A shot refused by the
/// instance pool is dropped and the tower keeps its old fire time.
pub fn run(registry: &mut EntityRegistry, pool: &mut dyn InstancePool, now: f64, events: &mut Vec<GameEvent>) {
    let candidates = registry.living_enemies();
    if candidates.is_empty() {
        return;
    }

    let mut towers: Vec<(Tower, Weapon, Position, f64)> = registry
        .world()
        .query::<(&Tower, &Weapon, &Position, &FireCooldown)>()
        .iter()
        .map(|(_, (tower, weapon, position, cooldown))| {
            (tower.clone(), weapon.clone(), *position, cooldown.last_fire_time)
        })
        .collect();
    towers.sort_by_key(|(tower, ..)| tower.id);

    for (tower, weapon, origin, last_fire_time) in towers {
        if now - last_fire_time < weapon.fire_rate {
            continue;
        }
        let Some(aim) = aim(&weapon, origin, &candidates) else {
            continue;
        };
        let Some(handle) = pool.acquire(weapon.projectile) else {
            continue;
        };

        let projectile_id = registry.next_projectile_id();
        let velocity = match weapon.projectile {
            ProjectileKind::Beam => Velocity::default(),
            _ => Velocity::aimed(origin, aim.target_position, weapon.projectile_speed),
        };
        registry.insert_projectile(
            Projectile {
                id: projectile_id,
                tower_id: tower.id,
                tower_kind: tower.kind,
                kind: weapon.projectile,
                start: origin,
                target_position: aim.target_position,
                target: aim.target,
                damage: weapon.damage,
                speed: weapon.projectile_speed,
                range: weapon.range,
                slow: weapon.slow,
                aoe_radius: weapon.aoe_radius,
                pierce_targets: aim.pierce,
                handle,
            },
            velocity,
        );
        registry.record_fire(tower.id, now);
        trace!(tower = tower.id.0, target = aim.target.0, "tower fired");
        events.push(GameEvent::TowerFired {
            tower_id: tower.id,
            kind: tower.kind,
            projectile_id,
            target: aim.target,
        });
    }
}

/// Choose a target (and pierce line, for beams) for one tower.
pub fn aim(weapon: &Weapon, origin: Position, candidates: &[TargetCandidate]) -> Option<Aim> {
    let primary = select_target(weapon.targeting, origin, weapon.range, candidates)?;

    match (weapon.projectile, weapon.max_pierce) {
        (ProjectileKind::Beam, Some(max_pierce)) => {
            let distance = origin.distance_to(&primary.position);
            if distance <= 0.0 {
                return Some(Aim {
                    target: primary.id,
                    target_position: primary.position,
                    pierce: vec![primary.id],
                });
            }
            let dir = (DVec2::from(primary.position) - DVec2::from(origin)) / distance;
            let end = DVec2::from(origin) + dir * distance * PIERCE_EXTENSION_FACTOR;
            let line = find_enemies_in_line(candidates, origin, end.into(), max_pierce as usize);
            let last = line.last()?;
            Some(Aim {
                target: last.id,
                target_position: last.position,
                pierce: line.iter().map(|c| c.id).collect(),
            })
        }
        (ProjectileKind::Beam, None) => Some(Aim {
            target: primary.id,
            target_position: primary.position,
            pierce: vec![primary.id],
        }),
        _ => Some(Aim {
            target: primary.id,
            target_position: primary.position,
            pierce: Vec::new(),
        }),
    }
}

/// Pick a target by policy. Ties go to the first candidate in iteration order.
pub fn select_target(
    policy: TargetingPolicy,
    origin: Position,
    range: f64,
    candidates: &[TargetCandidate],
) -> Option<&TargetCandidate> {
    match policy {
        TargetingPolicy::Nearest => {
            let mut best: Option<(&TargetCandidate, f64)> = None;
            for candidate in candidates {
                let d = origin.distance_to(&candidate.position);
                if best.map_or(true, |(_, best_d)| d < best_d) {
                    best = Some((candidate, d));
                }
            }
            best.filter(|(_, d)| *d <= range).map(|(c, _)| c)
        }
        TargetingPolicy::Furthest => {
            let mut best: Option<(&TargetCandidate, f64)> = None;
            for candidate in candidates {
                let d = origin.distance_to(&candidate.position);
                if d > range {
                    continue;
                }
                if best.map_or(true, |(_, best_d)| d > best_d) {
                    best = Some((candidate, d));
                }
            }
            best.map(|(c, _)| c)
        }
    }
}

/// Enemies grazed by the line `start`-`end`, nearest to `start` first, at
/// most `max`. An enemy counts when its projection falls on the line (with a
/// little slack past both ends) and it sits within
/// `max(PIERCE_MIN_THRESHOLD, size * PIERCE_SIZE_FACTOR)` of it.
pub fn find_enemies_in_line<'a>(
    candidates: &'a [TargetCandidate],
    start: Position,
    end: Position,
    max: usize,
) -> Vec<&'a TargetCandidate> {
    let (s, e) = (DVec2::from(start), DVec2::from(end));
    let length = s.distance(e);
    if length == 0.0 {
        return Vec::new();
    }
    let dir = (e - s) / length;

    let mut hits: Vec<(&TargetCandidate, f64)> = candidates
        .iter()
        .filter_map(|candidate| {
            let offset = DVec2::from(candidate.position) - s;
            let along = offset.dot(dir);
            if along < -PIERCE_LINE_TOLERANCE || along > length + PIERCE_LINE_TOLERANCE {
                return None;
            }
            let off_line = offset.distance(dir * along);
            let threshold = PIERCE_MIN_THRESHOLD.max(candidate.size * PIERCE_SIZE_FACTOR);
            (off_line <= threshold).then(|| (candidate, offset.length()))
        })
        .collect();

    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits.into_iter().take(max).map(|(c, _)| c).collect()
}

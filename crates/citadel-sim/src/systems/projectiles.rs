//! Projectile flight and beam resolution.
//!
//! Travelling projectiles fly at the velocity fixed at launch and are never
//! re-aimed. Beams resolve on their first pass and then linger for
//! `BEAM_DURATION` seconds of simulation time.

use tracing::trace;

use citadel_core::components::{BeamTimer, Projectile};
use citadel_core::constants::{HIT_THRESHOLD, MISS_RANGE_FACTOR};
use citadel_core::enums::{ExpiryReason, ProjectileKind};
use citadel_core::events::GameEvent;
use citadel_core::geometry::point_to_segment_distance;
use citadel_core::types::{Position, ProjectileId, Velocity};

use crate::pool::InstancePool;
use crate::registry::{EntityRegistry, KillRecord};
use crate::systems::damage;

enum Step {
    Fly(Position),
    Hit(Position),
    Expire(ExpiryReason),
    Beam(BeamTimer),
}

/// Advance every projectile by `dt`. Returns the enemies killed this pass.
pub fn run(
    registry: &mut EntityRegistry,
    pool: &mut dyn InstancePool,
    now: f64,
    dt: f64,
    events: &mut Vec<GameEvent>,
) -> Vec<KillRecord> {
    let mut kills = Vec::new();

    for id in registry.projectile_ids() {
        let Some((projectile, step)) = plan(registry, id, dt) else {
            continue;
        };

        match step {
            Step::Fly(position) => {
                if let Some(entity) = registry.projectile_entity(id) {
                    if let Ok(mut p) = registry.world_mut().get::<&mut Position>(entity) {
                        *p = position;
                    }
                }
            }
            Step::Hit(at) => {
                match projectile.kind {
                    ProjectileKind::Aoe => {
                        let radius = projectile.aoe_radius.unwrap_or(0.0);
                        damage::apply_area(registry, at, radius, projectile.damage, &mut kills);
                    }
                    _ => damage::apply_single(
                        registry,
                        projectile.target,
                        projectile.damage,
                        projectile.slow,
                        now,
                        &mut kills,
                    ),
                }
                events.push(GameEvent::ProjectileHit {
                    projectile_id: id,
                    kind: projectile.kind,
                    target: projectile.target,
                    position: at,
                });
                retire(registry, pool, id);
            }
            Step::Expire(reason) => {
                trace!(projectile = id.0, ?reason, "projectile expired");
                events.push(GameEvent::ProjectileExpired {
                    projectile_id: id,
                    reason,
                });
                retire(registry, pool, id);
            }
            Step::Beam(timer) if !timer.processed => {
                damage::apply_pierce(registry, &projectile.pierce_targets, projectile.damage, &mut kills);
                events.push(GameEvent::ProjectileHit {
                    projectile_id: id,
                    kind: projectile.kind,
                    target: projectile.target,
                    position: projectile.target_position,
                });
                set_beam(registry, id, BeamTimer {
                    processed: true,
                    ..timer
                });
            }
            Step::Beam(timer) => {
                let remaining = timer.remaining_secs - dt;
                if remaining <= 0.0 {
                    events.push(GameEvent::ProjectileExpired {
                        projectile_id: id,
                        reason: ExpiryReason::BeamFinished,
                    });
                    retire(registry, pool, id);
                } else {
                    set_beam(registry, id, BeamTimer {
                        remaining_secs: remaining,
                        ..timer
                    });
                }
            }
        }
    }

    kills
}

/// Work out what happens to one projectile this frame without mutating anything.
fn plan(registry: &EntityRegistry, id: ProjectileId, dt: f64) -> Option<(Projectile, Step)> {
    let entity = registry.projectile_entity(id)?;
    let world = registry.world();
    let projectile = Projectile::clone(&*world.get::<&Projectile>(entity).ok()?);

    if let Ok(timer) = world.get::<&BeamTimer>(entity) {
        return Some((projectile, Step::Beam(*timer)));
    }

    let Some(target_position) = registry.enemy_position(projectile.target) else {
        return Some((projectile, Step::Expire(ExpiryReason::TargetLost)));
    };
    let position = *world.get::<&Position>(entity).ok()?;
    let velocity = world.get::<&Velocity>(entity).map(|v| *v).unwrap_or_default();
    let next = position.advanced(velocity, dt);

    // Test the whole segment flown this frame so fast shots cannot skip past.
    let step = if point_to_segment_distance(target_position, position, next) < HIT_THRESHOLD {
        Step::Hit(target_position)
    } else if projectile.start.distance_to(&next) > projectile.range * MISS_RANGE_FACTOR {
        Step::Expire(ExpiryReason::OutOfRange)
    } else {
        Step::Fly(next)
    };
    Some((projectile, step))
}

fn set_beam(registry: &mut EntityRegistry, id: ProjectileId, timer: BeamTimer) {
    if let Some(entity) = registry.projectile_entity(id) {
        if let Ok(mut t) = registry.world_mut().get::<&mut BeamTimer>(entity) {
            *t = timer;
        }
    }
}

fn retire(registry: &mut EntityRegistry, pool: &mut dyn InstancePool, id: ProjectileId) {
    if let Some(projectile) = registry.remove_projectile(id) {
        pool.release(projectile.handle);
    }
}

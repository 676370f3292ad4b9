//! Enemy movement: slow expiry, path progress, end detection, regeneration.

use citadel_core::components::{Enemy, Health, PathFollower, SlowDebuff};
use citadel_core::constants::PATH_LENGTH_SCALE;
use citadel_core::geometry::{is_at_path_end, position_along_path};
use citadel_core::types::{EnemyId, Position, Waypoint};

use crate::registry::EntityRegistry;

/// Move every living enemy by `dt` seconds. Returns the enemies that reached
/// the end of their path this frame; each is reported exactly once and is
/// left in place for the caller to remove.
pub fn run(registry: &mut EntityRegistry, paths: &[Vec<Waypoint>], now: f64, dt: f64) -> Vec<EnemyId> {
    let mut arrivals = Vec::new();

    for (_entity, (enemy, health, follower, slow, position)) in registry
        .world_mut()
        .query_mut::<(&mut Enemy, &mut Health, &mut PathFollower, &mut SlowDebuff, &mut Position)>()
    {
        if health.current <= 0.0 || enemy.reached_end {
            continue;
        }
        let Some(path) = paths.get(follower.path_index).filter(|p| !p.is_empty()) else {
            continue;
        };

        let speed = effective_speed(enemy.speed, slow, now);
        follower.progress += speed * dt / PATH_LENGTH_SCALE;

        if is_at_path_end(follower.progress) {
            *position = position_along_path(path, 1.0);
            enemy.reached_end = true;
            arrivals.push(enemy.id);
            continue;
        }

        *position = position_along_path(path, follower.progress);
        if enemy.regeneration > 0.0 {
            health.current = (health.current + enemy.regeneration * dt).min(health.max);
        }
    }

    arrivals.sort();
    arrivals
}

/// Speed after slow. A lapsed slow is cleared in place.
pub fn effective_speed(base: f64, slow: &mut SlowDebuff, now: f64) -> f64 {
    if slow.until > now && slow.multiplier < 1.0 {
        return base * slow.multiplier;
    }
    if slow.multiplier < 1.0 {
        *slow = SlowDebuff::default();
    }
    base
}

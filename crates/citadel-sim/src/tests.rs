//! Tests for the simulation engine: session flow, building, combat, waves and upgrades.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use citadel_core::commands::PlayerCommand;
use citadel_core::components::{Enemy, SlowEffect};
use citadel_core::config::*;
use citadel_core::enums::*;
use citadel_core::error::ActionError;
use citadel_core::events::GameEvent;
use citadel_core::types::{EnemyId, GridCell, Position, TowerId, Waypoint};

use crate::engine::{SimConfig, SimulationEngine};
use crate::notify::{EventSink, SinkError};

/// Frame length used throughout; exact in binary so clocks land on whole seconds.
const STEP: f64 = 0.25;

/// Cell (10, 10) of a 21-cell grid is centred on the origin.
const ORIGIN: GridCell = GridCell { x: 10, z: 10 };

fn wave_of(kind: EnemyKind, count: u32, spawn_interval: f64) -> WaveConfig {
    WaveConfig {
        total_enemies: count,
        enemies: vec![WaveGroup {
            kind,
            count,
            spawn_interval,
        }],
    }
}

/// One straight lane running down the z axis from z=11 to z=1, ten units
/// long, so a speed-1 enemy covers half a unit per second.
fn lane_level() -> LevelConfig {
    LevelConfig {
        grid_size: 21,
        path_waypoints: vec![vec![Waypoint::new(0.0, 0.0, 11.0), Waypoint::new(0.0, 0.0, 1.0)]],
        wave_configs: vec![
            wave_of(EnemyKind::Basic, 2, 1.0),
            wave_of(EnemyKind::Basic, 2, 1.0),
        ],
        buildings: vec![BuildingConfig { grid_x: 0, grid_z: 0 }],
        towers: Vec::new(),
        enemies: Vec::new(),
    }
}

fn new_engine(game: GameConfig, level: LevelConfig) -> SimulationEngine {
    SimulationEngine::new(SimConfig { seed: 7, game, level }).unwrap()
}

fn started(game: GameConfig, level: LevelConfig) -> SimulationEngine {
    let mut engine = new_engine(game, level);
    engine.apply_command(PlayerCommand::StartGame).unwrap();
    engine
}

fn lane_engine() -> SimulationEngine {
    started(GameConfig::default(), lane_level())
}

/// Run `frames` frames of `STEP`, collecting every event.
fn run_frames(engine: &mut SimulationEngine, frames: usize) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for _ in 0..frames {
        events.extend(engine.advance(STEP).events);
    }
    events
}

fn place(engine: &mut SimulationEngine, cell: GridCell, kind: TowerKind) -> TowerId {
    engine
        .apply_command(PlayerCommand::PlaceTower { cell, kind })
        .unwrap();
    engine.registry().tower_at(cell).unwrap()
}

fn health_of(engine: &SimulationEngine, id: EnemyId) -> Option<f64> {
    engine.registry().enemy_health(id).map(|h| h.current)
}

fn kill_all(engine: &mut SimulationEngine) {
    for id in engine.registry().enemy_ids() {
        engine.registry_mut().damage_enemy(id, 1.0e6);
    }
}

/// Start wave 1 of the lane level and let both enemies spawn.
fn lane_wave_spawned(game: GameConfig) -> SimulationEngine {
    let mut engine = started(game, lane_level());
    engine.apply_command(PlayerCommand::StartFirstWave).unwrap();
    run_frames(&mut engine, 4);
    assert_eq!(engine.registry().enemy_count(), 2);
    engine
}

/// Clear wave 1 of the lane level, leaving the engine in the countdown.
fn lane_countdown(game: GameConfig) -> SimulationEngine {
    let mut engine = lane_wave_spawned(game);
    kill_all(&mut engine);
    let events = run_frames(&mut engine, 1);
    assert!(events.contains(&GameEvent::WaveCleared { wave: 1 }));
    engine
}

// ---- Determinism ----

#[test]
fn test_determinism_same_seed() {
    let run = || {
        let mut engine = SimulationEngine::new(SimConfig {
            seed: 12345,
            ..Default::default()
        })
        .unwrap();
        engine.queue_commands([
            PlayerCommand::StartGame,
            PlayerCommand::PlaceTower {
                cell: GridCell::new(5, 8),
                kind: TowerKind::Basic,
            },
            PlayerCommand::PlaceTower {
                cell: GridCell::new(12, 4),
                kind: TowerKind::Aoe,
            },
            PlayerCommand::StartFirstWave,
        ]);
        (0..1200)
            .map(|_| serde_json::to_string(&engine.tick()).unwrap())
            .collect::<Vec<_>>()
    };

    let a = run();
    let b = run();
    for (tick, (json_a, json_b)) in a.iter().zip(&b).enumerate() {
        assert_eq!(json_a, json_b, "Snapshots diverged at tick {tick}");
    }
}

#[test]
fn test_determinism_different_seeds_choose_different_paths() {
    let mut level = LevelConfig::default();
    level.wave_configs = vec![wave_of(EnemyKind::Basic, 30, 0.0)];

    let path_choices = |seed: u64| {
        let mut engine = SimulationEngine::new(SimConfig {
            seed,
            game: GameConfig::default(),
            level: level.clone(),
        })
        .unwrap();
        engine.queue_commands([PlayerCommand::StartGame, PlayerCommand::StartFirstWave]);
        let snapshot = engine.advance(STEP);
        assert_eq!(snapshot.enemies.len(), 30, "all zero-interval spawns release at once");
        snapshot.enemies.iter().map(|e| e.path_index).collect::<Vec<_>>()
    };

    assert_ne!(path_choices(1), path_choices(2));
}

// ---- Status ----

#[test]
fn test_engine_starts_in_menu_and_does_not_advance() {
    let mut engine = SimulationEngine::new(SimConfig::default()).unwrap();
    assert_eq!(engine.status(), GameStatus::Menu);
    for _ in 0..10 {
        engine.tick();
    }
    assert_eq!(engine.time().tick, 0);
    assert_eq!(engine.time().elapsed_secs, 0.0);
}

#[test]
fn test_invalid_config_is_rejected_up_front() {
    let mut level = lane_level();
    level.wave_configs[0].total_enemies = 3;
    let result = SimulationEngine::new(SimConfig {
        seed: 1,
        game: GameConfig::default(),
        level,
    });
    assert!(result.is_err());
}

#[test]
fn test_pause_toggle_twice_is_idempotent() {
    let mut engine = lane_engine();
    run_frames(&mut engine, 2);
    let before = engine.time();

    engine.queue_commands([PlayerCommand::TogglePause, PlayerCommand::TogglePause]);
    let snapshot = engine.advance(0.0);

    assert_eq!(snapshot.status, GameStatus::Playing);
    assert_eq!(engine.time(), before);
    assert_eq!(snapshot.events, vec![GameEvent::GamePaused, GameEvent::GameResumed]);
}

#[test]
fn test_paused_engine_freezes_everything() {
    let mut engine = lane_engine();
    let id = engine.spawn_enemy(EnemyKind::Basic, 0, 0.2).unwrap();
    run_frames(&mut engine, 2);
    engine.apply_command(PlayerCommand::Pause).unwrap();

    let time = engine.time();
    let progress = engine.registry().enemy_progress(id).unwrap().progress;
    run_frames(&mut engine, 40);

    assert_eq!(engine.time(), time);
    assert_eq!(engine.registry().enemy_progress(id).unwrap().progress, progress);
}

#[test]
fn test_game_menu_restores_previous_status() {
    let mut engine = lane_engine();
    engine.apply_command(PlayerCommand::Pause).unwrap();
    engine.apply_command(PlayerCommand::OpenGameMenu).unwrap();
    assert_eq!(engine.status(), GameStatus::GameMenu);
    engine.apply_command(PlayerCommand::CloseGameMenu).unwrap();
    assert_eq!(engine.status(), GameStatus::Paused);

    engine.apply_command(PlayerCommand::Resume).unwrap();
    engine.apply_command(PlayerCommand::OpenGameMenu).unwrap();
    let time = engine.time();
    run_frames(&mut engine, 8);
    assert_eq!(engine.time(), time, "game menu halts the clock");
    engine.apply_command(PlayerCommand::CloseGameMenu).unwrap();
    assert_eq!(engine.status(), GameStatus::Playing);
}

#[test]
fn test_rejected_command_is_reported_as_event() {
    let mut engine = lane_engine();
    engine.advance(0.0);
    engine.queue_command(PlayerCommand::Resume);
    let snapshot = engine.tick();

    assert_eq!(snapshot.status, GameStatus::Playing);
    assert!(matches!(
        snapshot.events.as_slice(),
        [GameEvent::CommandRejected { .. }]
    ));
}

#[test]
fn test_restart_resets_session_but_keeps_almanac() {
    let mut engine = lane_wave_spawned(GameConfig::default());
    place(&mut engine, ORIGIN, TowerKind::Basic);
    run_frames(&mut engine, 4);

    engine.apply_command(PlayerCommand::RestartGame).unwrap();
    let snapshot = engine.advance(0.0);

    assert_eq!(snapshot.status, GameStatus::Playing);
    assert_eq!(snapshot.money, 200);
    assert_eq!(snapshot.health, 20);
    assert_eq!(snapshot.wave.current, 0);
    assert!(snapshot.towers.is_empty());
    assert!(snapshot.enemies.is_empty());
    assert!(snapshot.projectiles.is_empty());
    assert_eq!(snapshot.time.elapsed_secs, 0.0);
    assert_eq!(snapshot.discovered, vec![EnemyKind::Basic]);
    assert!(snapshot.events.contains(&GameEvent::GameStarted));
}

#[test]
fn test_return_to_menu_resets_and_idles() {
    let mut engine = lane_engine();
    place(&mut engine, ORIGIN, TowerKind::Basic);
    engine.apply_command(PlayerCommand::ReturnToMenu).unwrap();

    assert_eq!(engine.status(), GameStatus::Menu);
    assert_eq!(engine.registry().tower_count(), 0);
    assert_eq!(engine.economy().money(), 200);
    assert!(engine.apply_command(PlayerCommand::StartGame).is_ok());
}

// ---- Building ----

#[test]
fn test_place_tower_spends_money_and_occupies_cell() {
    let mut engine = lane_engine();
    let id = place(&mut engine, ORIGIN, TowerKind::Basic);
    let snapshot = engine.advance(0.0);

    assert_eq!(snapshot.money, 150);
    assert_eq!(snapshot.towers.len(), 1);
    assert_eq!(snapshot.towers[0].id, id);
    assert_eq!(snapshot.towers[0].position.x, 0.0);
    assert_eq!(snapshot.towers[0].position.z, 0.0);
    assert_eq!(snapshot.towers[0].last_fire_time, 0.0);
    assert!(snapshot.events.contains(&GameEvent::TowerPlaced {
        tower_id: id,
        kind: TowerKind::Basic,
        cell: ORIGIN,
        cost: 50,
    }));
}

#[test]
fn test_place_tower_rejections_leave_state_untouched() {
    let mut engine = lane_engine();
    place(&mut engine, ORIGIN, TowerKind::Laser);
    assert_eq!(engine.economy().money(), 50);

    let attempt = |engine: &mut SimulationEngine, cell: GridCell, kind: TowerKind| {
        engine.apply_command(PlayerCommand::PlaceTower { cell, kind })
    };

    let off_grid = GridCell::new(21, 3);
    assert_eq!(
        attempt(&mut engine, off_grid, TowerKind::Basic),
        Err(ActionError::CellOutOfBounds(off_grid))
    );
    assert_eq!(
        attempt(&mut engine, ORIGIN, TowerKind::Basic),
        Err(ActionError::CellOccupied(ORIGIN))
    );
    let building = GridCell::new(0, 0);
    assert_eq!(
        attempt(&mut engine, building, TowerKind::Basic),
        Err(ActionError::CellBlocked(building))
    );
    let on_path = GridCell::new(10, 15);
    assert_eq!(
        attempt(&mut engine, on_path, TowerKind::Basic),
        Err(ActionError::CellOnPath(on_path))
    );
    let beside_path = GridCell::new(11, 15);
    assert_eq!(
        attempt(&mut engine, beside_path, TowerKind::Basic),
        Err(ActionError::CellOnPath(beside_path)),
        "tiles touching the lane edge count as on the path"
    );
    assert_eq!(
        attempt(&mut engine, GridCell::new(3, 3), TowerKind::Laser),
        Err(ActionError::InsufficientFunds {
            needed: 150,
            available: 50
        })
    );

    assert_eq!(engine.economy().money(), 50);
    assert_eq!(engine.registry().tower_count(), 1);
}

#[test]
fn test_cannot_build_from_menu() {
    let mut engine = new_engine(GameConfig::default(), lane_level());
    let result = engine.apply_command(PlayerCommand::PlaceTower {
        cell: ORIGIN,
        kind: TowerKind::Basic,
    });
    assert!(matches!(result, Err(ActionError::InvalidTransition { .. })));
}

#[test]
fn test_can_build_while_paused() {
    let mut engine = lane_engine();
    engine.apply_command(PlayerCommand::Pause).unwrap();
    place(&mut engine, ORIGIN, TowerKind::Slow);
    assert_eq!(engine.economy().money(), 125);
}

#[test]
fn test_sell_refunds_half_and_frees_cell() {
    let mut game = GameConfig::default();
    game.tower_types.get_mut(&TowerKind::Basic).unwrap().cost = 100;
    let mut engine = started(game, lane_level());

    let id = place(&mut engine, ORIGIN, TowerKind::Basic);
    assert_eq!(engine.economy().money(), 100);

    engine.apply_command(PlayerCommand::SellTower { tower_id: id }).unwrap();
    let snapshot = engine.advance(0.0);
    assert_eq!(snapshot.money, 150);
    assert!(snapshot.towers.is_empty());
    assert!(snapshot.events.contains(&GameEvent::TowerSold {
        tower_id: id,
        kind: TowerKind::Basic,
        cell: ORIGIN,
        refund: 50,
    }));

    place(&mut engine, ORIGIN, TowerKind::Basic);
    assert_eq!(engine.economy().money(), 50);
}

#[test]
fn test_sell_unknown_tower_rejected() {
    let mut engine = lane_engine();
    assert_eq!(
        engine.apply_command(PlayerCommand::SellTower { tower_id: TowerId(99) }),
        Err(ActionError::UnknownTower(TowerId(99)))
    );
    assert_eq!(engine.economy().money(), 200);
}

// ---- Combat ----

#[test]
fn test_basic_tower_fires_once_in_first_second_and_hits() {
    let mut engine = lane_engine();
    place(&mut engine, ORIGIN, TowerKind::Basic);
    // Three units up the lane, walking toward the tower.
    let id = engine.spawn_enemy(EnemyKind::Basic, 0, 0.8).unwrap();

    let events = run_frames(&mut engine, 4);
    let fired = events
        .iter()
        .filter(|e| matches!(e, GameEvent::TowerFired { .. }))
        .count();
    assert_eq!(fired, 1);

    let events = run_frames(&mut engine, 1);
    assert!(!events.iter().any(|e| matches!(e, GameEvent::TowerFired { .. })));
    assert_eq!(health_of(&engine, id), Some(40.0));
    assert_eq!(engine.registry().projectile_count(), 0);
}

#[test]
fn test_consecutive_fires_respect_fire_rate() {
    let mut engine = lane_engine();
    place(&mut engine, ORIGIN, TowerKind::Basic);
    engine.spawn_enemy(EnemyKind::Tank, 0, 0.8).unwrap();

    let mut fire_times = Vec::new();
    for _ in 0..24 {
        let snapshot = engine.advance(STEP);
        for event in &snapshot.events {
            if matches!(event, GameEvent::TowerFired { .. }) {
                fire_times.push(snapshot.time.elapsed_secs);
            }
        }
    }

    assert!(fire_times.len() >= 3, "expected several shots, got {fire_times:?}");
    for pair in fire_times.windows(2) {
        assert!(pair[1] - pair[0] >= 1.0 - 1e-9, "fired too soon: {pair:?}");
    }
}

#[test]
fn test_slow_expiry_excludes_paused_time() {
    let mut engine = lane_engine();
    let id = engine.spawn_enemy(EnemyKind::Basic, 0, 0.1).unwrap();
    engine.registry_mut().slow_enemy(
        id,
        SlowEffect {
            multiplier: 0.5,
            duration: 2.0,
        },
        0.0,
    );

    run_frames(&mut engine, 2);
    engine.apply_command(PlayerCommand::TogglePause).unwrap();
    run_frames(&mut engine, 20);
    engine.apply_command(PlayerCommand::TogglePause).unwrap();
    assert_eq!(engine.time().elapsed_secs, 0.5);

    // Slowed until t=2.0: five more slowed frames after resuming.
    run_frames(&mut engine, 5);
    let snapshot = engine.snapshot();
    assert!(snapshot.enemies[0].slowed);
    let progress = engine.registry().enemy_progress(id).unwrap().progress;
    assert!((progress - (0.1 + 7.0 * 0.5 * 0.0125)).abs() < 1e-9);

    run_frames(&mut engine, 1);
    let snapshot = engine.snapshot();
    assert!(!snapshot.enemies[0].slowed);
    let after = engine.registry().enemy_progress(id).unwrap().progress;
    assert!((after - progress - 0.0125).abs() < 1e-9, "full speed once the slow lapses");
}

#[test]
fn test_slow_tower_slows_its_target() {
    let mut engine = lane_engine();
    place(&mut engine, ORIGIN, TowerKind::Slow);
    let id = engine.spawn_enemy(EnemyKind::Tank, 0, 0.8).unwrap();

    let events = run_frames(&mut engine, 8);
    assert!(events.iter().any(|e| matches!(e, GameEvent::ProjectileHit { .. })));
    let slow = engine.registry().enemy_slow(id).unwrap();
    assert_eq!(slow.multiplier, 0.5);
    assert!(slow.until > engine.time().elapsed_secs);
}

#[test]
fn test_aoe_splash_hits_radius_and_pays_each_kill_once() {
    let mut game = GameConfig::default();
    game.tower_types.get_mut(&TowerKind::Aoe).unwrap().damage = 60.0;
    let mut engine = started(game, lane_level());
    place(&mut engine, ORIGIN, TowerKind::Aoe);
    assert_eq!(engine.economy().money(), 80);

    let struck = engine.spawn_enemy(EnemyKind::Basic, 0, 0.8).unwrap();
    let near = engine.spawn_enemy(EnemyKind::Basic, 0, 0.7).unwrap();
    let tank = engine.spawn_enemy(EnemyKind::Tank, 0, 0.7).unwrap();
    let outside = engine.spawn_enemy(EnemyKind::Basic, 0, 0.45).unwrap();

    let events = run_frames(&mut engine, 10);

    let killed: Vec<EnemyId> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::EnemyKilled { enemy_id, .. } => Some(*enemy_id),
            _ => None,
        })
        .collect();
    assert_eq!(killed.len(), 2);
    assert!(killed.contains(&struck) && killed.contains(&near));
    assert_eq!(health_of(&engine, tank), Some(140.0));
    assert_eq!(health_of(&engine, outside), Some(50.0));
    assert_eq!(engine.economy().money(), 100);
}

#[test]
fn test_laser_beam_pierces_enemies_in_line() {
    let mut engine = lane_engine();
    place(&mut engine, ORIGIN, TowerKind::Laser);
    let first = engine.spawn_enemy(EnemyKind::Basic, 0, 0.6).unwrap();
    let second = engine.spawn_enemy(EnemyKind::Basic, 0, 0.5).unwrap();
    let far = engine.spawn_enemy(EnemyKind::Basic, 0, 0.2).unwrap();

    let events = run_frames(&mut engine, 10);
    let fired = events.iter().find_map(|e| match e {
        GameEvent::TowerFired { target, .. } => Some(*target),
        _ => None,
    });
    assert_eq!(fired, Some(second), "beam ends on the last enemy it pierces");

    assert_eq!(health_of(&engine, first), Some(25.0));
    assert_eq!(health_of(&engine, second), Some(25.0));
    assert_eq!(health_of(&engine, far), Some(50.0));
    assert_eq!(engine.snapshot().projectiles[0].pierce_targets, vec![first, second]);

    let events = run_frames(&mut engine, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::ProjectileExpired {
            reason: ExpiryReason::BeamFinished,
            ..
        }
    )));
    assert_eq!(engine.registry().projectile_count(), 0);
    assert_eq!(health_of(&engine, first), Some(25.0), "a beam damages only once");
}

#[test]
fn test_projectile_expires_when_target_dies_first() {
    let mut engine = lane_engine();
    place(&mut engine, ORIGIN, TowerKind::Basic);
    // Far enough that the shot needs a few frames to arrive.
    let id = engine.spawn_enemy(EnemyKind::Tank, 0, 0.65).unwrap();

    run_frames(&mut engine, 4);
    assert_eq!(engine.registry().projectile_count(), 1);
    engine.registry_mut().damage_enemy(id, 1.0e6);

    let events = run_frames(&mut engine, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::ProjectileExpired {
            reason: ExpiryReason::TargetLost,
            ..
        }
    )));
    assert_eq!(engine.registry().projectile_count(), 0);
}

#[test]
fn test_outpaced_shot_expires_out_of_range_and_frees_its_slot() {
    let mut game = GameConfig::default();
    game.max_projectiles = 1;
    let basic = game.tower_types.get_mut(&TowerKind::Basic).unwrap();
    basic.range = 3.0;
    basic.projectile_speed = 0.4;
    let mut engine = started(game, lane_level());
    // Just behind the spawn point, so the enemy walks away from the shot.
    place(&mut engine, GridCell::new(12, 20), TowerKind::Basic);
    let id = engine.spawn_enemy(EnemyKind::Basic, 0, 0.0).unwrap();

    let events = run_frames(&mut engine, 56);
    let fired = events
        .iter()
        .filter(|e| matches!(e, GameEvent::TowerFired { .. }))
        .count();
    assert_eq!(fired, 1, "the single slot stays busy while the shot flies");
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::ProjectileExpired {
            reason: ExpiryReason::OutOfRange,
            ..
        }
    )));
    assert!(!events.iter().any(|e| matches!(e, GameEvent::ProjectileHit { .. })));
    assert_eq!(health_of(&engine, id), Some(50.0));
    assert_eq!(engine.registry().projectile_count(), 0);

    let fresh = place(&mut engine, GridCell::new(12, 15), TowerKind::Basic);
    let events = run_frames(&mut engine, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::TowerFired { tower_id, .. } if *tower_id == fresh
    )));
}

#[test]
fn test_pool_exhaustion_drops_shot_without_cooldown() {
    let mut game = GameConfig::default();
    game.max_projectiles = 1;
    let mut engine = started(game, lane_level());
    let first = place(&mut engine, ORIGIN, TowerKind::Basic);
    let second = place(&mut engine, GridCell::new(12, 10), TowerKind::Basic);
    engine.spawn_enemy(EnemyKind::Tank, 0, 0.8).unwrap();

    let events = run_frames(&mut engine, 4);
    let shooters: Vec<TowerId> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::TowerFired { tower_id, .. } => Some(*tower_id),
            _ => None,
        })
        .collect();
    assert_eq!(shooters, vec![first]);
    assert_eq!(engine.registry().last_fire_time(first), Some(1.0));
    assert_eq!(engine.registry().last_fire_time(second), Some(0.0));
}

// ---- Enemies and leaks ----

#[test]
fn test_enemy_reaching_end_costs_health_once() {
    let mut engine = lane_engine();
    let id = engine.spawn_enemy(EnemyKind::Tank, 0, 0.98).unwrap();

    let events = run_frames(&mut engine, 8);
    let leaks: Vec<&GameEvent> = events
        .iter()
        .filter(|e| matches!(e, GameEvent::EnemyReachedEnd { .. }))
        .collect();
    assert_eq!(leaks.len(), 1);
    assert!(matches!(
        leaks[0],
        GameEvent::EnemyReachedEnd { enemy_id, health_loss: 3, .. } if *enemy_id == id
    ));
    let GameEvent::EnemyReachedEnd { position, .. } = leaks[0] else {
        unreachable!();
    };
    assert_eq!(*position, Position::new(0.0, 1.0), "reported at the end of the path");
    assert_eq!(engine.economy().health(), 17);
    assert_eq!(engine.registry().enemy_count(), 0);
}

#[test]
fn test_game_over_when_health_runs_out() {
    let mut game = GameConfig::default();
    game.starting_health = 2;
    let mut engine = started(game, lane_level());
    engine.spawn_enemy(EnemyKind::Tank, 0, 0.985).unwrap();

    let snapshot = engine.advance(STEP);
    assert_eq!(snapshot.status, GameStatus::GameOver);
    assert_eq!(snapshot.health, 0);
    assert!(snapshot.events.contains(&GameEvent::GameOver { wave: 0 }));

    let time = engine.time();
    run_frames(&mut engine, 4);
    assert_eq!(engine.time(), time);
    assert!(engine.apply_command(PlayerCommand::RestartGame).is_ok());
}

#[test]
fn test_regeneration_never_exceeds_max_health() {
    let mut game = GameConfig::default();
    game.upgrade_gates = vec![UpgradeGate {
        from_wave: 1,
        max_tier: 3,
        max_selectable: 3,
    }];
    let mut engine = lane_countdown(game);
    engine
        .apply_command(PlayerCommand::SelectUpgrade {
            upgrade: UpgradeId::Regenerating,
        })
        .unwrap();
    engine.apply_command(PlayerCommand::StartNextWaveEarly).unwrap();
    run_frames(&mut engine, 1);

    let id = engine.registry().enemy_ids()[0];
    engine.registry_mut().damage_enemy(id, 10.0);
    run_frames(&mut engine, 2);
    assert_eq!(health_of(&engine, id), Some(42.5));

    run_frames(&mut engine, 8);
    assert_eq!(health_of(&engine, id), Some(50.0));
}

// ---- Waves ----

#[test]
fn test_first_wave_spawns_on_schedule() {
    let mut engine = lane_engine();
    engine.apply_command(PlayerCommand::StartFirstWave).unwrap();

    let snapshot = engine.advance(STEP);
    assert!(snapshot.events.contains(&GameEvent::WaveStarted {
        wave: 1,
        total_enemies: 2,
        upgrades: Vec::new(),
    }));
    assert_eq!(snapshot.enemies.len(), 1);
    assert_eq!(snapshot.wave.current, 1);
    assert!(snapshot.wave.in_progress);
    assert_eq!(snapshot.wave.remaining_enemies, 2);
    assert!(snapshot.events.contains(&GameEvent::EnemyDiscovered {
        kind: EnemyKind::Basic
    }));

    let events = run_frames(&mut engine, 3);
    assert_eq!(engine.registry().enemy_count(), 2);
    assert!(
        !events.iter().any(|e| matches!(e, GameEvent::EnemyDiscovered { .. })),
        "a kind is discovered only once"
    );
}

#[test]
fn test_start_first_wave_twice_rejected() {
    let mut engine = lane_engine();
    engine.apply_command(PlayerCommand::StartFirstWave).unwrap();
    assert_eq!(
        engine.apply_command(PlayerCommand::StartFirstWave),
        Err(ActionError::WaveAlreadyStarted)
    );
}

#[test]
fn test_cleared_wave_counts_down_into_next() {
    let mut engine = lane_countdown(GameConfig::default());
    let snapshot = engine.snapshot();
    assert!(!snapshot.wave.in_progress);
    assert_eq!(snapshot.wave.countdown_remaining, Some(10.0));
    assert_eq!(snapshot.wave.next_wave.len(), 1);
    assert_eq!(snapshot.wave.next_wave[0].kind, EnemyKind::Basic);
    assert_eq!(snapshot.wave.next_wave[0].count, 2);

    let events = run_frames(&mut engine, 39);
    assert!(!events.iter().any(|e| matches!(e, GameEvent::WaveStarted { .. })));
    let events = run_frames(&mut engine, 1);
    assert!(events.contains(&GameEvent::WaveStarted {
        wave: 2,
        total_enemies: 2,
        upgrades: Vec::new(),
    }));
}

#[test]
fn test_countdown_emits_cleared_and_countdown_events() {
    let mut engine = lane_wave_spawned(GameConfig::default());
    kill_all(&mut engine);
    let events = run_frames(&mut engine, 1);
    assert_eq!(
        events,
        vec![
            GameEvent::WaveCleared { wave: 1 },
            GameEvent::CountdownStarted {
                next_wave: 2,
                seconds: 10.0
            },
        ]
    );
}

#[test]
fn test_start_next_wave_early() {
    let mut engine = lane_engine();
    assert_eq!(
        engine.apply_command(PlayerCommand::StartNextWaveEarly),
        Err(ActionError::NoCountdown)
    );

    let mut engine = lane_countdown(GameConfig::default());
    engine.apply_command(PlayerCommand::StartNextWaveEarly).unwrap();
    assert_eq!(engine.waves().current_wave(), 2);
    assert!(engine.waves().in_progress());
}

#[test]
fn test_victory_after_final_wave() {
    let mut level = lane_level();
    level.wave_configs.truncate(1);
    let mut engine = started(GameConfig::default(), level);
    engine.apply_command(PlayerCommand::StartFirstWave).unwrap();
    run_frames(&mut engine, 4);
    kill_all(&mut engine);

    let snapshot = engine.advance(STEP);
    assert_eq!(snapshot.status, GameStatus::Won);
    assert!(snapshot.events.contains(&GameEvent::WaveCleared { wave: 1 }));
    assert!(snapshot.events.contains(&GameEvent::GameWon { wave: 1 }));
}

#[test]
fn test_pre_placed_entities_appear_with_the_level() {
    let mut level = lane_level();
    level.towers = vec![PlacedTowerConfig {
        kind: TowerKind::Basic,
        grid_x: 12,
        grid_z: 10,
    }];
    level.enemies = vec![PlacedEnemyConfig {
        kind: EnemyKind::Fast,
        path_index: 0,
        path_progress: 0.5,
    }];
    let mut engine = new_engine(GameConfig::default(), level);

    let menu = engine.advance(0.0);
    assert!(menu.towers.is_empty());
    assert!(menu.enemies.is_empty());
    assert!(menu.events.is_empty());

    engine.apply_command(PlayerCommand::StartGame).unwrap();
    assert_eq!(engine.registry().tower_count(), 1);
    assert_eq!(engine.registry().enemy_count(), 1);
    assert_eq!(engine.economy().money(), 200, "pre-placed towers are free");
    assert!(engine.almanac().is_discovered(EnemyKind::Fast));

    let events = engine.advance(0.0).events;
    assert!(events.iter().any(|e| matches!(e, GameEvent::EnemySpawned { kind: EnemyKind::Fast, .. })));

    engine.apply_command(PlayerCommand::ReturnToMenu).unwrap();
    assert_eq!(engine.registry().enemy_count(), 0);
    assert_eq!(engine.registry().tower_count(), 0);
}

// ---- Upgrades ----

fn upgrade_game() -> GameConfig {
    let mut game = GameConfig::default();
    game.upgrade_gates = vec![UpgradeGate {
        from_wave: 1,
        max_tier: 3,
        max_selectable: 2,
    }];
    game
}

#[test]
fn test_upgrades_only_selectable_during_countdown() {
    let mut engine = started(upgrade_game(), lane_level());
    assert_eq!(
        engine.apply_command(PlayerCommand::SelectUpgrade {
            upgrade: UpgradeId::Armored
        }),
        Err(ActionError::NoCountdown)
    );
}

#[test]
fn test_default_gates_lock_upgrades_after_first_wave() {
    let mut engine = lane_countdown(GameConfig::default());
    assert_eq!(
        engine.apply_command(PlayerCommand::SelectUpgrade {
            upgrade: UpgradeId::Armored
        }),
        Err(ActionError::UpgradeUnavailable(UpgradeId::Armored))
    );
}

#[test]
fn test_selected_upgrades_are_baked_into_next_wave() {
    let mut engine = lane_countdown(upgrade_game());
    for upgrade in [UpgradeId::Armored, UpgradeId::Swift] {
        engine.apply_command(PlayerCommand::SelectUpgrade { upgrade }).unwrap();
    }
    assert_eq!(
        engine.apply_command(PlayerCommand::SelectUpgrade {
            upgrade: UpgradeId::SlowImmune
        }),
        Err(ActionError::UpgradeLimitReached { max: 2 })
    );
    let view = engine.snapshot().upgrades;
    assert_eq!(view.selected, vec![UpgradeId::Armored, UpgradeId::Swift]);
    assert!((view.reward_multiplier - 1.3 * 1.25).abs() < 1e-9);

    engine.apply_command(PlayerCommand::StartNextWaveEarly).unwrap();
    let snapshot = engine.advance(STEP);
    assert!(snapshot.events.contains(&GameEvent::WaveStarted {
        wave: 2,
        total_enemies: 2,
        upgrades: vec![UpgradeId::Armored, UpgradeId::Swift],
    }));
    assert!(engine.upgrades().selected().is_empty());

    let enemy = &snapshot.enemies[0];
    assert_eq!(enemy.max_health, 75.0);
    assert_eq!(enemy.upgrades, vec![UpgradeId::Armored, UpgradeId::Swift]);

    let mut query = engine.registry().world().query::<&Enemy>();
    let (speed, reward) = query
        .iter()
        .map(|(_, e)| (e.speed, e.reward))
        .next()
        .unwrap();
    assert!((speed - 1.3).abs() < 1e-9);
    assert_eq!(reward, 16);
}

#[test]
fn test_slow_immune_wave_shrugs_off_frost() {
    let mut engine = lane_countdown(upgrade_game());
    engine
        .apply_command(PlayerCommand::SelectUpgrade {
            upgrade: UpgradeId::SlowImmune,
        })
        .unwrap();
    place(&mut engine, GridCell::new(12, 20), TowerKind::Slow);
    engine.apply_command(PlayerCommand::StartNextWaveEarly).unwrap();

    let events = run_frames(&mut engine, 8);
    assert!(events.iter().any(|e| matches!(e, GameEvent::ProjectileHit { .. })));
    let ids = engine.registry().enemy_ids();
    assert_eq!(ids.len(), 2);
    for id in ids {
        assert_eq!(engine.registry().enemy_slow(id).map(|s| s.multiplier), Some(1.0));
    }
    assert!(engine.snapshot().enemies.iter().all(|e| !e.slowed));
}

#[test]
fn test_toggle_and_deselect_upgrades() {
    let mut engine = lane_countdown(upgrade_game());
    let toggle = PlayerCommand::ToggleUpgrade {
        upgrade: UpgradeId::SlowImmune,
    };
    engine.apply_command(toggle.clone()).unwrap();
    assert!(engine.upgrades().is_selected(UpgradeId::SlowImmune));
    engine.apply_command(toggle).unwrap();
    assert!(!engine.upgrades().is_selected(UpgradeId::SlowImmune));

    assert_eq!(
        engine.apply_command(PlayerCommand::DeselectUpgrade {
            upgrade: UpgradeId::Armored
        }),
        Err(ActionError::UpgradeNotSelected(UpgradeId::Armored))
    );

    engine
        .apply_command(PlayerCommand::SelectUpgrade {
            upgrade: UpgradeId::Armored,
        })
        .unwrap();
    engine.apply_command(PlayerCommand::ClearUpgrades).unwrap();
    assert!(engine.upgrades().selected().is_empty());
}

#[test]
fn test_skip_upgrades_starts_wave_unmodified() {
    let mut engine = lane_countdown(upgrade_game());
    engine
        .apply_command(PlayerCommand::SelectUpgrade {
            upgrade: UpgradeId::Armored,
        })
        .unwrap();
    engine.apply_command(PlayerCommand::SkipUpgrades).unwrap();
    let snapshot = engine.advance(STEP);

    assert!(snapshot.events.contains(&GameEvent::WaveStarted {
        wave: 2,
        total_enemies: 2,
        upgrades: Vec::new(),
    }));
    assert_eq!(snapshot.enemies[0].max_health, 50.0);
}

// ---- Invariants ----

#[test]
fn test_health_bounds_and_single_removal_per_enemy() {
    let mut engine = SimulationEngine::new(SimConfig::default()).unwrap();
    engine.queue_command(PlayerCommand::StartGame);
    for (x, z) in [(5, 8), (8, 8), (12, 4), (2, 12), (14, 12)] {
        engine.queue_command(PlayerCommand::PlaceTower {
            cell: GridCell::new(x, z),
            kind: TowerKind::Basic,
        });
    }
    engine.queue_command(PlayerCommand::StartFirstWave);

    let mut removed: HashSet<EnemyId> = HashSet::new();
    for _ in 0..3000 {
        let snapshot = engine.tick();
        for enemy in &snapshot.enemies {
            assert!(enemy.health > 0.0 && enemy.health <= enemy.max_health);
            assert!(!removed.contains(&enemy.id), "removed enemy {:?} reappeared", enemy.id);
        }
        for event in &snapshot.events {
            let id = match event {
                GameEvent::EnemyKilled { enemy_id, .. } | GameEvent::EnemyReachedEnd { enemy_id, .. } => *enemy_id,
                _ => continue,
            };
            assert!(removed.insert(id), "enemy {id:?} removed twice");
        }
    }
    assert!(!removed.is_empty());
}

// ---- Event sinks ----

struct Recorder(Arc<Mutex<Vec<GameEvent>>>);

impl EventSink for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn deliver(&mut self, event: &GameEvent) -> Result<(), SinkError> {
        self.0.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct Broken;

impl EventSink for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn deliver(&mut self, _event: &GameEvent) -> Result<(), SinkError> {
        Err(SinkError("speaker unplugged".into()))
    }
}

#[test]
fn test_event_sinks_see_every_event_despite_failing_peer() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut engine = new_engine(GameConfig::default(), lane_level());
    engine.add_event_sink(Box::new(Broken));
    engine.add_event_sink(Box::new(Recorder(Arc::clone(&seen))));

    engine.queue_commands([PlayerCommand::StartGame, PlayerCommand::StartFirstWave]);
    let snapshot = engine.tick();

    assert_eq!(*seen.lock().unwrap(), snapshot.events);
    assert!(snapshot.events.contains(&GameEvent::GameStarted));
}

// ---- Snapshot ----

#[test]
fn test_snapshot_has_no_events_and_round_trips() {
    let mut engine = lane_engine();
    place(&mut engine, ORIGIN, TowerKind::Basic);
    engine.spawn_enemy(EnemyKind::Basic, 0, 0.8).unwrap();
    run_frames(&mut engine, 4);

    let snapshot = engine.snapshot();
    assert!(snapshot.events.is_empty());
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: citadel_core::state::GameStateSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back.enemies.len(), 1);
    assert_eq!(back.towers[0].last_fire_time, 1.0);
}

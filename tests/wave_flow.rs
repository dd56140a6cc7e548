mod common;

use bevy::ecs::message::Messages;
use bevy::prelude::*;

use zombie_waves::plugins::enemies::Enemy;
use zombie_waves::plugins::health::DamageMessage;
use zombie_waves::plugins::hud::HudModel;
use zombie_waves::plugins::waves::data::{EnemySpawnInfo, SpawnGroup, WaveData};
use zombie_waves::plugins::waves::scheduler::WaveScheduler;
use zombie_waves::plugins::waves::{StartWaveMessage, WaveCompleted, WaveStarted};

fn three_walker_wave() -> WaveData {
    WaveData {
        wave_name: "test".into(),
        spawn_groups: vec![SpawnGroup {
            enemies: vec![EnemySpawnInfo {
                spawn_interval: 0.0,
                ..EnemySpawnInfo::new("walker", 3)
            }],
            ..default()
        }],
        ..default()
    }
}

fn live_enemies(app: &mut App) -> Vec<Entity> {
    app.world_mut()
        .query_filtered::<Entity, With<Enemy>>()
        .iter(app.world())
        .collect()
}

#[test]
fn kill_all_wave_runs_to_completion() {
    let mut app = common::app_headless();
    app.update();

    app.world_mut()
        .write_message(StartWaveMessage(three_walker_wave()));

    // Wave starts and every scheduled enemy enters play.
    let mut started = false;
    for _ in 0..100 {
        app.update();
        started |= !app.world().resource::<Messages<WaveStarted>>().is_empty();
        if live_enemies(&mut app).len() == 3 {
            break;
        }
    }
    assert!(started, "wave should announce its start");
    assert_eq!(live_enemies(&mut app).len(), 3);
    assert_eq!(app.world().resource::<WaveScheduler>().live_count(), 3);

    // Kill everything.
    for enemy in live_enemies(&mut app) {
        app.world_mut()
            .write_message(DamageMessage { target: enemy, amount: 10_000.0 });
    }

    // The HUD snapshot reflects the deaths in the same fixed tick that
    // applied them, not one tick late.
    app.update();
    assert_eq!(app.world().resource::<HudModel>().live_enemies, 0);

    let mut completed = false;
    for _ in 0..100 {
        app.update();
        completed |= !app.world().resource::<Messages<WaveCompleted>>().is_empty();
        if completed {
            break;
        }
    }
    assert!(completed, "kill-all wave should complete once everything is dead");

    let scheduler = app.world().resource::<WaveScheduler>();
    assert!(!scheduler.is_active());
    assert_eq!(scheduler.live_count(), 0);
}

#[test]
fn second_start_while_active_is_rejected() {
    let mut app = common::app_headless();
    app.update();

    app.world_mut()
        .write_message(StartWaveMessage(three_walker_wave()));
    for _ in 0..5 {
        app.update();
    }
    assert_eq!(app.world().resource::<WaveScheduler>().wave_number(), 1);

    // A second start while wave 1 runs must not bump the wave number.
    app.world_mut()
        .write_message(StartWaveMessage(three_walker_wave()));
    for _ in 0..5 {
        app.update();
    }
    let scheduler = app.world().resource::<WaveScheduler>();
    assert!(scheduler.is_active());
    assert_eq!(scheduler.wave_number(), 1);
}

#[test]
fn dead_enemies_fade_out_and_despawn() {
    let mut app = common::app_headless();
    app.update();

    app.world_mut()
        .write_message(StartWaveMessage(three_walker_wave()));
    for _ in 0..20 {
        app.update();
        if live_enemies(&mut app).len() == 3 {
            break;
        }
    }

    for enemy in live_enemies(&mut app) {
        app.world_mut()
            .write_message(DamageMessage { target: enemy, amount: 10_000.0 });
    }

    // Fade plus slack: the corpses must leave the world.
    for _ in 0..60 {
        app.update();
        if live_enemies(&mut app).is_empty() {
            break;
        }
    }
    assert!(live_enemies(&mut app).is_empty());
}

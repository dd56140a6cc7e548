mod common;

use bevy::prelude::*;

use zombie_waves::plugins::combat::{AttackMessage, WeaponSlots};
use zombie_waves::plugins::enemies::{spawn_enemy, StatOverrides};
use zombie_waves::plugins::health::Health;
use zombie_waves::plugins::player::{Facing, Player};
use zombie_waves::plugins::waves::data::{EnemyCatalog, EnemyTemplate};

fn player_entity(app: &mut App) -> Entity {
    app.world_mut()
        .query_filtered::<Entity, With<Player>>()
        .single(app.world())
        .unwrap()
}

fn walker_template(app: &App) -> EnemyTemplate {
    app.world()
        .resource::<EnemyCatalog>()
        .get("walker")
        .unwrap()
        .clone()
}

fn spawn_test_enemy(app: &mut App, position: Vec2) -> Entity {
    let template = walker_template(app);
    let player = app
        .world_mut()
        .query_filtered::<Entity, With<Player>>()
        .single(app.world())
        .unwrap();

    let world = app.world_mut();
    let enemy = {
        let mut commands = world.commands();
        spawn_enemy(&mut commands, &template, position, player, StatOverrides::default())
    };
    world.flush();
    enemy
}

fn enemy_health(app: &App, enemy: Entity) -> f32 {
    app.world().entity(enemy).get::<Health>().unwrap().current()
}

fn player_health(app: &mut App) -> f32 {
    let player = player_entity(app);
    app.world().entity(player).get::<Health>().unwrap().current()
}

#[test]
fn melee_swing_hits_the_enemy_but_never_the_swinger() {
    let mut app = common::app_headless();
    app.update();

    let player = player_entity(&mut app);
    {
        let mut slots = app.world_mut().get_mut::<WeaponSlots>(player).unwrap();
        slots.swap(); // bat in hand
        assert_eq!(slots.current.name, "Bat");
    }
    app.world_mut().get_mut::<Facing>(player).unwrap().0 = Vec2::X;

    let enemy = spawn_test_enemy(&mut app, Vec2::new(30.0, 0.0));

    // Let the broad phase pick up the new collider before swinging.
    for _ in 0..3 {
        app.update();
    }
    let enemy_before = enemy_health(&app, enemy);

    app.world_mut().write_message(AttackMessage);
    for _ in 0..3 {
        app.update();
    }

    assert!(
        enemy_health(&app, enemy) < enemy_before,
        "swing should damage the enemy in front of the player"
    );
    assert_eq!(
        player_health(&mut app),
        100.0,
        "the swinger must never hit itself"
    );
}

#[test]
fn ranged_shot_hits_the_auto_target() {
    let mut app = common::app_headless();
    app.update();

    let enemy = spawn_test_enemy(&mut app, Vec2::new(200.0, 0.0));

    for _ in 0..3 {
        app.update();
    }
    let before = enemy_health(&app, enemy);

    // One intent: one pistol round at the acquired target.
    app.world_mut().write_message(AttackMessage);
    for _ in 0..3 {
        app.update();
    }

    let after = enemy_health(&app, enemy);
    assert!(after < before, "shot should hit the acquired target");
    assert_eq!(before - after, 25.0, "exactly one pistol round should land");
}

#[test]
fn enemy_strike_damages_the_player_once_per_cooldown() {
    let mut app = common::app_headless();
    app.update();

    // A custom brawler parked inside attack range: short wind-up, long
    // cooldown, so the damage pattern is one hit then silence.
    let template = EnemyTemplate {
        name: "brawler".into(),
        max_health: 100.0,
        move_speed: 0.0,
        detection_range: 600.0,
        attack_range: 60.0,
        attack_damage: 10.0,
        attack_cooldown: 10.0,
        attack_windup: 0.02,
        size: 32.0,
        color: [1.0, 0.0, 0.0],
    };
    let player = player_entity(&mut app);
    let world = app.world_mut();
    {
        let mut commands = world.commands();
        spawn_enemy(&mut commands, &template, Vec2::new(40.0, 0.0), player, StatOverrides::default());
    }
    world.flush();

    // Half a second of play: the wind-up lands exactly one strike.
    for _ in 0..25 {
        app.update();
    }
    assert_eq!(player_health(&mut app), 90.0);

    // Still inside the cooldown: no further hits.
    for _ in 0..25 {
        app.update();
    }
    assert_eq!(player_health(&mut app), 90.0);
}

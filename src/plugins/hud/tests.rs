use bevy::ecs::message::Messages;
use bevy::prelude::*;

use super::*;
use crate::common::test_utils::run_system_once;
use crate::plugins::combat::{Weapon, WeaponSlots};
use crate::plugins::player::Player;
use crate::plugins::waves::data::EnemyCatalog;
use crate::plugins::waves::level::demo_level;

fn hud_world() -> World {
    let mut world = World::new();
    world.insert_resource(Time::<()>::default());
    world.init_resource::<HudModel>();
    world.init_resource::<BannerClock>();
    world.init_resource::<WaveScheduler>();
    world.init_resource::<Messages<WaveStarted>>();
    world.init_resource::<Messages<WaveCompleted>>();
    world.init_resource::<Messages<WaveEventFired>>();
    world
}

#[test]
fn refresh_snapshots_player_and_wave_state() {
    let mut world = hud_world();
    let mut health = Health::new(100.0);
    health.take_damage(25.0);
    world.spawn((
        Player,
        health,
        WeaponSlots::new(Weapon::pistol(), Weapon::bat()),
    ));

    run_system_once(&mut world, refresh_hud);

    let hud = world.resource::<HudModel>();
    assert_eq!(hud.player_health, 75.0);
    assert_eq!(hud.player_health_fraction, 0.75);
    assert_eq!(hud.weapon_name, "Pistol");
    assert_eq!(hud.weapon_ammo, Some((12, 12)));
    assert!(!hud.wave_active);
    assert_eq!(hud.live_enemies, 0);
    // No level runner installed.
    assert_eq!(hud.level_name, None);
    assert_eq!(hud.waves_remaining, 0);
}

#[test]
fn refresh_reports_level_progress_when_a_runner_exists() {
    let mut world = hud_world();
    let catalog = EnemyCatalog::standard();
    world.insert_resource(LevelRunner::new(demo_level(), &catalog).unwrap());

    run_system_once(&mut world, refresh_hud);

    let hud = world.resource::<HudModel>();
    assert_eq!(hud.level_name.as_deref(), Some("Overrun"));
    assert_eq!(hud.waves_remaining, 3);
}

#[test]
fn banner_shows_wave_events_and_expires() {
    let mut world = hud_world();

    world.write_message(WaveEventFired {
        name: "incoming".into(),
        message: Some("Runners incoming!".into()),
    });
    run_system_once(&mut world, update_banner);
    assert_eq!(
        world.resource::<HudModel>().banner.as_deref(),
        Some("Runners incoming!")
    );

    // Each run uses a fresh reader, so drop the consumed message before the
    // next run re-reads it.
    world.resource_mut::<Messages<WaveEventFired>>().clear();

    // Outlives the display window -> cleared.
    world
        .resource_mut::<Time>()
        .advance_by(std::time::Duration::from_secs_f32(BANNER_SECS + 0.1));
    run_system_once(&mut world, update_banner);
    assert!(world.resource::<HudModel>().banner.is_none());
}

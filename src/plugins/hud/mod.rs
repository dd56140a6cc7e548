//! HUD model: a plain snapshot of what the player-facing overlay shows.
//!
//! Rendering is someone else's job; this plugin only maintains the facts
//! (wave number, live count, health, weapon, banner text) so a UI layer or
//! a test can read one resource instead of re-deriving game state.

use bevy::prelude::*;

use crate::common::state::GameState;
use crate::plugins::combat::{Reloading, WeaponKind, WeaponSlots};
use crate::plugins::health::Health;
use crate::plugins::player::Player;
use crate::plugins::waves::level::LevelRunner;
use crate::plugins::waves::scheduler::WaveScheduler;
use crate::plugins::waves::{WaveCompleted, WaveEventFired, WaveStarted};

/// How long a banner message stays up.
const BANNER_SECS: f32 = 3.0;

#[derive(Resource, Debug, Default, Clone)]
pub struct HudModel {
    pub wave_number: u32,
    pub wave_active: bool,
    pub wave_elapsed: f32,
    pub live_enemies: usize,

    /// Set while a level runner is driving the waves.
    pub level_name: Option<String>,
    pub waves_remaining: usize,

    pub player_health: f32,
    pub player_max_health: f32,
    /// `current / max`, the health-bar fill.
    pub player_health_fraction: f32,

    pub weapon_name: String,
    /// `(loaded, magazine)` for ranged weapons, `None` for melee.
    pub weapon_ammo: Option<(u32, u32)>,
    pub reloading: bool,

    pub banner: Option<String>,
}

#[derive(Resource, Debug, Default)]
struct BannerClock {
    timer: Option<Timer>,
}

pub fn plugin(app: &mut App) {
    app.init_resource::<HudModel>();
    app.init_resource::<BannerClock>();

    // After death tracking, so the live count never lags a tick behind.
    app.add_systems(
        FixedPostUpdate,
        (refresh_hud, update_banner)
            .after(crate::plugins::health::apply_damage)
            .after(crate::plugins::waves::track_enemy_deaths)
            .run_if(in_state(GameState::InGame)),
    );
}

fn refresh_hud(
    time: Res<Time>,
    scheduler: Res<WaveScheduler>,
    runner: Option<Res<LevelRunner>>,
    mut hud: ResMut<HudModel>,
    q_player: Query<(&Health, &WeaponSlots, Has<Reloading>), With<Player>>,
) {
    hud.wave_number = scheduler.wave_number();
    hud.wave_active = scheduler.is_active();
    hud.wave_elapsed = scheduler.elapsed(time.elapsed_secs());
    hud.live_enemies = scheduler.live_count();

    hud.level_name = runner.as_ref().map(|r| r.level_name().to_owned());
    hud.waves_remaining = runner.map_or(0, |r| r.waves_remaining());

    if let Ok((health, slots, reloading)) = q_player.single() {
        hud.player_health = health.current();
        hud.player_max_health = health.max();
        hud.player_health_fraction = health.fraction();
        hud.weapon_name = slots.current.name.clone();
        hud.weapon_ammo = match slots.current.kind {
            WeaponKind::Ranged => Some((slots.current.ammo, slots.current.magazine_size)),
            WeaponKind::Melee => None,
        };
        hud.reloading = reloading;
    }
}

fn update_banner(
    time: Res<Time>,
    mut hud: ResMut<HudModel>,
    mut clock: ResMut<BannerClock>,
    mut started: MessageReader<WaveStarted>,
    mut completed: MessageReader<WaveCompleted>,
    mut events: MessageReader<WaveEventFired>,
) {
    let mut text = None;
    for msg in started.read() {
        text = Some(format!("Wave {}", msg.0));
    }
    for msg in completed.read() {
        text = Some(format!("Wave {} cleared", msg.0));
    }
    for msg in events.read() {
        if let Some(banner) = &msg.message {
            text = Some(banner.clone());
        }
    }

    if let Some(text) = text {
        hud.banner = Some(text);
        clock.timer = Some(Timer::from_seconds(BANNER_SECS, TimerMode::Once));
        return;
    }

    if let Some(timer) = clock.timer.as_mut() {
        timer.tick(time.delta());
        if timer.is_finished() {
            clock.timer = None;
            hud.banner = None;
        }
    }
}

#[cfg(test)]
mod tests;

//! Integration test harness.
//!
//! Keep integration tests headless:
//! - `MinimalPlugins` provides the core ECS runtime.
//! - `zombie_waves::game::configure_headless` installs gameplay plugins.
//!
//! Time is driven manually so every `app.update()` advances the clock by a
//! fixed amount and runs exactly one fixed tick, regardless of wall time.

use std::time::Duration;

use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::scene::ScenePlugin;
use bevy::state::app::StatesPlugin;
use bevy::time::TimeUpdateStrategy;
use rand::rngs::StdRng;
use rand::SeedableRng;

use zombie_waves::plugins::waves::SpawnRng;

/// Virtual time per `app.update()`.
pub const STEP: Duration = Duration::from_millis(20);

pub fn app_headless() -> App {
    let mut app = App::new();

    app.add_plugins((
        MinimalPlugins,
        StatesPlugin,
        AssetPlugin::default(),
        ScenePlugin,
    ));

    zombie_waves::game::configure_headless(&mut app);

    app.insert_resource(TimeUpdateStrategy::ManualDuration(STEP));
    app.insert_resource(Time::<Fixed>::from_duration(STEP));
    app.insert_resource(SpawnRng(StdRng::seed_from_u64(7)));

    app
}

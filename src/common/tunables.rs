//! Tunable gameplay constants.

use bevy::prelude::*;

#[derive(Resource, Debug, Clone)]
pub struct Tunables {
    pub pixels_per_meter: f32,
    pub player_speed: f32,
    pub player_max_health: f32,
    /// Radius around a spawn point within which spawn positions are jittered.
    pub spawn_radius: f32,
    /// How long a non-fatal hit halts an enemy's navigation.
    pub hurt_stagger_secs: f32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            pixels_per_meter: 20.0,
            player_speed: 420.0,
            player_max_health: 100.0,
            spawn_radius: 40.0,
            hurt_stagger_secs: 0.25,
        }
    }
}

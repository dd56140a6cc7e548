//! Player: spawn, input gathering, movement.
//!
//! Input is split from movement: `gather_input` normalizes raw key state
//! into a `PlayerInput` resource each frame, and `apply_movement` turns it
//! into kinematic velocity on the fixed step. Tests drive movement by
//! writing `PlayerInput` directly.

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::layers::Layer;
use crate::common::state::GameState;
use crate::common::tunables::Tunables;
use crate::plugins::combat::{AutoTarget, FireControl, Weapon, WeaponSlots};
use crate::plugins::health::Health;

const PLAYER_SIZE: f32 = 28.0;
const TARGET_ACQUIRE_RADIUS: f32 = 420.0;

#[derive(Component, Debug, Clone, Copy)]
pub struct Player;

/// Last non-zero move direction; ranged fallback aim and melee swing arc.
#[derive(Component, Debug, Clone, Copy)]
pub struct Facing(pub Vec2);

impl Default for Facing {
    fn default() -> Self {
        Self(Vec2::Y)
    }
}

/// Normalized movement intent for this frame.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct PlayerInput {
    pub direction: Vec2,
}

pub fn plugin(app: &mut App) {
    app.init_resource::<PlayerInput>();

    app.add_systems(OnEnter(GameState::InGame), spawn_player);
    app.add_systems(Update, gather_input.run_if(in_state(GameState::InGame)));
    app.add_systems(
        FixedUpdate,
        apply_movement.run_if(in_state(GameState::InGame)),
    );
}

pub fn spawn_player(mut commands: Commands, tunables: Res<Tunables>) {
    commands.spawn((
        Name::new("Player"),
        Player,
        Health::new(tunables.player_max_health),
        Facing::default(),
        WeaponSlots::new(Weapon::pistol(), Weapon::bat()),
        FireControl::default(),
        AutoTarget::new(TARGET_ACQUIRE_RADIUS),
        Sprite {
            color: Color::srgb(0.2, 0.55, 0.9),
            custom_size: Some(Vec2::splat(PLAYER_SIZE)),
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, 2.0),
        RigidBody::Kinematic,
        Collider::circle(PLAYER_SIZE * 0.5),
        CollisionLayers::new(Layer::Player, [Layer::World, Layer::Enemy]),
        LinearVelocity::ZERO,
        DespawnOnExit(GameState::InGame),
    ));
}

/// WASD/arrows to a normalized direction. Keys are optional so headless
/// worlds without input plugins still run the schedule.
pub fn gather_input(keys: Option<Res<ButtonInput<KeyCode>>>, mut input: ResMut<PlayerInput>) {
    let Some(keys) = keys else {
        return;
    };

    let mut direction = Vec2::ZERO;
    if keys.pressed(KeyCode::KeyW) || keys.pressed(KeyCode::ArrowUp) {
        direction.y += 1.0;
    }
    if keys.pressed(KeyCode::KeyS) || keys.pressed(KeyCode::ArrowDown) {
        direction.y -= 1.0;
    }
    if keys.pressed(KeyCode::KeyA) || keys.pressed(KeyCode::ArrowLeft) {
        direction.x -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) || keys.pressed(KeyCode::ArrowRight) {
        direction.x += 1.0;
    }

    input.direction = direction.normalize_or_zero();
}

/// Turn movement intent into kinematic velocity; a dead player stops.
pub fn apply_movement(
    input: Res<PlayerInput>,
    tunables: Res<Tunables>,
    mut q: Query<(&Health, &mut LinearVelocity, &mut Facing), With<Player>>,
) {
    let Ok((health, mut vel, mut facing)) = q.single_mut() else {
        return;
    };

    if health.is_dead() {
        vel.0 = Vec2::ZERO;
        return;
    }

    vel.0 = input.direction * tunables.player_speed;
    if input.direction != Vec2::ZERO {
        facing.0 = input.direction;
    }
}

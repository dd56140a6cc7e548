//! Player combat: weapons, auto-targeting, attack resolution.
//!
//! ---------------------------
//! HOW THIS IS DESIGNED (ECS)
//! ---------------------------
//! Combat is a producer for the health pipeline: resolution never touches
//! `Health` directly, it writes `DamageMessage` and lets the single writer
//! apply it at the end of the tick.
//!
//! - `AutoTarget` is re-evaluated every fixed step from a physics overlap
//!   scan; it holds a fact ("nearest live enemy in radius"), not a decision.
//! - `AttackMessage` is intent (input, UI, tests all produce it the same
//!   way); `resolve_attacks` is the one consumer and owns the fire-rate
//!   gate, ammo, and the hit query.
//! - Ranged hits are a raycast toward the auto-target (fallback: facing),
//!   blocked by world geometry. Melee is an overlap circle in front of the
//!   attacker; the attacker itself is excluded from its own swing.
//! - An empty magazine flips the entity into `Reloading`; firing is refused
//!   until the timer clears it and refills the magazine.

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::common::layers::Layer;
use crate::common::state::GameState;
use crate::plugins::health::{DamageMessage, Health};
use crate::plugins::player::{Facing, Player};

// -----------------------------------------------------------------------------
// Weapons
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponKind {
    Melee,
    Ranged,
}

/// One weapon's stats plus its magazine state.
#[derive(Debug, Clone)]
pub struct Weapon {
    pub name: String,
    pub kind: WeaponKind,
    pub damage: f32,
    /// Attacks per second.
    pub fire_rate: f32,
    /// Ray length (ranged) or swing reach (melee).
    pub range: f32,
    pub magazine_size: u32,
    pub ammo: u32,
    pub reload_secs: f32,
}

impl Weapon {
    /// Seconds between attacks.
    #[inline]
    pub fn shot_interval(&self) -> f32 {
        1.0 / self.fire_rate.max(0.01)
    }

    pub fn pistol() -> Self {
        Self {
            name: "Pistol".into(),
            kind: WeaponKind::Ranged,
            damage: 25.0,
            fire_rate: 3.0,
            range: 500.0,
            magazine_size: 12,
            ammo: 12,
            reload_secs: 1.2,
        }
    }

    pub fn rifle() -> Self {
        Self {
            name: "Rifle".into(),
            kind: WeaponKind::Ranged,
            damage: 18.0,
            fire_rate: 8.0,
            range: 700.0,
            magazine_size: 30,
            ammo: 30,
            reload_secs: 2.0,
        }
    }

    pub fn bat() -> Self {
        Self {
            name: "Bat".into(),
            kind: WeaponKind::Melee,
            damage: 40.0,
            fire_rate: 1.5,
            range: 60.0,
            magazine_size: 0,
            ammo: 0,
            reload_secs: 0.0,
        }
    }
}

/// Held weapon pair: `current` is in hand, `stowed` swaps in on demand.
#[derive(Component, Debug, Clone)]
pub struct WeaponSlots {
    pub current: Weapon,
    pub stowed: Weapon,
}

impl WeaponSlots {
    pub fn new(current: Weapon, stowed: Weapon) -> Self {
        Self { current, stowed }
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.stowed);
    }
}

/// Game-clock timestamp of the last attack; gates fire rate.
#[derive(Component, Debug, Clone, Copy)]
pub struct FireControl {
    pub last_attack: f32,
}

impl Default for FireControl {
    fn default() -> Self {
        Self { last_attack: f32::NEG_INFINITY }
    }
}

/// Present while a reload is in progress; firing is refused.
#[derive(Component, Debug, Clone)]
pub struct Reloading {
    pub timer: Timer,
}

/// Continuous nearest-enemy scan result.
#[derive(Component, Debug, Clone, Copy)]
pub struct AutoTarget {
    pub radius: f32,
    pub current: Option<Entity>,
}

impl AutoTarget {
    pub fn new(radius: f32) -> Self {
        Self { radius, current: None }
    }
}

// -----------------------------------------------------------------------------
// Messages
// -----------------------------------------------------------------------------

/// Intent: the player attacks with the current weapon.
#[derive(Message, Debug, Clone, Copy)]
pub struct AttackMessage;

/// Intent: swap the held and stowed weapons.
#[derive(Message, Debug, Clone, Copy)]
pub struct SwapWeaponsMessage;

/// Notification: the held weapon changed.
#[derive(Message, Debug, Clone)]
pub struct WeaponSwitched {
    pub name: String,
}

/// Notification: the weapon discharged. Fires per shot or swing, hit or
/// miss, so audio/FX collaborators can cue off it.
#[derive(Message, Debug, Clone)]
pub struct WeaponFired {
    pub weapon: String,
    pub kind: WeaponKind,
}

// -----------------------------------------------------------------------------
// Plugin wiring
// -----------------------------------------------------------------------------

pub fn plugin(app: &mut App) {
    app.add_message::<AttackMessage>()
        .add_message::<SwapWeaponsMessage>()
        .add_message::<WeaponSwitched>()
        .add_message::<WeaponFired>();

    app.add_systems(
        Update,
        gather_combat_input.run_if(in_state(GameState::InGame)),
    );

    app.add_systems(
        FixedUpdate,
        (
            update_auto_target,
            handle_weapon_swap,
            tick_reload,
            resolve_attacks.after(update_auto_target).after(tick_reload),
        )
            .run_if(in_state(GameState::InGame)),
    );
}

// -----------------------------------------------------------------------------
// Input
// -----------------------------------------------------------------------------

/// Map raw input to combat intent. Inputs are optional so headless worlds
/// without input plugins still run the schedule.
pub fn gather_combat_input(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mouse: Option<Res<ButtonInput<MouseButton>>>,
    mut attacks: MessageWriter<AttackMessage>,
    mut swaps: MessageWriter<SwapWeaponsMessage>,
) {
    let key_fire = keys.as_ref().is_some_and(|k| k.pressed(KeyCode::Space));
    let mouse_fire = mouse.as_ref().is_some_and(|m| m.pressed(MouseButton::Left));
    if key_fire || mouse_fire {
        attacks.write(AttackMessage);
    }

    if keys.as_ref().is_some_and(|k| k.just_pressed(KeyCode::Tab)) {
        swaps.write(SwapWeaponsMessage);
    }
}

// -----------------------------------------------------------------------------
// Targeting
// -----------------------------------------------------------------------------

/// Scan for the nearest live enemy inside the acquisition radius.
///
/// Nearest wins; on an exact distance tie the first candidate found is kept
/// (strict `<` comparison), so the pick is stable within a tick.
pub fn update_auto_target(
    spatial: SpatialQuery,
    mut q_player: Query<(&Transform, &mut AutoTarget), With<Player>>,
    q_candidates: Query<(&Transform, &Health)>,
) {
    let Ok((tf, mut target)) = q_player.single_mut() else {
        return;
    };
    let origin = tf.translation.truncate();

    let filter = SpatialQueryFilter::from_mask(Layer::Enemy);
    let hits = spatial.shape_intersections(
        &Collider::circle(target.radius),
        origin,
        0.0,
        &filter,
    );

    let mut nearest: Option<(Entity, f32)> = None;
    for entity in hits {
        let Ok((candidate_tf, health)) = q_candidates.get(entity) else {
            continue;
        };
        if health.is_dead() {
            continue;
        }
        let distance = origin.distance(candidate_tf.translation.truncate());
        if nearest.is_none_or(|(_, best)| distance < best) {
            nearest = Some((entity, distance));
        }
    }

    target.current = nearest.map(|(entity, _)| entity);
}

// -----------------------------------------------------------------------------
// Resolution
// -----------------------------------------------------------------------------

/// Consume attack intents for the player.
pub fn resolve_attacks(
    time: Res<Time>,
    spatial: SpatialQuery,
    mut commands: Commands,
    mut attacks: MessageReader<AttackMessage>,
    mut damage: MessageWriter<DamageMessage>,
    mut fired: MessageWriter<WeaponFired>,
    mut q_player: Query<
        (
            Entity,
            &Transform,
            &Health,
            &Facing,
            &AutoTarget,
            &mut WeaponSlots,
            &mut FireControl,
            Has<Reloading>,
        ),
        With<Player>,
    >,
    q_targets: Query<(&Transform, &Health), Without<Player>>,
) {
    let Ok((player, tf, health, facing, auto, mut slots, mut fire, reloading)) =
        q_player.single_mut()
    else {
        return;
    };
    if health.is_dead() {
        attacks.read().last();
        return;
    }

    let now = time.elapsed_secs();
    let origin = tf.translation.truncate();

    for _ in attacks.read() {
        let weapon = &mut slots.current;
        if now - fire.last_attack < weapon.shot_interval() {
            continue;
        }

        match weapon.kind {
            WeaponKind::Ranged => {
                if reloading {
                    continue;
                }
                if weapon.ammo == 0 {
                    // Should have been caught on the emptying shot; recover.
                    commands.entity(player).insert(Reloading {
                        timer: Timer::from_seconds(weapon.reload_secs, TimerMode::Once),
                    });
                    continue;
                }

                fire.last_attack = now;
                weapon.ammo -= 1;
                fired.write(WeaponFired {
                    weapon: weapon.name.clone(),
                    kind: weapon.kind,
                });

                // Aim at the auto-target when one exists, else shoot the way
                // the player faces.
                let aim = auto
                    .current
                    .and_then(|e| q_targets.get(e).ok())
                    .map(|(target_tf, _)| target_tf.translation.truncate() - origin)
                    .filter(|v| v.length_squared() > 1e-4)
                    .unwrap_or(facing.0);

                if let Ok(direction) = Dir2::new(aim) {
                    let filter = SpatialQueryFilter::from_mask([Layer::Enemy, Layer::World])
                        .with_excluded_entities([player]);
                    if let Some(hit) =
                        spatial.cast_ray(origin, direction, weapon.range, true, &filter)
                    {
                        if let Ok((_, target_health)) = q_targets.get(hit.entity) {
                            if !target_health.is_dead() {
                                damage.write(DamageMessage {
                                    target: hit.entity,
                                    amount: weapon.damage,
                                });
                            }
                        }
                    }
                }

                if weapon.ammo == 0 {
                    debug!("{} empty, auto-reloading", weapon.name);
                    commands.entity(player).insert(Reloading {
                        timer: Timer::from_seconds(weapon.reload_secs, TimerMode::Once),
                    });
                }
            }
            WeaponKind::Melee => {
                fire.last_attack = now;
                fired.write(WeaponFired {
                    weapon: weapon.name.clone(),
                    kind: weapon.kind,
                });

                // Swing circle sits half a reach ahead of the attacker.
                let center = origin + facing.0.normalize_or_zero() * (weapon.range * 0.5);
                let filter = SpatialQueryFilter::from_mask(Layer::Enemy)
                    .with_excluded_entities([player]);
                let hits = spatial.shape_intersections(
                    &Collider::circle(weapon.range * 0.5),
                    center,
                    0.0,
                    &filter,
                );

                for entity in hits {
                    if entity == player {
                        continue;
                    }
                    let Ok((_, target_health)) = q_targets.get(entity) else {
                        continue;
                    };
                    if target_health.is_dead() {
                        continue;
                    }
                    damage.write(DamageMessage { target: entity, amount: weapon.damage });
                }
            }
        }
    }
}

/// Swap held/stowed on request and announce the switch.
pub fn handle_weapon_swap(
    mut swaps: MessageReader<SwapWeaponsMessage>,
    mut switched: MessageWriter<WeaponSwitched>,
    mut q_player: Query<&mut WeaponSlots, With<Player>>,
) {
    let Ok(mut slots) = q_player.single_mut() else {
        return;
    };
    for _ in swaps.read() {
        slots.swap();
        info!("switched to {}", slots.current.name);
        switched.write(WeaponSwitched { name: slots.current.name.clone() });
    }
}

/// Finish reloads: clear the marker and refill the held magazine.
pub fn tick_reload(
    time: Res<Time>,
    mut commands: Commands,
    mut q: Query<(Entity, &mut Reloading, &mut WeaponSlots)>,
) {
    for (entity, mut reloading, mut slots) in &mut q {
        reloading.timer.tick(time.delta());
        if !reloading.timer.is_finished() {
            continue;
        }

        commands.entity(entity).remove::<Reloading>();
        if slots.current.kind == WeaponKind::Ranged {
            slots.current.ammo = slots.current.magazine_size;
        }
    }
}

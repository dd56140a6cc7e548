//! Enemy AI: a per-enemy finite state machine plus the death lifecycle.
//!
//! ---------------------------
//! HOW THIS IS DESIGNED (ECS)
//! ---------------------------
//! 1) FACTS live in components:
//!    - `AiState` is the state machine value (Idle | Chase | Attack | Dead).
//!    - `AiConfig` carries the ranges/damage/cooldown for this enemy.
//!    - `NavAgent` is the navigation seam: systems write destination/stop
//!      intent, one system turns it into `LinearVelocity`.
//!
//! 2) RULES mutate facts in predictable places:
//!    - `tick_ai` is the only writer of `AiState` transitions among the
//!      living; the transition logic itself is the pure `next_state`
//!      function, keyed on (current state, inputs), so the whole table is
//!      unit-testable without a world.
//!    - `death_trigger` owns the one transition `tick_ai` never makes:
//!      any state -> Dead, driven by the health model's `Died` message.
//!
//! 3) Attacks are two-phase. Entering cooldown-ready Attack *commits* a
//!    strike (`PendingStrike`, the animation wind-up); `resolve_strikes`
//!    re-validates range and target liveness when the wind-up expires,
//!    because the target may have moved or died meanwhile.
//!
//! Dead is terminal: movement stops, collision filters are cleared without
//! structural changes, a short fade runs, and despawn is deferred to
//! PostUpdate via `PendingDespawn`.

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::layers::Layer;
use crate::common::state::GameState;
use crate::common::tunables::Tunables;
use crate::plugins::health::{DamageMessage, Died, Health, HealthChanged};
use crate::plugins::waves::data::EnemyTemplate;

/// How long a dead enemy stays visible before despawning.
const DEATH_FADE_SECS: f32 = 0.6;

/// Squared distance under which a nav destination counts as reached.
const ARRIVE_EPS_SQ: f32 = 4.0;

// -----------------------------------------------------------------------------
// State machine
// -----------------------------------------------------------------------------

/// Enemy behavior state. `Dead` is terminal.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiState {
    #[default]
    Idle,
    Chase,
    Attack,
    Dead,
}

/// Everything the transition function is allowed to look at.
#[derive(Debug, Clone, Copy)]
pub struct TransitionInputs {
    /// Own health model has fired death.
    pub dead: bool,
    /// Distance to the assigned target; `None` when no live target exists.
    pub target_distance: Option<f32>,
    pub detection_range: f32,
    pub attack_range: f32,
}

/// The whole transition table, in fixed priority order:
/// death beats everything, a missing target forces Idle, attack range beats
/// chase, an out-of-detection target reads as unreachable (Idle).
pub fn next_state(current: AiState, inputs: &TransitionInputs) -> AiState {
    if current == AiState::Dead || inputs.dead {
        return AiState::Dead;
    }

    let Some(distance) = inputs.target_distance else {
        return AiState::Idle;
    };

    if distance > inputs.detection_range {
        AiState::Idle
    } else if distance <= inputs.attack_range {
        AiState::Attack
    } else {
        AiState::Chase
    }
}

// -----------------------------------------------------------------------------
// Components
// -----------------------------------------------------------------------------

#[derive(Component, Debug, Clone, Copy)]
pub struct Enemy;

/// Per-enemy AI numbers, filled from the spawn template (plus overrides).
#[derive(Component, Debug, Clone)]
pub struct AiConfig {
    pub detection_range: f32,
    pub attack_range: f32,
    pub attack_damage: f32,
    /// Seconds between attack commits.
    pub attack_cooldown: f32,
    /// Wind-up between attack commit and damage resolution.
    pub attack_windup: f32,
}

/// Game-clock timestamp of the last attack commit.
#[derive(Component, Debug, Clone, Copy)]
pub struct AttackClock {
    pub last_attack: f32,
}

impl Default for AttackClock {
    fn default() -> Self {
        // First attack is never cooldown-gated.
        Self { last_attack: f32::NEG_INFINITY }
    }
}

/// The entity this enemy is hunting.
#[derive(Component, Debug, Clone, Copy)]
pub struct AiTarget(pub Entity);

/// Navigation seam: destination/stop intent, consumed by `drive_nav`.
#[derive(Component, Debug, Clone)]
pub struct NavAgent {
    pub speed: f32,
    pub stopped: bool,
    pub destination: Option<Vec2>,
}

impl NavAgent {
    pub fn new(speed: f32) -> Self {
        Self { speed, stopped: true, destination: None }
    }

    #[inline]
    pub fn halt(&mut self) {
        self.stopped = true;
    }

    #[inline]
    pub fn resume_to(&mut self, destination: Vec2) {
        self.stopped = false;
        self.destination = Some(destination);
    }
}

/// A committed attack waiting out its wind-up.
#[derive(Component, Debug, Clone)]
pub struct PendingStrike {
    pub timer: Timer,
    pub target: Entity,
    pub damage: f32,
}

/// Non-fatal hit reaction: navigation halts until the timer runs out.
#[derive(Component, Debug, Clone)]
pub struct HurtStagger {
    pub timer: Timer,
}

/// Short death display before removal.
#[derive(Component, Debug, Clone)]
pub struct DeathFade {
    pub timer: Timer,
}

/// Marker: enemy should be removed from the world.
///
/// We don't despawn in the fixed step; we mark and despawn in PostUpdate.
/// This keeps structural changes centralized and avoids ordering hazards.
#[derive(Component, Debug, Clone, Copy)]
pub struct PendingDespawn;

// -----------------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------------

/// Spawn-time stat multipliers from the wave definition.
#[derive(Debug, Clone, Copy)]
pub struct StatOverrides {
    pub health: f32,
    pub speed: f32,
    pub damage: f32,
}

impl Default for StatOverrides {
    fn default() -> Self {
        Self { health: 1.0, speed: 1.0, damage: 1.0 }
    }
}

/// Collision layers for an enemy that should no longer interact with anything.
///
/// Membership stays "Enemy" but filters are cleared: no structural change,
/// and no new collision interactions.
#[inline]
fn non_interacting_enemy_layers() -> CollisionLayers {
    CollisionLayers::new(Layer::Enemy, [] as [Layer; 0])
}

/// Instantiate one enemy from a template at `position`, hunting `target`.
pub fn spawn_enemy(
    commands: &mut Commands,
    template: &EnemyTemplate,
    position: Vec2,
    target: Entity,
    overrides: StatOverrides,
) -> Entity {
    let mut health = Health::new(template.max_health);
    if overrides.health != 1.0 {
        health.scale_max(overrides.health);
    }

    commands
        .spawn((
            Name::new(format!("Enemy({})", template.name)),
            Enemy,
            health,
            AiState::Idle,
            AiConfig {
                detection_range: template.detection_range,
                attack_range: template.attack_range,
                attack_damage: template.attack_damage * overrides.damage,
                attack_cooldown: template.attack_cooldown,
                attack_windup: template.attack_windup,
            },
            AttackClock::default(),
            AiTarget(target),
            NavAgent::new(template.move_speed * overrides.speed),
            Sprite {
                color: template.display_color(),
                custom_size: Some(Vec2::splat(template.size)),
                ..default()
            },
            Transform::from_translation(position.extend(1.0)),
            RigidBody::Kinematic,
            Collider::circle(template.size * 0.5),
            CollisionLayers::new(Layer::Enemy, [Layer::World, Layer::Player]),
            LinearVelocity::ZERO,
            DespawnOnExit(GameState::InGame),
        ))
        .id()
}

// -----------------------------------------------------------------------------
// Plugin wiring
// -----------------------------------------------------------------------------

/// Register enemy systems.
///
/// Schedules:
/// - FixedUpdate: state evaluation, strike resolution, nav driving.
/// - FixedPostUpdate: react to this tick's health results (death, stagger).
/// - PostUpdate: structural cleanup.
pub fn plugin(app: &mut App) {
    app.add_systems(
        FixedUpdate,
        (
            tick_ai,
            resolve_strikes.after(tick_ai),
            drive_nav.after(tick_ai),
        )
            .run_if(in_state(GameState::InGame)),
    );

    app.add_systems(
        FixedPostUpdate,
        (
            death_trigger.after(crate::plugins::health::apply_damage),
            hurt_stagger_on_hit.after(death_trigger),
            tick_hurt_stagger,
            death_fade.after(death_trigger),
        )
            .run_if(in_state(GameState::InGame)),
    );

    app.add_systems(
        PostUpdate,
        despawn_marked_enemies.run_if(in_state(GameState::InGame)),
    );
}

// -----------------------------------------------------------------------------
// Rules: state evaluation
// -----------------------------------------------------------------------------

/// Evaluate transitions for every living enemy and drive movement/attack
/// intent from the resulting state.
pub fn tick_ai(
    time: Res<Time>,
    mut commands: Commands,
    q_target: Query<(&Transform, &Health), Without<Enemy>>,
    mut q_enemies: Query<
        (
            Entity,
            &Transform,
            &Health,
            &mut AiState,
            &mut NavAgent,
            &mut AttackClock,
            &AiConfig,
            Option<&AiTarget>,
            Has<PendingStrike>,
        ),
        With<Enemy>,
    >,
) {
    let now = time.elapsed_secs();

    for (entity, tf, health, mut state, mut nav, mut clock, config, target, mid_strike) in
        &mut q_enemies
    {
        if *state == AiState::Dead {
            continue;
        }

        // A despawned or dead target reads as "no target assigned".
        let target_info = target.and_then(|t| {
            let (target_tf, target_health) = q_target.get(t.0).ok()?;
            if target_health.is_dead() {
                return None;
            }
            let pos = target_tf.translation.truncate();
            Some((t.0, pos, tf.translation.truncate().distance(pos)))
        });

        let inputs = TransitionInputs {
            dead: health.is_dead(),
            target_distance: target_info.map(|(_, _, d)| d),
            detection_range: config.detection_range,
            attack_range: config.attack_range,
        };

        let next = next_state(*state, &inputs);
        if next != *state {
            *state = next;
        }

        match next {
            AiState::Idle | AiState::Dead => nav.halt(),
            AiState::Chase => {
                let (_, target_pos, _) =
                    target_info.expect("Chase state requires a live target");
                nav.resume_to(target_pos);
            }
            AiState::Attack => {
                nav.halt();

                let (target_entity, _, _) =
                    target_info.expect("Attack state requires a live target");

                // Cooldown gate, game-clock based. One strike in flight at a time.
                if !mid_strike && now - clock.last_attack >= config.attack_cooldown {
                    clock.last_attack = now;
                    commands.entity(entity).insert(PendingStrike {
                        timer: Timer::from_seconds(config.attack_windup, TimerMode::Once),
                        target: target_entity,
                        damage: config.attack_damage,
                    });
                }
            }
        }
    }
}

/// Resolve committed strikes when their wind-up expires.
///
/// The range/liveness re-check is the point of the two-phase design: the
/// commit mirrors an animation start, the resolve mirrors its contact frame.
pub fn resolve_strikes(
    time: Res<Time>,
    mut commands: Commands,
    mut damage: MessageWriter<DamageMessage>,
    mut q_strikers: Query<(Entity, &Transform, &AiState, &AiConfig, &mut PendingStrike), With<Enemy>>,
    q_target: Query<(&Transform, &Health), Without<Enemy>>,
) {
    for (entity, tf, state, config, mut strike) in &mut q_strikers {
        strike.timer.tick(time.delta());
        if !strike.timer.is_finished() {
            continue;
        }

        commands.entity(entity).remove::<PendingStrike>();

        // Died mid-wind-up: the attack never lands.
        if *state == AiState::Dead {
            continue;
        }

        let Ok((target_tf, target_health)) = q_target.get(strike.target) else {
            debug!("strike target {:?} no longer exists", strike.target);
            continue;
        };
        if target_health.is_dead() {
            continue;
        }

        let distance = tf
            .translation
            .truncate()
            .distance(target_tf.translation.truncate());
        if distance <= config.attack_range {
            damage.write(DamageMessage { target: strike.target, amount: strike.damage });
        } else {
            debug!("strike whiffed: target moved out of range during wind-up");
        }
    }
}

/// Turn `NavAgent` intent into kinematic velocity.
pub fn drive_nav(
    mut q: Query<(&NavAgent, &Transform, &mut LinearVelocity, Has<HurtStagger>), With<Enemy>>,
) {
    for (nav, tf, mut vel, staggered) in &mut q {
        if nav.stopped || staggered {
            vel.0 = Vec2::ZERO;
            continue;
        }

        let Some(destination) = nav.destination else {
            vel.0 = Vec2::ZERO;
            continue;
        };

        let to_target = destination - tf.translation.truncate();
        if to_target.length_squared() <= ARRIVE_EPS_SQ {
            vel.0 = Vec2::ZERO;
        } else {
            vel.0 = to_target.normalize() * nav.speed;
        }
    }
}

// -----------------------------------------------------------------------------
// Rules: health reactions
// -----------------------------------------------------------------------------

/// The one transition `tick_ai` does not own: any state -> Dead.
pub fn death_trigger(
    mut commands: Commands,
    mut died: MessageReader<Died>,
    mut q: Query<
        (&mut AiState, &mut NavAgent, &mut LinearVelocity, &mut CollisionLayers),
        With<Enemy>,
    >,
) {
    for msg in died.read() {
        let Ok((mut state, mut nav, mut vel, mut layers)) = q.get_mut(msg.entity) else {
            continue;
        };
        if *state == AiState::Dead {
            continue;
        }

        *state = AiState::Dead;
        nav.halt();
        nav.destination = None;
        vel.0 = Vec2::ZERO;
        *layers = non_interacting_enemy_layers();

        commands
            .entity(msg.entity)
            .remove::<PendingStrike>()
            .insert(DeathFade {
                timer: Timer::from_seconds(DEATH_FADE_SECS, TimerMode::Once),
            });
    }
}

/// Non-fatal damage interrupts movement for a fixed hurt window.
pub fn hurt_stagger_on_hit(
    tunables: Res<Tunables>,
    mut commands: Commands,
    mut changed: MessageReader<HealthChanged>,
    q_enemies: Query<&Health, With<Enemy>>,
) {
    for msg in changed.read() {
        let Ok(health) = q_enemies.get(msg.entity) else {
            continue;
        };
        if health.is_dead() {
            continue;
        }

        // Re-inserting refreshes the window on repeated hits.
        commands.entity(msg.entity).insert(HurtStagger {
            timer: Timer::from_seconds(tunables.hurt_stagger_secs, TimerMode::Once),
        });
    }
}

pub fn tick_hurt_stagger(
    time: Res<Time>,
    mut commands: Commands,
    mut q: Query<(Entity, &mut HurtStagger)>,
) {
    for (entity, mut stagger) in &mut q {
        stagger.timer.tick(time.delta());
        if stagger.timer.is_finished() {
            commands.entity(entity).remove::<HurtStagger>();
        }
    }
}

/// Animate the death display and mark `PendingDespawn` once finished.
pub fn death_fade(
    time: Res<Time>,
    mut commands: Commands,
    mut q: Query<(Entity, &mut DeathFade, &mut Sprite, &mut Transform), With<Enemy>>,
) {
    for (entity, mut fade, mut sprite, mut tf) in &mut q {
        fade.timer.tick(time.delta());

        // Normalized [0..1] for simple animation curves.
        let dur = fade.timer.duration().as_secs_f32().max(0.0001);
        let t = (fade.timer.elapsed_secs() / dur).clamp(0.0, 1.0);

        tf.scale = Vec3::splat(1.0 - t);

        let mut c = sprite.color.to_srgba();
        c.alpha = 1.0 - t;
        sprite.color = c.into();

        if fade.timer.is_finished() {
            commands.entity(entity).insert(PendingDespawn);
        }
    }
}

// -----------------------------------------------------------------------------
// Cleanup (PostUpdate)
// -----------------------------------------------------------------------------

/// Despawn enemies marked for removal.
pub fn despawn_marked_enemies(mut commands: Commands, q: Query<Entity, With<PendingDespawn>>) {
    for e in &q {
        commands.entity(e).despawn();
    }
}

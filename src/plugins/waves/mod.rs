//! Wave orchestration: the ECS driver around the scheduler core.
//!
//! ---------------------------
//! HOW THIS IS DESIGNED (ECS)
//! ---------------------------
//! The split mirrors the rest of the game: facts and decisions live in a
//! plain core (`scheduler::WaveScheduler`), the systems here only feed it
//! and execute its commands.
//!
//! - `handle_wave_control` consumes start/stop intents and owns scheduler
//!   lifecycle calls.
//! - `drive_wave` ticks the scheduler once per fixed step with the current
//!   spawn-point set, then executes the returned commands: instantiate
//!   enemies, fire wave events, announce completion.
//! - `track_enemy_deaths` is the only bridge from the health model into the
//!   live-enemy set, running after this tick's damage has been applied.
//!
//! Everything observable (wave started/completed, spawns, kills, events)
//! leaves through messages so the HUD and level runner never reach into
//! scheduler internals.

pub mod data;
pub mod level;
pub mod scheduler;

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::common::state::GameState;
use crate::common::tunables::Tunables;
use crate::plugins::enemies::{spawn_enemy, StatOverrides};
use crate::plugins::health::Died;
use crate::plugins::player::Player;
use crate::plugins::world::SpawnPoint;

use data::{EnemyCatalog, WaveData, WaveEventKind};
use scheduler::{SpawnContext, WaveCommand, WaveScheduler};

// -----------------------------------------------------------------------------
// Messages
// -----------------------------------------------------------------------------

/// Intent: begin this wave now.
#[derive(Message, Debug, Clone)]
pub struct StartWaveMessage(pub WaveData);

/// Intent: cancel the active wave.
#[derive(Message, Debug, Clone, Copy)]
pub struct StopWaveMessage;

/// Notification: wave `n` began.
#[derive(Message, Debug, Clone, Copy)]
pub struct WaveStarted(pub u32);

/// Notification: wave `n` ended (kill-all or time).
#[derive(Message, Debug, Clone, Copy)]
pub struct WaveCompleted(pub u32);

/// Notification: an enemy entered play under wave tracking.
#[derive(Message, Debug, Clone, Copy)]
pub struct EnemySpawned(pub Entity);

/// Notification: a tracked enemy died.
#[derive(Message, Debug, Clone, Copy)]
pub struct EnemyKilled(pub Entity);

/// Notification: a wave event fired (not skipped).
#[derive(Message, Debug, Clone)]
pub struct WaveEventFired {
    pub name: String,
    /// Banner text for the HUD, when the event carries one.
    pub message: Option<String>,
}

// -----------------------------------------------------------------------------
// Resources
// -----------------------------------------------------------------------------

/// RNG for spawn positioning and infinite-wave entry picks.
///
/// A resource (not `thread_rng`) so headless runs can seed it.
#[derive(Resource, Debug)]
pub struct SpawnRng(pub StdRng);

impl Default for SpawnRng {
    fn default() -> Self {
        Self(StdRng::from_entropy())
    }
}

// -----------------------------------------------------------------------------
// Plugin wiring
// -----------------------------------------------------------------------------

pub fn plugin(app: &mut App) {
    app.init_resource::<WaveScheduler>()
        .init_resource::<SpawnRng>();

    app.add_message::<StartWaveMessage>()
        .add_message::<StopWaveMessage>()
        .add_message::<WaveStarted>()
        .add_message::<WaveCompleted>()
        .add_message::<EnemySpawned>()
        .add_message::<EnemyKilled>()
        .add_message::<WaveEventFired>()
        .add_message::<level::LevelCompleted>();

    app.add_systems(
        FixedUpdate,
        (
            level::run_level.run_if(resource_exists::<level::LevelRunner>),
            handle_wave_control,
            drive_wave,
        )
            .chain()
            .run_if(in_state(GameState::InGame)),
    );

    app.add_systems(
        FixedPostUpdate,
        track_enemy_deaths
            .after(crate::plugins::health::apply_damage)
            .run_if(in_state(GameState::InGame)),
    );
}

// -----------------------------------------------------------------------------
// Systems
// -----------------------------------------------------------------------------

/// Consume wave start/stop intents. Owns all scheduler lifecycle calls.
pub fn handle_wave_control(
    time: Res<Time>,
    catalog: Res<EnemyCatalog>,
    mut scheduler: ResMut<WaveScheduler>,
    mut starts: MessageReader<StartWaveMessage>,
    mut stops: MessageReader<StopWaveMessage>,
    mut started: MessageWriter<WaveStarted>,
) {
    if stops.read().next().is_some() {
        scheduler.stop_wave();
    }

    for msg in starts.read() {
        match scheduler.start_wave(msg.0.clone(), &catalog, time.elapsed_secs()) {
            Ok(number) => {
                started.write(WaveStarted(number));
            }
            // start_wave already logged the cause.
            Err(_) => {}
        }
    }
}

/// Tick the scheduler and execute its commands.
pub fn drive_wave(
    time: Res<Time>,
    tunables: Res<Tunables>,
    catalog: Res<EnemyCatalog>,
    mut scheduler: ResMut<WaveScheduler>,
    mut rng: ResMut<SpawnRng>,
    q_spawn_points: Query<&Transform, With<SpawnPoint>>,
    q_player: Query<Entity, With<Player>>,
    mut commands: Commands,
    mut spawned: MessageWriter<EnemySpawned>,
    mut completed: MessageWriter<WaveCompleted>,
    mut fired: MessageWriter<WaveEventFired>,
) {
    if !scheduler.is_active() {
        return;
    }

    let points: Vec<Vec2> = q_spawn_points
        .iter()
        .map(|tf| tf.translation.truncate())
        .collect();
    let ctx = SpawnContext {
        spawn_points: &points,
        spawn_radius: tunables.spawn_radius,
    };

    let work = scheduler.tick(time.elapsed_secs(), &ctx, &mut rng.0);
    if work.is_empty() {
        return;
    }

    let target = q_player.single().ok();

    for command in work {
        match command {
            WaveCommand::Spawn(order) => {
                let Some(template) = catalog.get(&order.template) else {
                    // Validation makes this unreachable for scheduled spawns.
                    warn!("spawn order names unknown template '{}'", order.template);
                    scheduler.discard_spawn();
                    continue;
                };
                let Some(target) = target else {
                    warn!("no player to target, dropping spawn of '{}'", order.template);
                    scheduler.discard_spawn();
                    continue;
                };

                let entity = spawn_enemy(
                    &mut commands,
                    template,
                    order.position,
                    target,
                    StatOverrides {
                        health: order.health_multiplier,
                        speed: order.speed_multiplier,
                        damage: order.damage_multiplier,
                    },
                );
                scheduler.register_enemy(entity);
                spawned.write(EnemySpawned(entity));
            }
            WaveCommand::Event(event) => {
                let banner = match event.kind {
                    WaveEventKind::SpawnBoss { ref template, location } => {
                        let Some(boss) = catalog.get(template) else {
                            warn!("boss event names unknown template '{template}'");
                            continue;
                        };
                        let Some(target) = target else {
                            warn!("no player to target, dropping boss '{template}'");
                            continue;
                        };

                        let position = location.map(|p| Vec2::new(p[0], p[1])).unwrap_or_else(|| {
                            pick_event_position(&points, &mut rng.0)
                        });
                        let entity = spawn_enemy(
                            &mut commands,
                            boss,
                            position,
                            target,
                            StatOverrides::default(),
                        );
                        scheduler.register_enemy(entity);
                        spawned.write(EnemySpawned(entity));
                        None
                    }
                    WaveEventKind::PlaySound { ref clip } => {
                        // Audio is a presentation concern; the cue is logged
                        // until a sound collaborator consumes the message.
                        info!("wave event sound cue: {clip}");
                        None
                    }
                    WaveEventKind::ShowMessage { ref text } => Some(text.clone()),
                };

                info!("wave event '{}' fired", event.event_name);
                fired.write(WaveEventFired { name: event.event_name, message: banner });
            }
            WaveCommand::Completed(number) => {
                completed.write(WaveCompleted(number));
            }
        }
    }
}

fn pick_event_position(points: &[Vec2], rng: &mut StdRng) -> Vec2 {
    use rand::Rng;
    if points.is_empty() {
        warn!("no spawn points available, spawning at origin");
        return Vec2::ZERO;
    }
    points[rng.gen_range(0..points.len())]
}

/// Fold this tick's deaths into the live set.
pub fn track_enemy_deaths(
    mut scheduler: ResMut<WaveScheduler>,
    mut died: MessageReader<Died>,
    mut killed: MessageWriter<EnemyKilled>,
) {
    for msg in died.read() {
        if scheduler.note_enemy_died(msg.entity) {
            killed.write(EnemyKilled(msg.entity));
        }
    }
}

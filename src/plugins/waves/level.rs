//! Level runner: sequences waves with rest time between them.

use bevy::prelude::*;

use super::data::{EnemyCatalog, EnemySpawnInfo, LevelData, SpawnGroup, WaveConfigError, WaveData,
    WaveEvent, WaveEventKind};
use super::{StartWaveMessage, StopWaveMessage, WaveCompleted};

/// Notification: every wave in the level is done (or the time limit hit).
#[derive(Message, Debug, Clone, Copy)]
pub struct LevelCompleted;

#[derive(Debug, Clone, Copy, PartialEq)]
enum LevelPhase {
    /// Ready to start the next wave.
    Pending,
    /// A wave is running; waiting on its completion.
    Running,
    /// Between waves.
    Resting { until: f32 },
    Finished,
}

/// Drives a `LevelData` through the wave pipeline. Insert it to start a
/// level; `run_level` only runs while it exists.
#[derive(Resource, Debug)]
pub struct LevelRunner {
    level: LevelData,
    next_wave: usize,
    phase: LevelPhase,
    started_at: Option<f32>,
}

impl LevelRunner {
    /// Validate the whole level up front; a runner never holds bad data.
    pub fn new(level: LevelData, catalog: &EnemyCatalog) -> Result<Self, WaveConfigError> {
        level.validate(catalog)?;
        Ok(Self { level, next_wave: 0, phase: LevelPhase::Pending, started_at: None })
    }

    pub fn level_name(&self) -> &str {
        &self.level.level_name
    }

    pub fn waves_remaining(&self) -> usize {
        self.level.wave_count().saturating_sub(self.next_wave)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == LevelPhase::Finished
    }
}

/// Advance the level phase machine one step.
pub fn run_level(
    time: Res<Time>,
    mut runner: ResMut<LevelRunner>,
    mut wave_done: MessageReader<WaveCompleted>,
    mut start: MessageWriter<StartWaveMessage>,
    mut stop: MessageWriter<StopWaveMessage>,
    mut level_done: MessageWriter<LevelCompleted>,
) {
    let now = time.elapsed_secs();
    let started_at = *runner.started_at.get_or_insert(now);

    // Level-wide time limit overrides everything but Finished.
    let limit = runner.level.level_time_limit;
    if runner.phase != LevelPhase::Finished && limit > 0.0 && now - started_at >= limit {
        info!("level '{}' hit its time limit", runner.level.level_name);
        stop.write(StopWaveMessage);
        runner.phase = LevelPhase::Finished;
        level_done.write(LevelCompleted);
        return;
    }

    match runner.phase {
        LevelPhase::Pending => {
            let index = runner.next_wave;
            let Some(wave) = runner.level.waves.get(index).cloned() else {
                runner.phase = LevelPhase::Finished;
                level_done.write(LevelCompleted);
                return;
            };
            info!(
                "level '{}': dispatching wave {}/{}",
                runner.level.level_name,
                index + 1,
                runner.level.wave_count()
            );
            start.write(StartWaveMessage(wave));
            runner.phase = LevelPhase::Running;
        }
        LevelPhase::Running => {
            if wave_done.read().next().is_none() {
                return;
            }
            runner.next_wave += 1;
            if runner.next_wave >= runner.level.wave_count() {
                info!("level '{}' completed", runner.level.level_name);
                runner.phase = LevelPhase::Finished;
                level_done.write(LevelCompleted);
            } else {
                runner.phase = LevelPhase::Resting {
                    until: now + runner.level.time_between_waves.max(0.0),
                };
            }
        }
        LevelPhase::Resting { until } => {
            if now >= until {
                runner.phase = LevelPhase::Pending;
            }
        }
        LevelPhase::Finished => {}
    }
}

// -----------------------------------------------------------------------------
// Stock content
// -----------------------------------------------------------------------------

/// The built-in three-wave level used when no level file is loaded.
pub fn demo_level() -> LevelData {
    LevelData {
        level_name: "Overrun".into(),
        time_between_waves: 6.0,
        level_time_limit: 0.0,
        waves: vec![
            WaveData {
                wave_name: "First Contact".into(),
                wave_start_delay: 2.0,
                spawn_groups: vec![SpawnGroup {
                    group_name: "walkers".into(),
                    enemies: vec![EnemySpawnInfo {
                        spawn_interval: 1.5,
                        ..EnemySpawnInfo::new("walker", 5)
                    }],
                    ..default()
                }],
                ..default()
            },
            WaveData {
                wave_name: "Pincer".into(),
                wave_start_delay: 1.0,
                spawn_groups: vec![
                    SpawnGroup {
                        group_name: "walkers".into(),
                        enemies: vec![EnemySpawnInfo {
                            spawn_interval: 1.0,
                            ..EnemySpawnInfo::new("walker", 6)
                        }],
                        ..default()
                    },
                    SpawnGroup {
                        group_name: "runners".into(),
                        group_start_delay: 5.0,
                        enemies: vec![EnemySpawnInfo {
                            spawn_interval: 0.8,
                            ..EnemySpawnInfo::new("runner", 4)
                        }],
                        ..default()
                    },
                ],
                wave_events: vec![WaveEvent {
                    event_name: "incoming".into(),
                    trigger_time: 5.0,
                    kind: WaveEventKind::ShowMessage { text: "Runners incoming!".into() },
                    require_all_enemies_dead: false,
                    trigger_on_enemy_count: None,
                }],
                ..default()
            },
            WaveData {
                wave_name: "The Brute".into(),
                wave_start_delay: 1.0,
                spawn_groups: vec![SpawnGroup {
                    group_name: "escort".into(),
                    enemies: vec![
                        EnemySpawnInfo {
                            spawn_interval: 1.0,
                            ..EnemySpawnInfo::new("walker", 4)
                        },
                        EnemySpawnInfo {
                            spawn_delay: 2.0,
                            spawn_interval: 1.2,
                            ..EnemySpawnInfo::new("runner", 3)
                        },
                    ],
                    ..default()
                }],
                wave_events: vec![WaveEvent {
                    event_name: "brute-arrives".into(),
                    trigger_time: 10.0,
                    kind: WaveEventKind::SpawnBoss { template: "brute".into(), location: None },
                    require_all_enemies_dead: false,
                    trigger_on_enemy_count: None,
                }],
                ..default()
            },
        ],
    }
}

/// Install the demo level. Registered by the full (windowed) configuration
/// only, so headless runs keep full control of wave starts.
pub fn setup_demo_level(mut commands: Commands, catalog: Res<EnemyCatalog>) {
    match LevelRunner::new(demo_level(), &catalog) {
        Ok(runner) => commands.insert_resource(runner),
        Err(e) => error!("demo level rejected: {e}"),
    }
}

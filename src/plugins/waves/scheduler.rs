//! Wave scheduler core: timed, grouped, conditional spawning as explicit
//! task state, no coroutines.
//!
//! ---------------------------
//! DESIGN
//! ---------------------------
//! The scheduler is a plain struct, deliberately ECS-free. Each tick the
//! driver system hands it the clock, the spawn-point list, and an RNG; it
//! advances every task and returns `WaveCommand`s for the driver to execute
//! (instantiate an enemy, fire an event, announce completion). That keeps
//! the scheduling logic unit-testable with a seeded RNG and no world.
//!
//! Delayed work is absolute deadlines computed at wave start:
//! - one spawner task per enemy entry (group delay + entry delay + interval),
//! - one group record per spawn group (completion/cooldown bookkeeping),
//! - an event cursor over trigger-time-sorted wave events,
//! - an infinite-spawn deadline when the wave is infinite.
//!
//! Cancellation is ownership: `stop_wave` drops the whole task set, so a
//! cancelled task can never spawn again.
//!
//! The live-enemy set is owned here exclusively. The driver registers every
//! spawn and reports deaths; nothing else may touch it.
//!
//! Completion is polled on a fixed short interval. When the kill-all and
//! time conditions are eligible on the same poll, kill-all wins.

use bevy::platform::collections::HashSet;
use bevy::prelude::*;
use rand::Rng;

use std::cmp::Ordering;
use std::fmt;

use super::data::{EnemyCatalog, EnemySpawnInfo, WaveConfigError, WaveData, WaveEvent};

/// How often completion conditions are evaluated.
const COMPLETION_POLL_SECS: f32 = 0.1;

/// Floor for the infinite-spawn interval, so a zero in data cannot spin.
const MIN_INFINITE_INTERVAL: f32 = 0.1;

// -----------------------------------------------------------------------------
// Commands out
// -----------------------------------------------------------------------------

/// A resolved instruction to instantiate one enemy.
#[derive(Debug, Clone)]
pub struct SpawnOrder {
    pub template: String,
    pub position: Vec2,
    pub health_multiplier: f32,
    pub speed_multiplier: f32,
    pub damage_multiplier: f32,
}

/// What the driver must do this tick.
#[derive(Debug, Clone)]
pub enum WaveCommand {
    Spawn(SpawnOrder),
    Event(WaveEvent),
    Completed(u32),
}

/// Per-tick spawn environment supplied by the driver.
#[derive(Debug, Clone, Copy)]
pub struct SpawnContext<'a> {
    pub spawn_points: &'a [Vec2],
    pub spawn_radius: f32,
}

// -----------------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartWaveError {
    /// Only one wave may run per scheduler.
    AlreadyActive,
    Config(WaveConfigError),
}

impl fmt::Display for StartWaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "cannot start wave: another wave is active"),
            Self::Config(e) => write!(f, "cannot start wave: {e}"),
        }
    }
}

impl std::error::Error for StartWaveError {}

impl From<WaveConfigError> for StartWaveError {
    fn from(e: WaveConfigError) -> Self {
        Self::Config(e)
    }
}

// -----------------------------------------------------------------------------
// Task state
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SpawnerTask {
    group: usize,
    entry: usize,
    remaining: u32,
    next_spawn_at: f32,
}

#[derive(Debug, Clone)]
struct GroupTask {
    index: usize,
    /// Set once all of the group's spawners finish, when the group gates
    /// completion and has a cooldown.
    cooldown_until: Option<f32>,
    done: bool,
}

#[derive(Debug)]
struct ActiveWave {
    wave: WaveData,
    number: u32,
    started_at: f32,
    /// Start time plus the wave start delay; all task deadlines hang off it.
    origin: f32,
    spawners: Vec<SpawnerTask>,
    groups: Vec<GroupTask>,
    event_cursor: usize,
    infinite_next_at: Option<f32>,
    next_poll_at: f32,
}

// -----------------------------------------------------------------------------
// Scheduler
// -----------------------------------------------------------------------------

#[derive(Resource, Debug, Default)]
pub struct WaveScheduler {
    active: Option<ActiveWave>,
    wave_number: u32,
    live: HashSet<Entity>,
    /// Spawn orders handed out but not yet registered (or discarded) by the
    /// driver. Kill-all completion waits on this reaching zero, so a wave
    /// cannot complete between emitting an order and the enemy entering the
    /// live set.
    pending_spawns: u32,
}

impl WaveScheduler {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Number of the most recently started wave (0 before the first).
    pub fn wave_number(&self) -> u32 {
        self.wave_number
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Seconds since the active wave started; 0 when inactive.
    pub fn elapsed(&self, now: f32) -> f32 {
        self.active.as_ref().map_or(0.0, |a| now - a.started_at)
    }

    /// Begin a wave. Rejected when one is already active or the definition
    /// fails validation; rejection leaves existing state untouched.
    pub fn start_wave(
        &mut self,
        mut wave: WaveData,
        catalog: &EnemyCatalog,
        now: f32,
    ) -> Result<u32, StartWaveError> {
        if self.active.is_some() {
            warn!("cannot start wave '{}': another wave is active", wave.wave_name);
            return Err(StartWaveError::AlreadyActive);
        }
        if let Err(e) = wave.validate(catalog) {
            error!("cannot start wave '{}': {e}", wave.wave_name);
            return Err(e.into());
        }

        let origin = now + wave.wave_start_delay.max(0.0);

        let mut spawners = Vec::new();
        let mut groups = Vec::new();
        for (gi, group) in wave.spawn_groups.iter().enumerate() {
            groups.push(GroupTask { index: gi, cooldown_until: None, done: false });
            for (ei, entry) in group.enemies.iter().enumerate() {
                spawners.push(SpawnerTask {
                    group: gi,
                    entry: ei,
                    remaining: entry.spawn_count,
                    next_spawn_at: origin
                        + group.group_start_delay.max(0.0)
                        + entry.spawn_delay.max(0.0),
                });
            }
        }

        // Events fire in ascending trigger-time order.
        wave.wave_events.sort_by(|a, b| {
            a.trigger_time.partial_cmp(&b.trigger_time).unwrap_or(Ordering::Equal)
        });

        let infinite_next_at = wave
            .infinite_wave
            .then(|| origin + wave.infinite_spawn_interval.max(MIN_INFINITE_INTERVAL));

        self.wave_number += 1;
        info!("starting wave {} '{}'", self.wave_number, wave.wave_name);

        self.active = Some(ActiveWave {
            wave,
            number: self.wave_number,
            started_at: now,
            origin,
            spawners,
            groups,
            event_cursor: 0,
            infinite_next_at,
            next_poll_at: now,
        });

        Ok(self.wave_number)
    }

    /// Cancel the active wave and every outstanding task. Idempotent.
    pub fn stop_wave(&mut self) {
        if let Some(active) = self.active.take() {
            info!("wave {} stopped", active.number);
            self.live.clear();
            self.pending_spawns = 0;
        }
    }

    /// Record a freshly spawned enemy in the live set. Ignored when no wave
    /// is active (a timed wave can end in the same tick a boss event fires);
    /// a stale entry must not leak into the next wave's set.
    pub fn register_enemy(&mut self, entity: Entity) {
        if self.active.is_none() {
            return;
        }
        self.live.insert(entity);
        self.pending_spawns = self.pending_spawns.saturating_sub(1);
    }

    /// The driver could not execute a spawn order; release its slot so the
    /// wave can still complete.
    pub fn discard_spawn(&mut self) {
        self.pending_spawns = self.pending_spawns.saturating_sub(1);
    }

    /// Remove a dead enemy from the live set. Returns whether it was tracked.
    pub fn note_enemy_died(&mut self, entity: Entity) -> bool {
        let removed = self.live.remove(&entity);
        if removed {
            debug!("enemy {entity:?} died, {} remaining", self.live.len());
        }
        removed
    }

    /// Advance every task to `now` and return the work to perform.
    pub fn tick(
        &mut self,
        now: f32,
        ctx: &SpawnContext<'_>,
        rng: &mut impl Rng,
    ) -> Vec<WaveCommand> {
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };

        let mut out = Vec::new();

        // Scheduled spawners.
        for spawner in &mut active.spawners {
            while spawner.remaining > 0 && now >= spawner.next_spawn_at {
                let entry = &active.wave.spawn_groups[spawner.group].enemies[spawner.entry];
                out.push(WaveCommand::Spawn(make_order(entry, ctx, rng)));
                self.pending_spawns += 1;
                spawner.remaining -= 1;
                // No wait after the final spawn of an entry.
                spawner.next_spawn_at += entry.spawn_interval.max(0.0);
            }
        }

        // Group completion/cooldown bookkeeping.
        for group in &mut active.groups {
            if group.done {
                continue;
            }
            let spawners_done = active
                .spawners
                .iter()
                .filter(|s| s.group == group.index)
                .all(|s| s.remaining == 0);
            if !spawners_done {
                continue;
            }

            let def = &active.wave.spawn_groups[group.index];
            if def.wait_for_group_completion && def.group_cooldown > 0.0 {
                let until = *group.cooldown_until.get_or_insert(now + def.group_cooldown);
                if now >= until {
                    group.done = true;
                }
            } else {
                group.done = true;
            }
        }

        // Timed events: fire or skip, never defer.
        let mut event_fired = false;
        loop {
            let Some(event) = active.wave.wave_events.get(active.event_cursor).cloned() else {
                break;
            };
            if now < active.origin + event.trigger_time {
                break;
            }
            active.event_cursor += 1;

            if event.require_all_enemies_dead && !self.live.is_empty() {
                debug!("skipping wave event '{}': enemies remain", event.event_name);
                continue;
            }
            if let Some(required) = event.trigger_on_enemy_count {
                if self.live.len() as u32 != required {
                    debug!(
                        "skipping wave event '{}': live count {} != {required}",
                        event.event_name,
                        self.live.len()
                    );
                    continue;
                }
            }
            event_fired = true;
            out.push(WaveCommand::Event(event));
        }

        // Infinite spawning: random entry from the first group.
        while let Some(next_at) = active.infinite_next_at {
            if now < next_at {
                break;
            }
            let group = &active.wave.spawn_groups[0];
            let entry = &group.enemies[rng.gen_range(0..group.enemies.len())];
            out.push(WaveCommand::Spawn(make_order(entry, ctx, rng)));
            self.pending_spawns += 1;
            active.infinite_next_at = Some(
                next_at + active.wave.infinite_spawn_interval.max(MIN_INFINITE_INTERVAL),
            );
        }

        // Completion poll. Kill-all is checked before the time conditions,
        // so simultaneous eligibility resolves as a kill-all victory.
        if now >= active.next_poll_at {
            active.next_poll_at = now + COMPLETION_POLL_SECS;

            let spawning_outstanding = active.spawners.iter().any(|s| s.remaining > 0)
                || active.groups.iter().any(|g| !g.done)
                || active.event_cursor < active.wave.wave_events.len()
                || active.infinite_next_at.is_some();

            // An event emitted this tick is still in the driver's hands; a
            // boss it spawns has not reached the live set yet.
            let kill_all_done = active.wave.must_kill_all_enemies
                && self.live.is_empty()
                && self.pending_spawns == 0
                && !spawning_outstanding
                && !event_fired;

            let elapsed = now - active.started_at;
            let duration = active.wave.wave_duration;
            let timed_out = duration > 0.0 && elapsed >= duration;

            if kill_all_done || timed_out {
                let number = active.number;
                info!("wave {number} completed");
                self.active = None;
                self.live.clear();
                self.pending_spawns = 0;
                out.push(WaveCommand::Completed(number));
            }
        }

        out
    }
}

/// Resolve a spawn entry into a concrete order (position picked here).
fn make_order(entry: &EnemySpawnInfo, ctx: &SpawnContext<'_>, rng: &mut impl Rng) -> SpawnOrder {
    SpawnOrder {
        template: entry.template.clone(),
        position: pick_position(entry, ctx, rng),
        health_multiplier: entry.health_multiplier,
        speed_multiplier: entry.speed_multiplier,
        damage_multiplier: entry.damage_multiplier,
    }
}

/// Spawn position policy: specific points when configured and non-random,
/// else a jittered random global spawn point, else the origin as a warned
/// last resort.
fn pick_position(entry: &EnemySpawnInfo, ctx: &SpawnContext<'_>, rng: &mut impl Rng) -> Vec2 {
    if !entry.use_random_spawn_points && !entry.specific_spawn_points.is_empty() {
        let points: Vec<Vec2> = entry.specific_points().collect();
        return points[rng.gen_range(0..points.len())];
    }

    if !ctx.spawn_points.is_empty() {
        let base = ctx.spawn_points[rng.gen_range(0..ctx.spawn_points.len())];
        let radius = ctx.spawn_radius.max(0.0);
        if radius == 0.0 {
            return base;
        }
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let offset = Vec2::from_angle(angle) * rng.gen_range(0.0..radius);
        return base + offset;
    }

    warn!("no spawn points available, spawning at origin");
    Vec2::ZERO
}

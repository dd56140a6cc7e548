//! Health model: gameplay truth for anything damageable.
//!
//! ---------------------------
//! HOW THIS IS DESIGNED (ECS)
//! ---------------------------
//! `Health` is a fact component. Nothing mutates it directly:
//!
//! 1) Producers (weapon resolution, enemy strikes) write *intent*:
//!    `DamageMessage` / `HealMessage`.
//! 2) `apply_damage` / `apply_heals` are the single writers. They run in
//!    `FixedPostUpdate`, after all producers of the tick, and emit
//!    `HealthChanged` / `Died` in the same tick so downstream readers
//!    (AI death transition, wave bookkeeping, HUD) never see stale values.
//! 3) `Died` fires exactly once per entity: the record becomes terminal the
//!    instant current health reaches zero, and every later damage or heal is
//!    a no-op.
//!
//! Sign policy: a non-positive damage or heal amount is a producer bug.
//! The consumer rejects it with a warning and applies nothing; negative
//! damage is not implicit healing.

use bevy::prelude::*;

use crate::common::state::GameState;

// -----------------------------------------------------------------------------
// Component
// -----------------------------------------------------------------------------

/// Current/max health with a terminal dead flag.
///
/// Invariant: `0 <= current <= max`, and `dead` implies `current == 0`.
/// `dead` is never unset.
#[derive(Component, Debug, Clone)]
pub struct Health {
    current: f32,
    max: f32,
    dead: bool,
}

/// What a mutation did, so the caller knows which notifications to raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    /// Nothing happened (dead record, or rejected amount).
    Unchanged,
    Changed,
    /// The mutation brought health to zero. Raised at most once per record.
    Died,
}

impl Health {
    /// Smallest max health we accept; guards config typos like `max: 0.0`.
    const MIN_MAX: f32 = 1.0;

    pub fn new(max: f32) -> Self {
        let max = max.max(Self::MIN_MAX);
        Self { current: max, max, dead: false }
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn max(&self) -> f32 {
        self.max
    }

    #[inline]
    pub fn fraction(&self) -> f32 {
        self.current / self.max
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn take_damage(&mut self, amount: f32) -> HealthOutcome {
        if self.dead || amount <= 0.0 {
            return HealthOutcome::Unchanged;
        }

        self.current = (self.current - amount).max(0.0);
        if self.current == 0.0 {
            self.dead = true;
            HealthOutcome::Died
        } else {
            HealthOutcome::Changed
        }
    }

    pub fn heal(&mut self, amount: f32) -> HealthOutcome {
        if self.dead || amount <= 0.0 {
            return HealthOutcome::Unchanged;
        }

        self.current = (self.current + amount).min(self.max);
        HealthOutcome::Changed
    }

    /// Clamp-set current health. Setting to zero kills the record.
    pub fn set(&mut self, value: f32) -> HealthOutcome {
        if self.dead {
            return HealthOutcome::Unchanged;
        }

        self.current = value.clamp(0.0, self.max);
        if self.current == 0.0 {
            self.dead = true;
            HealthOutcome::Died
        } else {
            HealthOutcome::Changed
        }
    }

    /// Spawn-time stat override: rescale max health and refill.
    ///
    /// Only valid before the entity has taken damage; max health is fixed
    /// once play starts.
    pub fn scale_max(&mut self, multiplier: f32) {
        if multiplier <= 0.0 {
            warn!("ignoring non-positive health multiplier {multiplier}");
            return;
        }
        self.max = (self.max * multiplier).max(Self::MIN_MAX);
        self.current = self.max;
    }
}

// -----------------------------------------------------------------------------
// Messages
// -----------------------------------------------------------------------------

/// Intent: apply damage to `target`. `amount` must be positive.
#[derive(Message, Debug, Clone, Copy)]
pub struct DamageMessage {
    pub target: Entity,
    pub amount: f32,
}

/// Intent: heal `target`. `amount` must be positive.
#[derive(Message, Debug, Clone, Copy)]
pub struct HealMessage {
    pub target: Entity,
    pub amount: f32,
}

/// Notification: health changed this tick (fires for deaths too).
#[derive(Message, Debug, Clone, Copy)]
pub struct HealthChanged {
    pub entity: Entity,
    pub current: f32,
    pub max: f32,
}

/// Notification: the entity's health reached zero. Fires exactly once.
#[derive(Message, Debug, Clone, Copy)]
pub struct Died {
    pub entity: Entity,
}

// -----------------------------------------------------------------------------
// Plugin wiring
// -----------------------------------------------------------------------------

pub fn plugin(app: &mut App) {
    app.add_message::<DamageMessage>()
        .add_message::<HealMessage>()
        .add_message::<HealthChanged>()
        .add_message::<Died>();

    app.add_systems(
        FixedPostUpdate,
        (apply_damage, apply_heals).run_if(in_state(GameState::InGame)),
    );
}

// -----------------------------------------------------------------------------
// Single writers
// -----------------------------------------------------------------------------

/// Consume damage intents. The only system that lowers `Health`.
pub fn apply_damage(
    mut reader: MessageReader<DamageMessage>,
    mut q_health: Query<&mut Health>,
    mut changed: MessageWriter<HealthChanged>,
    mut died: MessageWriter<Died>,
) {
    for msg in reader.read() {
        if msg.amount <= 0.0 {
            warn!("rejecting non-positive damage amount {}", msg.amount);
            continue;
        }

        // Target may have despawned between produce and consume.
        let Ok(mut health) = q_health.get_mut(msg.target) else {
            debug!("damage target {:?} no longer exists", msg.target);
            continue;
        };

        match health.take_damage(msg.amount) {
            HealthOutcome::Unchanged => {}
            HealthOutcome::Changed => {
                changed.write(HealthChanged {
                    entity: msg.target,
                    current: health.current(),
                    max: health.max(),
                });
            }
            HealthOutcome::Died => {
                changed.write(HealthChanged {
                    entity: msg.target,
                    current: 0.0,
                    max: health.max(),
                });
                died.write(Died { entity: msg.target });
            }
        }
    }
}

/// Consume heal intents. The only system that raises `Health`.
pub fn apply_heals(
    mut reader: MessageReader<HealMessage>,
    mut q_health: Query<&mut Health>,
    mut changed: MessageWriter<HealthChanged>,
) {
    for msg in reader.read() {
        if msg.amount <= 0.0 {
            warn!("rejecting non-positive heal amount {}", msg.amount);
            continue;
        }

        let Ok(mut health) = q_health.get_mut(msg.target) else {
            debug!("heal target {:?} no longer exists", msg.target);
            continue;
        };

        if health.heal(msg.amount) == HealthOutcome::Changed {
            changed.write(HealthChanged {
                entity: msg.target,
                current: health.current(),
                max: health.max(),
            });
        }
    }
}

#[cfg(test)]
mod tests;

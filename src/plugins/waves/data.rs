//! Wave, level, and enemy-template definitions.
//!
//! These are data, not behavior: they are authored outside the code (RON via
//! serde) and handed to the scheduler. Positions live as `[f32; 2]` so the
//! files stay plain; accessors convert to `Vec2`.
//!
//! Enemy templates replace prefab references: a spawn entry names a template,
//! and the catalog resolves the name to concrete stats at validation time.
//! An unknown or empty name is a configuration error, caught before the wave
//! starts.

use std::collections::HashMap;
use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// Enemy templates
// -----------------------------------------------------------------------------

/// Stats for one enemy archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub name: String,
    pub max_health: f32,
    pub move_speed: f32,
    pub detection_range: f32,
    pub attack_range: f32,
    pub attack_damage: f32,
    pub attack_cooldown: f32,
    pub attack_windup: f32,
    /// Sprite/collider size in world units.
    pub size: f32,
    pub color: [f32; 3],
}

impl EnemyTemplate {
    pub fn display_color(&self) -> Color {
        Color::srgb(self.color[0], self.color[1], self.color[2])
    }
}

/// Name -> template lookup, inserted once at startup.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnemyCatalog {
    templates: HashMap<String, EnemyTemplate>,
}

impl EnemyCatalog {
    pub fn insert(&mut self, template: EnemyTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn get(&self, name: &str) -> Option<&EnemyTemplate> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// The stock zombie roster.
    pub fn standard() -> Self {
        let mut catalog = Self::default();
        catalog.insert(EnemyTemplate {
            name: "walker".into(),
            max_health: 100.0,
            move_speed: 90.0,
            detection_range: 600.0,
            attack_range: 48.0,
            attack_damage: 10.0,
            attack_cooldown: 1.2,
            attack_windup: 0.35,
            size: 32.0,
            color: [0.35, 0.6, 0.3],
        });
        catalog.insert(EnemyTemplate {
            name: "runner".into(),
            max_health: 60.0,
            move_speed: 190.0,
            detection_range: 800.0,
            attack_range: 44.0,
            attack_damage: 6.0,
            attack_cooldown: 0.8,
            attack_windup: 0.25,
            size: 26.0,
            color: [0.7, 0.55, 0.2],
        });
        catalog.insert(EnemyTemplate {
            name: "brute".into(),
            max_health: 320.0,
            move_speed: 60.0,
            detection_range: 600.0,
            attack_range: 56.0,
            attack_damage: 25.0,
            attack_cooldown: 2.0,
            attack_windup: 0.6,
            size: 48.0,
            color: [0.55, 0.2, 0.2],
        });
        catalog
    }
}

// -----------------------------------------------------------------------------
// Wave definitions
// -----------------------------------------------------------------------------

fn one() -> f32 {
    1.0
}

fn default_spawn_interval() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

/// One enemy type's spawn schedule within a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySpawnInfo {
    pub template: String,
    pub spawn_count: u32,

    /// Delay before the first spawn of this entry, relative to group start.
    #[serde(default)]
    pub spawn_delay: f32,
    /// Time between individual spawns of this entry.
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval: f32,

    /// When false and `specific_spawn_points` is non-empty, spawn only there.
    #[serde(default = "default_true")]
    pub use_random_spawn_points: bool,
    #[serde(default)]
    pub specific_spawn_points: Vec<[f32; 2]>,

    #[serde(default = "one")]
    pub health_multiplier: f32,
    #[serde(default = "one")]
    pub speed_multiplier: f32,
    #[serde(default = "one")]
    pub damage_multiplier: f32,
}

impl EnemySpawnInfo {
    pub fn new(template: impl Into<String>, spawn_count: u32) -> Self {
        Self {
            template: template.into(),
            spawn_count,
            spawn_delay: 0.0,
            spawn_interval: default_spawn_interval(),
            use_random_spawn_points: true,
            specific_spawn_points: Vec::new(),
            health_multiplier: 1.0,
            speed_multiplier: 1.0,
            damage_multiplier: 1.0,
        }
    }

    pub fn specific_points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.specific_spawn_points.iter().map(|p| Vec2::new(p[0], p[1]))
    }

    /// Time from group start until this entry's last spawn.
    pub fn spawn_span(&self) -> f32 {
        self.spawn_delay + self.spawn_count.saturating_sub(1) as f32 * self.spawn_interval
    }
}

/// A named sub-batch of spawns within a wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnGroup {
    #[serde(default)]
    pub group_name: String,
    /// When this group starts spawning, relative to wave start.
    #[serde(default)]
    pub group_start_delay: f32,
    pub enemies: Vec<EnemySpawnInfo>,
    /// Gate wave progress on this group finishing all its spawns.
    #[serde(default)]
    pub wait_for_group_completion: bool,
    /// Extra wait after completion before the group reads as done.
    #[serde(default)]
    pub group_cooldown: f32,
}

impl Default for SpawnGroup {
    fn default() -> Self {
        Self {
            group_name: "Spawn Group".into(),
            group_start_delay: 0.0,
            enemies: Vec::new(),
            wait_for_group_completion: false,
            group_cooldown: 0.0,
        }
    }
}

/// What a timed wave event does when it fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WaveEventKind {
    SpawnBoss {
        template: String,
        /// Fixed location; `None` picks a random spawn point.
        location: Option<[f32; 2]>,
    },
    PlaySound {
        clip: String,
    },
    ShowMessage {
        text: String,
    },
}

/// A timed, conditional event within a wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveEvent {
    pub event_name: String,
    /// Seconds since wave start.
    pub trigger_time: f32,
    pub kind: WaveEventKind,

    /// Skip unless every enemy is dead at trigger time.
    #[serde(default)]
    pub require_all_enemies_dead: bool,
    /// Skip unless the live count equals this exactly. `None` = ignore.
    #[serde(default)]
    pub trigger_on_enemy_count: Option<u32>,
}

/// A timed batch of enemy spawns with explicit completion conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveData {
    #[serde(default)]
    pub wave_name: String,
    /// Delay before any group scheduling begins.
    #[serde(default)]
    pub wave_start_delay: f32,
    /// Maximum wave duration; `<= 0` means unlimited.
    #[serde(default)]
    pub wave_duration: f32,

    pub spawn_groups: Vec<SpawnGroup>,

    /// Keep spawning (first group's entries, at random) until the wave ends.
    #[serde(default)]
    pub infinite_wave: bool,
    #[serde(default = "default_spawn_interval")]
    pub infinite_spawn_interval: f32,

    /// Victory: every spawned enemy dead and nothing left to spawn.
    #[serde(default = "default_true")]
    pub must_kill_all_enemies: bool,
    /// Victory: the wave duration elapsing counts as a win.
    #[serde(default)]
    pub time_based_victory: bool,

    #[serde(default)]
    pub wave_events: Vec<WaveEvent>,
}

impl Default for WaveData {
    fn default() -> Self {
        Self {
            wave_name: "Wave".into(),
            wave_start_delay: 0.0,
            wave_duration: 0.0,
            spawn_groups: Vec::new(),
            infinite_wave: false,
            infinite_spawn_interval: default_spawn_interval(),
            must_kill_all_enemies: true,
            time_based_victory: false,
            wave_events: Vec::new(),
        }
    }
}

impl WaveData {
    /// Sum of spawn counts over every entry in every group. Infinite and
    /// event spawns are not included.
    pub fn total_enemy_count(&self) -> u32 {
        self.spawn_groups
            .iter()
            .flat_map(|g| &g.enemies)
            .map(|e| e.spawn_count)
            .sum()
    }

    /// Upper bound on when scheduled (non-infinite) spawning finishes.
    pub fn estimated_duration(&self) -> f32 {
        if self.wave_duration > 0.0 {
            return self.wave_duration;
        }

        self.spawn_groups
            .iter()
            .map(|g| {
                let span = g
                    .enemies
                    .iter()
                    .map(EnemySpawnInfo::spawn_span)
                    .fold(0.0_f32, f32::max);
                self.wave_start_delay + g.group_start_delay + span
            })
            .fold(0.0_f32, f32::max)
    }

    /// Structural + catalog validation. Run before a wave starts.
    pub fn validate(&self, catalog: &EnemyCatalog) -> Result<(), WaveConfigError> {
        if self.spawn_groups.is_empty() {
            return Err(WaveConfigError::NoSpawnGroups);
        }

        for group in &self.spawn_groups {
            if group.enemies.is_empty() {
                return Err(WaveConfigError::EmptyGroup { group: group.group_name.clone() });
            }

            for entry in &group.enemies {
                if entry.spawn_count == 0 {
                    return Err(WaveConfigError::ZeroSpawnCount {
                        group: group.group_name.clone(),
                        template: entry.template.clone(),
                    });
                }
                if entry.template.is_empty() || !catalog.contains(&entry.template) {
                    return Err(WaveConfigError::UnknownTemplate {
                        group: group.group_name.clone(),
                        template: entry.template.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn is_valid(&self, catalog: &EnemyCatalog) -> bool {
        self.validate(catalog).is_ok()
    }
}

/// An ordered sequence of waves with rest time between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelData {
    #[serde(default)]
    pub level_name: String,
    /// Rest time between consecutive waves.
    #[serde(default)]
    pub time_between_waves: f32,
    pub waves: Vec<WaveData>,
    /// Level-wide time limit; `<= 0` means none.
    #[serde(default)]
    pub level_time_limit: f32,
}

impl Default for LevelData {
    fn default() -> Self {
        Self {
            level_name: "Level".into(),
            time_between_waves: 10.0,
            waves: Vec::new(),
            level_time_limit: 0.0,
        }
    }
}

impl LevelData {
    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    pub fn total_enemy_count(&self) -> u32 {
        self.waves.iter().map(WaveData::total_enemy_count).sum()
    }

    pub fn validate(&self, catalog: &EnemyCatalog) -> Result<(), WaveConfigError> {
        if self.waves.is_empty() {
            return Err(WaveConfigError::NoWaves);
        }
        for wave in &self.waves {
            wave.validate(catalog)?;
        }
        Ok(())
    }

    pub fn is_valid(&self, catalog: &EnemyCatalog) -> bool {
        self.validate(catalog).is_ok()
    }
}

// -----------------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------------

/// Why a wave/level definition was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaveConfigError {
    NoSpawnGroups,
    NoWaves,
    EmptyGroup { group: String },
    ZeroSpawnCount { group: String, template: String },
    UnknownTemplate { group: String, template: String },
}

impl fmt::Display for WaveConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSpawnGroups => write!(f, "wave has no spawn groups"),
            Self::NoWaves => write!(f, "level has no waves"),
            Self::EmptyGroup { group } => {
                write!(f, "spawn group '{group}' has no enemy entries")
            }
            Self::ZeroSpawnCount { group, template } => {
                write!(f, "entry '{template}' in group '{group}' has zero spawn count")
            }
            Self::UnknownTemplate { group, template } => {
                write!(f, "entry in group '{group}' names unknown template '{template}'")
            }
        }
    }
}

impl std::error::Error for WaveConfigError {}

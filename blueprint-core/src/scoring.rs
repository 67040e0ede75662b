//! Score resolution for graded actions and maximum attainable scores.
//!
//! Every function here is pure and total: unknown mechanics fall back to the
//! label count, and non-finite overrides are ignored in favour of defaults.
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_POINTS_PER_ITEM, DEFAULT_STREAK_MULTIPLIER};
use crate::model::{Blueprint, ScoringOverride};
use crate::numbers::{finite_or, round_f64_to_i32, round_f64_to_u32, usize_to_u32};
use crate::registry::{MechanicRegistry, default_registry};

/// Effective scoring knobs of one mechanic instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    pub base_points_per_item: u32,
    pub partial_credit: bool,
    pub time_bonus_enabled: bool,
    pub time_bonus_max_points: u32,
    pub time_bonus_window_secs: f64,
    pub attempt_penalty: u32,
    /// Failed attempts after which a label locks; `None` never locks.
    pub max_attempts: Option<u32>,
    pub streak_multiplier: f64,
    pub max_score_override: Option<u32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_points_per_item: DEFAULT_POINTS_PER_ITEM,
            partial_credit: false,
            time_bonus_enabled: false,
            time_bonus_max_points: 0,
            time_bonus_window_secs: 0.0,
            attempt_penalty: 0,
            max_attempts: None,
            streak_multiplier: DEFAULT_STREAK_MULTIPLIER,
            max_score_override: None,
        }
    }
}

/// One graded player action.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEvent {
    pub is_correct: bool,
    #[serde(default)]
    pub attempt_count: Option<u32>,
    #[serde(default)]
    pub consecutive_correct: Option<u32>,
    #[serde(default)]
    pub elapsed_secs: Option<f64>,
}

impl ScoreEvent {
    #[must_use]
    pub const fn correct() -> Self {
        Self {
            is_correct: true,
            attempt_count: None,
            consecutive_correct: None,
            elapsed_secs: None,
        }
    }

    #[must_use]
    pub const fn incorrect() -> Self {
        Self {
            is_correct: false,
            attempt_count: None,
            consecutive_correct: None,
            elapsed_secs: None,
        }
    }
}

/// Finite, non-negative override value.
fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite() && *value >= 0.0)
}

/// Mechanic-level value wins over blueprint-level value.
fn pick<T>(
    mechanic: Option<&ScoringOverride>,
    blueprint: Option<&ScoringOverride>,
    field: impl Fn(&ScoringOverride) -> Option<T>,
) -> Option<T> {
    mechanic.and_then(&field).or_else(|| blueprint.and_then(&field))
}

/// Resolve the effective scoring config of `mode` within `blueprint`.
///
/// Priority: the mechanic's own `scoring`, then the blueprint's
/// `scoringStrategy`, then defaults.
#[must_use]
pub fn scoring_config_for(mode: &str, blueprint: &Blueprint) -> ScoringConfig {
    let mechanic = blueprint
        .mechanic(mode)
        .and_then(|entry| entry.scoring.as_ref());
    let global = blueprint.scoring_strategy.as_ref();
    let defaults = ScoringConfig::default();
    let number = |field: fn(&ScoringOverride) -> Option<f64>| {
        pick(mechanic, global, |scoring| usable(field(scoring)))
    };
    ScoringConfig {
        base_points_per_item: number(|s| s.base_points_per_item)
            .map_or(defaults.base_points_per_item, round_f64_to_u32),
        partial_credit: pick(mechanic, global, |s| s.partial_credit)
            .unwrap_or(defaults.partial_credit),
        time_bonus_enabled: pick(mechanic, global, |s| s.time_bonus_enabled)
            .unwrap_or(defaults.time_bonus_enabled),
        time_bonus_max_points: number(|s| s.time_bonus_max_points)
            .map_or(defaults.time_bonus_max_points, round_f64_to_u32),
        time_bonus_window_secs: number(|s| s.time_bonus_window_secs)
            .unwrap_or(defaults.time_bonus_window_secs),
        attempt_penalty: number(|s| s.attempt_penalty)
            .map_or(defaults.attempt_penalty, round_f64_to_u32),
        max_attempts: number(|s| s.max_attempts)
            .map(round_f64_to_u32)
            .filter(|attempts| *attempts > 0),
        streak_multiplier: number(|s| s.streak_multiplier).unwrap_or(defaults.streak_multiplier),
        max_score_override: number(|s| s.max_score).map(round_f64_to_u32),
    }
}

/// Points for one graded action.
///
/// Incorrect actions cost `attempt_penalty`. Correct actions earn the base
/// points scaled by the streak factor `1 + (streak - 1) * (multiplier - 1)`
/// when the multiplier exceeds 1, split across attempts when partial credit
/// is on, plus a linearly decaying time bonus.
#[must_use]
pub fn score_delta(config: &ScoringConfig, event: &ScoreEvent) -> i32 {
    if !event.is_correct {
        return -round_f64_to_i32(f64::from(config.attempt_penalty));
    }
    let base = f64::from(config.base_points_per_item);
    let multiplier = config.streak_multiplier;
    let streaked = if multiplier.is_finite() && multiplier > 1.0 {
        let streak = f64::from(event.consecutive_correct.unwrap_or(1).max(1));
        base * (1.0 + (streak - 1.0) * (multiplier - 1.0))
    } else {
        base
    };
    let mut points = finite_or(streaked, base);
    if config.partial_credit {
        let attempts = event.attempt_count.unwrap_or(1).max(1);
        points /= f64::from(attempts);
    }
    round_f64_to_i32(points).saturating_add(time_bonus(config, event.elapsed_secs))
}

fn time_bonus(config: &ScoringConfig, elapsed_secs: Option<f64>) -> i32 {
    let window = config.time_bonus_window_secs;
    if !config.time_bonus_enabled || !window.is_finite() || window <= 0.0 {
        return 0;
    }
    let Some(elapsed) = elapsed_secs.filter(|secs| secs.is_finite() && *secs >= 0.0) else {
        return 0;
    };
    let remaining = (1.0 - elapsed / window).clamp(0.0, 1.0);
    round_f64_to_i32(f64::from(config.time_bonus_max_points) * remaining)
}

/// Maximum score of `mode` using the built-in registry.
#[must_use]
pub fn max_score(mode: &str, blueprint: &Blueprint, points_per_zone: u32) -> u32 {
    max_score_with(default_registry(), mode, blueprint, points_per_zone)
}

/// Maximum score of `mode`: an explicit `maxScore` override on the mechanic,
/// else the registered strategy, else `labels * points_per_zone`.
#[must_use]
pub fn max_score_with(
    registry: &MechanicRegistry,
    mode: &str,
    blueprint: &Blueprint,
    points_per_zone: u32,
) -> u32 {
    let override_score = blueprint
        .mechanic(mode)
        .and_then(|entry| entry.scoring.as_ref())
        .and_then(|scoring| usable(scoring.max_score));
    if let Some(score) = override_score {
        return round_f64_to_u32(score);
    }
    registry.lookup(mode).map_or_else(
        || {
            log::trace!(
                target: "blueprint_core::scoring",
                "no strategy for '{mode}', using label count"
            );
            usize_to_u32(blueprint.labels.len()).saturating_mul(points_per_zone)
        },
        |strategy| strategy.max_score(blueprint, points_per_zone),
    )
}

/// Sum of [`max_score`] over `modes`.
#[must_use]
pub fn cumulative_max_score<S: AsRef<str>>(
    modes: &[S],
    blueprint: &Blueprint,
    points_per_zone: u32,
) -> u32 {
    cumulative_max_score_with(default_registry(), modes, blueprint, points_per_zone)
}

#[must_use]
pub fn cumulative_max_score_with<S: AsRef<str>>(
    registry: &MechanicRegistry,
    modes: &[S],
    blueprint: &Blueprint,
    points_per_zone: u32,
) -> u32 {
    modes.iter().fold(0_u32, |total, mode| {
        total.saturating_add(max_score_with(registry, mode.as_ref(), blueprint, points_per_zone))
    })
}

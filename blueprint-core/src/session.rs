//! Play-session bookkeeping as an immutable state plus a pure reducer.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::Blueprint;
use crate::scoring::{ScoreEvent, ScoringConfig, score_delta, scoring_config_for};

/// Read-only inputs shared by every transition of one session.
#[derive(Debug, Clone)]
pub struct SessionContext<'a> {
    pub blueprint: &'a Blueprint,
    pub scoring: ScoringConfig,
}

impl<'a> SessionContext<'a> {
    /// Context scored with the resolved config of `mode`.
    #[must_use]
    pub fn new(blueprint: &'a Blueprint, mode: &str) -> Self {
        Self {
            blueprint,
            scoring: scoring_config_for(mode, blueprint),
        }
    }

    /// Context scored with the blueprint's first active mechanic.
    #[must_use]
    pub fn for_blueprint(blueprint: &'a Blueprint) -> Self {
        let modes = blueprint.active_modes();
        let mode = modes.first().map_or("drag_drop", String::as_str);
        Self::new(blueprint, mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum SessionAction {
    PlaceLabel {
        label_id: String,
        zone_id: String,
        #[serde(default)]
        elapsed_ms: Option<u64>,
    },
    RemoveLabel {
        label_id: String,
    },
    RequestHint {
        zone_id: String,
    },
    Reset,
}

/// What the last action did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    Correct { points: i32 },
    Incorrect { penalty: i32, locked: bool },
    Distractor { explanation: String, penalty: i32 },
    HintRevealed { zone_id: String, text: String },
    Removed,
    /// The action had no effect (unknown id, locked or finished label, ...).
    Ignored { reason: String },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Running total, never below zero.
    pub score: u32,
    /// Correct placements, label id to zone id.
    pub placements: BTreeMap<String, String>,
    /// Labels whose correct placement has already been counted.
    #[serde(default)]
    pub scored: BTreeSet<String>,
    /// Attempts per label or distractor id.
    pub attempts: BTreeMap<String, u32>,
    pub locked: BTreeSet<String>,
    pub streak: u32,
    pub revealed_hints: BTreeSet<String>,
    pub completed: bool,
    pub last_outcome: Option<Outcome>,
}

impl SessionState {
    #[must_use]
    pub fn is_placed(&self, label_id: &str) -> bool {
        self.placements.contains_key(label_id)
    }

    fn ignored(&self, reason: impl Into<String>) -> Self {
        Self {
            last_outcome: Some(Outcome::Ignored {
                reason: reason.into(),
            }),
            ..self.clone()
        }
    }
}

/// Apply one action and return the next state; `state` is never modified.
#[must_use]
pub fn reduce(ctx: &SessionContext<'_>, state: &SessionState, action: &SessionAction) -> SessionState {
    match action {
        SessionAction::Reset => SessionState {
            last_outcome: Some(Outcome::Reset),
            ..SessionState::default()
        },
        SessionAction::PlaceLabel {
            label_id,
            zone_id,
            elapsed_ms,
        } => place_label(ctx, state, label_id, zone_id, *elapsed_ms),
        SessionAction::RemoveLabel { label_id } => {
            if state.completed {
                return state.ignored("session already completed");
            }
            let mut next = state.clone();
            if next.placements.remove(label_id).is_none() {
                return state.ignored(format!("label '{label_id}' is not placed"));
            }
            next.last_outcome = Some(Outcome::Removed);
            next
        }
        SessionAction::RequestHint { zone_id } => request_hint(ctx, state, zone_id),
    }
}

fn place_label(
    ctx: &SessionContext<'_>,
    state: &SessionState,
    label_id: &str,
    zone_id: &str,
    elapsed_ms: Option<u64>,
) -> SessionState {
    if state.completed {
        return state.ignored("session already completed");
    }
    if state.locked.contains(label_id) {
        return state.ignored(format!("label '{label_id}' is locked"));
    }
    if state.is_placed(label_id) {
        return state.ignored(format!("label '{label_id}' is already placed"));
    }
    if ctx.blueprint.zone(zone_id).is_none() {
        return state.ignored(format!("unknown zone '{zone_id}'"));
    }

    let mut next = state.clone();
    let attempts = next.attempts.entry(label_id.to_string()).or_insert(0);
    *attempts = attempts.saturating_add(1);
    let attempt_count = *attempts;

    if let Some(distractor) = ctx.blueprint.distractor(label_id) {
        let penalty = score_delta(&ctx.scoring, &ScoreEvent::incorrect());
        next.score = next.score.saturating_add_signed(penalty);
        next.streak = 0;
        next.last_outcome = Some(Outcome::Distractor {
            explanation: distractor.explanation.clone(),
            penalty,
        });
        return next;
    }
    let Some(label) = ctx.blueprint.label(label_id) else {
        return state.ignored(format!("unknown label '{label_id}'"));
    };

    let elapsed_secs = elapsed_ms.map(|ms| std::time::Duration::from_millis(ms).as_secs_f64());
    if label.correct_zone_id == zone_id {
        next.streak = next.streak.saturating_add(1);
        // Points are awarded once per label.
        let points = if next.scored.insert(label_id.to_string()) {
            score_delta(
                &ctx.scoring,
                &ScoreEvent {
                    is_correct: true,
                    attempt_count: Some(attempt_count),
                    consecutive_correct: Some(next.streak),
                    elapsed_secs,
                },
            )
        } else {
            0
        };
        next.score = next.score.saturating_add_signed(points);
        next.placements
            .insert(label_id.to_string(), zone_id.to_string());
        next.completed = ctx
            .blueprint
            .labels
            .iter()
            .all(|label| next.placements.contains_key(&label.id));
        next.last_outcome = Some(Outcome::Correct { points });
        if next.completed {
            log::debug!(target: "blueprint_core::session", "completed with score {}", next.score);
        }
    } else {
        let penalty = score_delta(
            &ctx.scoring,
            &ScoreEvent {
                attempt_count: Some(attempt_count),
                ..ScoreEvent::incorrect()
            },
        );
        next.score = next.score.saturating_add_signed(penalty);
        next.streak = 0;
        let locked = ctx
            .scoring
            .max_attempts
            .is_some_and(|max| attempt_count >= max);
        if locked {
            next.locked.insert(label_id.to_string());
        }
        next.last_outcome = Some(Outcome::Incorrect { penalty, locked });
    }
    next
}

fn request_hint(ctx: &SessionContext<'_>, state: &SessionState, zone_id: &str) -> SessionState {
    let text = ctx
        .blueprint
        .hints
        .iter()
        .find(|hint| hint.zone_id == zone_id)
        .map(|hint| hint.hint_text.clone())
        .or_else(|| ctx.blueprint.zone(zone_id).and_then(|zone| zone.hint.clone()));
    let Some(text) = text else {
        return state.ignored(format!("no hint for zone '{zone_id}'"));
    };
    let mut next = state.clone();
    next.revealed_hints.insert(zone_id.to_string());
    next.last_outcome = Some(Outcome::HintRevealed {
        zone_id: zone_id.to_string(),
        text,
    });
    next
}

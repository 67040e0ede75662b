//! Normalized blueprint data model handed to rendering collaborators.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::{SmallVec, smallvec};
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::schema::mechanics::MechanicConfigSet;

/// Ordered registry keys of a scene's mechanics; scenes rarely stack more
/// than two.
pub type ModeList = SmallVec<[String; 2]>;

/// Geometry family of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneShape {
    #[default]
    Circle,
    Rect,
    Polygon,
}

impl ZoneShape {
    #[must_use]
    pub fn from_tag(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "circle" | "point" => Some(Self::Circle),
            "rect" | "rectangle" | "box" => Some(Self::Rect),
            "polygon" | "poly" => Some(Self::Polygon),
            _ => None,
        }
    }
}

/// A labeled target region on the diagram. Coordinates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    #[serde(default)]
    pub shape: ZoneShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Set on zones created by the normalizer for dangling label references.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthesized: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A placeable answer entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub text: String,
    pub correct_zone_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A decoy label. It carries an explanation and never satisfies a placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistractorLabel {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Diagram asset with resolved pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_prompt: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Diagram as read from the document, before dimension coercion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagramDraft {
    pub asset_url: Option<String>,
    pub asset_prompt: Option<String>,
    pub width: Option<Value>,
    pub height: Option<Value>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub zone_id: String,
    pub hint_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackMessages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perfect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Misconception {
    pub trigger_label: String,
    pub message: String,
}

/// Scoring knobs declared by a document, either per mechanic or blueprint wide.
///
/// Every field is optional; resolution against defaults happens in
/// [`crate::scoring::scoring_config_for`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_points_per_item: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_credit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_bonus_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_bonus_max_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_bonus_window_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanicFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_correct: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_incorrect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_completion: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub misconceptions: Vec<Misconception>,
}

/// The ten interaction mechanics understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanicKind {
    DragDrop,
    Sequencing,
    SortingCategories,
    MemoryMatch,
    BranchingScenario,
    CompareContrast,
    ClickToIdentify,
    TracePath,
    DescriptionMatching,
    Generic,
}

impl MechanicKind {
    pub const ALL: [Self; 10] = [
        Self::DragDrop,
        Self::Sequencing,
        Self::SortingCategories,
        Self::MemoryMatch,
        Self::BranchingScenario,
        Self::CompareContrast,
        Self::ClickToIdentify,
        Self::TracePath,
        Self::DescriptionMatching,
        Self::Generic,
    ];

    /// Canonical tag used in documents and as registry key.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::DragDrop => "drag_drop",
            Self::Sequencing => "sequencing",
            Self::SortingCategories => "sorting_categories",
            Self::MemoryMatch => "memory_match",
            Self::BranchingScenario => "branching_scenario",
            Self::CompareContrast => "compare_contrast",
            Self::ClickToIdentify => "click_to_identify",
            Self::TracePath => "trace_path",
            Self::DescriptionMatching => "description_matching",
            Self::Generic => "generic",
        }
    }

    /// Document key holding this mechanic's config object.
    #[must_use]
    pub const fn config_key(self) -> Option<&'static str> {
        match self {
            Self::DragDrop => Some("dragDropConfig"),
            Self::Sequencing => Some("sequenceConfig"),
            Self::SortingCategories => Some("sortingConfig"),
            Self::MemoryMatch => Some("memoryMatchConfig"),
            Self::BranchingScenario => Some("branchingConfig"),
            Self::CompareContrast => Some("compareConfig"),
            Self::ClickToIdentify => Some("clickToIdentifyConfig"),
            Self::TracePath => Some("tracePathConfig"),
            Self::DescriptionMatching => Some("descriptionMatchingConfig"),
            Self::Generic => None,
        }
    }

    /// Resolve a tag, accepting short names and any casing.
    #[must_use]
    pub fn from_tag(raw: &str) -> Option<Self> {
        match canonical_tag(raw).as_str() {
            "drag_drop" | "drag_and_drop" | "label_diagram" => Some(Self::DragDrop),
            "sequencing" | "sequence" | "ordering" => Some(Self::Sequencing),
            "sorting_categories" | "sorting" | "categorization" => Some(Self::SortingCategories),
            "memory_match" | "memory" | "matching_pairs" => Some(Self::MemoryMatch),
            "branching_scenario" | "branching" | "decision_tree" => Some(Self::BranchingScenario),
            "compare_contrast" | "compare" => Some(Self::CompareContrast),
            "click_to_identify" | "identify" => Some(Self::ClickToIdentify),
            "trace_path" | "path_tracing" => Some(Self::TracePath),
            "description_matching" | "describe" => Some(Self::DescriptionMatching),
            "generic" => Some(Self::Generic),
            _ => None,
        }
    }
}

impl std::fmt::Display for MechanicKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Lower-snake a mechanic tag: `dragDrop`, `Drag-Drop` and `drag drop` all
/// become `drag_drop`.
#[must_use]
pub fn canonical_tag(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_lower = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else if ch == '-' || ch == ' ' || ch == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out.trim_end_matches('_').to_string()
}

/// Registry key for a mechanic tag: the canonical tag of a known kind, the
/// lower-snake form of anything else.
#[must_use]
pub fn mode_key(raw: &str) -> String {
    MechanicKind::from_tag(raw).map_or_else(|| canonical_tag(raw), |kind| kind.tag().to_string())
}

/// One activated mechanic of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanicEntry {
    /// Registry key (see [`mode_key`]); unknown tags are kept verbatim.
    #[serde(rename = "type")]
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<MechanicFeedback>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MechanicEntry {
    #[must_use]
    pub fn new(mode: &str) -> Self {
        Self {
            mode: mode_key(mode),
            scoring: None,
            feedback: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> MechanicKind {
        MechanicKind::from_tag(&self.mode).unwrap_or(MechanicKind::Generic)
    }
}

/// A schema-validated scene whose identifiers have not been repaired yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlueprintDraft {
    pub template_type: String,
    pub title: String,
    pub narrative_intro: Option<String>,
    pub diagram: DiagramDraft,
    pub zones: Vec<Zone>,
    pub labels: Vec<Label>,
    pub distractor_labels: Vec<DistractorLabel>,
    pub interaction_mode: Option<String>,
    pub mechanics: Vec<MechanicEntry>,
    pub configs: MechanicConfigSet,
    pub scoring_strategy: Option<ScoringOverride>,
    pub hints: Vec<Hint>,
    pub feedback_messages: Option<FeedbackMessages>,
    pub extra: Map<String, Value>,
}

/// Normalized, renderable scene.
///
/// Zone and label identifiers are unique and every label references a zone
/// present in `zones`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub template_type: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative_intro: Option<String>,
    pub diagram: Diagram,
    pub zones: Vec<Zone>,
    pub labels: Vec<Label>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub distractor_labels: Vec<DistractorLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_mode: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mechanics: Vec<MechanicEntry>,
    #[serde(flatten)]
    pub configs: MechanicConfigSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring_strategy: Option<ScoringOverride>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_messages: Option<FeedbackMessages>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Blueprint {
    #[must_use]
    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    #[must_use]
    pub fn label(&self, id: &str) -> Option<&Label> {
        self.labels.iter().find(|label| label.id == id)
    }

    #[must_use]
    pub fn distractor(&self, id: &str) -> Option<&DistractorLabel> {
        self.distractor_labels.iter().find(|label| label.id == id)
    }

    /// Mechanic entry declared for `mode`, if any.
    #[must_use]
    pub fn mechanic(&self, mode: &str) -> Option<&MechanicEntry> {
        let key = mode_key(mode);
        self.mechanics.iter().find(|entry| entry.mode == key)
    }

    /// Ordered registry keys of the mechanics this scene activates.
    ///
    /// Declared `mechanics` win, then `interactionMode`, then drag-and-drop.
    #[must_use]
    pub fn active_modes(&self) -> ModeList {
        if !self.mechanics.is_empty() {
            return self.mechanics.iter().map(|entry| entry.mode.clone()).collect();
        }
        let mode = self
            .interaction_mode
            .as_deref()
            .map(str::trim)
            .filter(|mode| !mode.is_empty())
            .map_or_else(|| MechanicKind::DragDrop.tag().to_string(), mode_key);
        smallvec![mode]
    }

    /// Serialize back into a document value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// XxHash64 of the canonical JSON form; equal blueprints hash equal.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(&bytes);
        hasher.finish()
    }
}

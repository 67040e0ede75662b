//! Identifier repair and fallback layout.
//!
//! Turns a [`BlueprintDraft`] into a [`Blueprint`] whose zone and label ids are
//! unique and whose label references all resolve. Processing is strictly in
//! document order, so the same draft always yields the same blueprint.
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use crate::constants::{
    DEFAULT_DIAGRAM_HEIGHT, DEFAULT_DIAGRAM_WIDTH, DISTRACTOR_ID_PREFIX, FALLBACK_ZONE_RADIUS,
    FIRST_COLLISION_SUFFIX, LABEL_ID_PREFIX, ZONE_ID_PREFIX,
};
use crate::model::{Blueprint, BlueprintDraft, Diagram, DiagramDraft, Hint, Label, Zone, ZoneShape};
use crate::numbers::{round_f64_to_u32, round_hundredths, usize_to_f64};

const fn default_width() -> u32 {
    DEFAULT_DIAGRAM_WIDTH
}

const fn default_height() -> u32 {
    DEFAULT_DIAGRAM_HEIGHT
}

const fn default_fallback_radius() -> f64 {
    FALLBACK_ZONE_RADIUS
}

/// Caller-tunable layout defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    #[serde(default = "default_width")]
    pub default_width: u32,
    #[serde(default = "default_height")]
    pub default_height: u32,
    /// Radius of zones synthesized for dangling label references.
    #[serde(default = "default_fallback_radius")]
    pub fallback_radius: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_width: default_width(),
            default_height: default_height(),
            fallback_radius: default_fallback_radius(),
        }
    }
}

/// An identifier that had to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdRename {
    pub index: usize,
    pub original: String,
    pub assigned: String,
}

/// A label whose zone reference was rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRemap {
    pub label_id: String,
    pub original: String,
    pub resolved: String,
}

/// Everything the normalizer changed, for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationReport {
    pub zone_renames: Vec<IdRename>,
    pub label_renames: Vec<IdRename>,
    pub distractor_renames: Vec<IdRename>,
    pub reference_remaps: Vec<ReferenceRemap>,
    pub synthesized_zones: Vec<String>,
    pub defaulted_dimensions: bool,
}

impl NormalizationReport {
    /// True when the draft was already internally consistent.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.zone_renames.is_empty()
            && self.label_renames.is_empty()
            && self.distractor_renames.is_empty()
            && self.reference_remaps.is_empty()
            && self.synthesized_zones.is_empty()
    }
}

/// A normalized blueprint with its repair log.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub blueprint: Blueprint,
    pub report: NormalizationReport,
}

/// Arena handle of a zone in the output list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ZoneHandle(usize);

/// Hands out unique identifiers within one id space.
///
/// Per-base suffix counters make repeated collisions on the same base O(1)
/// amortized; the result is still the smallest free `_<n>` with `n >= 2`.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    used: HashSet<String>,
    next_suffix: HashMap<String, u32>,
}

impl IdAllocator {
    pub(crate) fn contains(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    pub(crate) fn allocate(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut suffix = self
            .next_suffix
            .get(base)
            .copied()
            .unwrap_or(FIRST_COLLISION_SUFFIX);
        let mut candidate = format!("{base}_{suffix}");
        while self.used.contains(&candidate) {
            suffix = suffix.saturating_add(1);
            candidate = format!("{base}_{suffix}");
        }
        self.next_suffix.insert(base.to_string(), suffix.saturating_add(1));
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Lower-case slug of free text; empty when nothing alphanumeric remains.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}

fn dimension_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^\s*([+-]?\d+(?:\.\d+)?)\s*(?:px)?\s*$").ok())
        .as_ref()
}

/// Coerce a numeric, numeric-string or `"<n>px"` dimension to whole pixels.
///
/// Returns `None` for absent, non-finite, non-positive or unparseable input.
#[must_use]
pub fn coerce_dimension(value: Option<&Value>) -> Option<u32> {
    let raw = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => dimension_pattern()
            .and_then(|pattern| pattern.captures(text))
            .and_then(|captures| captures.get(1))
            .and_then(|digits| digits.as_str().parse::<f64>().ok()),
        _ => None,
    }?;
    (raw.is_finite() && raw > 0.0).then(|| round_f64_to_u32(raw))
}

fn resolve_diagram(
    draft: DiagramDraft,
    layout: &LayoutConfig,
    report: &mut NormalizationReport,
) -> Diagram {
    let width = coerce_dimension(draft.width.as_ref());
    let height = coerce_dimension(draft.height.as_ref());
    if width.is_none() || height.is_none() {
        report.defaulted_dimensions = true;
        log::debug!(
            target: "blueprint_core::normalize",
            "diagram dimensions {:?}x{:?} defaulted",
            draft.width,
            draft.height
        );
    }
    Diagram {
        asset_url: draft.asset_url,
        asset_prompt: draft.asset_prompt,
        width: width.unwrap_or(layout.default_width),
        height: height.unwrap_or(layout.default_height),
        extra: draft.extra,
    }
}

/// Grid slot `index` of `count` synthesized zones, in percent coordinates.
///
/// `rows = ceil(sqrt(count))`, `cols = ceil(count / rows)`; every slot lies
/// strictly inside `0..100` and no two slots coincide.
#[must_use]
pub fn grid_position(index: usize, count: usize) -> (f64, f64) {
    let count = count.max(1);
    let rows = count.isqrt() + usize::from(count.isqrt() * count.isqrt() < count);
    let cols = count.div_ceil(rows);
    let col = index % cols;
    let row = index / cols;
    let x = usize_to_f64(col + 1) * 100.0 / usize_to_f64(cols + 1);
    let y = usize_to_f64(row + 1) * 100.0 / usize_to_f64(rows + 1);
    (round_hundredths(x), round_hundredths(y))
}

struct ZoneArena {
    zones: Vec<Zone>,
    ids: IdAllocator,
    /// Original id -> handles of the zones that carried it, in document order.
    queues: HashMap<String, VecDeque<ZoneHandle>>,
    /// Original id -> last handle handed out, reused once the queue drains.
    sticky: HashMap<String, ZoneHandle>,
}

impl ZoneArena {
    fn build(zones: Vec<Zone>, report: &mut NormalizationReport) -> Self {
        let mut arena = Self {
            zones: Vec::with_capacity(zones.len()),
            ids: IdAllocator::default(),
            queues: HashMap::new(),
            sticky: HashMap::new(),
        };
        for (index, mut zone) in zones.into_iter().enumerate() {
            let original = zone.id.trim().to_string();
            let base = if original.is_empty() {
                format!("{ZONE_ID_PREFIX}{}", index + 1)
            } else {
                original.clone()
            };
            let assigned = arena.ids.allocate(&base);
            if assigned != zone.id {
                log::debug!(
                    target: "blueprint_core::normalize",
                    "zone {index}: '{}' -> '{assigned}'",
                    zone.id
                );
                report.zone_renames.push(IdRename {
                    index,
                    original: zone.id.clone(),
                    assigned: assigned.clone(),
                });
            }
            zone.id = assigned;
            let handle = ZoneHandle(arena.zones.len());
            if !original.is_empty() {
                arena.queues.entry(original).or_default().push_back(handle);
            }
            arena.zones.push(zone);
        }
        arena
    }

    fn id(&self, handle: ZoneHandle) -> &str {
        &self.zones[handle.0].id
    }

    /// Next zone renamed from `original`, in document order.
    fn take_renamed(&mut self, original: &str) -> Option<ZoneHandle> {
        let next = self
            .queues
            .get_mut(original)
            .and_then(VecDeque::pop_front);
        if let Some(handle) = next {
            self.sticky.insert(original.to_string(), handle);
            return Some(handle);
        }
        // Drained queue: later references stay on the last zone handed out.
        self.sticky.get(original).copied()
    }
}

/// Resolve one label reference to a zone id, which may not exist yet.
fn resolve_reference(arena: &mut ZoneArena, reference: &str, label_index: usize) -> String {
    let reference = reference.trim();
    if !reference.is_empty() {
        if let Some(handle) = arena.take_renamed(reference) {
            return arena.id(handle).to_string();
        }
        return reference.to_string();
    }
    arena.zones.get(label_index).map_or_else(
        || format!("{ZONE_ID_PREFIX}{}", label_index + 1),
        |zone| zone.id.clone(),
    )
}

fn base_label_id(id: &str, text: &str, prefix: &str, index: usize) -> String {
    let id = id.trim();
    if !id.is_empty() {
        return id.to_string();
    }
    let slug = slugify(text);
    if slug.is_empty() {
        format!("{prefix}{}", index + 1)
    } else {
        slug
    }
}

/// Normalize with the default layout.
#[must_use]
pub fn normalize_blueprint(draft: BlueprintDraft) -> Normalized {
    normalize(draft, &LayoutConfig::default())
}

/// Repair identifiers, re-link labels and synthesize missing zones.
#[must_use]
pub fn normalize(draft: BlueprintDraft, layout: &LayoutConfig) -> Normalized {
    let mut report = NormalizationReport::default();
    let diagram = resolve_diagram(draft.diagram, layout, &mut report);
    let mut arena = ZoneArena::build(draft.zones, &mut report);

    let mut label_ids = IdAllocator::default();
    let mut labels: Vec<Label> = Vec::with_capacity(draft.labels.len());
    let mut pending: Vec<(String, String)> = Vec::new();
    for (index, mut label) in draft.labels.into_iter().enumerate() {
        let base = base_label_id(&label.id, &label.text, LABEL_ID_PREFIX, index);
        let assigned = label_ids.allocate(&base);
        if assigned != label.id {
            report.label_renames.push(IdRename {
                index,
                original: label.id.clone(),
                assigned: assigned.clone(),
            });
        }
        label.id = assigned;

        let resolved = resolve_reference(&mut arena, &label.correct_zone_id, index);
        if resolved != label.correct_zone_id {
            report.reference_remaps.push(ReferenceRemap {
                label_id: label.id.clone(),
                original: label.correct_zone_id.clone(),
                resolved: resolved.clone(),
            });
        }
        if !arena.ids.contains(&resolved) && !pending.iter().any(|(id, _)| *id == resolved) {
            pending.push((resolved.clone(), label.text.clone()));
        }
        label.correct_zone_id = resolved;
        labels.push(label);
    }

    let count = pending.len();
    for (slot, (id, text)) in pending.into_iter().enumerate() {
        let (x, y) = grid_position(slot, count);
        let assigned = arena.ids.allocate(&id);
        log::debug!(
            target: "blueprint_core::normalize",
            "synthesized zone '{assigned}' at ({x}, {y})"
        );
        report.synthesized_zones.push(assigned.clone());
        arena.zones.push(Zone {
            id: assigned,
            label: text,
            x,
            y,
            radius: layout.fallback_radius,
            shape: ZoneShape::Circle,
            width: None,
            height: None,
            points: Vec::new(),
            description: None,
            hint: None,
            synthesized: true,
            extra: serde_json::Map::new(),
        });
    }

    let mut distractor_labels = draft.distractor_labels;
    for (index, distractor) in distractor_labels.iter_mut().enumerate() {
        let base = base_label_id(&distractor.id, &distractor.text, DISTRACTOR_ID_PREFIX, index);
        let assigned = label_ids.allocate(&base);
        if assigned != distractor.id {
            report.distractor_renames.push(IdRename {
                index,
                original: distractor.id.clone(),
                assigned: assigned.clone(),
            });
        }
        distractor.id = assigned;
    }

    let hints = relink_hints(draft.hints, &arena.ids, &report.zone_renames);

    Normalized {
        blueprint: Blueprint {
            template_type: draft.template_type,
            title: draft.title,
            narrative_intro: draft.narrative_intro,
            diagram,
            zones: arena.zones,
            labels,
            distractor_labels,
            interaction_mode: draft.interaction_mode,
            mechanics: draft.mechanics,
            configs: draft.configs,
            scoring_strategy: draft.scoring_strategy,
            hints,
            feedback_messages: draft.feedback_messages,
            extra: draft.extra,
        },
        report,
    }
}

/// Hints whose zone id no longer exists follow the first zone renamed from it.
fn relink_hints(hints: Vec<Hint>, zones: &IdAllocator, renames: &[IdRename]) -> Vec<Hint> {
    hints
        .into_iter()
        .map(|mut hint| {
            if !zones.contains(&hint.zone_id) {
                let wanted = hint.zone_id.trim();
                if let Some(rename) = renames.iter().find(|rename| rename.original.trim() == wanted) {
                    hint.zone_id.clone_from(&rename.assigned);
                }
            }
            hint
        })
        .collect()
}

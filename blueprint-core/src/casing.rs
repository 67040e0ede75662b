//! Key casing normalization for inbound documents.
//!
//! Generated documents mix `snake_case` and `camelCase` keys. Every helper in
//! this module appends the canonical key next to the original one: values are
//! never overwritten and original keys are never removed.

use serde_json::{Map, Value};

use crate::model::Misconception;

/// Canonical camelCase forms for the document-level keys we read.
pub const DOCUMENT_KEY_ALIASES: &[(&str, &str)] = &[
    ("sequence_config", "sequenceConfig"),
    ("sorting_config", "sortingConfig"),
    ("memory_match_config", "memoryMatchConfig"),
    ("branching_config", "branchingConfig"),
    ("drag_drop_config", "dragDropConfig"),
    ("click_to_identify_config", "clickToIdentifyConfig"),
    ("trace_path_config", "tracePathConfig"),
    ("compare_config", "compareConfig"),
    ("description_matching_config", "descriptionMatchingConfig"),
    ("scoring_strategy", "scoringStrategy"),
    ("distractor_labels", "distractorLabels"),
    ("narrative_intro", "narrativeIntro"),
];

pub const SEQUENCE_ITEM_ALIASES: &[(&str, &str)] = &[
    ("content", "text"),
    ("explanation", "description"),
    ("image_url", "image"),
    ("imageUrl", "image"),
];

pub const SORTING_ITEM_ALIASES: &[(&str, &str)] = &[
    ("correct_category_id", "correctCategoryId"),
    ("category_id", "correctCategoryId"),
    ("categoryId", "correctCategoryId"),
    ("content", "text"),
];

pub const MEMORY_PAIR_ALIASES: &[(&str, &str)] = &[
    ("front_content", "front"),
    ("frontContent", "front"),
    ("back_content", "back"),
    ("backContent", "back"),
];

pub const BRANCHING_CONFIG_ALIASES: &[(&str, &str)] = &[("start_node_id", "startNodeId")];

pub const BRANCHING_NODE_ALIASES: &[(&str, &str)] = &[
    ("prompt", "question"),
    ("is_end_node", "isEndNode"),
    ("end_message", "endMessage"),
];

pub const BRANCHING_OPTION_ALIASES: &[(&str, &str)] = &[
    ("next_node_id", "nextNodeId"),
    ("is_correct", "isCorrect"),
];

pub const SCORING_KEY_ALIASES: &[(&str, &str)] = &[
    ("points_per_correct", "basePointsPerItem"),
    ("pointsPerCorrect", "basePointsPerItem"),
    ("base_points_per_zone", "basePointsPerItem"),
    ("basePointsPerZone", "basePointsPerItem"),
    ("max_score", "maxScore"),
    ("partial_credit", "partialCredit"),
];

/// Append `canonical` for every `(alias, canonical)` entry whose alias is
/// present and whose canonical key is absent.
#[must_use]
pub fn promote_aliases(map: &Map<String, Value>, table: &[(&str, &str)]) -> Map<String, Value> {
    let mut out = map.clone();
    for &(alias, canonical) in table {
        if out.contains_key(canonical) {
            continue;
        }
        if let Some(value) = map.get(alias) {
            out.insert(canonical.to_string(), value.clone());
        }
    }
    out
}

/// Promote the fixed document-level key table.
#[must_use]
pub fn promote_known_keys(map: &Map<String, Value>) -> Map<String, Value> {
    promote_aliases(map, DOCUMENT_KEY_ALIASES)
}

/// Transliterate one `snake_case` key to `camelCase`.
///
/// Leading underscores are kept so private-looking keys stay distinct.
#[must_use]
pub fn snake_to_camel(key: &str) -> String {
    let leading = key.len() - key.trim_start_matches('_').len();
    let mut out = String::with_capacity(key.len());
    out.push_str(&key[..leading]);
    let mut upper_next = false;
    for ch in key[leading..].chars() {
        if ch == '_' {
            upper_next = !out[leading..].is_empty();
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

pub(crate) fn canonical_key(key: &str) -> String {
    DOCUMENT_KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or_else(|| snake_to_camel(key), |(_, canonical)| (*canonical).to_string())
}

/// Append a camelCase twin for every snake_case key of a flat map.
///
/// The fixed document table wins over plain transliteration.
#[must_use]
pub fn camelize_keys(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = map.clone();
    for (key, value) in map {
        if !key.contains('_') {
            continue;
        }
        let canonical = canonical_key(key);
        if canonical != *key && !out.contains_key(&canonical) {
            out.insert(canonical, value.clone());
        }
    }
    out
}

/// Camelize the object elements of the array stored under `field`, then apply
/// an item-level alias table to each of them.
pub fn camelize_array_items(map: &mut Map<String, Value>, field: &str, aliases: &[(&str, &str)]) {
    let Some(Value::Array(items)) = map.get_mut(field) else {
        return;
    };
    for item in items.iter_mut() {
        if let Value::Object(obj) = item {
            *obj = promote_aliases(&camelize_keys(obj), aliases);
        }
    }
}

/// Accept misconceptions either as `[{trigger_label, message}]` or as a flat
/// `{label: message}` map and return the array form.
///
/// Malformed entries are skipped.
#[must_use]
pub fn normalize_misconceptions(value: &Value) -> Vec<Misconception> {
    match value {
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| {
                let obj = entry.as_object()?;
                let trigger = ["trigger_label", "triggerLabel", "label"]
                    .iter()
                    .find_map(|key| obj.get(*key).and_then(Value::as_str))?;
                let message = obj.get("message").and_then(Value::as_str)?;
                Some(Misconception {
                    trigger_label: trigger.to_string(),
                    message: message.to_string(),
                })
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(label, message)| {
                message.as_str().map(|message| Misconception {
                    trigger_label: label.clone(),
                    message: message.to_string(),
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

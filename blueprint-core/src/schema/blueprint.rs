//! Scene-level blueprint parsing.
//!
//! Produces a [`BlueprintDraft`] whose identifiers are still unrepaired. Every
//! structural problem becomes an issue; the draft is always returned.
use serde_json::{Map, Value};

use super::{
    IssueSink, Parsed, SchemaError, collect_extra, index_path, join_path, read_array, read_bool,
    read_number, read_string, type_name, validate_mechanic_config,
};
use crate::casing::{SCORING_KEY_ALIASES, camelize_keys, normalize_misconceptions, promote_aliases};
use crate::constants::{
    COORD_MAX, COORD_MIN, DEFAULT_TEMPLATE_TYPE, DEFAULT_ZONE_RADIUS, DEFAULT_ZONE_X,
    DEFAULT_ZONE_Y,
};
use crate::model::{
    BlueprintDraft, DiagramDraft, DistractorLabel, FeedbackMessages, Hint, Label, MechanicEntry,
    MechanicFeedback, MechanicKind, ScoringOverride, Zone, ZoneShape, mode_key,
};
use crate::schema::MechanicConfigSet;

const ROOT_KEYS: &[&str] = &[
    "templateType",
    "title",
    "narrativeIntro",
    "diagram",
    "zones",
    "labels",
    "distractorLabels",
    "interactionMode",
    "mechanics",
    "scoringStrategy",
    "hints",
    "feedbackMessages",
    "misconceptions",
    "dragDropConfig",
    "sequenceConfig",
    "sortingConfig",
    "memoryMatchConfig",
    "branchingConfig",
    "compareConfig",
    "clickToIdentifyConfig",
    "tracePathConfig",
    "descriptionMatchingConfig",
];

const DIAGRAM_KEYS: &[&str] = &["assetUrl", "url", "imageUrl", "assetPrompt", "width", "height"];

const ZONE_KEYS: &[&str] = &[
    "id",
    "label",
    "name",
    "x",
    "y",
    "radius",
    "shape",
    "width",
    "height",
    "points",
    "description",
    "hint",
    "synthesized",
];

const LABEL_KEYS: &[&str] = &["id", "text", "label", "correctZoneId", "zoneId", "targetZoneId"];

const DISTRACTOR_KEYS: &[&str] = &["id", "text", "label", "explanation", "reason"];

const MECHANIC_KEYS: &[&str] = &["type", "mode", "mechanic", "scoring", "feedback"];

/// Parse a single-scene blueprint document.
#[must_use]
pub fn parse_blueprint(value: &Value) -> Parsed<BlueprintDraft> {
    parse_blueprint_at(value, "")
}

/// Parse a blueprint embedded at `prefix` (e.g. `scenes[2].blueprint`), so
/// issue paths point into the enclosing document.
#[must_use]
pub fn parse_blueprint_at(value: &Value, prefix: &str) -> Parsed<BlueprintDraft> {
    let mut sink = IssueSink::default();
    let Value::Object(raw) = value else {
        sink.push(&SchemaError::WrongType {
            path: if prefix.is_empty() { "$".to_string() } else { prefix.to_string() },
            expected: "object",
        });
        return Parsed {
            value: BlueprintDraft {
                template_type: DEFAULT_TEMPLATE_TYPE.to_string(),
                ..BlueprintDraft::default()
            },
            issues: sink.into_vec(),
        };
    };
    let map = camelize_keys(raw);
    let draft = BlueprintDraft {
        template_type: read_string(&map, &["templateType"], prefix, &mut sink)
            .filter(|tag| !tag.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TEMPLATE_TYPE.to_string()),
        title: read_string(&map, &["title"], prefix, &mut sink).unwrap_or_default(),
        narrative_intro: read_string(&map, &["narrativeIntro"], prefix, &mut sink),
        diagram: parse_diagram(map.get("diagram"), &join_path(prefix, "diagram"), &mut sink),
        zones: parse_zones(&map, prefix, &mut sink),
        labels: parse_labels(&map, prefix, &mut sink),
        distractor_labels: parse_distractors(&map, prefix, &mut sink),
        interaction_mode: read_string(&map, &["interactionMode"], prefix, &mut sink)
            .filter(|mode| !mode.trim().is_empty()),
        mechanics: parse_mechanics(&map, prefix, &mut sink),
        configs: parse_configs(&map, prefix, &mut sink),
        scoring_strategy: map.get("scoringStrategy").and_then(|value| {
            parse_scoring_override(value, &join_path(prefix, "scoringStrategy"), &mut sink)
        }),
        hints: parse_hints(map.get("hints"), &join_path(prefix, "hints"), &mut sink),
        feedback_messages: parse_feedback_messages(
            map.get("feedbackMessages"),
            &join_path(prefix, "feedbackMessages"),
            &mut sink,
        ),
        extra: root_extra(&map),
    };
    Parsed {
        value: draft,
        issues: sink.into_vec(),
    }
}

fn root_extra(map: &Map<String, Value>) -> Map<String, Value> {
    let mut extra = collect_extra(map, ROOT_KEYS);
    if let Some(misconceptions) = map.get("misconceptions") {
        let normalized = normalize_misconceptions(misconceptions);
        extra.insert(
            "misconceptions".to_string(),
            serde_json::to_value(normalized).unwrap_or(Value::Null),
        );
    }
    extra
}

fn parse_diagram(value: Option<&Value>, path: &str, sink: &mut IssueSink) -> DiagramDraft {
    let map = match value {
        None | Some(Value::Null) => return DiagramDraft::default(),
        Some(Value::Object(map)) => camelize_keys(map),
        Some(other) => {
            sink.push(&SchemaError::WrongType {
                path: path.to_string(),
                expected: "object",
            });
            log::debug!(target: "blueprint_core::schema", "diagram was {}", type_name(other));
            return DiagramDraft::default();
        }
    };
    DiagramDraft {
        asset_url: read_string(&map, &["assetUrl", "url", "imageUrl"], path, sink),
        asset_prompt: read_string(&map, &["assetPrompt"], path, sink),
        width: map.get("width").filter(|value| !value.is_null()).cloned(),
        height: map.get("height").filter(|value| !value.is_null()).cloned(),
        extra: collect_extra(&map, DIAGRAM_KEYS),
    }
}

/// Object elements of the array under `key`, camelized, with their paths.
fn object_items(
    map: &Map<String, Value>,
    key: &str,
    prefix: &str,
    sink: &mut IssueSink,
) -> Vec<(String, Map<String, Value>)> {
    let list_path = join_path(prefix, key);
    read_array(map, key, prefix, sink)
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let path = index_path(&list_path, index);
            if let Value::Object(obj) = item {
                Some((path, camelize_keys(obj)))
            } else {
                sink.push(&SchemaError::WrongType {
                    path,
                    expected: "object",
                });
                None
            }
        })
        .collect()
}

fn coordinate(
    map: &Map<String, Value>,
    key: &str,
    fallback: f64,
    path: &str,
    sink: &mut IssueSink,
) -> f64 {
    let Some(value) = read_number(map, &[key], path, sink) else {
        return fallback;
    };
    if (COORD_MIN..=COORD_MAX).contains(&value) {
        value
    } else {
        sink.push(&SchemaError::OutOfRange {
            path: join_path(path, key),
            min: COORD_MIN,
            max: COORD_MAX,
            value,
        });
        value.clamp(COORD_MIN, COORD_MAX)
    }
}

fn parse_points(value: Option<&Value>, path: &str, sink: &mut IssueSink) -> Vec<[f64; 2]> {
    let Some(Value::Array(points)) = value else {
        if value.is_some_and(|value| !value.is_null()) {
            sink.push(&SchemaError::WrongType {
                path: path.to_string(),
                expected: "array",
            });
        }
        return Vec::new();
    };
    points
        .iter()
        .enumerate()
        .filter_map(|(index, point)| {
            let pair = match point {
                Value::Array(pair) if pair.len() == 2 => {
                    pair[0].as_f64().zip(pair[1].as_f64())
                }
                Value::Object(obj) => obj
                    .get("x")
                    .and_then(Value::as_f64)
                    .zip(obj.get("y").and_then(Value::as_f64)),
                _ => None,
            };
            if pair.is_none() {
                sink.push(&SchemaError::WrongType {
                    path: index_path(path, index),
                    expected: "[x, y] point",
                });
            }
            pair.map(|(x, y)| [x, y])
        })
        .collect()
}

fn parse_zones(map: &Map<String, Value>, prefix: &str, sink: &mut IssueSink) -> Vec<Zone> {
    object_items(map, "zones", prefix, sink)
        .into_iter()
        .map(|(path, zone)| {
            let shape = match read_string(&zone, &["shape"], &path, sink) {
                None => ZoneShape::default(),
                Some(tag) => ZoneShape::from_tag(&tag).unwrap_or_else(|| {
                    sink.push(&SchemaError::invalid(
                        join_path(&path, "shape"),
                        format!("unknown zone shape '{tag}'"),
                    ));
                    ZoneShape::default()
                }),
            };
            let radius = match read_number(&zone, &["radius"], &path, sink) {
                Some(radius) if radius > 0.0 => radius,
                Some(radius) => {
                    sink.push(&SchemaError::invalid(
                        join_path(&path, "radius"),
                        format!("radius must be positive, found {radius}"),
                    ));
                    DEFAULT_ZONE_RADIUS
                }
                None => DEFAULT_ZONE_RADIUS,
            };
            Zone {
                id: read_string(&zone, &["id"], &path, sink).unwrap_or_default(),
                label: read_string(&zone, &["label", "name"], &path, sink).unwrap_or_default(),
                x: coordinate(&zone, "x", DEFAULT_ZONE_X, &path, sink),
                y: coordinate(&zone, "y", DEFAULT_ZONE_Y, &path, sink),
                radius,
                shape,
                width: read_number(&zone, &["width"], &path, sink),
                height: read_number(&zone, &["height"], &path, sink),
                points: parse_points(zone.get("points"), &join_path(&path, "points"), sink),
                description: read_string(&zone, &["description"], &path, sink),
                hint: read_string(&zone, &["hint"], &path, sink),
                synthesized: read_bool(&zone, &["synthesized"], &path, sink).unwrap_or(false),
                extra: collect_extra(&zone, ZONE_KEYS),
            }
        })
        .collect()
}

fn parse_labels(map: &Map<String, Value>, prefix: &str, sink: &mut IssueSink) -> Vec<Label> {
    object_items(map, "labels", prefix, sink)
        .into_iter()
        .map(|(path, label)| {
            let correct_zone_id =
                read_string(&label, &["correctZoneId", "zoneId", "targetZoneId"], &path, sink)
                    .unwrap_or_default();
            if correct_zone_id.trim().is_empty() {
                sink.push(&SchemaError::EmptyReference {
                    path: join_path(&path, "correctZoneId"),
                });
            }
            Label {
                id: read_string(&label, &["id"], &path, sink).unwrap_or_default(),
                text: read_string(&label, &["text", "label"], &path, sink).unwrap_or_default(),
                correct_zone_id,
                extra: collect_extra(&label, LABEL_KEYS),
            }
        })
        .collect()
}

fn parse_distractors(
    map: &Map<String, Value>,
    prefix: &str,
    sink: &mut IssueSink,
) -> Vec<DistractorLabel> {
    object_items(map, "distractorLabels", prefix, sink)
        .into_iter()
        .map(|(path, distractor)| DistractorLabel {
            id: read_string(&distractor, &["id"], &path, sink).unwrap_or_default(),
            text: read_string(&distractor, &["text", "label"], &path, sink).unwrap_or_default(),
            explanation: read_string(&distractor, &["explanation", "reason"], &path, sink)
                .unwrap_or_default(),
            extra: collect_extra(&distractor, DISTRACTOR_KEYS),
        })
        .collect()
}

fn parse_mechanics(
    map: &Map<String, Value>,
    prefix: &str,
    sink: &mut IssueSink,
) -> Vec<MechanicEntry> {
    let list_path = join_path(prefix, "mechanics");
    read_array(map, "mechanics", prefix, sink)
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let path = index_path(&list_path, index);
            match entry {
                Value::String(tag) if !tag.trim().is_empty() => Some(MechanicEntry::new(tag)),
                Value::Object(obj) => parse_mechanic_entry(&camelize_keys(obj), &path, sink),
                _ => {
                    sink.push(&SchemaError::WrongType {
                        path,
                        expected: "mechanic tag or object",
                    });
                    None
                }
            }
        })
        .collect()
}

fn parse_mechanic_entry(
    obj: &Map<String, Value>,
    path: &str,
    sink: &mut IssueSink,
) -> Option<MechanicEntry> {
    let Some(tag) = read_string(obj, &["type", "mode", "mechanic"], path, sink)
        .filter(|tag| !tag.trim().is_empty())
    else {
        sink.push(&SchemaError::Missing {
            path: join_path(path, "type"),
        });
        return None;
    };
    let mut entry = MechanicEntry::new(&tag);
    if MechanicKind::from_tag(&tag).is_none() {
        log::debug!(
            target: "blueprint_core::schema",
            "{path}: mechanic '{tag}' is not built in, keeping it as '{}'",
            mode_key(&tag)
        );
    }
    entry.scoring = obj
        .get("scoring")
        .and_then(|value| parse_scoring_override(value, &join_path(path, "scoring"), sink));
    entry.feedback = obj
        .get("feedback")
        .and_then(|value| parse_mechanic_feedback(value, &join_path(path, "feedback"), sink));
    entry.extra = collect_extra(obj, MECHANIC_KEYS);
    Some(entry)
}

fn parse_configs(map: &Map<String, Value>, prefix: &str, sink: &mut IssueSink) -> MechanicConfigSet {
    let mut configs = MechanicConfigSet::default();
    for kind in MechanicKind::ALL {
        let Some(key) = kind.config_key() else {
            continue;
        };
        let Some(value) = map.get(key).filter(|value| !value.is_null()) else {
            continue;
        };
        match validate_mechanic_config(kind, value, &join_path(prefix, key)) {
            Ok(config) => configs.insert(config),
            Err(errors) => sink.extend(&errors.0),
        }
    }
    configs
}

fn parse_scoring_override(
    value: &Value,
    path: &str,
    sink: &mut IssueSink,
) -> Option<ScoringOverride> {
    let map = match value {
        Value::Null => return None,
        Value::Object(map) => promote_aliases(&camelize_keys(map), SCORING_KEY_ALIASES),
        _ => {
            sink.push(&SchemaError::WrongType {
                path: path.to_string(),
                expected: "object",
            });
            return None;
        }
    };
    match serde_json::from_value::<ScoringOverride>(Value::Object(map)) {
        Ok(scoring) => Some(scoring),
        Err(err) => {
            sink.push(&SchemaError::Decode {
                path: path.to_string(),
                message: err.to_string(),
            });
            None
        }
    }
}

fn parse_mechanic_feedback(
    value: &Value,
    path: &str,
    sink: &mut IssueSink,
) -> Option<MechanicFeedback> {
    let map = match value {
        Value::Null => return None,
        Value::Object(map) => camelize_keys(map),
        _ => {
            sink.push(&SchemaError::WrongType {
                path: path.to_string(),
                expected: "object",
            });
            return None;
        }
    };
    Some(MechanicFeedback {
        on_correct: read_string(&map, &["onCorrect", "correct"], path, sink),
        on_incorrect: read_string(&map, &["onIncorrect", "incorrect"], path, sink),
        on_completion: read_string(&map, &["onCompletion", "completion"], path, sink),
        misconceptions: map
            .get("misconceptions")
            .map(normalize_misconceptions)
            .unwrap_or_default(),
    })
}

fn parse_hints(value: Option<&Value>, path: &str, sink: &mut IssueSink) -> Vec<Hint> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(by_zone)) => by_zone
            .iter()
            .filter_map(|(zone_id, text)| {
                text.as_str().map(|text| Hint {
                    zone_id: zone_id.clone(),
                    hint_text: text.to_string(),
                })
            })
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let item_path = index_path(path, index);
                let Value::Object(obj) = item else {
                    sink.push(&SchemaError::WrongType {
                        path: item_path,
                        expected: "object",
                    });
                    return None;
                };
                let obj = camelize_keys(obj);
                let zone_id = read_string(&obj, &["zoneId"], &item_path, sink)
                    .filter(|id| !id.trim().is_empty());
                let hint_text = read_string(&obj, &["hintText", "hint", "text"], &item_path, sink);
                if zone_id.is_none() {
                    sink.push(&SchemaError::EmptyReference {
                        path: join_path(&item_path, "zoneId"),
                    });
                }
                Some(Hint {
                    zone_id: zone_id?,
                    hint_text: hint_text.unwrap_or_default(),
                })
            })
            .collect(),
        Some(_) => {
            sink.push(&SchemaError::WrongType {
                path: path.to_string(),
                expected: "array or object",
            });
            Vec::new()
        }
    }
}

fn parse_feedback_messages(
    value: Option<&Value>,
    path: &str,
    sink: &mut IssueSink,
) -> Option<FeedbackMessages> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => {
            match serde_json::from_value(Value::Object(camelize_keys(map))) {
                Ok(messages) => Some(messages),
                Err(err) => {
                    sink.push(&SchemaError::Decode {
                        path: path.to_string(),
                        message: err.to_string(),
                    });
                    None
                }
            }
        }
        Some(_) => {
            sink.push(&SchemaError::WrongType {
                path: path.to_string(),
                expected: "object",
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snake_case_document_parses() {
        let doc = json!({
            "template_type": "INTERACTIVE_DIAGRAM",
            "title": "Heart",
            "narrative_intro": "Label the chambers",
            "diagram": {"asset_url": "heart.png", "width": "1024px", "height": 768},
            "zones": [{"id": "z1", "label": "Atrium", "x": 20, "y": 30, "radius": 5}],
            "labels": [{"id": "l1", "text": "Atrium", "correct_zone_id": "z1"}],
            "distractor_labels": [{"text": "Kidney", "explanation": "Not in the heart"}],
            "scoring_strategy": {"points_per_correct": 5},
            "hints": {"z1": "Upper chamber"},
            "theme": "dark"
        });
        let parsed = parse_blueprint(&doc);
        assert!(parsed.is_clean(), "{:?}", parsed.issues);
        let draft = parsed.value;
        assert_eq!(draft.narrative_intro.as_deref(), Some("Label the chambers"));
        assert_eq!(draft.diagram.asset_url.as_deref(), Some("heart.png"));
        assert_eq!(draft.diagram.width, Some(json!("1024px")));
        assert_eq!(draft.labels[0].correct_zone_id, "z1");
        assert_eq!(draft.distractor_labels[0].explanation, "Not in the heart");
        assert_eq!(
            draft.scoring_strategy.and_then(|s| s.base_points_per_item),
            Some(5.0)
        );
        assert_eq!(draft.hints[0].hint_text, "Upper chamber");
        assert_eq!(draft.extra.len(), 1);
        assert_eq!(draft.extra["theme"], json!("dark"));
    }

    #[test]
    fn issues_are_collected_and_parsing_continues() {
        let doc = json!({
            "zones": [{"id": "z1", "x": 140, "y": "abc", "shape": "blob"}, 7],
            "labels": [{"id": "l1", "text": "A"}],
            "sortingConfig": {"items": [{"id": "i1"}], "categories": []},
            "sequenceConfig": {"items": [{"id": "s1", "text": "first"}]}
        });
        let parsed = parse_blueprint(&doc);
        let paths: Vec<_> = parsed.issues.iter().map(|issue| issue.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "zones[1]",
                "zones[0].shape",
                "zones[0].x",
                "zones[0].y",
                "labels[0].correctZoneId",
                "sortingConfig.items[0].correctCategoryId",
            ]
        );
        assert_eq!(parsed.value.zones.len(), 1);
        assert!((parsed.value.zones[0].x - 100.0).abs() < f64::EPSILON);
        assert!((parsed.value.zones[0].y - 50.0).abs() < f64::EPSILON);
        assert!(parsed.value.configs.sorting().is_none());
        assert!(parsed.value.configs.sequence().is_some());
    }

    #[test]
    fn mechanics_accept_tags_and_objects() {
        let doc = json!({
            "mechanics": [
                "drag_drop",
                {"type": "sequencing", "scoring": {"max_score": 40}, "feedback": {"misconceptions": {"Egg": "Comes first"}}},
                {"mode": "timedChallenge"},
                {"scoring": {}}
            ]
        });
        let parsed = parse_blueprint(&doc);
        let modes: Vec<_> = parsed.value.mechanics.iter().map(|entry| entry.mode.as_str()).collect();
        assert_eq!(modes, ["drag_drop", "sequencing", "timed_challenge"]);
        let sequencing = &parsed.value.mechanics[1];
        assert_eq!(sequencing.scoring.as_ref().and_then(|s| s.max_score), Some(40.0));
        assert_eq!(
            sequencing.feedback.as_ref().map(|f| f.misconceptions.len()),
            Some(1)
        );
        assert_eq!(parsed.issues.len(), 1);
        assert_eq!(parsed.issues[0].path, "mechanics[3].type");
    }

    #[test]
    fn non_object_root_yields_default_draft() {
        let parsed = parse_blueprint(&json!([1, 2, 3]));
        assert_eq!(parsed.issues[0].path, "$");
        assert_eq!(parsed.value.template_type, DEFAULT_TEMPLATE_TYPE);
        assert!(parsed.value.zones.is_empty());
    }

    #[test]
    fn embedded_paths_are_prefixed() {
        let parsed = parse_blueprint_at(&json!({"labels": "nope"}), "scenes[1].blueprint");
        assert_eq!(parsed.issues[0].path, "scenes[1].blueprint.labels");
    }

    #[test]
    fn root_misconceptions_use_array_form() {
        let parsed = parse_blueprint(&json!({"misconceptions": {"Heart": "Not a lung"}}));
        assert_eq!(
            parsed.value.extra["misconceptions"],
            json!([{"triggerLabel": "Heart", "message": "Not a lung"}])
        );
    }
}

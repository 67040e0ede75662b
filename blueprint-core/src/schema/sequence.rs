//! Multi-scene sequence contract.
//!
//! Ordering, prerequisite and reveal fields are validated here and handed to
//! an external orchestrator; traversal itself is not performed.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::{
    IssueSink, Parsed, SchemaError, collect_extra, index_path, join_path, read_array,
    read_number, read_string,
};
use crate::casing::camelize_keys;
use crate::constants::{REVEAL_THRESHOLD_MAX, REVEAL_THRESHOLD_MIN};
use crate::model::canonical_tag;
use crate::normalize::IdAllocator;

const SEQUENCE_KEYS: &[&str] = &["sequenceId", "id", "title", "progressionType", "scenes"];

const SCENE_KEYS: &[&str] = &[
    "sceneId",
    "id",
    "title",
    "prerequisiteScene",
    "prerequisite",
    "prerequisiteSceneId",
    "revealTrigger",
    "revealThreshold",
    "revealZones",
    "blueprint",
];

/// Traversal hint for the orchestrator. Only `linear` has defined semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionType {
    #[default]
    Linear,
    ZoomIn,
    DepthFirst,
    Branching,
}

impl ProgressionType {
    #[must_use]
    pub fn from_tag(raw: &str) -> Option<Self> {
        match canonical_tag(raw).as_str() {
            "linear" => Some(Self::Linear),
            "zoom_in" => Some(Self::ZoomIn),
            "depth_first" => Some(Self::DepthFirst),
            "branching" => Some(Self::Branching),
            _ => None,
        }
    }
}

/// Condition under which a scene becomes available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealTrigger {
    #[default]
    AllCorrect,
    Percentage,
    SpecificZones,
    Manual,
}

impl RevealTrigger {
    #[must_use]
    pub fn from_tag(raw: &str) -> Option<Self> {
        match canonical_tag(raw).as_str() {
            "all_correct" => Some(Self::AllCorrect),
            "percentage" => Some(Self::Percentage),
            "specific_zones" => Some(Self::SpecificZones),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Progress of the prerequisite scene, as reported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SceneProgress {
    pub total_zones: usize,
    /// Zones with a correct placement.
    pub correct_zones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameScene {
    pub scene_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisite_scene: Option<String>,
    #[serde(default)]
    pub reveal_trigger: RevealTrigger,
    /// Percentage (0-100) of the prerequisite scene's zones that must be
    /// correctly placed; used by [`RevealTrigger::Percentage`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reveal_zones: Vec<String>,
    /// Embedded scene document, still raw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Position in the document's `scenes` array, used for issue paths.
    #[serde(skip)]
    pub source_index: usize,
}

impl GameScene {
    /// Issue path of this scene in the source document.
    #[must_use]
    pub fn path(&self) -> String {
        index_path("scenes", self.source_index)
    }

    /// Whether the reveal condition holds for the prerequisite's progress.
    /// `manual` scenes are revealed by the orchestrator only.
    #[must_use]
    pub fn reveal_satisfied(&self, progress: &SceneProgress) -> bool {
        match self.reveal_trigger {
            RevealTrigger::AllCorrect => progress.correct_zones.len() >= progress.total_zones,
            RevealTrigger::Percentage => {
                if progress.total_zones == 0 {
                    return true;
                }
                let done = crate::numbers::usize_to_f64(progress.correct_zones.len());
                let total = crate::numbers::usize_to_f64(progress.total_zones);
                done * 100.0 / total >= self.reveal_threshold.unwrap_or(REVEAL_THRESHOLD_MAX)
            }
            RevealTrigger::SpecificZones => self
                .reveal_zones
                .iter()
                .all(|zone| progress.correct_zones.contains(zone)),
            RevealTrigger::Manual => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSequence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub progression_type: ProgressionType,
    pub scenes: Vec<GameScene>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameSequence {
    #[must_use]
    pub fn scene(&self, scene_id: &str) -> Option<&GameScene> {
        self.scenes.iter().find(|scene| scene.scene_id == scene_id)
    }

    /// Scenes without a prerequisite, in document order.
    pub fn roots(&self) -> impl Iterator<Item = &GameScene> {
        self.scenes
            .iter()
            .filter(|scene| scene.prerequisite_scene.is_none())
    }

    /// Scenes unlocked by `scene_id`, in document order.
    pub fn children<'a>(&'a self, scene_id: &'a str) -> impl Iterator<Item = &'a GameScene> {
        self.scenes
            .iter()
            .filter(move |scene| scene.prerequisite_scene.as_deref() == Some(scene_id))
    }
}

/// Parse and validate a multi-scene sequence document.
#[must_use]
pub fn parse_sequence(value: &Value) -> Parsed<GameSequence> {
    let mut sink = IssueSink::default();
    let Value::Object(raw) = value else {
        sink.push(&SchemaError::WrongType {
            path: "$".to_string(),
            expected: "object",
        });
        return Parsed {
            value: GameSequence {
                sequence_id: None,
                title: String::new(),
                progression_type: ProgressionType::default(),
                scenes: Vec::new(),
                extra: Map::new(),
            },
            issues: sink.into_vec(),
        };
    };
    let map = camelize_keys(raw);
    let progression_type = match read_string(&map, &["progressionType"], "", &mut sink) {
        None => ProgressionType::default(),
        Some(tag) => ProgressionType::from_tag(&tag).unwrap_or_else(|| {
            sink.push(&SchemaError::invalid(
                "progressionType",
                format!("unknown progression type '{tag}'"),
            ));
            ProgressionType::default()
        }),
    };

    let raw_scenes = read_array(&map, "scenes", "", &mut sink);
    if raw_scenes.is_empty() {
        sink.push(&SchemaError::invalid("scenes", "at least one scene is required"));
    }
    let mut ids = IdAllocator::default();
    let mut scenes: Vec<GameScene> = raw_scenes
        .iter()
        .enumerate()
        .filter_map(|(index, scene)| parse_scene(scene, index, &mut ids, &mut sink))
        .collect();
    check_prerequisites(&mut scenes, &mut sink);

    Parsed {
        value: GameSequence {
            sequence_id: read_string(&map, &["sequenceId", "id"], "", &mut sink),
            title: read_string(&map, &["title"], "", &mut sink).unwrap_or_default(),
            progression_type,
            scenes,
            extra: collect_extra(&map, SEQUENCE_KEYS),
        },
        issues: sink.into_vec(),
    }
}

fn parse_scene(
    value: &Value,
    index: usize,
    ids: &mut IdAllocator,
    sink: &mut IssueSink,
) -> Option<GameScene> {
    let path = index_path("scenes", index);
    let Value::Object(raw) = value else {
        sink.push(&SchemaError::WrongType {
            path,
            expected: "object",
        });
        return None;
    };
    let scene = camelize_keys(raw);

    let given = read_string(&scene, &["sceneId", "id"], &path, sink)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let base = given.clone().unwrap_or_else(|| {
        sink.push(&SchemaError::Missing {
            path: join_path(&path, "sceneId"),
        });
        format!("scene_{}", index + 1)
    });
    let scene_id = ids.allocate(&base);
    if given.is_some() && scene_id != base {
        sink.push(&SchemaError::invalid(
            join_path(&path, "sceneId"),
            format!("duplicate scene id '{base}', renamed to '{scene_id}'"),
        ));
    }

    let prerequisite_scene = match read_string(
        &scene,
        &["prerequisiteScene", "prerequisite", "prerequisiteSceneId"],
        &path,
        sink,
    ) {
        Some(id) if id.trim().is_empty() => {
            sink.push(&SchemaError::EmptyReference {
                path: join_path(&path, "prerequisiteScene"),
            });
            None
        }
        other => other.map(|id| id.trim().to_string()),
    };

    let reveal_trigger = match read_string(&scene, &["revealTrigger"], &path, sink) {
        None => RevealTrigger::default(),
        Some(tag) => RevealTrigger::from_tag(&tag).unwrap_or_else(|| {
            sink.push(&SchemaError::invalid(
                join_path(&path, "revealTrigger"),
                format!("unknown reveal trigger '{tag}'"),
            ));
            RevealTrigger::default()
        }),
    };

    let mut reveal_threshold = read_number(&scene, &["revealThreshold"], &path, sink);
    if let Some(threshold) = reveal_threshold {
        if !(REVEAL_THRESHOLD_MIN..=REVEAL_THRESHOLD_MAX).contains(&threshold) {
            sink.push(&SchemaError::OutOfRange {
                path: join_path(&path, "revealThreshold"),
                min: REVEAL_THRESHOLD_MIN,
                max: REVEAL_THRESHOLD_MAX,
                value: threshold,
            });
            reveal_threshold = Some(threshold.clamp(REVEAL_THRESHOLD_MIN, REVEAL_THRESHOLD_MAX));
        }
    } else if reveal_trigger == RevealTrigger::Percentage {
        sink.push(&SchemaError::Missing {
            path: join_path(&path, "revealThreshold"),
        });
    }

    let reveal_zones = parse_reveal_zones(&scene, &path, sink);
    if reveal_trigger == RevealTrigger::SpecificZones && reveal_zones.is_empty() {
        sink.push(&SchemaError::invalid(
            join_path(&path, "revealZones"),
            "specific_zones requires at least one zone id",
        ));
    }

    let blueprint = match scene.get("blueprint") {
        None | Some(Value::Null) => None,
        Some(doc @ Value::Object(_)) => Some(doc.clone()),
        Some(_) => {
            sink.push(&SchemaError::WrongType {
                path: join_path(&path, "blueprint"),
                expected: "object",
            });
            None
        }
    };

    Some(GameScene {
        scene_id,
        title: read_string(&scene, &["title"], &path, sink).unwrap_or_default(),
        prerequisite_scene,
        reveal_trigger,
        reveal_threshold,
        reveal_zones,
        blueprint,
        extra: collect_extra(&scene, SCENE_KEYS),
        source_index: index,
    })
}

fn parse_reveal_zones(scene: &Map<String, Value>, path: &str, sink: &mut IssueSink) -> Vec<String> {
    let zones_path = join_path(path, "revealZones");
    read_array(scene, "revealZones", path, sink)
        .iter()
        .enumerate()
        .filter_map(|(index, zone)| match zone.as_str().map(str::trim) {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            _ => {
                sink.push(&SchemaError::EmptyReference {
                    path: index_path(&zones_path, index),
                });
                None
            }
        })
        .collect()
}

/// Drop prerequisites that are unknown, self-referencing or part of a cycle,
/// so the remaining edges form a forest.
fn check_prerequisites(scenes: &mut [GameScene], sink: &mut IssueSink) {
    let known: HashSet<String> = scenes.iter().map(|scene| scene.scene_id.clone()).collect();
    for scene in scenes.iter_mut() {
        let Some(parent) = scene.prerequisite_scene.as_deref() else {
            continue;
        };
        let problem = if parent == scene.scene_id {
            Some(format!("scene '{parent}' cannot be its own prerequisite"))
        } else if !known.contains(parent) {
            Some(format!("unknown prerequisite scene '{parent}'"))
        } else {
            None
        };
        if let Some(message) = problem {
            sink.push(&SchemaError::invalid(
                join_path(&scene.path(), "prerequisiteScene"),
                message,
            ));
            scene.prerequisite_scene = None;
        }
    }

    for index in 0..scenes.len() {
        let start = scenes[index].scene_id.clone();
        let mut seen = HashSet::from([start.clone()]);
        let mut cursor = scenes[index].prerequisite_scene.clone();
        while let Some(current) = cursor {
            if current == start {
                sink.push(&SchemaError::invalid(
                    join_path(&scenes[index].path(), "prerequisiteScene"),
                    format!("prerequisite chain of '{start}' forms a cycle"),
                ));
                scenes[index].prerequisite_scene = None;
                break;
            }
            if !seen.insert(current.clone()) {
                break;
            }
            cursor = scenes
                .iter()
                .find(|scene| scene.scene_id == current)
                .and_then(|scene| scene.prerequisite_scene.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue_paths(parsed: &Parsed<GameSequence>) -> Vec<&str> {
        parsed.issues.iter().map(|issue| issue.path.as_str()).collect()
    }

    #[test]
    fn well_formed_sequence_is_clean() {
        let parsed = parse_sequence(&json!({
            "title": "Cell biology",
            "progression_type": "zoom_in",
            "scenes": [
                {"scene_id": "cell", "blueprint": {"title": "Cell"}},
                {"scene_id": "nucleus", "prerequisite_scene": "cell", "reveal_trigger": "percentage", "reveal_threshold": 75},
                {"scene_id": "dna", "prerequisiteScene": "nucleus", "revealTrigger": "specific_zones", "revealZones": ["z1"]}
            ]
        }));
        assert!(parsed.is_clean(), "{:?}", parsed.issues);
        let sequence = parsed.value;
        assert_eq!(sequence.progression_type, ProgressionType::ZoomIn);
        assert_eq!(sequence.roots().count(), 1);
        assert_eq!(sequence.children("cell").next().map(|s| s.scene_id.as_str()), Some("nucleus"));
        assert_eq!(sequence.scene("nucleus").and_then(|s| s.reveal_threshold), Some(75.0));
        assert!(sequence.scenes[0].blueprint.is_some());
    }

    #[test]
    fn dropped_scenes_keep_document_positions() {
        let parsed = parse_sequence(&json!({
            "scenes": [5, {"sceneId": "a", "prerequisiteScene": "zz"}]
        }));
        assert_eq!(issue_paths(&parsed), ["scenes[0]", "scenes[1].prerequisiteScene"]);
        assert_eq!(parsed.value.scenes.len(), 1);
        assert_eq!(parsed.value.scenes[0].source_index, 1);
        assert_eq!(parsed.value.scenes[0].path(), "scenes[1]");
    }

    #[test]
    fn empty_sequence_is_reported() {
        let parsed = parse_sequence(&json!({"scenes": []}));
        assert_eq!(issue_paths(&parsed), ["scenes"]);
    }

    #[test]
    fn reveal_rules_are_enforced() {
        let parsed = parse_sequence(&json!({
            "progressionType": "spiral",
            "scenes": [
                {"sceneId": "a", "revealTrigger": "percentage"},
                {"sceneId": "b", "revealTrigger": "percentage", "revealThreshold": 140},
                {"sceneId": "c", "revealTrigger": "specific_zones"},
                {"sceneId": "d", "revealTrigger": "whenever"}
            ]
        }));
        assert_eq!(
            issue_paths(&parsed),
            [
                "progressionType",
                "scenes[0].revealThreshold",
                "scenes[1].revealThreshold",
                "scenes[2].revealZones",
                "scenes[3].revealTrigger"
            ]
        );
        assert_eq!(parsed.value.progression_type, ProgressionType::Linear);
        assert_eq!(parsed.value.scenes[1].reveal_threshold, Some(100.0));
        assert_eq!(parsed.value.scenes[3].reveal_trigger, RevealTrigger::AllCorrect);
    }

    #[test]
    fn prerequisites_form_a_forest() {
        let parsed = parse_sequence(&json!({
            "scenes": [
                {"sceneId": "a", "prerequisiteScene": "c"},
                {"sceneId": "b", "prerequisiteScene": "a"},
                {"sceneId": "c", "prerequisiteScene": "b"},
                {"sceneId": "d", "prerequisiteScene": "d"},
                {"sceneId": "e", "prerequisiteScene": "missing"}
            ]
        }));
        assert_eq!(
            issue_paths(&parsed),
            [
                "scenes[3].prerequisiteScene",
                "scenes[4].prerequisiteScene",
                "scenes[0].prerequisiteScene"
            ]
        );
        let scenes = &parsed.value.scenes;
        assert_eq!(scenes[0].prerequisite_scene, None);
        assert_eq!(scenes[1].prerequisite_scene.as_deref(), Some("a"));
        assert_eq!(scenes[2].prerequisite_scene.as_deref(), Some("b"));
        assert_eq!(parsed.value.roots().count(), 3);
    }

    #[test]
    fn scene_ids_are_required_and_unique() {
        let parsed = parse_sequence(&json!({
            "scenes": [{"sceneId": "a"}, {"sceneId": "a"}, {"title": "untitled"}, 5]
        }));
        let ids: Vec<_> = parsed.value.scenes.iter().map(|s| s.scene_id.as_str()).collect();
        assert_eq!(ids, ["a", "a_2", "scene_3"]);
        assert_eq!(
            issue_paths(&parsed),
            ["scenes[1].sceneId", "scenes[2].sceneId", "scenes[3]"]
        );
    }

    #[test]
    fn reveal_conditions_use_zone_percentage() {
        let mut scene = parse_sequence(&json!({
            "scenes": [{"sceneId": "a", "revealTrigger": "percentage", "revealThreshold": 50}]
        }))
        .value
        .scenes
        .remove(0);
        let half = SceneProgress {
            total_zones: 4,
            correct_zones: vec!["z1".into(), "z2".into()],
        };
        assert!(scene.reveal_satisfied(&half));
        scene.reveal_threshold = Some(75.0);
        assert!(!scene.reveal_satisfied(&half));
        scene.reveal_trigger = RevealTrigger::SpecificZones;
        scene.reveal_zones = vec!["z2".into()];
        assert!(scene.reveal_satisfied(&half));
        scene.reveal_trigger = RevealTrigger::AllCorrect;
        assert!(!scene.reveal_satisfied(&half));
        scene.reveal_trigger = RevealTrigger::Manual;
        assert!(!scene.reveal_satisfied(&half));
    }
}

use blueprint_core::schema::SceneProgress;
use blueprint_core::{ProgressionType, RevealTrigger, prepare_sequence_value};
use serde_json::json;

fn course() -> serde_json::Value {
    json!({
        "sequence_id": "anatomy-101",
        "title": "Anatomy",
        "progression_type": "depth_first",
        "scenes": [
            {
                "scene_id": "body",
                "title": "Body",
                "blueprint": {
                    "zones": [{"id": "heart"}, {"id": "lungs"}],
                    "labels": [
                        {"id": "h", "text": "Heart", "correctZoneId": "heart"},
                        {"id": "l", "text": "Lungs", "correctZoneId": "lungs"}
                    ]
                }
            },
            {
                "scene_id": "heart",
                "prerequisite_scene": "body",
                "reveal_trigger": "specific_zones",
                "reveal_zones": ["heart"],
                "blueprint": {
                    "mechanics": ["sequencing"],
                    "sequenceConfig": {"items": [{"id": "a"}, {"id": "b"}, {"id": "c"}, {"id": "d"}]}
                }
            },
            {
                "scene_id": "lungs",
                "prerequisite_scene": "body",
                "reveal_trigger": "percentage",
                "reveal_threshold": 50,
                "blueprint": {"labels": [{"id": "x", "text": "Alveoli", "correctZoneId": "alv"}]}
            }
        ]
    })
}

#[test]
fn course_prepares_every_scene() {
    let prepared = prepare_sequence_value(&course());
    assert!(prepared.issues.is_empty(), "{:?}", prepared.issues);
    assert_eq!(prepared.sequence.sequence_id.as_deref(), Some("anatomy-101"));
    assert_eq!(prepared.sequence.progression_type, ProgressionType::DepthFirst);
    assert_eq!(prepared.scenes.len(), 3);
    assert_eq!(prepared.sequence.children("body").count(), 2);
    assert_eq!(
        prepared.scene("lungs").map(|s| s.report.synthesized_zones.clone()),
        Some(vec!["alv".to_string()])
    );
}

#[test]
fn cumulative_score_spans_scenes() {
    let prepared = prepare_sequence_value(&course());
    let per_scene: u32 = prepared.scenes.iter().map(|s| s.prepared.max_score(10)).sum();
    assert_eq!(per_scene, 20 + 40 + 10);
    assert_eq!(prepared.cumulative_max_score(10), per_scene);
}

#[test]
fn reveal_conditions_follow_progress() {
    let prepared = prepare_sequence_value(&course());
    let heart = prepared.sequence.scene("heart").unwrap();
    let lungs = prepared.sequence.scene("lungs").unwrap();
    assert_eq!(heart.reveal_trigger, RevealTrigger::SpecificZones);
    let progress = SceneProgress {
        total_zones: 2,
        correct_zones: vec!["heart".to_string()],
    };
    assert!(heart.reveal_satisfied(&progress));
    assert!(lungs.reveal_satisfied(&progress));
    assert!(!lungs.reveal_satisfied(&SceneProgress {
        total_zones: 2,
        correct_zones: Vec::new(),
    }));
}

#[test]
fn broken_scene_does_not_block_siblings() {
    let mut doc = course();
    doc["scenes"][1]["blueprint"]["sequenceConfig"] = json!({"items": "oops"});
    doc["scenes"][2]["reveal_threshold"] = json!(250);
    let prepared = prepare_sequence_value(&doc);
    let paths: Vec<_> = prepared.issues.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(
        paths,
        [
            "scenes[2].revealThreshold",
            "scenes[1].blueprint.sequenceConfig.items"
        ]
    );
    assert_eq!(prepared.scenes.len(), 3);
    assert!(prepared.scene("heart").unwrap().blueprint.configs.sequence().is_none());
    assert_eq!(prepared.scene("body").unwrap().max_score(10), 20);
}

#[test]
fn scene_issues_name_their_document_position() {
    let mut doc = course();
    let scenes = doc["scenes"].as_array_mut().unwrap();
    scenes.insert(0, json!("not a scene"));
    scenes[2]["blueprint"]["sequenceConfig"] = json!({"items": "oops"});
    let prepared = prepare_sequence_value(&doc);
    let paths: Vec<_> = prepared.issues.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(paths, ["scenes[0]", "scenes[2].blueprint.sequenceConfig.items"]);
    assert_eq!(prepared.scenes.len(), 3);
    assert_eq!(prepared.sequence.scene("heart").unwrap().path(), "scenes[2]");
}

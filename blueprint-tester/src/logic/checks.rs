//! Invariant checks over prepared scenes. Each check returns the failures it
//! found as human-readable lines; an empty list means the check passed.
use blueprint_core::scoring::max_score_with;
use blueprint_core::{Blueprint, BlueprintEngine, BlueprintLoader, PreparedScene};
use std::collections::HashSet;

/// Zone ids unique; label and distractor ids unique across both lists.
pub fn unique_ids(blueprint: &Blueprint) -> Vec<String> {
    let mut failures = Vec::new();
    let mut zones = HashSet::new();
    for zone in &blueprint.zones {
        if zone.id.is_empty() {
            failures.push("zone with empty id".to_string());
        } else if !zones.insert(zone.id.as_str()) {
            failures.push(format!("duplicate zone id '{}'", zone.id));
        }
    }
    let mut labels = HashSet::new();
    let label_ids = blueprint
        .labels
        .iter()
        .map(|label| &label.id)
        .chain(blueprint.distractor_labels.iter().map(|d| &d.id));
    for id in label_ids {
        if id.is_empty() {
            failures.push("label with empty id".to_string());
        } else if !labels.insert(id.as_str()) {
            failures.push(format!("duplicate label id '{id}'"));
        }
    }
    failures
}

pub fn references_resolve(blueprint: &Blueprint) -> Vec<String> {
    blueprint
        .labels
        .iter()
        .filter(|label| blueprint.zone(&label.correct_zone_id).is_none())
        .map(|label| {
            format!(
                "label '{}' points at missing zone '{}'",
                label.id, label.correct_zone_id
            )
        })
        .collect()
}

/// Synthesized zones sit strictly inside the diagram and never overlap.
pub fn grid_bounds(scene: &PreparedScene) -> Vec<String> {
    let mut failures = Vec::new();
    let mut slots = HashSet::new();
    let synthesized: Vec<_> = scene
        .blueprint
        .zones
        .iter()
        .filter(|zone| zone.synthesized)
        .collect();
    if synthesized.len() < scene.report.synthesized_zones.len() {
        failures.push(format!(
            "report lists {} synthesized zones, blueprint has {}",
            scene.report.synthesized_zones.len(),
            synthesized.len()
        ));
    }
    for zone in synthesized {
        let inside = |v: f64| v > 0.0 && v < 100.0;
        if !inside(zone.x) || !inside(zone.y) {
            failures.push(format!(
                "synthesized zone '{}' at ({}, {}) is outside the diagram",
                zone.id, zone.x, zone.y
            ));
        }
        if !slots.insert((zone.x.to_bits(), zone.y.to_bits())) {
            failures.push(format!(
                "synthesized zone '{}' shares its slot ({}, {})",
                zone.id, zone.x, zone.y
            ));
        }
    }
    failures
}

pub fn deterministic(first: &Blueprint, second: &Blueprint) -> Vec<String> {
    let (a, b) = (first.fingerprint(), second.fingerprint());
    if a == b {
        Vec::new()
    } else {
        vec![format!("two runs disagree: fingerprint {a:016x} vs {b:016x}")]
    }
}

/// Re-preparing the serialized output keeps counts and resolvability.
pub fn idempotent<L: BlueprintLoader>(
    engine: &BlueprintEngine<L>,
    scene: &PreparedScene,
) -> Vec<String> {
    let again = engine.prepare_scene_value(&scene.blueprint.to_value());
    let mut failures = Vec::new();
    let before = (scene.blueprint.zones.len(), scene.blueprint.labels.len());
    let after = (again.blueprint.zones.len(), again.blueprint.labels.len());
    if before != after {
        failures.push(format!(
            "re-normalizing changed zones/labels from {before:?} to {after:?}"
        ));
    }
    if !again.report.synthesized_zones.is_empty() {
        failures.push(format!(
            "re-normalizing synthesized {:?}",
            again.report.synthesized_zones
        ));
    }
    failures.extend(
        references_resolve(&again.blueprint)
            .into_iter()
            .map(|failure| format!("after re-normalizing: {failure}")),
    );
    failures
}

/// Scene maximum equals the sum of its mechanics' maxima.
pub fn additive<L: BlueprintLoader>(
    engine: &BlueprintEngine<L>,
    scene: &PreparedScene,
    points_per_zone: u32,
) -> Vec<String> {
    let blueprint = &scene.blueprint;
    let parts = blueprint.active_modes().iter().fold(0_u32, |total, mode| {
        total.saturating_add(max_score_with(
            engine.registry(),
            mode,
            blueprint,
            points_per_zone,
        ))
    });
    let total = engine.scene_max_score(scene, points_per_zone);
    if parts == total {
        Vec::new()
    } else {
        vec![format!("max score {total} differs from sum of mechanics {parts}")]
    }
}

/// Every single-run check for one prepared scene.
pub fn scene_invariants<L: BlueprintLoader>(
    engine: &BlueprintEngine<L>,
    scene: &PreparedScene,
    points_per_zone: u32,
) -> Vec<String> {
    let mut failures = unique_ids(&scene.blueprint);
    failures.extend(references_resolve(&scene.blueprint));
    failures.extend(grid_bounds(scene));
    failures.extend(idempotent(engine, scene));
    failures.extend(additive(engine, scene, points_per_zone));
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::prepare_scene_value;
    use serde_json::{Value, json};
    use std::convert::Infallible;

    struct NoDocuments;

    impl BlueprintLoader for NoDocuments {
        type Error = Infallible;

        fn load_document(&self, _name: &str) -> Result<Value, Self::Error> {
            Ok(Value::Null)
        }
    }

    fn messy() -> Value {
        json!({
            "zones": [{"id": "z1"}, {"id": "z1"}],
            "labels": [
                {"id": "a", "text": "A", "correctZoneId": "z1"},
                {"id": "a", "text": "B", "correctZoneId": "z1"},
                {"id": "c", "text": "C", "correctZoneId": "ghost"},
                {"id": "d", "text": "D", "correctZoneId": "ghost_2"}
            ],
            "mechanics": ["drag_drop", "sequencing"],
            "sequenceConfig": {"items": [{"id": "s1"}, {"id": "s2"}]}
        })
    }

    #[test]
    fn prepared_scenes_pass_every_check() {
        let engine = BlueprintEngine::new(NoDocuments);
        let scene = engine.prepare_scene_value(&messy());
        assert_eq!(scene_invariants(&engine, &scene, 10), Vec::<String>::new());
        let again = engine.prepare_scene_value(&messy());
        assert!(deterministic(&scene.blueprint, &again.blueprint).is_empty());
    }

    #[test]
    fn broken_blueprints_are_reported() {
        let mut scene = prepare_scene_value(&messy());
        scene.blueprint.zones[1].id = "z1".to_string();
        scene.blueprint.labels[0].correct_zone_id = "nowhere".to_string();
        scene.blueprint.zones[2].x = 100.0;
        let ids = unique_ids(&scene.blueprint);
        assert_eq!(ids, ["duplicate zone id 'z1'"]);
        assert_eq!(
            references_resolve(&scene.blueprint),
            ["label 'a' points at missing zone 'nowhere'"]
        );
        assert_eq!(grid_bounds(&scene).len(), 1);
    }

    #[test]
    fn fingerprint_mismatch_is_a_failure() {
        let first = prepare_scene_value(&messy()).blueprint;
        let mut second = first.clone();
        second.title = "changed".to_string();
        assert_eq!(deterministic(&first, &second).len(), 1);
    }
}

//! Mechanic tag to scoring strategy lookup.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::model::{Blueprint, MechanicKind, mode_key};
use crate::numbers::usize_to_u32;

/// Per-mechanic maximum score computation.
pub trait ScoringStrategy: Send + Sync {
    /// Number of gradable items this mechanic exposes in `blueprint`.
    fn item_count(&self, blueprint: &Blueprint) -> usize;

    /// Highest attainable score; never negative.
    fn max_score(&self, blueprint: &Blueprint, points_per_zone: u32) -> u32 {
        usize_to_u32(self.item_count(blueprint)).saturating_mul(points_per_zone)
    }
}

/// Strategy that counts items with a plain function.
#[derive(Clone, Copy)]
pub struct CountStrategy {
    count: fn(&Blueprint) -> usize,
}

impl CountStrategy {
    #[must_use]
    pub const fn new(count: fn(&Blueprint) -> usize) -> Self {
        Self { count }
    }
}

impl ScoringStrategy for CountStrategy {
    fn item_count(&self, blueprint: &Blueprint) -> usize {
        (self.count)(blueprint)
    }
}

fn label_count(blueprint: &Blueprint) -> usize {
    blueprint.labels.len()
}

fn sequence_items(blueprint: &Blueprint) -> usize {
    blueprint
        .configs
        .sequence()
        .map_or_else(|| label_count(blueprint), |config| config.items.len())
}

fn sorting_items(blueprint: &Blueprint) -> usize {
    blueprint
        .configs
        .sorting()
        .map_or_else(|| label_count(blueprint), |config| config.items.len())
}

fn memory_pairs(blueprint: &Blueprint) -> usize {
    blueprint
        .configs
        .memory_match()
        .map_or_else(|| label_count(blueprint), |config| config.pairs.len())
}

fn branching_decisions(blueprint: &Blueprint) -> usize {
    blueprint.configs.branching().map_or_else(
        || label_count(blueprint),
        |config| config.nodes.iter().filter(|node| node.is_decision()).count(),
    )
}

fn compare_zones(blueprint: &Blueprint) -> usize {
    blueprint
        .configs
        .compare()
        .map(|config| config.expected_categories.len())
        .filter(|count| *count > 0)
        .unwrap_or_else(|| blueprint.zones.len())
}

fn identify_prompts(blueprint: &Blueprint) -> usize {
    blueprint
        .configs
        .click_to_identify()
        .map(|config| config.prompts.len())
        .filter(|count| *count > 0)
        .unwrap_or_else(|| blueprint.zones.len())
}

fn trace_waypoints(blueprint: &Blueprint) -> usize {
    blueprint
        .configs
        .trace_path()
        .map_or_else(|| label_count(blueprint), |config| config.waypoint_count())
}

fn described_zones(blueprint: &Blueprint) -> usize {
    blueprint
        .configs
        .description_matching()
        .map(|config| config.descriptions.len())
        .filter(|count| *count > 0)
        .unwrap_or_else(|| blueprint.zones.len())
}

/// Built-in strategy for each mechanic kind.
#[must_use]
pub const fn builtin_strategy(kind: MechanicKind) -> CountStrategy {
    CountStrategy::new(match kind {
        MechanicKind::DragDrop | MechanicKind::Generic => label_count,
        MechanicKind::Sequencing => sequence_items,
        MechanicKind::SortingCategories => sorting_items,
        MechanicKind::MemoryMatch => memory_pairs,
        MechanicKind::BranchingScenario => branching_decisions,
        MechanicKind::CompareContrast => compare_zones,
        MechanicKind::ClickToIdentify => identify_prompts,
        MechanicKind::TracePath => trace_waypoints,
        MechanicKind::DescriptionMatching => described_zones,
    })
}

/// Lookup from mechanic tag to strategy. Adding a mechanic means registering
/// a strategy here; scoring never changes.
#[derive(Clone, Default)]
pub struct MechanicRegistry {
    strategies: BTreeMap<String, Arc<dyn ScoringStrategy>>,
}

impl fmt::Debug for MechanicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MechanicRegistry")
            .field("modes", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MechanicRegistry {
    /// Registry with every built-in mechanic.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        for kind in MechanicKind::ALL {
            registry.register(kind.tag(), builtin_strategy(kind));
        }
        registry
    }

    /// Register or replace the strategy for `mode`.
    pub fn register<S>(&mut self, mode: &str, strategy: S)
    where
        S: ScoringStrategy + 'static,
    {
        self.strategies.insert(mode_key(mode), Arc::new(strategy));
    }

    #[must_use]
    pub fn lookup(&self, mode: &str) -> Option<&dyn ScoringStrategy> {
        self.strategies.get(&mode_key(mode)).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn contains(&self, mode: &str) -> bool {
        self.strategies.contains_key(&mode_key(mode))
    }

    pub fn modes(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }
}

/// Process-wide registry of built-in mechanics.
#[must_use]
pub fn default_registry() -> &'static MechanicRegistry {
    static REGISTRY: OnceLock<MechanicRegistry> = OnceLock::new();
    REGISTRY.get_or_init(MechanicRegistry::with_defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare_scene_value;
    use serde_json::json;

    struct Fixed(usize);

    impl ScoringStrategy for Fixed {
        fn item_count(&self, _blueprint: &Blueprint) -> usize {
            self.0
        }
    }

    fn blueprint(doc: &serde_json::Value) -> Blueprint {
        prepare_scene_value(doc).blueprint
    }

    #[test]
    fn defaults_cover_every_kind() {
        let registry = MechanicRegistry::with_defaults();
        for kind in MechanicKind::ALL {
            assert!(registry.contains(kind.tag()), "{kind} missing");
        }
        assert!(registry.lookup("Sequence").is_some());
        assert!(registry.lookup("timed_challenge").is_none());
        assert_eq!(registry.modes().count(), MechanicKind::ALL.len());
    }

    #[test]
    fn builtin_counts_follow_configs() {
        let bp = blueprint(&json!({
            "labels": [{"id": "a", "text": "A", "correctZoneId": "z"}],
            "sequenceConfig": {"items": [{"id": "1"}, {"id": "2"}, {"id": "3"}]},
            "memoryMatchConfig": {"pairs": [{"front": "a", "back": "b"}, {"front": "c", "back": "d"}]},
            "branchingConfig": {"startNodeId": "n1", "nodes": [
                {"id": "n1", "options": [{"text": "go", "nextNodeId": "n2"}]},
                {"id": "n2", "isEndNode": true}
            ]},
            "tracePathConfig": {"paths": [{"waypoints": [{"zoneId": "z"}, {"zoneId": "q"}]}]}
        }));
        let registry = default_registry();
        let score = |mode: &str| registry.lookup(mode).map(|s| s.max_score(&bp, 10));
        assert_eq!(score("sequencing"), Some(30));
        assert_eq!(score("memory_match"), Some(20));
        assert_eq!(score("branching_scenario"), Some(10));
        assert_eq!(score("trace_path"), Some(20));
        assert_eq!(score("sorting_categories"), Some(10));
        assert_eq!(score("click_to_identify"), Some(10));
        assert_eq!(score("drag_drop"), Some(10));
    }

    #[test]
    fn custom_strategies_can_be_registered() {
        let mut registry = MechanicRegistry::with_defaults();
        registry.register("timedChallenge", Fixed(7));
        let bp = blueprint(&json!({}));
        let strategy = registry.lookup("timed_challenge").unwrap();
        assert_eq!(strategy.max_score(&bp, 3), 21);
        assert_eq!(strategy.max_score(&bp, u32::MAX), u32::MAX);
    }
}

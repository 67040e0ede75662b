//! Blueprint Core
//!
//! Validation, repair and scoring for generated interactive-diagram
//! blueprints. Pure and synchronous: documents come in as JSON values through
//! a [`BlueprintLoader`], normalized blueprints and score figures come out.

pub mod casing;
pub mod constants;
pub mod model;
pub mod normalize;
pub mod numbers;
pub mod registry;
pub mod schema;
pub mod scoring;
pub mod session;

use serde_json::Value;

// Re-export commonly used types
pub use casing::{camelize_keys, normalize_misconceptions, promote_known_keys, snake_to_camel};
pub use model::{
    Blueprint, BlueprintDraft, Diagram, DistractorLabel, Hint, Label, MechanicEntry,
    MechanicKind, Misconception, ModeList, ScoringOverride, Zone, ZoneShape,
};
pub use normalize::{LayoutConfig, NormalizationReport, Normalized, normalize, normalize_blueprint};
pub use registry::{MechanicRegistry, ScoringStrategy, default_registry};
pub use schema::{
    GameScene, GameSequence, MechanicConfig, Parsed, ProgressionType, RevealTrigger, SchemaError,
    ValidationIssue, parse_blueprint, parse_sequence,
};
pub use scoring::{
    ScoreEvent, ScoringConfig, cumulative_max_score, max_score, score_delta, scoring_config_for,
};
pub use session::{Outcome, SessionAction, SessionContext, SessionState, reduce};

/// Trait for abstracting where blueprint documents come from.
/// Platform-specific implementations should provide this
pub trait BlueprintLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load a raw JSON document by name
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or is not JSON.
    fn load_document(&self, name: &str) -> Result<Value, Self::Error>;
}

/// A normalized scene with everything found while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedScene {
    pub blueprint: Blueprint,
    pub issues: Vec<ValidationIssue>,
    pub report: NormalizationReport,
}

impl PreparedScene {
    /// Cumulative maximum over the scene's active mechanics.
    #[must_use]
    pub fn max_score(&self, points_per_zone: u32) -> u32 {
        self.max_score_with(default_registry(), points_per_zone)
    }

    #[must_use]
    pub fn max_score_with(&self, registry: &MechanicRegistry, points_per_zone: u32) -> u32 {
        let modes = self.blueprint.active_modes();
        scoring::cumulative_max_score_with(
            registry,
            modes.as_slice(),
            &self.blueprint,
            points_per_zone,
        )
    }
}

/// One scene of a sequence that carried an embedded blueprint.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceScene {
    pub scene_id: String,
    pub prepared: PreparedScene,
}

/// A validated sequence plus its prepared scenes, in scene order.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSequence {
    pub sequence: GameSequence,
    pub scenes: Vec<SequenceScene>,
    /// Sequence-level and scene-level issues; scene paths are prefixed with
    /// `scenes[i].blueprint`.
    pub issues: Vec<ValidationIssue>,
}

impl PreparedSequence {
    /// Sum of every scene's maximum score.
    #[must_use]
    pub fn cumulative_max_score(&self, points_per_zone: u32) -> u32 {
        self.cumulative_max_score_with(default_registry(), points_per_zone)
    }

    #[must_use]
    pub fn cumulative_max_score_with(
        &self,
        registry: &MechanicRegistry,
        points_per_zone: u32,
    ) -> u32 {
        self.scenes.iter().fold(0_u32, |total, scene| {
            total.saturating_add(scene.prepared.max_score_with(registry, points_per_zone))
        })
    }

    #[must_use]
    pub fn scene(&self, scene_id: &str) -> Option<&PreparedScene> {
        self.scenes
            .iter()
            .find(|scene| scene.scene_id == scene_id)
            .map(|scene| &scene.prepared)
    }
}

fn prepare_scene_at(value: &Value, prefix: &str, layout: &LayoutConfig) -> PreparedScene {
    let Parsed { value: draft, issues } = schema::parse_blueprint_at(value, prefix);
    let Normalized { blueprint, report } = normalize(draft, layout);
    PreparedScene {
        blueprint,
        issues,
        report,
    }
}

fn prepare_sequence_with(value: &Value, layout: &LayoutConfig) -> PreparedSequence {
    let Parsed {
        value: sequence,
        mut issues,
    } = parse_sequence(value);
    let scenes = sequence
        .scenes
        .iter()
        .filter_map(|scene| {
            let document = scene.blueprint.as_ref()?;
            let prepared = prepare_scene_at(document, &format!("{}.blueprint", scene.path()), layout);
            issues.extend(prepared.issues.iter().cloned());
            Some(SequenceScene {
                scene_id: scene.scene_id.clone(),
                prepared,
            })
        })
        .collect();
    PreparedSequence {
        sequence,
        scenes,
        issues,
    }
}

/// Parse and normalize one scene document with the default layout.
#[must_use]
pub fn prepare_scene_value(value: &Value) -> PreparedScene {
    prepare_scene_at(value, "", &LayoutConfig::default())
}

/// Parse a sequence document and prepare every embedded scene with the
/// default layout.
#[must_use]
pub fn prepare_sequence_value(value: &Value) -> PreparedSequence {
    prepare_sequence_with(value, &LayoutConfig::default())
}

/// Main engine tying a document source to the preparation pipeline
pub struct BlueprintEngine<L>
where
    L: BlueprintLoader,
{
    loader: L,
    layout: LayoutConfig,
    registry: MechanicRegistry,
}

impl<L> BlueprintEngine<L>
where
    L: BlueprintLoader,
{
    /// Create an engine with default layout and the built-in mechanics
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            layout: LayoutConfig::default(),
            registry: MechanicRegistry::with_defaults(),
        }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: MechanicRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub const fn loader(&self) -> &L {
        &self.loader
    }

    #[must_use]
    pub const fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    #[must_use]
    pub const fn registry(&self) -> &MechanicRegistry {
        &self.registry
    }

    /// Load and prepare a single-scene document
    ///
    /// # Errors
    ///
    /// Returns an error if the loader cannot provide the document. Schema
    /// problems are reported in [`PreparedScene::issues`] instead.
    pub fn prepare_scene(&self, name: &str) -> Result<PreparedScene, L::Error> {
        let document = self.loader.load_document(name)?;
        log::debug!(target: "blueprint_core", "preparing scene '{name}'");
        Ok(self.prepare_scene_value(&document))
    }

    /// Load and prepare a multi-scene sequence document
    ///
    /// # Errors
    ///
    /// Returns an error if the loader cannot provide the document.
    pub fn prepare_sequence(&self, name: &str) -> Result<PreparedSequence, L::Error> {
        let document = self.loader.load_document(name)?;
        log::debug!(target: "blueprint_core", "preparing sequence '{name}'");
        Ok(self.prepare_sequence_value(&document))
    }

    #[must_use]
    pub fn prepare_scene_value(&self, document: &Value) -> PreparedScene {
        prepare_scene_at(document, "", &self.layout)
    }

    #[must_use]
    pub fn prepare_sequence_value(&self, document: &Value) -> PreparedSequence {
        prepare_sequence_with(document, &self.layout)
    }

    /// Scene maximum using this engine's registry
    #[must_use]
    pub fn scene_max_score(&self, scene: &PreparedScene, points_per_zone: u32) -> u32 {
        scene.max_score_with(&self.registry, points_per_zone)
    }

    /// Sequence maximum using this engine's registry
    #[must_use]
    pub fn sequence_max_score(&self, sequence: &PreparedSequence, points_per_zone: u32) -> u32 {
        sequence.cumulative_max_score_with(&self.registry, points_per_zone)
    }
}

use anyhow::{Context, Result};
use blueprint_core::constants::DEFAULT_POINTS_PER_ITEM;
use blueprint_core::{
    BlueprintEngine, BlueprintLoader, LayoutConfig, PreparedScene, PreparedSequence,
    ValidationIssue,
};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};

use super::checks;
use crate::common::FsLoader;

const fn default_points_per_zone() -> u32 {
    DEFAULT_POINTS_PER_ITEM
}

/// Settings read from `--config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TesterConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default = "default_points_per_zone")]
    pub points_per_zone: u32,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            points_per_zone: default_points_per_zone(),
        }
    }
}

impl TesterConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Scene,
    Sequence,
}

impl DocumentKind {
    /// Documents with a `scenes` array are sequences.
    pub fn detect(document: &Value) -> Self {
        if document.get("scenes").is_some_and(Value::is_array) {
            Self::Sequence
        } else {
            Self::Scene
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Sequence => "sequence",
        }
    }
}

/// Outcome of checking one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    pub document: String,
    /// `None` when the document could not be loaded.
    pub kind: Option<DocumentKind>,
    pub passed: bool,
    pub scenes: usize,
    pub zones: usize,
    pub labels: usize,
    pub synthesized_zones: usize,
    pub renamed_ids: usize,
    pub max_score: u32,
    pub issues: Vec<ValidationIssue>,
    pub failures: Vec<String>,
    pub duration_ms: f64,
}

impl DocumentResult {
    fn new(document: &str, kind: Option<DocumentKind>) -> Self {
        Self {
            document: document.to_string(),
            kind,
            passed: false,
            scenes: 0,
            zones: 0,
            labels: 0,
            synthesized_zones: 0,
            renamed_ids: 0,
            max_score: 0,
            issues: Vec::new(),
            failures: Vec::new(),
            duration_ms: 0.0,
        }
    }

    fn absorb_scene(&mut self, scene: &PreparedScene) {
        let report = &scene.report;
        self.scenes += 1;
        self.zones += scene.blueprint.zones.len();
        self.labels += scene.blueprint.labels.len();
        self.synthesized_zones += report.synthesized_zones.len();
        self.renamed_ids += report.zone_renames.len()
            + report.label_renames.len()
            + report.distractor_renames.len();
    }
}

pub struct DocumentTester {
    engine: BlueprintEngine<FsLoader>,
    points_per_zone: u32,
    strict: bool,
    verbose: bool,
}

impl DocumentTester {
    pub fn new(config: TesterConfig, strict: bool, verbose: bool) -> Self {
        Self {
            engine: BlueprintEngine::new(FsLoader::default()).with_layout(config.layout),
            points_per_zone: config.points_per_zone,
            strict,
            verbose,
        }
    }

    /// Load and check one document. `kind` of `None` detects it from the
    /// document shape.
    pub fn check_path(&self, path: &Path, kind: Option<DocumentKind>) -> DocumentResult {
        let start = Instant::now();
        let name = path.display().to_string();
        let mut result = match self.engine.loader().load_document(&name) {
            Ok(document) => {
                let kind = kind.unwrap_or_else(|| DocumentKind::detect(&document));
                self.check_document(&name, kind, &document)
            }
            Err(err) => {
                log::warn!("{err}");
                let mut result = DocumentResult::new(&name, None);
                result.failures.push(err.to_string());
                result
            }
        };
        if self.strict && !result.issues.is_empty() {
            result.failures.push(format!(
                "{} schema issue(s) with --strict",
                result.issues.len()
            ));
        }
        result.passed = result.failures.is_empty();
        result.duration_ms = duration_ms(start.elapsed());
        if self.verbose {
            self.print_detail(&result);
        }
        result
    }

    pub fn check_document(&self, name: &str, kind: DocumentKind, document: &Value) -> DocumentResult {
        match kind {
            DocumentKind::Scene => self.check_scene(name, document),
            DocumentKind::Sequence => self.check_sequence(name, document),
        }
    }

    fn check_scene(&self, name: &str, document: &Value) -> DocumentResult {
        let mut result = DocumentResult::new(name, Some(DocumentKind::Scene));
        let scene = self.engine.prepare_scene_value(document);
        let rerun = self.engine.prepare_scene_value(document);
        result.absorb_scene(&scene);
        result.max_score = self.engine.scene_max_score(&scene, self.points_per_zone);
        result.failures = checks::scene_invariants(&self.engine, &scene, self.points_per_zone);
        result
            .failures
            .extend(checks::deterministic(&scene.blueprint, &rerun.blueprint));
        result.issues = scene.issues;
        result
    }

    fn check_sequence(&self, name: &str, document: &Value) -> DocumentResult {
        let mut result = DocumentResult::new(name, Some(DocumentKind::Sequence));
        let prepared = self.engine.prepare_sequence_value(document);
        let rerun = self.engine.prepare_sequence_value(document);
        for (scene, again) in prepared.scenes.iter().zip(&rerun.scenes) {
            result.absorb_scene(&scene.prepared);
            let failures = checks::scene_invariants(&self.engine, &scene.prepared, self.points_per_zone)
                .into_iter()
                .chain(checks::deterministic(
                    &scene.prepared.blueprint,
                    &again.prepared.blueprint,
                ));
            result.failures.extend(
                failures.map(|failure| format!("scene '{}': {failure}", scene.scene_id)),
            );
        }
        result.max_score = self.engine.sequence_max_score(&prepared, self.points_per_zone);
        result.failures.extend(sequence_additivity(
            &self.engine,
            &prepared,
            self.points_per_zone,
        ));
        result.issues = prepared.issues;
        result
    }

    fn print_detail(&self, result: &DocumentResult) {
        let status = if result.passed {
            "PASS".green()
        } else {
            "FAIL".red()
        };
        let kind = result.kind.map_or("unreadable", DocumentKind::label);
        eprintln!("🧪 {status} {} ({kind})", result.document.bright_white());
        eprintln!(
            "   scenes {} zones {} labels {} synthesized {} renamed {} max score {} (ppz {})",
            result.scenes,
            result.zones,
            result.labels,
            result.synthesized_zones,
            result.renamed_ids,
            result.max_score,
            self.points_per_zone
        );
        for issue in &result.issues {
            eprintln!("   {} {}: {}", "issue".yellow(), issue.path, issue.message);
        }
        for failure in &result.failures {
            eprintln!("   {} {failure}", "failure".red());
        }
    }
}

/// Sequence maximum equals the sum of its scenes' maxima.
fn sequence_additivity<L: BlueprintLoader>(
    engine: &BlueprintEngine<L>,
    prepared: &PreparedSequence,
    points_per_zone: u32,
) -> Vec<String> {
    let parts = prepared.scenes.iter().fold(0_u32, |total, scene| {
        total.saturating_add(engine.scene_max_score(&scene.prepared, points_per_zone))
    });
    let total = engine.sequence_max_score(prepared, points_per_zone);
    if parts == total {
        Vec::new()
    } else {
        vec![format!("sequence max score {total} differs from sum of scenes {parts}")]
    }
}

fn duration_ms(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tester(strict: bool) -> DocumentTester {
        DocumentTester::new(TesterConfig::default(), strict, false)
    }

    #[test]
    fn kinds_are_detected_from_shape() {
        assert_eq!(DocumentKind::detect(&json!({"scenes": []})), DocumentKind::Sequence);
        assert_eq!(DocumentKind::detect(&json!({"scenes": "x"})), DocumentKind::Scene);
        assert_eq!(DocumentKind::detect(&json!([1, 2])), DocumentKind::Scene);
    }

    #[test]
    fn config_fields_default_independently() {
        let config: TesterConfig =
            serde_json::from_value(json!({"layout": {"defaultWidth": 1024}})).unwrap();
        assert_eq!(config.points_per_zone, 10);
        assert_eq!(config.layout.default_width, 1024);
        assert_eq!(config.layout.default_height, LayoutConfig::default().default_height);
    }

    #[test]
    fn repaired_scene_passes_unless_strict() {
        let doc = json!({
            "zones": [{"id": "z1"}],
            "labels": [
                {"id": "a", "text": "A", "correctZoneId": "z1"},
                {"id": "b", "text": "B", "correctZoneId": ""}
            ]
        });
        let lenient = tester(false).check_document("inline", DocumentKind::Scene, &doc);
        assert!(lenient.failures.is_empty(), "{:?}", lenient.failures);
        assert_eq!(lenient.issues.len(), 1);
        assert_eq!(lenient.synthesized_zones, 1);
        assert_eq!(lenient.max_score, 20);

        let path = std::env::temp_dir().join(format!(
            "blueprint-tester-strict-{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::write(&path, doc.to_string()).unwrap();
        assert!(tester(false).check_path(&path, None).passed);
        let strict = tester(true).check_path(&path, Some(DocumentKind::Scene));
        assert!(!strict.passed);
        assert_eq!(strict.failures, ["1 schema issue(s) with --strict"]);
    }

    #[test]
    fn sequences_sum_their_scenes() {
        let doc = json!({
            "scenes": [
                {"sceneId": "one", "blueprint": {"labels": [{"id": "a", "text": "A", "correctZoneId": "z"}]}},
                {"sceneId": "two", "prerequisiteScene": "one", "blueprint": {
                    "mechanics": ["sorting"],
                    "sortingConfig": {
                        "items": [{"id": "i", "correctCategoryId": "c"}, {"id": "j", "correctCategoryId": "c"}],
                        "categories": [{"id": "c"}]
                    }
                }}
            ]
        });
        let result = tester(false).check_document("course", DocumentKind::Sequence, &doc);
        assert!(result.failures.is_empty(), "{:?}", result.failures);
        assert_eq!(result.scenes, 2);
        assert_eq!(result.max_score, 10 + 20);
    }

    #[test]
    fn unreadable_files_fail() {
        let path = std::env::temp_dir().join("blueprint-tester-no-such-file.json");
        let result = tester(false).check_path(&path, None);
        assert!(!result.passed);
        assert_eq!(result.kind, None);
        assert_eq!(result.failures.len(), 1);
    }
}

//! Per-mechanic config validators.
//!
//! Each validator camelizes the fragment, checks the reference fields that
//! must be non-empty strings, then decodes into a typed config with every
//! optional field defaulted and unknown siblings kept in `extra`. Whether a
//! reference resolves against the scene's zones is not checked here; the
//! normalizer runs later and may still synthesize zones.
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{SchemaError, SchemaErrors, index_path, join_path};
use crate::casing::{
    BRANCHING_CONFIG_ALIASES, BRANCHING_NODE_ALIASES, BRANCHING_OPTION_ALIASES,
    MEMORY_PAIR_ALIASES, SEQUENCE_ITEM_ALIASES, SORTING_ITEM_ALIASES, camelize_array_items,
    camelize_keys, promote_aliases,
};
use crate::constants::{
    DEFAULT_CARD_FACE_TYPE, DEFAULT_COMPARE_CATEGORIES, DEFAULT_DRAWING_MODE,
    DEFAULT_FLIP_DURATION_MS, DEFAULT_MATCHING_MODE, DEFAULT_PATH_TYPE, DEFAULT_PROMPT_STYLE,
    DEFAULT_SELECTION_MODE, DEFAULT_SEQUENCE_TYPE,
};
use crate::model::MechanicKind;

const fn default_true() -> bool {
    true
}

fn default_sequence_type() -> String {
    DEFAULT_SEQUENCE_TYPE.to_string()
}

fn default_card_face() -> String {
    DEFAULT_CARD_FACE_TYPE.to_string()
}

const fn default_flip_duration() -> u32 {
    DEFAULT_FLIP_DURATION_MS
}

fn default_prompt_style() -> String {
    DEFAULT_PROMPT_STYLE.to_string()
}

fn default_selection_mode() -> String {
    DEFAULT_SELECTION_MODE.to_string()
}

fn default_path_type() -> String {
    DEFAULT_PATH_TYPE.to_string()
}

fn default_drawing_mode() -> String {
    DEFAULT_DRAWING_MODE.to_string()
}

fn default_matching_mode() -> String {
    DEFAULT_MATCHING_MODE.to_string()
}

fn default_compare_categories() -> Vec<String> {
    DEFAULT_COMPARE_CATEGORIES
        .iter()
        .map(|category| (*category).to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragDropConfig {
    #[serde(default = "default_true")]
    pub snap_to_zone: bool,
    #[serde(default)]
    pub show_leader_lines: bool,
    #[serde(default = "default_true")]
    pub allow_reposition: bool,
    #[serde(default)]
    pub show_distractors: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceItem {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceConfig {
    pub items: Vec<SequenceItem>,
    /// Item ids in the expected order; defaults to document order.
    #[serde(default)]
    pub correct_order: Vec<String>,
    #[serde(default = "default_sequence_type")]
    pub sequence_type: String,
    #[serde(default = "default_true")]
    pub allow_partial_credit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingItem {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub correct_category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingCategory {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingConfig {
    pub items: Vec<SortingItem>,
    pub categories: Vec<SortingCategory>,
    #[serde(default = "default_true")]
    pub allow_partial_credit: bool,
    #[serde(default)]
    pub show_category_hints: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryPair {
    #[serde(default)]
    pub id: String,
    pub front: String,
    pub back: String,
    #[serde(default = "default_card_face")]
    pub front_type: String,
    #[serde(default = "default_card_face")]
    pub back_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMatchConfig {
    pub pairs: Vec<MemoryPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<[u32; 2]>,
    #[serde(default = "default_flip_duration")]
    pub flip_duration_ms: u32,
    #[serde(default = "default_true")]
    pub show_attempts_counter: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOption {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consequence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionNode {
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<DecisionOption>,
    #[serde(default)]
    pub is_end_node: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DecisionNode {
    /// Nodes that ask the player something; end nodes and option-less nodes
    /// are not graded.
    #[must_use]
    pub fn is_decision(&self) -> bool {
        !self.is_end_node && !self.options.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchingConfig {
    pub nodes: Vec<DecisionNode>,
    pub start_node_id: String,
    #[serde(default = "default_true")]
    pub show_path_taken: bool,
    #[serde(default = "default_true")]
    pub allow_backtrack: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparableDiagram {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub zones: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_a: Option<ComparableDiagram>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_b: Option<ComparableDiagram>,
    /// Zone id to expected category.
    #[serde(default)]
    pub expected_categories: BTreeMap<String, String>,
    #[serde(default = "default_compare_categories")]
    pub category_types: Vec<String>,
    #[serde(default = "default_true")]
    pub highlight_matching: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationPrompt {
    pub zone_id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickToIdentifyConfig {
    #[serde(default)]
    pub prompts: Vec<IdentificationPrompt>,
    #[serde(default = "default_prompt_style")]
    pub prompt_style: String,
    #[serde(default = "default_selection_mode")]
    pub selection_mode: String,
    #[serde(default = "default_true")]
    pub highlight_on_hover: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathWaypoint {
    pub zone_id: String,
    #[serde(default)]
    pub order: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePath {
    #[serde(default)]
    pub id: String,
    pub waypoints: Vec<PathWaypoint>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub requires_order: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePathConfig {
    #[serde(default)]
    pub paths: Vec<TracePath>,
    #[serde(default = "default_path_type")]
    pub path_type: String,
    #[serde(default = "default_drawing_mode")]
    pub drawing_mode: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TracePathConfig {
    #[must_use]
    pub fn waypoint_count(&self) -> usize {
        self.paths.iter().map(|path| path.waypoints.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionMatchingConfig {
    /// Zone id to the description the player must match.
    #[serde(default)]
    pub descriptions: BTreeMap<String, String>,
    #[serde(default = "default_matching_mode")]
    pub mode: String,
    #[serde(default = "default_true")]
    pub show_connecting_lines: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validated config of one mechanic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MechanicConfig {
    DragDrop(DragDropConfig),
    Sequencing(SequenceConfig),
    SortingCategories(SortingConfig),
    MemoryMatch(MemoryMatchConfig),
    BranchingScenario(BranchingConfig),
    CompareContrast(CompareConfig),
    ClickToIdentify(ClickToIdentifyConfig),
    TracePath(TracePathConfig),
    DescriptionMatching(DescriptionMatchingConfig),
    Generic(Map<String, Value>),
}

impl MechanicConfig {
    #[must_use]
    pub const fn kind(&self) -> MechanicKind {
        match self {
            Self::DragDrop(_) => MechanicKind::DragDrop,
            Self::Sequencing(_) => MechanicKind::Sequencing,
            Self::SortingCategories(_) => MechanicKind::SortingCategories,
            Self::MemoryMatch(_) => MechanicKind::MemoryMatch,
            Self::BranchingScenario(_) => MechanicKind::BranchingScenario,
            Self::CompareContrast(_) => MechanicKind::CompareContrast,
            Self::ClickToIdentify(_) => MechanicKind::ClickToIdentify,
            Self::TracePath(_) => MechanicKind::TracePath,
            Self::DescriptionMatching(_) => MechanicKind::DescriptionMatching,
            Self::Generic(_) => MechanicKind::Generic,
        }
    }
}

/// At most one validated config per mechanic kind.
///
/// Serializes as the document keys (`sequenceConfig`, ...) so it can be
/// flattened into a blueprint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MechanicConfigSet {
    configs: BTreeMap<MechanicKind, MechanicConfig>,
}

impl MechanicConfigSet {
    /// Insert a config, replacing any previous config of the same kind.
    pub fn insert(&mut self, config: MechanicConfig) {
        self.configs.insert(config.kind(), config);
    }

    #[must_use]
    pub fn get(&self, kind: MechanicKind) -> Option<&MechanicConfig> {
        self.configs.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MechanicConfig> {
        self.configs.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    #[must_use]
    pub fn sequence(&self) -> Option<&SequenceConfig> {
        match self.get(MechanicKind::Sequencing) {
            Some(MechanicConfig::Sequencing(config)) => Some(config),
            _ => None,
        }
    }

    #[must_use]
    pub fn sorting(&self) -> Option<&SortingConfig> {
        match self.get(MechanicKind::SortingCategories) {
            Some(MechanicConfig::SortingCategories(config)) => Some(config),
            _ => None,
        }
    }

    #[must_use]
    pub fn memory_match(&self) -> Option<&MemoryMatchConfig> {
        match self.get(MechanicKind::MemoryMatch) {
            Some(MechanicConfig::MemoryMatch(config)) => Some(config),
            _ => None,
        }
    }

    #[must_use]
    pub fn branching(&self) -> Option<&BranchingConfig> {
        match self.get(MechanicKind::BranchingScenario) {
            Some(MechanicConfig::BranchingScenario(config)) => Some(config),
            _ => None,
        }
    }

    #[must_use]
    pub fn compare(&self) -> Option<&CompareConfig> {
        match self.get(MechanicKind::CompareContrast) {
            Some(MechanicConfig::CompareContrast(config)) => Some(config),
            _ => None,
        }
    }

    #[must_use]
    pub fn click_to_identify(&self) -> Option<&ClickToIdentifyConfig> {
        match self.get(MechanicKind::ClickToIdentify) {
            Some(MechanicConfig::ClickToIdentify(config)) => Some(config),
            _ => None,
        }
    }

    #[must_use]
    pub fn trace_path(&self) -> Option<&TracePathConfig> {
        match self.get(MechanicKind::TracePath) {
            Some(MechanicConfig::TracePath(config)) => Some(config),
            _ => None,
        }
    }

    #[must_use]
    pub fn description_matching(&self) -> Option<&DescriptionMatchingConfig> {
        match self.get(MechanicKind::DescriptionMatching) {
            Some(MechanicConfig::DescriptionMatching(config)) => Some(config),
            _ => None,
        }
    }
}

impl Serialize for MechanicConfigSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let keyed: Vec<_> = self
            .configs
            .iter()
            .filter_map(|(kind, config)| kind.config_key().map(|key| (key, config)))
            .collect();
        let mut map = serializer.serialize_map(Some(keyed.len()))?;
        for (key, config) in keyed {
            map.serialize_entry(key, config)?;
        }
        map.end()
    }
}

fn require_array<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    prefix: &str,
    errors: &mut Vec<SchemaError>,
) -> &'a [Value] {
    let path = join_path(prefix, key);
    match map.get(key) {
        None | Some(Value::Null) => {
            errors.push(SchemaError::Missing { path });
            &[]
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.push(SchemaError::WrongType {
                path,
                expected: "array",
            });
            &[]
        }
    }
}

fn optional_array<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    prefix: &str,
    errors: &mut Vec<SchemaError>,
) -> &'a [Value] {
    match map.get(key) {
        None | Some(Value::Null) => &[],
        Some(_) => require_array(map, key, prefix, errors),
    }
}

/// Object elements of an array, reporting non-object elements by index.
fn objects<'a>(
    items: &'a [Value],
    prefix: &str,
    errors: &mut Vec<SchemaError>,
) -> Vec<(String, &'a Map<String, Value>)> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let path = index_path(prefix, index);
            if let Value::Object(obj) = item {
                Some((path, obj))
            } else {
                errors.push(SchemaError::WrongType {
                    path,
                    expected: "object",
                });
                None
            }
        })
        .collect()
}

fn require_reference(
    map: &Map<String, Value>,
    key: &str,
    prefix: &str,
    errors: &mut Vec<SchemaError>,
) {
    let path = join_path(prefix, key);
    match map.get(key) {
        None | Some(Value::Null) => errors.push(SchemaError::Missing { path }),
        Some(Value::String(text)) if !text.trim().is_empty() => {}
        Some(_) => errors.push(SchemaError::EmptyReference { path }),
    }
}

fn optional_reference(
    map: &Map<String, Value>,
    key: &str,
    prefix: &str,
    errors: &mut Vec<SchemaError>,
) {
    if map.get(key).is_some_and(|value| !value.is_null()) {
        require_reference(map, key, prefix, errors);
    }
}

fn decode<T: DeserializeOwned>(map: Map<String, Value>, path: &str) -> Result<T, SchemaErrors> {
    serde_json::from_value(Value::Object(map)).map_err(|err| {
        SchemaErrors(vec![SchemaError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        }])
    })
}

fn finish<T: DeserializeOwned>(
    map: Map<String, Value>,
    path: &str,
    errors: Vec<SchemaError>,
) -> Result<T, SchemaErrors> {
    if errors.is_empty() {
        decode(map, path)
    } else {
        Err(SchemaErrors(errors))
    }
}

fn camelize_nested_object(map: &mut Map<String, Value>, field: &str) {
    if let Some(Value::Object(obj)) = map.get_mut(field) {
        *obj = camelize_keys(obj);
    }
}

fn validate_sequence(
    mut map: Map<String, Value>,
    path: &str,
) -> Result<SequenceConfig, SchemaErrors> {
    camelize_array_items(&mut map, "items", SEQUENCE_ITEM_ALIASES);
    let mut errors = Vec::new();
    let items = require_array(&map, "items", path, &mut errors);
    for (item_path, item) in objects(items, &join_path(path, "items"), &mut errors) {
        require_reference(item, "id", &item_path, &mut errors);
    }
    let order = optional_array(&map, "correctOrder", path, &mut errors);
    for (index, entry) in order.iter().enumerate() {
        if !entry.as_str().is_some_and(|id| !id.trim().is_empty()) {
            errors.push(SchemaError::EmptyReference {
                path: index_path(&join_path(path, "correctOrder"), index),
            });
        }
    }
    let mut config: SequenceConfig = finish(map, path, errors)?;
    if config.correct_order.is_empty() {
        config.correct_order = config.items.iter().map(|item| item.id.clone()).collect();
    }
    Ok(config)
}

fn validate_sorting(mut map: Map<String, Value>, path: &str) -> Result<SortingConfig, SchemaErrors> {
    camelize_array_items(&mut map, "items", SORTING_ITEM_ALIASES);
    camelize_array_items(&mut map, "categories", &[("name", "label")]);
    let mut errors = Vec::new();
    let items = require_array(&map, "items", path, &mut errors);
    for (item_path, item) in objects(items, &join_path(path, "items"), &mut errors) {
        require_reference(item, "id", &item_path, &mut errors);
        require_reference(item, "correctCategoryId", &item_path, &mut errors);
    }
    let categories = require_array(&map, "categories", path, &mut errors);
    for (category_path, category) in objects(categories, &join_path(path, "categories"), &mut errors)
    {
        require_reference(category, "id", &category_path, &mut errors);
    }
    finish(map, path, errors)
}

fn validate_memory_match(
    mut map: Map<String, Value>,
    path: &str,
) -> Result<MemoryMatchConfig, SchemaErrors> {
    camelize_array_items(&mut map, "pairs", MEMORY_PAIR_ALIASES);
    let mut errors = Vec::new();
    let pairs = require_array(&map, "pairs", path, &mut errors);
    for (pair_path, pair) in objects(pairs, &join_path(path, "pairs"), &mut errors) {
        for side in ["front", "back"] {
            if !pair.get(side).is_some_and(Value::is_string) {
                errors.push(SchemaError::WrongType {
                    path: join_path(&pair_path, side),
                    expected: "string",
                });
            }
        }
    }
    let mut config: MemoryMatchConfig = finish(map, path, errors)?;
    for (index, pair) in config.pairs.iter_mut().enumerate() {
        if pair.id.trim().is_empty() {
            pair.id = format!("pair_{}", index + 1);
        }
    }
    Ok(config)
}

fn validate_branching(
    map: Map<String, Value>,
    path: &str,
) -> Result<BranchingConfig, SchemaErrors> {
    let mut map = promote_aliases(&map, BRANCHING_CONFIG_ALIASES);
    camelize_array_items(&mut map, "nodes", BRANCHING_NODE_ALIASES);
    if let Some(Value::Array(nodes)) = map.get_mut("nodes") {
        for node in nodes.iter_mut().filter_map(Value::as_object_mut) {
            camelize_array_items(node, "options", BRANCHING_OPTION_ALIASES);
        }
    }
    let mut errors = Vec::new();
    require_reference(&map, "startNodeId", path, &mut errors);
    let nodes = require_array(&map, "nodes", path, &mut errors);
    for (node_path, node) in objects(nodes, &join_path(path, "nodes"), &mut errors) {
        require_reference(node, "id", &node_path, &mut errors);
        let options = optional_array(node, "options", &node_path, &mut errors);
        for (option_path, option) in objects(options, &join_path(&node_path, "options"), &mut errors)
        {
            optional_reference(option, "nextNodeId", &option_path, &mut errors);
        }
    }
    let mut config: BranchingConfig = finish(map, path, errors)?;
    for node in &mut config.nodes {
        for (index, option) in node.options.iter_mut().enumerate() {
            if option.id.trim().is_empty() {
                option.id = format!("{}_opt_{}", node.id, index + 1);
            }
        }
    }
    Ok(config)
}

fn validate_compare(mut map: Map<String, Value>, path: &str) -> Result<CompareConfig, SchemaErrors> {
    camelize_nested_object(&mut map, "diagramA");
    camelize_nested_object(&mut map, "diagramB");
    let mut errors = Vec::new();
    for side in ["diagramA", "diagramB"] {
        if map.get(side).is_some_and(|value| !value.is_null() && !value.is_object()) {
            errors.push(SchemaError::WrongType {
                path: join_path(path, side),
                expected: "object",
            });
        }
    }
    match map.get("expectedCategories") {
        None | Some(Value::Null) => {}
        Some(Value::Object(expected)) => {
            let expected_path = join_path(path, "expectedCategories");
            for (zone_id, category) in expected {
                if !category.as_str().is_some_and(|c| !c.trim().is_empty()) {
                    errors.push(SchemaError::EmptyReference {
                        path: join_path(&expected_path, zone_id),
                    });
                }
            }
        }
        Some(_) => errors.push(SchemaError::WrongType {
            path: join_path(path, "expectedCategories"),
            expected: "object",
        }),
    }
    finish(map, path, errors)
}

fn validate_click_to_identify(
    mut map: Map<String, Value>,
    path: &str,
) -> Result<ClickToIdentifyConfig, SchemaErrors> {
    camelize_array_items(&mut map, "prompts", &[("text", "prompt"), ("question", "prompt")]);
    let mut errors = Vec::new();
    let prompts = optional_array(&map, "prompts", path, &mut errors);
    for (prompt_path, prompt) in objects(prompts, &join_path(path, "prompts"), &mut errors) {
        require_reference(prompt, "zoneId", &prompt_path, &mut errors);
    }
    finish(map, path, errors)
}

fn validate_trace_path(
    mut map: Map<String, Value>,
    path: &str,
) -> Result<TracePathConfig, SchemaErrors> {
    camelize_array_items(&mut map, "paths", &[]);
    if let Some(Value::Array(paths)) = map.get_mut("paths") {
        for trace in paths.iter_mut().filter_map(Value::as_object_mut) {
            camelize_array_items(trace, "waypoints", &[]);
        }
    }
    let mut errors = Vec::new();
    let paths = optional_array(&map, "paths", path, &mut errors);
    for (trace_path, trace) in objects(paths, &join_path(path, "paths"), &mut errors) {
        let waypoints = require_array(trace, "waypoints", &trace_path, &mut errors);
        for (waypoint_path, waypoint) in
            objects(waypoints, &join_path(&trace_path, "waypoints"), &mut errors)
        {
            require_reference(waypoint, "zoneId", &waypoint_path, &mut errors);
        }
    }
    let mut config: TracePathConfig = finish(map, path, errors)?;
    for (index, trace) in config.paths.iter_mut().enumerate() {
        if trace.id.trim().is_empty() {
            trace.id = format!("path_{}", index + 1);
        }
    }
    Ok(config)
}

fn validate_description_matching(
    map: Map<String, Value>,
    path: &str,
) -> Result<DescriptionMatchingConfig, SchemaErrors> {
    let mut errors = Vec::new();
    match map.get("descriptions") {
        None | Some(Value::Null) => {}
        Some(Value::Object(descriptions)) => {
            let descriptions_path = join_path(path, "descriptions");
            for (zone_id, description) in descriptions {
                if zone_id.trim().is_empty() {
                    errors.push(SchemaError::EmptyReference {
                        path: join_path(&descriptions_path, zone_id),
                    });
                } else if !description.is_string() {
                    errors.push(SchemaError::WrongType {
                        path: join_path(&descriptions_path, zone_id),
                        expected: "string",
                    });
                }
            }
        }
        Some(_) => errors.push(SchemaError::WrongType {
            path: join_path(path, "descriptions"),
            expected: "object",
        }),
    }
    finish(map, path, errors)
}

/// Validate one mechanic config fragment found at `path`.
///
/// # Errors
///
/// Returns every structural violation found in the fragment. A failure here
/// never affects sibling mechanics.
pub fn validate_mechanic_config(
    kind: MechanicKind,
    value: &Value,
    path: &str,
) -> Result<MechanicConfig, SchemaErrors> {
    let Value::Object(raw) = value else {
        return Err(SchemaErrors(vec![SchemaError::WrongType {
            path: path.to_string(),
            expected: if value.is_null() { "object, found null" } else { "object" },
        }]));
    };
    log::debug!(
        target: "blueprint_core::schema",
        "validating {kind} config at {path} ({} keys)",
        raw.len()
    );
    let map = camelize_keys(raw);
    match kind {
        MechanicKind::DragDrop => decode(map, path).map(MechanicConfig::DragDrop),
        MechanicKind::Sequencing => validate_sequence(map, path).map(MechanicConfig::Sequencing),
        MechanicKind::SortingCategories => {
            validate_sorting(map, path).map(MechanicConfig::SortingCategories)
        }
        MechanicKind::MemoryMatch => {
            validate_memory_match(map, path).map(MechanicConfig::MemoryMatch)
        }
        MechanicKind::BranchingScenario => {
            validate_branching(map, path).map(MechanicConfig::BranchingScenario)
        }
        MechanicKind::CompareContrast => {
            validate_compare(map, path).map(MechanicConfig::CompareContrast)
        }
        MechanicKind::ClickToIdentify => {
            validate_click_to_identify(map, path).map(MechanicConfig::ClickToIdentify)
        }
        MechanicKind::TracePath => validate_trace_path(map, path).map(MechanicConfig::TracePath),
        MechanicKind::DescriptionMatching => {
            validate_description_matching(map, path).map(MechanicConfig::DescriptionMatching)
        }
        MechanicKind::Generic => Ok(MechanicConfig::Generic(map)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(err: &SchemaErrors) -> Vec<&str> {
        err.0.iter().map(SchemaError::path).collect()
    }

    #[test]
    fn sequence_defaults_and_aliases() {
        let value = json!({
            "items": [
                {"id": "s1", "content": "Egg", "explanation": "start"},
                {"id": "s2", "text": "Larva", "image_url": "larva.png"}
            ],
            "instruction_text": "Order the stages",
            "custom_flag": true
        });
        let config = validate_mechanic_config(MechanicKind::Sequencing, &value, "sequenceConfig")
            .unwrap();
        let MechanicConfig::Sequencing(seq) = config else {
            panic!("expected sequence config");
        };
        assert_eq!(seq.correct_order, ["s1", "s2"]);
        assert_eq!(seq.items[0].text, "Egg");
        assert_eq!(seq.items[0].description.as_deref(), Some("start"));
        assert_eq!(seq.items[1].image.as_deref(), Some("larva.png"));
        assert_eq!(seq.sequence_type, "linear");
        assert!(seq.allow_partial_credit);
        assert_eq!(seq.instruction_text.as_deref(), Some("Order the stages"));
        assert_eq!(seq.extra["custom_flag"], json!(true));
        assert_eq!(seq.extra["customFlag"], json!(true));
    }

    #[test]
    fn sorting_requires_category_references() {
        let value = json!({
            "items": [
                {"id": "i1", "text": "Oak", "correct_category_id": "trees"},
                {"id": "i2", "text": "Rose", "correctCategoryId": ""},
                {"id": "i3", "text": "Fern"}
            ],
            "categories": [{"id": "trees", "label": "Trees"}]
        });
        let err = validate_mechanic_config(MechanicKind::SortingCategories, &value, "sortingConfig")
            .unwrap_err();
        assert_eq!(
            paths(&err),
            [
                "sortingConfig.items[1].correctCategoryId",
                "sortingConfig.items[2].correctCategoryId"
            ]
        );
        assert!(matches!(err.0[0], SchemaError::EmptyReference { .. }));
        assert!(matches!(err.0[1], SchemaError::Missing { .. }));
    }

    #[test]
    fn memory_pairs_get_ids() {
        let value = json!({"pairs": [{"front": "H2O", "back": "Water"}, {"id": "p2", "front": "NaCl", "back": "Salt"}]});
        let MechanicConfig::MemoryMatch(config) =
            validate_mechanic_config(MechanicKind::MemoryMatch, &value, "memoryMatchConfig")
                .unwrap()
        else {
            panic!("expected memory config");
        };
        assert_eq!(config.pairs[0].id, "pair_1");
        assert_eq!(config.pairs[1].id, "p2");
        assert_eq!(config.flip_duration_ms, 600);
        assert_eq!(config.pairs[0].front_type, "text");
    }

    #[test]
    fn branching_checks_start_node_and_links() {
        let value = json!({
            "nodes": [
                {"id": "n1", "prompt": "Go?", "options": [
                    {"text": "Yes", "next_node_id": "n2", "is_correct": true},
                    {"text": "No", "nextNodeId": ""}
                ]}
            ]
        });
        let err = validate_mechanic_config(MechanicKind::BranchingScenario, &value, "branchingConfig")
            .unwrap_err();
        assert_eq!(
            paths(&err),
            ["branchingConfig.startNodeId", "branchingConfig.nodes[0].options[1].nextNodeId"]
        );

        let fixed = json!({
            "start_node_id": "n1",
            "nodes": [
                {"id": "n1", "prompt": "Go?", "options": [{"text": "Yes", "next_node_id": "n2", "is_correct": true}]},
                {"id": "n2", "is_end_node": true, "end_message": "Done"}
            ]
        });
        let MechanicConfig::BranchingScenario(config) =
            validate_mechanic_config(MechanicKind::BranchingScenario, &fixed, "branchingConfig")
                .unwrap()
        else {
            panic!("expected branching config");
        };
        assert_eq!(config.start_node_id, "n1");
        assert_eq!(config.nodes[0].question, "Go?");
        assert_eq!(config.nodes[0].options[0].id, "n1_opt_1");
        assert_eq!(config.nodes[0].options[0].next_node_id.as_deref(), Some("n2"));
        assert!(config.nodes[0].is_decision());
        assert!(!config.nodes[1].is_decision());
    }

    #[test]
    fn compare_and_description_maps_are_checked() {
        let compare = json!({"expected_categories": {"z1": "similar", "z2": ""}});
        let err = validate_mechanic_config(MechanicKind::CompareContrast, &compare, "compareConfig")
            .unwrap_err();
        assert_eq!(paths(&err), ["compareConfig.expectedCategories.z2"]);

        let described = json!({"descriptions": {"z1": "Pumps blood"}});
        let MechanicConfig::DescriptionMatching(config) = validate_mechanic_config(
            MechanicKind::DescriptionMatching,
            &described,
            "descriptionMatchingConfig",
        )
        .unwrap() else {
            panic!("expected description config");
        };
        assert_eq!(config.descriptions.len(), 1);
        assert_eq!(config.mode, "click_zone");
    }

    #[test]
    fn trace_path_waypoints_need_zones() {
        let value = json!({"paths": [{"waypoints": [{"zone_id": "a", "order": 1}, {"order": 2}]}]});
        let err = validate_mechanic_config(MechanicKind::TracePath, &value, "tracePathConfig")
            .unwrap_err();
        assert_eq!(paths(&err), ["tracePathConfig.paths[0].waypoints[1].zoneId"]);

        let ok = json!({"paths": [{"waypoints": [{"zone_id": "a", "order": 1}, {"zoneId": "b", "order": 2}]}]});
        let MechanicConfig::TracePath(config) =
            validate_mechanic_config(MechanicKind::TracePath, &ok, "tracePathConfig").unwrap()
        else {
            panic!("expected trace config");
        };
        assert_eq!(config.paths[0].id, "path_1");
        assert_eq!(config.waypoint_count(), 2);
    }

    #[test]
    fn non_objects_are_rejected_with_path() {
        let err = validate_mechanic_config(MechanicKind::DragDrop, &json!([1, 2]), "dragDropConfig")
            .unwrap_err();
        assert_eq!(paths(&err), ["dragDropConfig"]);
        let ok = validate_mechanic_config(MechanicKind::DragDrop, &json!({}), "dragDropConfig")
            .unwrap();
        let MechanicConfig::DragDrop(config) = ok else {
            panic!("expected drag drop config");
        };
        assert!(config.snap_to_zone);
        assert!(!config.show_leader_lines);
    }

    #[test]
    fn config_set_serializes_document_keys() {
        let mut set = MechanicConfigSet::default();
        set.insert(
            validate_mechanic_config(MechanicKind::DragDrop, &json!({}), "dragDropConfig").unwrap(),
        );
        set.insert(MechanicConfig::Generic(Map::new()));
        let value = serde_json::to_value(&set).unwrap();
        assert!(value.get("dragDropConfig").is_some());
        assert_eq!(value.as_object().unwrap().len(), 1);
        assert_eq!(set.len(), 2);
    }
}

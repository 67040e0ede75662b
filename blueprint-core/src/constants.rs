//! Centralized defaults for blueprint repair and scoring.

// Diagram -----------------------------------------------------------------
pub const DEFAULT_DIAGRAM_WIDTH: u32 = 800;
pub const DEFAULT_DIAGRAM_HEIGHT: u32 = 600;

// Zone geometry -----------------------------------------------------------
pub const COORD_MIN: f64 = 0.0;
pub const COORD_MAX: f64 = 100.0;
pub const DEFAULT_ZONE_X: f64 = 50.0;
pub const DEFAULT_ZONE_Y: f64 = 50.0;
pub const DEFAULT_ZONE_RADIUS: f64 = 8.0;
pub const FALLBACK_ZONE_RADIUS: f64 = 8.0;

// Identifier synthesis ----------------------------------------------------
pub(crate) const ZONE_ID_PREFIX: &str = "zone_";
pub(crate) const LABEL_ID_PREFIX: &str = "label_";
pub(crate) const DISTRACTOR_ID_PREFIX: &str = "distractor_";
/// First suffix tried when an identifier is already taken (`z1` -> `z1_2`).
pub(crate) const FIRST_COLLISION_SUFFIX: u32 = 2;

// Scoring -----------------------------------------------------------------
pub const DEFAULT_POINTS_PER_ITEM: u32 = 10;
pub const DEFAULT_STREAK_MULTIPLIER: f64 = 1.0;
pub const DEFAULT_TEMPLATE_TYPE: &str = "INTERACTIVE_DIAGRAM";

// Mechanic defaults -------------------------------------------------------
pub(crate) const DEFAULT_FLIP_DURATION_MS: u32 = 600;
pub(crate) const DEFAULT_SEQUENCE_TYPE: &str = "linear";
pub(crate) const DEFAULT_CARD_FACE_TYPE: &str = "text";
pub(crate) const DEFAULT_PROMPT_STYLE: &str = "naming";
pub(crate) const DEFAULT_SELECTION_MODE: &str = "sequential";
pub(crate) const DEFAULT_PATH_TYPE: &str = "linear";
pub(crate) const DEFAULT_DRAWING_MODE: &str = "click_waypoints";
pub(crate) const DEFAULT_MATCHING_MODE: &str = "click_zone";
pub(crate) const DEFAULT_COMPARE_CATEGORIES: [&str; 4] =
    ["similar", "different", "unique_a", "unique_b"];

// Sequence contract -------------------------------------------------------
pub const REVEAL_THRESHOLD_MIN: f64 = 0.0;
pub const REVEAL_THRESHOLD_MAX: f64 = 100.0;

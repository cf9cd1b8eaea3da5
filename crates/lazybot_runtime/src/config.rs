//! Scene configuration - TOML/JSON to raw scene structs
//!
//! A scene lists shared waypoints, obstacles, target types and entities.
//! Parsing only checks syntax; names are resolved when the world is built.
//!
//! # Scene Format
//!
//! ```toml
//! seed = 7
//!
//! [[target_types]]
//! name = "intruder"
//! properties = "0/1"
//!
//! [[waypoints]]
//! name = "gate"
//! position = [0.0, 0.0, 10.0]
//!
//! [[obstacles]]
//! center = [5.0, 0.0, 5.0]
//! radius = 1.5
//!
//! [[entities]]
//! name = "guard"
//! position = [0.0, 0.0, 0.0]
//! max_speed = 3.0
//!
//! [entities.health]
//! start = 100.0
//! min = 0.0
//! max = 100.0
//! low = 10.0
//!
//! [[entities.navigation.points]]
//! waypoint = "gate"
//! action = "stop"
//! transfer_delay = 2.0
//!
//! [[entities.detection_areas]]
//! name = "body"
//!
//! [[entities.searching_areas]]
//! target_type = "intruder"
//! radius = 12.0
//! angle = 120.0
//! tags = ["intruder"]
//!
//! [[entities.exclusive_states]]
//! kind = "patrol"
//! check_on = "1"
//!
//! [[entities.exclusive_states]]
//! kind = "attack"
//! priority = 10
//! check_on = "0"
//! ```

use std::path::Path;

use glam::Vec3;
use lazybot_ai::{IntMask, PointAction, PointType, PolicyKind};
use lazybot_combat::{FloatEntityData, ResourceError};
use lazybot_sensing::{ObservationType, ValidatorKind};
use serde::Deserialize;
use thiserror::Error;

/// Errors from loading or building a scene
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported scene format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown state kind: {0}")]
    UnknownState(String),

    #[error("Unknown waypoint: {0}")]
    UnknownWaypoint(String),

    #[error("Unknown target type: {0}")]
    UnknownTargetType(String),

    #[error("Invalid resource: {0}")]
    Resource(#[from] ResourceError),

    #[error("Scene error: {0}")]
    Core(#[from] lazybot_core::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for scene operations
pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_dt() -> f32 {
    1.0 / 30.0
}

fn default_one() -> f32 {
    1.0
}

fn default_accuracy() -> f32 {
    0.5
}

fn default_angle() -> f32 {
    360.0
}

fn default_target_mask() -> u32 {
    u32::MAX
}

fn default_max_speed() -> f32 {
    3.5
}

fn default_angular_speed() -> f32 {
    360.0
}

fn default_sweep() -> f32 {
    1.0
}

fn default_health() -> FloatEntityData {
    FloatEntityData::new(100.0, 0.0, 100.0)
}

fn default_stamina() -> FloatEntityData {
    FloatEntityData::new(100.0, 0.0, 100.0)
}

fn default_action() -> PointAction {
    PointAction::Continue
}

fn default_volume() -> f32 {
    1.0
}

/// Root of a scene file
#[derive(Debug, Clone, Deserialize)]
pub struct SceneConfig {
    /// Seed of every random navigation container
    #[serde(default)]
    pub seed: u64,
    /// Seconds per tick
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Seconds between dead-entity sweeps
    #[serde(default = "default_sweep")]
    pub sweep_interval: f32,
    #[serde(default)]
    pub target_types: Vec<TargetTypeConfig>,
    #[serde(default)]
    pub waypoints: Vec<WaypointConfig>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    /// Known clip durations in seconds
    #[serde(default)]
    pub clips: Vec<ClipConfig>,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetTypeConfig {
    pub name: String,
    /// Property names (`"position"`) or ids, mixed freely
    #[serde(default)]
    pub properties: PropertyList,
    #[serde(default)]
    pub data_on_detection: bool,
}

/// Properties listed either as a mask string or as names and ids
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PropertyList {
    Mask(IntMask),
    Names(Vec<PropertyRef>),
}

impl Default for PropertyList {
    fn default() -> Self {
        Self::Mask(IntMask::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PropertyRef {
    Id(u32),
    Name(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaypointConfig {
    pub name: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObstacleConfig {
    pub center: Vec3,
    pub radius: f32,
    /// Bit index tested against obstacle masks
    #[serde(default)]
    pub layer: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClipConfig {
    pub name: String,
    pub duration: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    /// Labels candidates are enumerated by
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub position: Vec3,
    /// Euler angles in degrees
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
    /// Degrees per second
    #[serde(default = "default_angular_speed")]
    pub angular_speed: f32,
    #[serde(default)]
    pub path_update_delay: f32,
    #[serde(default)]
    pub active_state: usize,
    #[serde(default = "default_health")]
    pub health: FloatEntityData,
    #[serde(default = "default_stamina")]
    pub stamina: FloatEntityData,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub detection_areas: Vec<DetectionAreaConfig>,
    #[serde(default)]
    pub searching_areas: Vec<SearchingAreaConfig>,
    #[serde(default)]
    pub steady_states: Vec<StateConfig>,
    #[serde(default)]
    pub exclusive_states: Vec<StateConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NavigationConfig {
    #[serde(default)]
    pub random: bool,
    #[serde(default)]
    pub startup_point: usize,
    #[serde(default)]
    pub policy: PolicyKind,
    #[serde(default)]
    pub points: Vec<NavigationPointConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationPointConfig {
    /// Shared waypoint name
    pub waypoint: Option<String>,
    /// Private position, used when no waypoint is named
    pub position: Option<Vec3>,
    #[serde(default, rename = "type")]
    pub point_type: PointType,
    #[serde(default = "default_action")]
    pub action: PointAction,
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub transfer_delay: f32,
    #[serde(default = "default_one")]
    pub movement_speed: f32,
    #[serde(default = "default_accuracy")]
    pub accuracy_radius: f32,
    #[serde(default)]
    pub impact_radius: f32,
    #[serde(default = "default_one")]
    pub min_impact_speed: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionAreaConfig {
    pub name: String,
    #[serde(default)]
    pub offset: Vec3,
    #[serde(default)]
    pub layer: u8,
    #[serde(default = "default_one")]
    pub damage_multiplier: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchingAreaConfig {
    pub target_type: Option<String>,
    #[serde(default)]
    pub observation: ObservationType,
    pub radius: f32,
    #[serde(default = "default_angle")]
    pub angle: f32,
    #[serde(default)]
    pub offset: Vec3,
    /// Euler angles in degrees
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default)]
    pub obstacle_mask: u32,
    #[serde(default = "default_target_mask")]
    pub target_mask: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub update_rate: f32,
    #[serde(default)]
    pub priority: u16,
    /// Defaults to the standard chain
    pub validators: Option<Vec<ValidatorKind>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// Built-in behaviour: `idle`, `patrol`, `attack` or `alert`
    pub kind: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub check_on: IntMask,
    #[serde(default)]
    pub blocking: bool,
    #[serde(default)]
    pub blocking_on_sleep: bool,
    /// Clip played by `alert`
    pub clip: Option<String>,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

/// Parse a scene from TOML
pub fn parse_scene(content: &str) -> ConfigResult<SceneConfig> {
    let scene: SceneConfig = toml::from_str(content)?;
    validate_scene(&scene)?;
    Ok(scene)
}

/// Parse a scene from JSON
pub fn parse_scene_json(content: &str) -> ConfigResult<SceneConfig> {
    let scene: SceneConfig = serde_json::from_str(content)?;
    validate_scene(&scene)?;
    Ok(scene)
}

/// Load a scene, choosing the format by extension (`.toml` or `.json`)
pub fn load_scene(path: impl AsRef<Path>) -> ConfigResult<SceneConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => parse_scene(&content),
        Some("json") => parse_scene_json(&content),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn validate_scene(scene: &SceneConfig) -> ConfigResult<()> {
    if scene.dt <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "dt must be positive, got {}",
            scene.dt
        )));
    }

    for entity in &scene.entities {
        if entity.exclusive_states.is_empty() {
            log::warn!("entity {} has no exclusive states", entity.name);
        }
        if entity.active_state > 0 && entity.active_state >= entity.exclusive_states.len() {
            return Err(ConfigError::Validation(format!(
                "entity {}: active state {} out of range",
                entity.name, entity.active_state
            )));
        }
        for point in &entity.navigation.points {
            if point.waypoint.is_none() && point.position.is_none() {
                return Err(ConfigError::Validation(format!(
                    "entity {}: navigation point needs a waypoint or a position",
                    entity.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_scene() {
        let scene = parse_scene("").unwrap();
        assert!(scene.entities.is_empty());
        assert_eq!(scene.seed, 0);
        assert!((scene.dt - 1.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_entity_defaults() {
        let content = r#"
[[entities]]
name = "guard"

[[entities.navigation.points]]
position = [1.0, 0.0, 2.0]

[[entities.exclusive_states]]
kind = "patrol"
check_on = "1/2"
"#;
        let scene = parse_scene(content).unwrap();
        let guard = &scene.entities[0];
        assert_eq!(guard.health.start(), 100.0);
        assert_eq!(guard.navigation.points[0].action, PointAction::Continue);
        assert_eq!(guard.navigation.points[0].point_type, PointType::Path);
        assert_eq!(guard.exclusive_states[0].check_on.values(), vec![1, 2]);
        assert!(guard.searching_areas.is_empty());
    }

    #[test]
    fn test_parse_searching_area() {
        let content = r#"
[[entities]]
name = "guard"

[[entities.searching_areas]]
target_type = "intruder"
observation = "view"
radius = 8.0
angle = 90.0
tags = ["intruder"]
validators = ["distance", "direct_contact"]
"#;
        let scene = parse_scene(content).unwrap();
        let area = &scene.entities[0].searching_areas[0];
        assert_eq!(area.observation, ObservationType::View);
        assert_eq!(area.target_mask, u32::MAX);
        assert_eq!(
            area.validators.as_deref(),
            Some(&[ValidatorKind::Distance, ValidatorKind::DirectContact][..])
        );
    }

    #[test]
    fn test_property_lists() {
        let content = r#"
[[target_types]]
name = "a"
properties = "0/1"

[[target_types]]
name = "b"
properties = ["position", 2]
"#;
        let scene = parse_scene(content).unwrap();
        assert!(matches!(scene.target_types[0].properties, PropertyList::Mask(_)));
        match &scene.target_types[1].properties {
            PropertyList::Names(names) => assert_eq!(names.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_point_without_position_is_rejected() {
        let content = r#"
[[entities]]
name = "guard"

[[entities.navigation.points]]
action = "stop"
"#;
        assert!(matches!(parse_scene(content), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_bad_dt_is_rejected() {
        assert!(matches!(parse_scene("dt = 0.0"), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_parse_json_scene() {
        let json = r#"{ "seed": 3, "entities": [{ "name": "dummy", "tags": ["intruder"] }] }"#;
        let scene = parse_scene_json(json).unwrap();
        assert_eq!(scene.seed, 3);
        assert_eq!(scene.entities[0].tags, vec!["intruder".to_string()]);
    }
}

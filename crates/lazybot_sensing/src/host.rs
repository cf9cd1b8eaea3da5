//! Spatial query contract implemented by the simulation host

use glam::Vec3;
use lazybot_core::{EntityId, Transform};

use crate::detection::DetectionAreaContainer;

/// What a scan needs to know about the world
pub trait SpatialQuery {
    /// Entities currently carrying `tag`
    fn tagged(&self, tag: &str) -> Vec<EntityId>;

    /// Current pose of an entity
    fn transform(&self, entity: EntityId) -> Option<Transform>;

    /// Detection areas attached to an entity
    fn detection_areas(&self, entity: EntityId) -> Option<&DetectionAreaContainer>;

    /// Whether anything on `obstacle_mask` blocks the ray within `max_distance`
    fn is_obstructed(&self, origin: Vec3, direction: Vec3, max_distance: f32, obstacle_mask: u32)
        -> bool;
}

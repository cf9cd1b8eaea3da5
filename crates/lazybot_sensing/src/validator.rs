//! Composable predicates deciding whether a searcher senses a detection area

use glam::{Vec2, Vec3};
use lazybot_core::EntityId;
use serde::{Deserialize, Serialize};

use crate::detection::DetectionArea;
use crate::host::SpatialQuery;
use crate::searching::AreaData;

/// The scanning side of a validation
#[derive(Debug, Clone, Copy)]
pub struct Searcher<'a> {
    pub owner: EntityId,
    /// Scan origin in world space
    pub origin: Vec3,
    /// Facing direction after the area rotation
    pub forward: Vec3,
    pub data: &'a AreaData,
}

/// The sensed side of a validation
#[derive(Debug, Clone, Copy)]
pub struct Probe<'a> {
    pub entity: EntityId,
    /// Index of the area in its container
    pub index: usize,
    pub area: &'a DetectionArea,
    /// Area position in world space
    pub position: Vec3,
}

impl Probe<'_> {
    /// Vector from the searcher origin to the probe
    pub fn offset_from(&self, searcher: &Searcher<'_>) -> Vec3 {
        self.position - searcher.origin
    }
}

/// A single link in a validator chain
pub trait DetectionValidator: Send + Sync {
    /// `false` rejects the candidate
    fn validate(&self, searcher: &Searcher<'_>, probe: &Probe<'_>, host: &dyn SpatialQuery) -> bool;
}

/// Built-in validators, selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Within the area radius
    Distance,
    /// Inside the horizontal field of view
    Direction,
    /// Nothing on the obstacle mask in between
    DirectContact,
    /// Area layer is in the target mask
    Mask,
    /// Area is neither Disabled nor Unknown
    Activity,
}

impl ValidatorKind {
    /// Activity, distance, direction, mask and line of sight, cheapest first
    pub fn standard_chain() -> Vec<Box<dyn DetectionValidator>> {
        [
            Self::Activity,
            Self::Distance,
            Self::Direction,
            Self::Mask,
            Self::DirectContact,
        ]
        .into_iter()
        .map(|kind| Box::new(kind) as Box<dyn DetectionValidator>)
        .collect()
    }
}

impl DetectionValidator for ValidatorKind {
    fn validate(&self, searcher: &Searcher<'_>, probe: &Probe<'_>, host: &dyn SpatialQuery) -> bool {
        match self {
            Self::Distance => probe.offset_from(searcher).length() <= searcher.data.radius,
            Self::Direction => {
                if searcher.data.angle >= 360.0 {
                    return true;
                }
                let to_probe = probe.offset_from(searcher);
                horizontal_angle(to_probe, searcher.forward) <= searcher.data.angle / 2.0
            }
            Self::DirectContact => {
                let to_probe = probe.offset_from(searcher);
                !host.is_obstructed(
                    searcher.origin,
                    to_probe.normalize_or_zero(),
                    to_probe.length(),
                    searcher.data.obstacle_mask,
                )
            }
            Self::Mask => (1u32 << probe.area.layer.min(31)) & searcher.data.target_mask != 0,
            Self::Activity => probe.area.is_active(),
        }
    }
}

/// Unsigned angle in degrees between two vectors projected onto the XZ plane
pub fn horizontal_angle(a: Vec3, b: Vec3) -> f32 {
    let a = Vec2::new(a.x, a.z);
    let b = Vec2::new(b.x, b.z);
    if a.length_squared() < 1e-10 || b.length_squared() < 1e-10 {
        return 0.0;
    }
    a.angle_between(b).abs().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{DetectionAreaContainer, DetectionState};
    use approx::assert_relative_eq;
    use lazybot_core::Transform;

    struct OpenWorld {
        wall: bool,
    }

    impl SpatialQuery for OpenWorld {
        fn tagged(&self, _tag: &str) -> Vec<EntityId> {
            Vec::new()
        }

        fn transform(&self, _entity: EntityId) -> Option<Transform> {
            None
        }

        fn detection_areas(&self, _entity: EntityId) -> Option<&DetectionAreaContainer> {
            None
        }

        fn is_obstructed(&self, _o: Vec3, _d: Vec3, _m: f32, mask: u32) -> bool {
            self.wall && mask != 0
        }
    }

    fn check(kind: ValidatorKind, data: &AreaData, area: &DetectionArea, at: Vec3, wall: bool) -> bool {
        let searcher = Searcher {
            owner: EntityId(0),
            origin: Vec3::ZERO,
            forward: Vec3::Z,
            data,
        };
        let probe = Probe {
            entity: EntityId(1),
            index: 0,
            area,
            position: at,
        };
        kind.validate(&searcher, &probe, &OpenWorld { wall })
    }

    #[test]
    fn test_distance() {
        let data = AreaData::new(5.0, 360.0);
        let area = DetectionArea::new("body");
        assert!(check(ValidatorKind::Distance, &data, &area, Vec3::new(0.0, 0.0, 5.0), false));
        assert!(!check(ValidatorKind::Distance, &data, &area, Vec3::new(0.0, 0.0, 5.1), false));
    }

    #[test]
    fn test_direction() {
        let data = AreaData::new(10.0, 90.0);
        let area = DetectionArea::new("body");
        assert!(check(ValidatorKind::Direction, &data, &area, Vec3::new(1.0, 0.0, 2.0), false));
        assert!(!check(ValidatorKind::Direction, &data, &area, Vec3::new(2.0, 0.0, 1.0), false));
        assert!(!check(ValidatorKind::Direction, &data, &area, Vec3::new(0.0, 0.0, -1.0), false));

        let all_round = AreaData::new(10.0, 360.0);
        assert!(check(ValidatorKind::Direction, &all_round, &area, Vec3::new(0.0, 0.0, -1.0), false));
    }

    #[test]
    fn test_direct_contact() {
        let data = AreaData::new(10.0, 360.0).with_obstacle_mask(1);
        let area = DetectionArea::new("body");
        let at = Vec3::new(0.0, 0.0, 3.0);
        assert!(check(ValidatorKind::DirectContact, &data, &area, at, false));
        assert!(!check(ValidatorKind::DirectContact, &data, &area, at, true));
    }

    #[test]
    fn test_mask() {
        let data = AreaData::new(10.0, 360.0).with_target_mask(0b100);
        let hit = DetectionArea::new("body").with_layer(2);
        let miss = DetectionArea::new("body").with_layer(1);
        assert!(check(ValidatorKind::Mask, &data, &hit, Vec3::ZERO, false));
        assert!(!check(ValidatorKind::Mask, &data, &miss, Vec3::ZERO, false));
    }

    #[test]
    fn test_activity() {
        let data = AreaData::new(10.0, 360.0);
        let enabled = DetectionArea::new("body");
        let disabled = DetectionArea::new("body").with_state(DetectionState::Disabled);
        let unknown = DetectionArea::new("body").with_state(DetectionState::Unknown);
        let found = DetectionArea::new("body").with_state(DetectionState::Found);
        assert!(check(ValidatorKind::Activity, &data, &enabled, Vec3::ZERO, false));
        assert!(check(ValidatorKind::Activity, &data, &found, Vec3::ZERO, false));
        assert!(!check(ValidatorKind::Activity, &data, &disabled, Vec3::ZERO, false));
        assert!(!check(ValidatorKind::Activity, &data, &unknown, Vec3::ZERO, false));
    }

    #[test]
    fn test_horizontal_angle_ignores_height() {
        assert_relative_eq!(horizontal_angle(Vec3::new(0.0, 50.0, 1.0), Vec3::Z), 0.0);
        assert_relative_eq!(horizontal_angle(Vec3::X, Vec3::Z), 90.0, epsilon = 1e-4);
        assert_relative_eq!(horizontal_angle(Vec3::Y, Vec3::Z), 0.0);
    }

    #[test]
    fn test_config_names() {
        let kinds: Vec<ValidatorKind> =
            serde_json::from_str(r#"["distance", "direct_contact", "activity"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![ValidatorKind::Distance, ValidatorKind::DirectContact, ValidatorKind::Activity]
        );
    }
}

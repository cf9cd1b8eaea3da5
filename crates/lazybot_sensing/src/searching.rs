//! Searching areas: periodic scans over tagged candidates

use glam::Vec3;
use lazybot_core::{euler_degrees, AreaId, EntityId, Transform};
use serde::{Deserialize, Serialize};

use crate::host::SpatialQuery;
use crate::validator::{DetectionValidator, Probe, Searcher};

/// How a searching area perceives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    #[default]
    Undefined,
    Sonar,
    Sound,
    View,
}

/// Geometry and filters of a searching area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaData {
    /// World-space offset from the owner's position
    #[serde(default)]
    pub offset: Vec3,
    /// Euler rotation in degrees applied to the owner's forward
    #[serde(default)]
    pub rotation: Vec3,
    /// Detection radius (0 - 500)
    pub radius: f32,
    /// Full field of view in degrees; 360 sees all round
    #[serde(default = "full_circle")]
    pub angle: f32,
    /// Layers that block line of sight
    #[serde(default)]
    pub obstacle_mask: u32,
    /// Layers of detection areas that may be sensed
    #[serde(default = "all_layers")]
    pub target_mask: u32,
    /// Candidate tags, scanned in order
    #[serde(default)]
    pub enemy_tags: Vec<String>,
}

fn full_circle() -> f32 {
    360.0
}

fn all_layers() -> u32 {
    u32::MAX
}

impl AreaData {
    pub fn new(radius: f32, angle: f32) -> Self {
        Self {
            offset: Vec3::ZERO,
            rotation: Vec3::ZERO,
            radius: radius.clamp(0.0, 500.0),
            angle: angle.clamp(0.0, 360.0),
            obstacle_mask: 0,
            target_mask: all_layers(),
            enemy_tags: Vec::new(),
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_rotation(mut self, euler_degrees: Vec3) -> Self {
        self.rotation = euler_degrees;
        self
    }

    pub fn with_obstacle_mask(mut self, mask: u32) -> Self {
        self.obstacle_mask = mask;
        self
    }

    pub fn with_target_mask(mut self, mask: u32) -> Self {
        self.target_mask = mask;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.enemy_tags.push(tag.into());
        self
    }

    /// Scan origin for an owner pose
    pub fn origin(&self, owner: &Transform) -> Vec3 {
        owner.position + self.offset
    }

    /// Facing direction for an owner pose
    pub fn forward(&self, owner: &Transform) -> Vec3 {
        euler_degrees(self.rotation) * owner.forward()
    }
}

/// One candidate accepted by the validator chain
#[derive(Debug, Clone, PartialEq)]
pub struct TargetHit {
    pub entity: EntityId,
    /// Index of the accepted detection area in the candidate's container
    pub area_index: usize,
    pub position: Vec3,
}

/// Result of one scan cycle.
///
/// Consumers clear what this area captured before and replace it with `hits`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub area: AreaId,
    pub owner: EntityId,
    /// Target type name; `None` produces no hits
    pub target_type: Option<String>,
    pub observation: ObservationType,
    pub hits: Vec<TargetHit>,
}

/// A probe attached to an entity representing one way it senses others
pub struct SearchingArea {
    id: AreaId,
    owner: EntityId,
    observation: ObservationType,
    target_type: Option<String>,
    update_rate: f32,
    priority: u16,
    validators: Vec<Box<dyn DetectionValidator>>,
    data: AreaData,
    active: bool,
    allow_self: bool,
    elapsed: f32,
}

impl SearchingArea {
    pub fn new(id: AreaId, owner: EntityId, data: AreaData) -> Self {
        Self {
            id,
            owner,
            observation: ObservationType::Undefined,
            target_type: None,
            update_rate: 0.0,
            priority: 0,
            validators: Vec::new(),
            data,
            active: true,
            allow_self: false,
            elapsed: 0.0,
        }
    }

    pub fn with_observation(mut self, observation: ObservationType) -> Self {
        self.observation = observation;
        self
    }

    pub fn with_target_type(mut self, target_type: impl Into<String>) -> Self {
        self.target_type = Some(target_type.into());
        self
    }

    /// Seconds between scans; zero scans every tick
    pub fn with_update_rate(mut self, seconds: f32) -> Self {
        self.update_rate = seconds.max(0.0);
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn DetectionValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_validators(mut self, validators: Vec<Box<dyn DetectionValidator>>) -> Self {
        self.validators.extend(validators);
        self
    }

    /// Let the owner's own detection areas be sensed
    pub fn with_allow_self(mut self, allow: bool) -> Self {
        self.allow_self = allow;
        self
    }

    pub fn id(&self) -> AreaId {
        self.id
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn observation(&self) -> ObservationType {
        self.observation
    }

    pub fn target_type(&self) -> Option<&str> {
        self.target_type.as_deref()
    }

    pub fn priority(&self) -> u16 {
        self.priority
    }

    pub fn update_rate(&self) -> f32 {
        self.update_rate
    }

    pub fn data(&self) -> &AreaData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut AreaData {
        &mut self.data
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start or stop the scan loop. Starting waits a full interval before the first scan.
    pub fn set_active(&mut self, active: bool) {
        if active && !self.active {
            self.elapsed = 0.0;
        }
        self.active = active;
    }

    /// Advance the scan loop, scanning once when the interval elapses
    pub fn tick(&mut self, dt: f32, host: &dyn SpatialQuery) -> Option<ScanReport> {
        if !self.active {
            return None;
        }

        self.elapsed += dt.max(0.0);
        if self.elapsed < self.update_rate {
            return None;
        }

        if self.update_rate > 0.0 {
            self.elapsed -= self.update_rate;
            if self.elapsed >= self.update_rate {
                self.elapsed %= self.update_rate;
            }
        } else {
            self.elapsed = 0.0;
        }

        Some(self.scan(host))
    }

    /// Run one scan immediately
    pub fn scan(&self, host: &dyn SpatialQuery) -> ScanReport {
        let mut report = ScanReport {
            area: self.id,
            owner: self.owner,
            target_type: self.target_type.clone(),
            observation: self.observation,
            hits: Vec::new(),
        };

        let Some(owner_pose) = host.transform(self.owner) else {
            log::warn!("searching area {} has no owner transform", self.id);
            return report;
        };

        let searcher = Searcher {
            owner: self.owner,
            origin: self.data.origin(&owner_pose),
            forward: self.data.forward(&owner_pose),
            data: &self.data,
        };

        for tag in &self.data.enemy_tags {
            for candidate in host.tagged(tag) {
                if candidate == self.owner && !self.allow_self {
                    continue;
                }
                if report.hits.iter().any(|hit| hit.entity == candidate) {
                    continue;
                }
                if let Some(hit) = self.probe_candidate(candidate, &searcher, host) {
                    if report.target_type.is_some() {
                        report.hits.push(hit);
                    }
                }
            }
        }

        log::trace!("searching area {} found {} targets", self.id, report.hits.len());
        report
    }

    /// First detection area of `candidate` passing the whole chain
    fn probe_candidate(
        &self,
        candidate: EntityId,
        searcher: &Searcher<'_>,
        host: &dyn SpatialQuery,
    ) -> Option<TargetHit> {
        let pose = host.transform(candidate)?;
        let areas = host.detection_areas(candidate)?;

        for (index, area) in areas.iter().enumerate() {
            let probe = Probe {
                entity: candidate,
                index,
                area,
                position: area.world_position(&pose),
            };

            if self
                .validators
                .iter()
                .all(|validator| validator.validate(searcher, &probe, host))
            {
                return Some(TargetHit {
                    entity: candidate,
                    area_index: index,
                    position: probe.position,
                });
            }
        }
        None
    }
}

impl std::fmt::Debug for SearchingArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchingArea")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("observation", &self.observation)
            .field("target_type", &self.target_type)
            .field("update_rate", &self.update_rate)
            .field("priority", &self.priority)
            .field("validators", &self.validators.len())
            .field("active", &self.active)
            .finish()
    }
}

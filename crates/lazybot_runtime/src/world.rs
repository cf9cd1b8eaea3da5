//! Headless world: builds a scene and drives the tick loop
//!
//! One tick runs, in order:
//! 1. every entity controller
//! 2. every searching area whose interval elapsed, replacing what it captured
//! 3. the detection decay of every entity
//! 4. the dead-entity sweep
//! 5. the property board publish used by lazy targets

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use glam::Vec3;
use lazybot_ai::{
    EntityAgent, EntityController, EntityManager, IntMask, IntermediatePoint, NavigationContainer,
    NavigationPoint, SharedPoint, Target, TargetType,
};
use lazybot_combat::{BehaviourEvent, EntityBehaviour};
use lazybot_core::{AreaId, EntityId, IdGenerator, PointId, Transform};
use lazybot_sensing::{
    AreaData, DetectionArea, DetectionAreaContainer, DetectionState, DetectionValidator,
    ScanReport, SearchingArea, SpatialQuery, ValidatorKind,
};

use crate::audio::{AudioJournal, LoggingAudioSink};
use crate::config::{
    ConfigError, ConfigResult, EntityConfig, NavigationConfig, PropertyList, PropertyRef,
    SceneConfig, SearchingAreaConfig, TargetTypeConfig,
};
use crate::kinematic::KinematicMover;
use crate::states::build_state;

/// A sphere blocking line of sight on one layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub center: Vec3,
    pub radius: f32,
    pub layer: u8,
}

impl Obstacle {
    /// Whether the ray hits this sphere within `max_distance`. `direction` is unit length.
    pub fn intersects(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> bool {
        let oc = origin - self.center;
        let c = oc.length_squared() - self.radius * self.radius;
        if c <= 0.0 {
            return true;
        }
        let b = oc.dot(direction);
        if b > 0.0 {
            return false;
        }
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return false;
        }
        -b - discriminant.sqrt() <= max_distance
    }
}

/// Per-entity line of the run summary
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySummary {
    pub name: String,
    pub id: EntityId,
    pub state: String,
    pub position: Vec3,
    pub health: f32,
    pub targets: usize,
    pub dead: bool,
}

/// Read-only view handed to searching areas
struct SceneView<'a> {
    registry: &'a EntityManager,
    tags: &'a BTreeMap<String, Vec<EntityId>>,
    obstacles: &'a [Obstacle],
}

impl SpatialQuery for SceneView<'_> {
    fn tagged(&self, tag: &str) -> Vec<EntityId> {
        self.tags
            .get(tag)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| self.registry.get(*id).is_some_and(|c| !c.is_dead()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn transform(&self, entity: EntityId) -> Option<Transform> {
        self.registry.get(entity).map(|c| c.agent().transform())
    }

    fn detection_areas(&self, entity: EntityId) -> Option<&DetectionAreaContainer> {
        self.registry.get(entity).map(|c| &c.agent().detection_areas)
    }

    fn is_obstructed(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        obstacle_mask: u32,
    ) -> bool {
        if direction == Vec3::ZERO {
            return false;
        }
        self.obstacles
            .iter()
            .filter(|o| (1u32 << o.layer.min(31)) & obstacle_mask != 0)
            .any(|o| o.intersects(origin, direction, max_distance))
    }
}

/// Every entity, searching area and obstacle of a loaded scene
pub struct World {
    registry: EntityManager,
    searching: Vec<SearchingArea>,
    target_types: BTreeMap<String, TargetType>,
    tags: BTreeMap<String, Vec<EntityId>>,
    names: BTreeMap<String, EntityId>,
    obstacles: Vec<Obstacle>,
    events: Vec<(EntityId, BehaviourEvent)>,
    audio: AudioJournal,
    dt: f32,
    ticks: u64,
    elapsed: f64,
}

impl World {
    /// Build a world from a parsed scene, resolving every name it references
    pub fn from_config(config: &SceneConfig) -> ConfigResult<Self> {
        let mut world = Self {
            registry: EntityManager::new().with_sweep_interval(config.sweep_interval),
            searching: Vec::new(),
            target_types: BTreeMap::new(),
            tags: BTreeMap::new(),
            names: BTreeMap::new(),
            obstacles: config
                .obstacles
                .iter()
                .map(|o| Obstacle {
                    center: o.center,
                    radius: o.radius.max(0.0),
                    layer: o.layer,
                })
                .collect(),
            events: Vec::new(),
            audio: AudioJournal::default(),
            dt: config.dt,
            ticks: 0,
            elapsed: 0.0,
        };

        for target_type in &config.target_types {
            let built = world.build_target_type(target_type)?;
            world.target_types.insert(built.name.clone(), built);
        }

        let point_ids = IdGenerator::new();
        let waypoints: HashMap<String, SharedPoint> = config
            .waypoints
            .iter()
            .map(|w| {
                (
                    w.name.clone(),
                    IntermediatePoint::shared(point_ids.next(), w.position),
                )
            })
            .collect();

        let entity_ids = IdGenerator::starting_at(1);
        let area_ids = IdGenerator::new();
        for entity in &config.entities {
            world.spawn(config, entity, &waypoints, &point_ids, &entity_ids, &area_ids)?;
        }

        // Higher priority areas scan first
        world.searching.sort_by_key(|area| Reverse(area.priority()));
        world.registry.publish_board();

        log::info!(
            "world built: {} entities, {} searching areas, {} obstacles",
            world.registry.len(),
            world.searching.len(),
            world.obstacles.len()
        );
        Ok(world)
    }

    fn build_target_type(&self, config: &TargetTypeConfig) -> ConfigResult<TargetType> {
        let mask = match &config.properties {
            PropertyList::Mask(mask) => mask.clone(),
            PropertyList::Names(refs) => {
                let ids = refs
                    .iter()
                    .map(|r| match r {
                        PropertyRef::Id(id) => Ok(*id),
                        PropertyRef::Name(name) => {
                            self.registry.property_id(name).ok_or_else(|| {
                                ConfigError::Validation(format!(
                                    "target type {}: unknown property {}",
                                    config.name, name
                                ))
                            })
                        }
                    })
                    .collect::<ConfigResult<Vec<_>>>()?;
                IntMask::from_values(ids)
            }
        };

        let mut target_type = TargetType::new(config.name.as_str())
            .with_mask(mask)
            .with_data_on_detection(config.data_on_detection);
        self.registry.validate_target_type(&mut target_type);
        Ok(target_type)
    }

    fn spawn(
        &mut self,
        scene: &SceneConfig,
        config: &EntityConfig,
        waypoints: &HashMap<String, SharedPoint>,
        point_ids: &IdGenerator,
        entity_ids: &IdGenerator,
        area_ids: &IdGenerator,
    ) -> ConfigResult<()> {
        if self.names.contains_key(&config.name) {
            return Err(ConfigError::Validation(format!(
                "duplicate entity name {}",
                config.name
            )));
        }
        let id: EntityId = entity_ids.next();

        let transform =
            Transform::from_position(config.position).with_euler_degrees(config.rotation);
        let mover = KinematicMover::new(transform, config.max_speed)
            .with_angular_speed(config.angular_speed);
        let behaviour = EntityBehaviour::new(
            config.health.clone().validated()?,
            config.stamina.clone().validated()?,
        );

        let navigation =
            build_navigation(&config.navigation, waypoints, point_ids, scene.seed ^ id.0)?;

        let mut detection = DetectionAreaContainer::new();
        for area in &config.detection_areas {
            detection.push(
                DetectionArea::new(area.name.as_str())
                    .with_offset(area.offset)
                    .with_layer(area.layer)
                    .with_damage_multiplier(area.damage_multiplier),
            );
        }

        let sink = scene.clips.iter().fold(
            LoggingAudioSink::new().with_journal(self.audio.clone()),
            |sink, clip| sink.with_clip(clip.name.as_str(), clip.duration),
        );

        let agent = EntityAgent::new(id, behaviour, Box::new(mover))
            .with_navigation(navigation)
            .with_detection_areas(detection)
            .with_audio(Box::new(sink))
            .with_path_update_delay(config.path_update_delay);

        let mut controller = EntityController::new(agent);
        for state in &config.steady_states {
            controller = controller.with_steady(build_state(state)?);
        }
        for state in &config.exclusive_states {
            controller = controller.with_exclusive(build_state(state)?);
        }
        controller = controller.with_active(config.active_state);

        for area in &config.searching_areas {
            let searching = self.build_searching(id, area, area_ids)?;
            if let Some(name) = searching.target_type() {
                if let Some(target_type) = self.target_types.get(name) {
                    controller
                        .agent_mut()
                        .init_target_container(target_type, searching.id());
                }
            }
            self.searching.push(searching);
        }

        for tag in &config.tags {
            self.tags.entry(tag.clone()).or_default().push(id);
        }
        self.names.insert(config.name.clone(), id);
        self.registry.register(controller);
        log::debug!("spawned {} as {}", config.name, id);
        Ok(())
    }

    fn build_searching(
        &self,
        owner: EntityId,
        config: &SearchingAreaConfig,
        area_ids: &IdGenerator,
    ) -> ConfigResult<SearchingArea> {
        let data = config.tags.iter().fold(
            AreaData::new(config.radius, config.angle)
                .with_offset(config.offset)
                .with_rotation(config.rotation)
                .with_obstacle_mask(config.obstacle_mask)
                .with_target_mask(config.target_mask),
            |data, tag| data.with_tag(tag.as_str()),
        );

        let validators: Vec<Box<dyn DetectionValidator>> = match &config.validators {
            Some(kinds) => kinds
                .iter()
                .map(|kind| Box::new(*kind) as Box<dyn DetectionValidator>)
                .collect(),
            None => ValidatorKind::standard_chain(),
        };

        let mut area = SearchingArea::new(area_ids.next::<AreaId>(), owner, data)
            .with_observation(config.observation)
            .with_update_rate(config.update_rate)
            .with_priority(config.priority)
            .with_validators(validators);

        if let Some(name) = &config.target_type {
            if !self.target_types.contains_key(name) {
                return Err(ConfigError::UnknownTargetType(name.clone()));
            }
            area = area.with_target_type(name.as_str());
        }
        Ok(area)
    }

    /// Advance the world by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        self.registry.tick(dt);
        self.collect_events();

        let reports: Vec<ScanReport> = {
            let view = SceneView {
                registry: &self.registry,
                tags: &self.tags,
                obstacles: &self.obstacles,
            };
            self.searching
                .iter_mut()
                .filter_map(|area| area.tick(dt, &view))
                .collect()
        };
        for report in reports {
            self.apply_report(report);
        }

        for (_, controller) in self.registry.iter_mut() {
            controller.agent_mut().detection_areas.late_update();
        }

        let removed = self.registry.update(dt);
        if !removed.is_empty() {
            self.forget(&removed);
        }
        self.registry.publish_board();

        self.ticks += 1;
        self.elapsed += f64::from(dt);
    }

    /// Run `ticks` ticks of the scene's fixed step
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick(self.dt);
        }
    }

    /// Replace what one area captured with the hits of its latest scan
    fn apply_report(&mut self, report: ScanReport) {
        let Some(type_name) = report.target_type.as_deref() else {
            return;
        };
        let Some(target_type) = self.target_types.get(type_name) else {
            log::warn!("area {} reports unknown target type {}", report.area, type_name);
            return;
        };

        let captured: Vec<Target> = report
            .hits
            .iter()
            .map(|hit| {
                let target = if target_type.data_on_detection {
                    Target::resolved(
                        self.registry
                            .properties(hit.entity, &target_type.mask)
                            .unwrap_or_default(),
                    )
                } else {
                    Target::lazy(self.registry.lazy_fill(hit.entity, &target_type.mask))
                };
                target.with_source(hit.entity)
            })
            .collect();

        if let Some(owner) = self.registry.get_mut(report.owner) {
            let agent = owner.agent_mut();
            agent.clear_target(type_name, report.area);
            agent.init_target_container(target_type, report.area);
            for target in captured {
                agent.add_target(target_type, report.area, target);
            }
        }

        for hit in &report.hits {
            log::trace!("{} senses {} through {}", report.owner, hit.entity, report.area);
            if let Some(sensed) = self.registry.get_mut(hit.entity) {
                if let Err(err) = sensed
                    .agent_mut()
                    .detection_areas
                    .set_state(hit.area_index, DetectionState::Found)
                {
                    log::warn!("{}: {}", hit.entity, err);
                }
            }
        }
    }

    fn collect_events(&mut self) {
        for (id, controller) in self.registry.iter_mut() {
            for event in controller.drain_events() {
                if event == BehaviourEvent::Died {
                    log::info!("{} died", id);
                }
                self.events.push((id, event));
            }
        }
    }

    /// Drop every reference to swept entities
    fn forget(&mut self, removed: &[EntityId]) {
        self.searching.retain(|area| !removed.contains(&area.owner()));
        for ids in self.tags.values_mut() {
            ids.retain(|id| !removed.contains(id));
        }
        self.names.retain(|_, id| !removed.contains(id));
    }

    /// Behaviour events since the last drain, with their entity
    pub fn drain_events(&mut self) -> Vec<(EntityId, BehaviourEvent)> {
        std::mem::take(&mut self.events)
    }

    pub fn registry(&self) -> &EntityManager {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityManager {
        &mut self.registry
    }

    pub fn entity_id(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    pub fn entity_by_name(&self, name: &str) -> Option<&EntityController> {
        self.registry.get(self.entity_id(name)?)
    }

    pub fn entity_by_name_mut(&mut self, name: &str) -> Option<&mut EntityController> {
        let id = self.entity_id(name)?;
        self.registry.get_mut(id)
    }

    pub fn searching_areas(&self) -> &[SearchingArea] {
        &self.searching
    }

    pub fn searching_areas_mut(&mut self) -> &mut [SearchingArea] {
        &mut self.searching
    }

    pub fn target_type(&self, name: &str) -> Option<&TargetType> {
        self.target_types.get(name)
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn audio_journal(&self) -> &AudioJournal {
        &self.audio
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Simulated seconds
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// One line per named entity still in the world
    pub fn summary(&self) -> Vec<EntitySummary> {
        self.names
            .iter()
            .filter_map(|(name, id)| {
                let controller = self.registry.get(*id)?;
                let agent = controller.agent();
                Some(EntitySummary {
                    name: name.clone(),
                    id: *id,
                    state: controller
                        .active_state()
                        .map_or_else(|| "<none>".to_string(), |s| s.name().to_string()),
                    position: agent.position(),
                    health: agent.behaviour.health.value(),
                    targets: agent.targets.count(),
                    dead: controller.is_dead(),
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.registry.len())
            .field("searching", &self.searching.len())
            .field("obstacles", &self.obstacles.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

fn build_navigation(
    config: &NavigationConfig,
    waypoints: &HashMap<String, SharedPoint>,
    point_ids: &IdGenerator,
    seed: u64,
) -> ConfigResult<NavigationContainer> {
    let mut points = Vec::with_capacity(config.points.len());
    for point in &config.points {
        let shared = match (&point.waypoint, point.position) {
            (Some(name), _) => waypoints
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownWaypoint(name.clone()))?,
            (None, Some(position)) => IntermediatePoint::shared(point_ids.next::<PointId>(), position),
            (None, None) => {
                return Err(ConfigError::Validation(
                    "navigation point needs a waypoint or a position".to_string(),
                ))
            }
        };

        points.push(
            NavigationPoint::new(shared)
                .with_type(point.point_type)
                .with_action(point.action)
                .with_priority(point.priority)
                .with_transfer_delay(point.transfer_delay)
                .with_movement_speed(point.movement_speed)
                .with_accuracy_radius(point.accuracy_radius)
                .with_impact(point.impact_radius, point.min_impact_speed),
        );
    }

    if !points.is_empty() && config.startup_point >= points.len() {
        return Err(ConfigError::Core(lazybot_core::Error::IndexOutOfRange {
            index: config.startup_point,
            len: points.len(),
        }));
    }

    Ok(NavigationContainer::new()
        .with_points(points)
        .with_random(config.random)
        .with_startup_point(config.startup_point)
        .with_policy(config.policy.build())
        .with_seed(seed))
}

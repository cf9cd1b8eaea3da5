//! Entity registry and property access
//!
//! [`EntityManager`] owns every live [`EntityController`], answers property
//! queries through registered [`PropertyProvider`]s and periodically sweeps
//! dead entities. After each tick it publishes a property board that lazy
//! target fills read from without borrowing the registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use lazybot_core::{EntityId, PropertyId, PropertyValue};
use parking_lot::RwLock;

use crate::agent::EntityAgent;
use crate::controller::EntityController;
use crate::error::FillError;
use crate::int_mask::IntMask;
use crate::targets::{FillFn, PropertyData, TargetType};

/// Built-in property id of the world position
pub const POSITION: PropertyId = 0;
/// Built-in property id of the current health
pub const HEALTH: PropertyId = 1;
/// Built-in property id of the current stamina
pub const STAMINA: PropertyId = 2;

/// Reads one property of an entity
pub trait PropertyProvider: Send + Sync {
    fn id(&self) -> PropertyId;

    fn name(&self) -> &str;

    fn property(&self, agent: &EntityAgent) -> PropertyValue;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionProperty;

impl PropertyProvider for PositionProperty {
    fn id(&self) -> PropertyId {
        POSITION
    }

    fn name(&self) -> &str {
        "position"
    }

    fn property(&self, agent: &EntityAgent) -> PropertyValue {
        PropertyValue::Vec3(agent.position())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HealthProperty;

impl PropertyProvider for HealthProperty {
    fn id(&self) -> PropertyId {
        HEALTH
    }

    fn name(&self) -> &str {
        "health"
    }

    fn property(&self, agent: &EntityAgent) -> PropertyValue {
        PropertyValue::Float(agent.behaviour.health.value())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StaminaProperty;

impl PropertyProvider for StaminaProperty {
    fn id(&self) -> PropertyId {
        STAMINA
    }

    fn name(&self) -> &str {
        "stamina"
    }

    fn property(&self, agent: &EntityAgent) -> PropertyValue {
        PropertyValue::Float(agent.behaviour.stamina.value())
    }
}

/// Last published properties of every entity
pub type SharedBoard = Arc<RwLock<HashMap<EntityId, HashMap<PropertyId, PropertyValue>>>>;

/// Directory of live entities
pub struct EntityManager {
    entities: BTreeMap<EntityId, EntityController>,
    providers: BTreeMap<PropertyId, Arc<dyn PropertyProvider>>,
    sweep_interval: f32,
    since_sweep: f32,
    board: SharedBoard,
}

impl EntityManager {
    /// Registry with the built-in position, health and stamina providers
    pub fn new() -> Self {
        Self::empty()
            .with_provider(Arc::new(PositionProperty))
            .with_provider(Arc::new(HealthProperty))
            .with_provider(Arc::new(StaminaProperty))
    }

    /// Registry without any provider
    pub fn empty() -> Self {
        Self {
            entities: BTreeMap::new(),
            providers: BTreeMap::new(),
            sweep_interval: 1.0,
            since_sweep: 0.0,
            board: SharedBoard::default(),
        }
    }

    /// Seconds between dead-entity sweeps; zero sweeps every update
    pub fn with_sweep_interval(mut self, seconds: f32) -> Self {
        self.sweep_interval = seconds.max(0.0);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn PropertyProvider>) -> Self {
        self.add_provider(provider);
        self
    }

    /// Register a provider, replacing one with the same id
    pub fn add_provider(&mut self, provider: Arc<dyn PropertyProvider>) {
        if let Some(old) = self.providers.insert(provider.id(), provider) {
            log::warn!("property provider {} replaced", old.name());
        }
    }

    /// Provider ids and names in id order
    pub fn providers(&self) -> impl Iterator<Item = (PropertyId, &str)> {
        self.providers.iter().map(|(id, p)| (*id, p.name()))
    }

    /// Property id registered under `name`
    pub fn property_id(&self, name: &str) -> Option<PropertyId> {
        self.providers
            .values()
            .find(|p| p.name() == name)
            .map(|p| p.id())
    }

    pub fn register(&mut self, controller: EntityController) -> Option<EntityController> {
        let id = controller.id();
        log::debug!("registered {}", id);
        self.entities.insert(id, controller)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<EntityController> {
        self.board.write().remove(&id);
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityController> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityController> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &EntityController)> {
        self.entities.iter().map(|(id, c)| (*id, c))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut EntityController)> {
        self.entities.iter_mut().map(|(id, c)| (*id, c))
    }

    pub fn is_property_exist(&self, property: PropertyId) -> bool {
        self.providers.contains_key(&property)
    }

    /// Current value of one property
    pub fn property(&self, entity: EntityId, property: PropertyId) -> Option<PropertyValue> {
        let controller = self.entities.get(&entity)?;
        let provider = self.providers.get(&property)?;
        Some(provider.property(controller.agent()))
    }

    /// Current values of every known property in `mask`, in mask order
    pub fn properties(&self, entity: EntityId, mask: &IntMask) -> Option<PropertyData> {
        let controller = self.entities.get(&entity)?;
        Some(
            mask.iter()
                .filter_map(|id| {
                    self.providers
                        .get(&id)
                        .map(|p| (id, p.property(controller.agent())))
                })
                .collect(),
        )
    }

    /// Strip property ids without a provider from a type's mask.
    ///
    /// Returns the removed ids.
    pub fn validate_target_type(&self, target_type: &mut TargetType) -> Vec<PropertyId> {
        let unknown: Vec<PropertyId> = target_type
            .mask
            .iter()
            .filter(|id| !self.is_property_exist(*id))
            .collect();

        for id in &unknown {
            log::warn!(
                "target type {}: unknown property {} removed",
                target_type.name,
                id
            );
            target_type.mask.remove(*id);
        }
        target_type.mask.bake();
        unknown
    }

    /// Deferred fill reading `entity`'s published properties in `mask`
    pub fn lazy_fill(&self, entity: EntityId, mask: &IntMask) -> FillFn {
        let board = Arc::clone(&self.board);
        let ids = mask.values();

        Box::new(move || -> Result<PropertyData, FillError> {
            let board = board.read();
            let values = board.get(&entity).ok_or(FillError::EntityGone(entity))?;
            Ok(ids
                .iter()
                .filter_map(|id| values.get(id).map(|v| (*id, v.clone())))
                .collect())
        })
    }

    pub fn board(&self) -> &SharedBoard {
        &self.board
    }

    /// Tick every controller
    pub fn tick(&mut self, dt: f32) {
        for controller in self.entities.values_mut() {
            controller.tick(dt);
        }
    }

    /// Advance the sweep clock, sweeping when due. Returns removed ids.
    pub fn update(&mut self, dt: f32) -> Vec<EntityId> {
        self.since_sweep += dt.max(0.0);
        if self.since_sweep < self.sweep_interval {
            return Vec::new();
        }
        self.since_sweep = 0.0;
        self.sweep()
    }

    /// Remove every dead entity now
    pub fn sweep(&mut self) -> Vec<EntityId> {
        let dead: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, c)| c.is_dead())
            .map(|(id, _)| *id)
            .collect();

        for id in &dead {
            self.remove(*id);
            log::debug!("swept dead entity {}", id);
        }
        dead
    }

    /// Snapshot every property of every live entity into the board
    pub fn publish_board(&self) {
        let mut board = self.board.write();
        board.clear();
        for (id, controller) in &self.entities {
            let values = self
                .providers
                .iter()
                .map(|(pid, p)| (*pid, p.property(controller.agent())))
                .collect();
            board.insert(*id, values);
        }
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManager")
            .field("entities", &self.entities.len())
            .field("providers", &self.providers.len())
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

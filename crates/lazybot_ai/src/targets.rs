//! Target registry
//!
//! [`TargetInfo`] maps a [`TargetType`] to a [`TargetContainer`], which maps
//! the id of the searching area that captured a target to the list of
//! [`Target`] snapshots it produced.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use lazybot_core::{AreaId, EntityId, PropertyId, PropertyValue};
use serde::{Deserialize, Serialize};

use crate::error::FillError;
use crate::int_mask::IntMask;

/// Property pairs produced by a fill
pub type PropertyData = Vec<(PropertyId, PropertyValue)>;

/// Deferred fill of a target snapshot
pub type FillFn = Box<dyn FnMut() -> Result<PropertyData, FillError> + Send>;

/// Kind of target tracked by an entity.
///
/// Identity is the name; the mask lists the property ids captured for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetType {
    pub name: String,
    #[serde(default)]
    pub mask: IntMask,
    /// Capture properties at detection time instead of on first access
    #[serde(default)]
    pub data_on_detection: bool,
}

impl TargetType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mask: IntMask::new(),
            data_on_detection: false,
        }
    }

    pub fn with_mask(mut self, mut mask: IntMask) -> Self {
        mask.bake();
        self.mask = mask;
        self
    }

    pub fn with_data_on_detection(mut self, eager: bool) -> Self {
        self.data_on_detection = eager;
        self
    }
}

impl PartialEq for TargetType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TargetType {}

impl Hash for TargetType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A captured, possibly lazily filled, snapshot of a detected entity
#[derive(Default)]
pub struct Target {
    data: BTreeMap<PropertyId, PropertyValue>,
    filled: bool,
    late_call: Option<FillFn>,
    source: Option<EntityId>,
}

impl Target {
    /// Snapshot with data already resolved
    pub fn resolved(data: impl IntoIterator<Item = (PropertyId, PropertyValue)>) -> Self {
        Self {
            data: data.into_iter().collect(),
            filled: true,
            late_call: None,
            source: None,
        }
    }

    /// Snapshot filled on first access
    pub fn lazy(call: FillFn) -> Self {
        Self {
            data: BTreeMap::new(),
            filled: false,
            late_call: Some(call),
            source: None,
        }
    }

    pub fn with_source(mut self, entity: EntityId) -> Self {
        self.source = Some(entity);
        self
    }

    /// Entity the snapshot describes
    pub fn source(&self) -> Option<EntityId> {
        self.source
    }

    pub fn is_filled(&self) -> bool {
        self.filled
    }

    pub fn has_late_call(&self) -> bool {
        self.late_call.is_some()
    }

    /// Run the deferred fill. Failure is reported as `false`.
    pub fn fill_data(&mut self) -> bool {
        let Some(call) = self.late_call.as_mut() else {
            return false;
        };

        match call() {
            Ok(pairs) => {
                self.data.extend(pairs);
                self.filled = true;
                true
            }
            Err(err) => {
                log::debug!("target fill failed: {}", err);
                false
            }
        }
    }

    /// Fill once if not filled yet
    pub fn ensure_filled(&mut self) -> bool {
        self.filled || self.fill_data()
    }

    /// Property value, filling a lazy snapshot first
    pub fn get(&mut self, property: PropertyId) -> Option<&PropertyValue> {
        self.ensure_filled();
        self.data.get(&property)
    }

    /// Property value without triggering a fill
    pub fn peek(&self, property: PropertyId) -> Option<&PropertyValue> {
        self.data.get(&property)
    }

    pub fn data(&self) -> &BTreeMap<PropertyId, PropertyValue> {
        &self.data
    }

    pub fn insert(&mut self, property: PropertyId, value: PropertyValue) {
        self.data.insert(property, value);
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("source", &self.source)
            .field("filled", &self.filled)
            .field("lazy", &self.late_call.is_some())
            .field("data", &self.data)
            .finish()
    }
}

/// Targets of one type, grouped by the searching area that captured them
#[derive(Debug, Default)]
pub struct TargetContainer {
    areas: BTreeMap<AreaId, Vec<Target>>,
}

impl TargetContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an area slot. Idempotent.
    pub fn add_area(&mut self, area: AreaId) {
        self.areas.entry(area).or_default();
    }

    pub fn has_area(&self, area: AreaId) -> bool {
        self.areas.contains_key(&area)
    }

    pub fn areas(&self) -> impl Iterator<Item = AreaId> + '_ {
        self.areas.keys().copied()
    }

    pub fn add_target(&mut self, area: AreaId, target: Target) {
        self.areas.entry(area).or_default().push(target);
    }

    pub fn add_resolved(
        &mut self,
        area: AreaId,
        data: impl IntoIterator<Item = (PropertyId, PropertyValue)>,
    ) {
        self.add_target(area, Target::resolved(data));
    }

    pub fn add_lazy(&mut self, area: AreaId, call: FillFn) {
        self.add_target(area, Target::lazy(call));
    }

    /// Drop an area slot with its targets
    pub fn erase(&mut self, area: AreaId) {
        self.areas.remove(&area);
    }

    /// Take an area slot's targets, dropping the slot
    pub fn cut(&mut self, area: AreaId) -> Option<Vec<Target>> {
        self.areas.remove(&area)
    }

    /// Alias of [`cut`](Self::cut)
    pub fn remove(&mut self, area: AreaId) -> Option<Vec<Target>> {
        self.cut(area)
    }

    pub fn get(&self, area: AreaId) -> Option<&[Target]> {
        self.areas.get(&area).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, area: AreaId) -> Option<&mut Vec<Target>> {
        self.areas.get_mut(&area)
    }

    pub fn get_at(&self, area: AreaId, index: usize) -> Option<&Target> {
        self.areas.get(&area)?.get(index)
    }

    pub fn get_at_mut(&mut self, area: AreaId, index: usize) -> Option<&mut Target> {
        self.areas.get_mut(&area)?.get_mut(index)
    }

    /// Drop one target
    pub fn erase_at(&mut self, area: AreaId, index: usize) -> bool {
        self.cut_at(area, index).is_some()
    }

    /// Take one target
    pub fn cut_at(&mut self, area: AreaId, index: usize) -> Option<Target> {
        let targets = self.areas.get_mut(&area)?;
        (index < targets.len()).then(|| targets.remove(index))
    }

    /// Alias of [`cut_at`](Self::cut_at)
    pub fn remove_at(&mut self, area: AreaId, index: usize) -> Option<Target> {
        self.cut_at(area, index)
    }

    /// Drop every target of every area
    pub fn clear(&mut self) {
        for targets in self.areas.values_mut() {
            targets.clear();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.areas.values().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Target> {
        self.areas.values_mut().flatten()
    }

    pub fn count(&self) -> usize {
        self.areas.values().map(Vec::len).sum()
    }
}

/// Per-entity registry of tracked targets
#[derive(Debug, Default)]
pub struct TargetInfo {
    types: BTreeMap<String, (TargetType, TargetContainer)>,
}

impl TargetInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target type. Idempotent.
    pub fn add_type(&mut self, target_type: TargetType) -> &mut TargetContainer {
        &mut self
            .types
            .entry(target_type.name.clone())
            .or_insert_with(|| (target_type, TargetContainer::new()))
            .1
    }

    /// Register an area slot under a type name, if the type is known
    pub fn add_area(&mut self, type_name: &str, area: AreaId) -> bool {
        match self.types.get_mut(type_name) {
            Some((_, container)) => {
                container.add_area(area);
                true
            }
            None => false,
        }
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn target_type(&self, type_name: &str) -> Option<&TargetType> {
        self.types.get(type_name).map(|(t, _)| t)
    }

    pub fn get(&self, target_type: &TargetType) -> Option<&TargetContainer> {
        self.get_by_name(&target_type.name)
    }

    pub fn get_by_name(&self, type_name: &str) -> Option<&TargetContainer> {
        self.types.get(type_name).map(|(_, c)| c)
    }

    pub fn get_mut(&mut self, type_name: &str) -> Option<&mut TargetContainer> {
        self.types.get_mut(type_name).map(|(_, c)| c)
    }

    pub fn types(&self) -> impl Iterator<Item = &TargetType> {
        self.types.values().map(|(t, _)| t)
    }

    /// Clear what one area captured in every type
    pub fn erase_area(&mut self, area: AreaId) {
        for (_, container) in self.types.values_mut() {
            container.erase(area);
        }
    }

    /// First target of any type, in type-name then area order
    pub fn first_mut(&mut self) -> Option<&mut Target> {
        self.types
            .values_mut()
            .flat_map(|(_, container)| container.iter_mut())
            .next()
    }

    /// Total number of targets across all types and areas
    pub fn count(&self) -> usize {
        self.types.values().map(|(_, c)| c.count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const POSITION: PropertyId = 0;

    #[test]
    fn test_add_type_is_idempotent() {
        let mut info = TargetInfo::new();
        info.add_type(TargetType::new("enemy")).add_resolved(AreaId(1), []);
        info.add_type(TargetType::new("enemy").with_data_on_detection(true));

        assert_eq!(info.types().count(), 1);
        assert_eq!(info.count(), 1);
        // The first registration wins
        assert!(!info.target_type("enemy").unwrap().data_on_detection);
    }

    #[test]
    fn test_add_area_is_idempotent() {
        let mut container = TargetContainer::new();
        container.add_resolved(AreaId(1), [(POSITION, Vec3::ONE.into())]);
        container.add_area(AreaId(1));
        assert_eq!(container.count(), 1);

        let mut info = TargetInfo::new();
        assert!(!info.add_area("ghost", AreaId(1)));
        info.add_type(TargetType::new("enemy"));
        assert!(info.add_area("enemy", AreaId(1)));
        assert!(info.get_by_name("enemy").unwrap().has_area(AreaId(1)));
    }

    #[test]
    fn test_erase_cut_remove() {
        let mut container = TargetContainer::new();
        for i in 0..3 {
            container.add_resolved(AreaId(1), [(POSITION, PropertyValue::Int(i))]);
        }
        container.add_resolved(AreaId(2), []);
        container.add_resolved(AreaId(3), []);

        let cut = container.cut_at(AreaId(1), 1).unwrap();
        assert_eq!(cut.peek(POSITION), Some(&PropertyValue::Int(1)));
        assert!(container.cut_at(AreaId(1), 9).is_none());
        assert!(container.erase_at(AreaId(1), 0));
        assert_eq!(container.count(), 3);

        assert_eq!(container.cut(AreaId(1)).map(|t| t.len()), Some(1));
        assert!(!container.has_area(AreaId(1)));
        assert!(container.cut(AreaId(1)).is_none());

        container.erase(AreaId(2));
        assert!(!container.has_area(AreaId(2)));
        assert_eq!(container.remove(AreaId(3)).map(|t| t.len()), Some(1));
        assert_eq!(container.count(), 0);
        assert!(container.remove_at(AreaId(3), 0).is_none());
    }

    #[test]
    fn test_lazy_fill_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut target = Target::lazy(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![(POSITION, PropertyValue::Vec3(Vec3::X))])
        }));

        assert!(!target.is_filled());
        assert_eq!(target.peek(POSITION), None);
        assert_eq!(target.get(POSITION), Some(&PropertyValue::Vec3(Vec3::X)));
        assert_eq!(target.get(POSITION), Some(&PropertyValue::Vec3(Vec3::X)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fill_failure_is_swallowed() {
        let mut target =
            Target::lazy(Box::new(|| Err(FillError::EntityGone(EntityId(4)))));
        assert!(!target.fill_data());
        assert!(!target.is_filled());
        assert_eq!(target.get(POSITION), None);

        let mut resolved = Target::resolved([]);
        assert!(!resolved.fill_data());
        assert!(resolved.ensure_filled());
    }

    #[test]
    fn test_count_spans_types() {
        let mut info = TargetInfo::new();
        info.add_type(TargetType::new("enemy")).add_resolved(AreaId(1), []);
        info.add_type(TargetType::new("ally")).add_resolved(AreaId(2), []);
        info.get_mut("enemy").unwrap().add_resolved(AreaId(3), []);
        assert_eq!(info.count(), 3);

        info.erase_area(AreaId(1));
        assert_eq!(info.count(), 2);
    }

    #[test]
    fn test_target_type_identity_is_name() {
        let a = TargetType::new("enemy").with_mask(IntMask::parse("0/1"));
        let b = TargetType::new("enemy");
        assert_eq!(a, b);
        assert!(a.mask.contains(1));

        let mut info = TargetInfo::new();
        info.add_type(a);
        assert!(info.get(&b).is_some());
    }

    #[test]
    fn test_target_type_from_json() {
        let json = r#"{ "name": "enemy", "mask": "0/2", "data_on_detection": true }"#;
        let parsed: TargetType = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.mask.values(), vec![0, 2]);
        assert!(parsed.data_on_detection);
    }
}

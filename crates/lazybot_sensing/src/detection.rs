//! Detection areas: how an entity can be sensed

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use lazybot_core::{EntityId, Error, Result, Transform};
use serde::{Deserialize, Serialize};

/// State of a detection area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionState {
    Unknown,
    #[default]
    Enabled,
    /// Sensed by someone this tick
    Found,
    Disabled,
}

/// Receives damage routed through an area, already scaled
pub type DamageLink = Arc<dyn Fn(f32) + Send + Sync>;

/// Returns how loud the owner is at a listener position
pub type SoundLink = Arc<dyn Fn(Vec3) -> f32 + Send + Sync>;

/// A probe attached to an entity representing one way it can be sensed
#[derive(Clone, Serialize, Deserialize)]
pub struct DetectionArea {
    /// Area name, unique within its container
    pub name: String,
    /// Offset from the owner's origin in the owner's local space
    #[serde(default)]
    pub offset: Vec3,
    /// Physics layer (0 - 31) tested by layer-mask validators
    #[serde(default)]
    pub layer: u8,
    /// Scale applied to damage and sound passing through this area
    #[serde(default = "default_multiplier")]
    pub damage_multiplier: f32,
    #[serde(default)]
    state: DetectionState,
    #[serde(skip)]
    owner: Option<EntityId>,
    #[serde(skip)]
    was_found: bool,
    #[serde(skip)]
    on_damage: Option<DamageLink>,
    #[serde(skip)]
    on_sound: Option<SoundLink>,
}

fn default_multiplier() -> f32 {
    1.0
}

impl DetectionArea {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset: Vec3::ZERO,
            layer: 0,
            damage_multiplier: 1.0,
            state: DetectionState::Enabled,
            owner: None,
            was_found: false,
            on_damage: None,
            on_sound: None,
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer.min(31);
        self
    }

    pub fn with_damage_multiplier(mut self, multiplier: f32) -> Self {
        self.damage_multiplier = multiplier.max(0.0);
        self
    }

    /// Start in a specific state, bypassing transition rules
    pub fn with_state(mut self, state: DetectionState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub fn was_found(&self) -> bool {
        self.was_found
    }

    /// Request a state change.
    ///
    /// From Unknown or Disabled only Enabled is accepted; other requests are
    /// dropped and `false` is returned.
    pub fn set_state(&mut self, state: DetectionState) -> bool {
        if matches!(self.state, DetectionState::Unknown | DetectionState::Disabled)
            && state != DetectionState::Enabled
        {
            return false;
        }

        match state {
            DetectionState::Found => self.was_found = true,
            DetectionState::Disabled => self.was_found = false,
            _ => {}
        }
        self.state = state;
        true
    }

    pub fn enable(&mut self) {
        self.set_state(DetectionState::Enabled);
    }

    pub fn disable(&mut self) {
        self.set_state(DetectionState::Disabled);
    }

    /// Post-update decay: Found reverts to Enabled unless re-asserted this tick
    pub fn late_update(&mut self) {
        if self.state == DetectionState::Unknown {
            return;
        }
        if !self.was_found && self.state != DetectionState::Disabled {
            self.set_state(DetectionState::Enabled);
        }
        self.was_found = false;
    }

    /// Active areas can be sensed
    pub fn is_active(&self) -> bool {
        !matches!(self.state, DetectionState::Unknown | DetectionState::Disabled)
    }

    /// Forward `amount * damage_multiplier` to the damage link
    pub fn perform_damage(&self, amount: f32) {
        if let Some(link) = &self.on_damage {
            link(amount * self.damage_multiplier);
        }
    }

    /// Loudness of the owner at `listener`, scaled by the multiplier. Zero without a link.
    pub fn emit_sound(&self, listener: Vec3) -> f32 {
        self.on_sound
            .as_ref()
            .map_or(0.0, |link| link(listener) * self.damage_multiplier)
    }

    /// World position given the owner's transform
    pub fn world_position(&self, owner: &Transform) -> Vec3 {
        owner.transform_point(self.offset)
    }
}

impl fmt::Debug for DetectionArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionArea")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("layer", &self.layer)
            .field("damage_multiplier", &self.damage_multiplier)
            .field("state", &self.state)
            .field("owner", &self.owner)
            .field("was_found", &self.was_found)
            .field("has_damage_link", &self.on_damage.is_some())
            .field("has_sound_link", &self.on_sound.is_some())
            .finish()
    }
}

/// All detection areas of one entity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionAreaContainer {
    areas: Vec<DetectionArea>,
    #[serde(skip)]
    disabled: bool,
}

impl DetectionAreaContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_area(mut self, area: DetectionArea) -> Self {
        self.areas.push(area);
        self
    }

    pub fn push(&mut self, area: DetectionArea) {
        self.areas.push(area);
    }

    /// Assign the owner of every area
    pub fn set_owner(&mut self, owner: EntityId) {
        for area in &mut self.areas {
            area.owner = Some(owner);
        }
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectionArea> {
        self.areas.iter()
    }

    pub fn get(&self, index: usize) -> Result<&DetectionArea> {
        Error::check_index(index, self.areas.len())?;
        Ok(&self.areas[index])
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut DetectionArea> {
        Error::check_index(index, self.areas.len())?;
        Ok(&mut self.areas[index])
    }

    pub fn find(&self, name: &str) -> Option<(usize, &DetectionArea)> {
        self.areas.iter().enumerate().find(|(_, a)| a.name == name)
    }

    /// Whether switching requests are honoured
    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// Enable or disable the container and every area in it
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.disabled = false;
            self.switch_all(true);
        } else {
            self.switch_all(false);
            self.disabled = true;
        }
    }

    /// Enable or disable every area. Ignored while the container is disabled.
    pub fn switch_all(&mut self, active: bool) {
        if self.disabled {
            return;
        }
        for area in &mut self.areas {
            switch(area, active);
        }
    }

    /// Enable or disable one area. Ignored while the container is disabled.
    pub fn switch_area(&mut self, index: usize, active: bool) -> Result<()> {
        Error::check_index(index, self.areas.len())?;
        if !self.disabled {
            switch(&mut self.areas[index], active);
        }
        Ok(())
    }

    /// Enable or disable the first area called `name`; `false` if none matched
    pub fn switch_area_by_name(&mut self, name: &str, active: bool) -> bool {
        if self.disabled {
            return false;
        }
        match self.areas.iter_mut().find(|a| a.name == name) {
            Some(area) => {
                switch(area, active);
                true
            }
            None => false,
        }
    }

    /// Install the same damage link on every area
    pub fn set_damage_link(&mut self, link: DamageLink) {
        for area in &mut self.areas {
            area.on_damage = Some(Arc::clone(&link));
        }
    }

    /// Install the same sound link on every area
    pub fn set_sound_link(&mut self, link: SoundLink) {
        for area in &mut self.areas {
            area.on_sound = Some(Arc::clone(&link));
        }
    }

    pub fn point_state(&self, index: usize) -> Result<DetectionState> {
        self.get(index).map(DetectionArea::state)
    }

    pub fn set_state(&mut self, index: usize, state: DetectionState) -> Result<bool> {
        Ok(self.get_mut(index)?.set_state(state))
    }

    /// World position of area `index` given the owner's transform
    pub fn area_position(&self, index: usize, owner: &Transform) -> Result<Vec3> {
        Ok(self.get(index)?.world_position(owner))
    }

    /// Run the post-update decay on every area
    pub fn late_update(&mut self) {
        for area in &mut self.areas {
            area.late_update();
        }
    }
}

fn switch(area: &mut DetectionArea, active: bool) {
    if active {
        area.enable();
    } else {
        area.disable();
    }
}

impl<'a> IntoIterator for &'a DetectionAreaContainer {
    type Item = &'a DetectionArea;
    type IntoIter = std::slice::Iter<'a, DetectionArea>;

    fn into_iter(self) -> Self::IntoIter {
        self.areas.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use parking_lot::Mutex;

    #[test]
    fn test_transition_restrictions() {
        let mut area = DetectionArea::new("body").with_state(DetectionState::Disabled);
        assert!(!area.set_state(DetectionState::Found));
        assert_eq!(area.state(), DetectionState::Disabled);
        assert!(area.set_state(DetectionState::Enabled));

        let mut unknown = DetectionArea::new("head").with_state(DetectionState::Unknown);
        assert!(!unknown.set_state(DetectionState::Disabled));
        assert_eq!(unknown.state(), DetectionState::Unknown);
    }

    #[test]
    fn test_found_decays_after_one_tick() {
        let mut area = DetectionArea::new("body");
        area.set_state(DetectionState::Found);

        // Tick T: still found, flag consumed
        area.late_update();
        assert_eq!(area.state(), DetectionState::Found);

        // Tick T+1: not re-asserted
        area.late_update();
        assert_eq!(area.state(), DetectionState::Enabled);
    }

    #[test]
    fn test_found_held_while_reasserted() {
        let mut area = DetectionArea::new("body");
        for _ in 0..3 {
            area.set_state(DetectionState::Found);
            area.late_update();
            assert_eq!(area.state(), DetectionState::Found);
        }
    }

    #[test]
    fn test_disabled_does_not_decay() {
        let mut area = DetectionArea::new("body");
        area.set_state(DetectionState::Found);
        area.disable();
        assert!(!area.was_found());
        area.late_update();
        assert_eq!(area.state(), DetectionState::Disabled);
    }

    #[test]
    fn test_unknown_has_no_decay() {
        let mut area = DetectionArea::new("body").with_state(DetectionState::Unknown);
        area.late_update();
        assert_eq!(area.state(), DetectionState::Unknown);
    }

    #[test]
    fn test_links_are_scaled() {
        let damage = Arc::new(Mutex::new(0.0f32));
        let sink = Arc::clone(&damage);

        let mut container = DetectionAreaContainer::new()
            .with_area(DetectionArea::new("head").with_damage_multiplier(2.0))
            .with_area(DetectionArea::new("legs").with_damage_multiplier(0.5));
        container.set_damage_link(Arc::new(move |amount| *sink.lock() = amount));
        container.set_sound_link(Arc::new(|listener: Vec3| 10.0 - listener.length()));

        container.get(0).unwrap().perform_damage(10.0);
        assert_relative_eq!(*damage.lock(), 20.0);
        container.get(1).unwrap().perform_damage(10.0);
        assert_relative_eq!(*damage.lock(), 5.0);

        let loudness = container.get(1).unwrap().emit_sound(Vec3::new(4.0, 0.0, 0.0));
        assert_relative_eq!(loudness, 3.0);
    }

    #[test]
    fn test_emit_sound_without_link() {
        assert_eq!(DetectionArea::new("body").emit_sound(Vec3::ZERO), 0.0);
    }

    #[test]
    fn test_container_switching() {
        let mut container = DetectionAreaContainer::new()
            .with_area(DetectionArea::new("head"))
            .with_area(DetectionArea::new("body"));

        container.switch_area(0, false).unwrap();
        assert_eq!(container.point_state(0).unwrap(), DetectionState::Disabled);
        assert!(container.switch_area_by_name("body", false));
        assert!(!container.switch_area_by_name("tail", false));
        assert_eq!(container.point_state(1).unwrap(), DetectionState::Disabled);

        container.switch_all(true);
        assert_eq!(container.point_state(0).unwrap(), DetectionState::Enabled);

        container.set_enabled(false);
        container.switch_all(true);
        assert_eq!(container.point_state(1).unwrap(), DetectionState::Disabled);
        container.set_enabled(true);
        assert_eq!(container.point_state(1).unwrap(), DetectionState::Enabled);
    }

    #[test]
    fn test_index_errors() {
        let mut container = DetectionAreaContainer::new().with_area(DetectionArea::new("body"));
        assert_eq!(
            container.point_state(1),
            Err(Error::IndexOutOfRange { index: 1, len: 1 })
        );
        assert!(container.switch_area(5, true).is_err());
    }

    #[test]
    fn test_world_position() {
        let container = DetectionAreaContainer::new()
            .with_area(DetectionArea::new("head").with_offset(Vec3::new(0.0, 2.0, 0.0)));
        let owner = Transform::from_position(Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(
            container.area_position(0, &owner).unwrap(),
            Vec3::new(1.0, 2.0, 1.0)
        );
    }
}

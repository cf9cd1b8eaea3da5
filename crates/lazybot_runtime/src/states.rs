//! Built-in state behaviours
//!
//! - `idle`: always valid, does nothing
//! - `patrol`: walks the navigation path while no target is known
//! - `attack`: chases the first captured target's position
//! - `alert`: steady state that plays a clip when targets show up

use std::sync::Arc;

use lazybot_ai::{EntityAgent, EntityState, PointAction, StateBehaviour, POSITION};
use lazybot_core::{AudioRequest, PropertyValue, SpatialParams};

use crate::config::{ConfigError, ConfigResult, StateConfig};

/// Does nothing, always valid
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleState;

impl StateBehaviour for IdleState {
    fn name(&self) -> &str {
        "idle"
    }
}

/// Walks the navigation path, honouring stop and continue actions
#[derive(Debug, Clone, Copy, Default)]
pub struct PatrolState;

impl PatrolState {
    fn head_on(&self, agent: &mut EntityAgent) {
        if let Err(err) = agent.on_update_path_destination_next() {
            log::warn!("{} cannot continue patrol: {}", agent.id(), err);
        }
    }
}

impl StateBehaviour for PatrolState {
    fn name(&self) -> &str {
        "patrol"
    }

    fn validate(&self, agent: &EntityAgent) -> bool {
        !agent.navigation.is_empty() && agent.targets.count() == 0
    }

    fn on_enter(&self, agent: &mut EntityAgent) {
        if let Err(err) = agent.on_update_path_destination() {
            log::warn!("{} cannot start patrol: {}", agent.id(), err);
        }
    }

    fn execute(&self, agent: &mut EntityAgent) {
        if agent.is_sleep() {
            return;
        }

        let Some(index) = agent.navigation_index else {
            self.on_enter(agent);
            return;
        };
        let (accuracy, movement_speed, action, transfer_delay) =
            match agent.navigation.get_point(index) {
                Ok(point) => (
                    point.accuracy_radius,
                    point.movement_speed,
                    point.action,
                    point.transfer_delay,
                ),
                Err(err) => {
                    log::warn!("{} lost its patrol point: {}", agent.id(), err);
                    agent.navigation_index = None;
                    return;
                }
            };

        let speed = if agent.distance() > accuracy {
            agent
                .navigation
                .calculate_speed_on_path(movement_speed, agent.position())
        } else {
            0.0
        };
        agent.update_speed(speed);
        agent.move_entity();

        if agent.distance() > accuracy {
            return;
        }

        match action {
            PointAction::Continue => self.head_on(agent),
            PointAction::Stop => {
                agent.update_speed(0.0);
                agent.turn_sleep(transfer_delay);
                self.head_on(agent);
            }
            PointAction::Undefined | PointAction::Attack => {}
        }
    }

    fn on_exit(&self, agent: &mut EntityAgent) {
        agent.navigation_index = None;
    }
}

/// Chases the first captured target
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackState;

impl StateBehaviour for AttackState {
    fn name(&self) -> &str {
        "attack"
    }

    fn validate(&self, agent: &EntityAgent) -> bool {
        agent.targets.count() > 0
    }

    fn on_enter(&self, agent: &mut EntityAgent) {
        log::debug!("{} saw a target", agent.id());
    }

    fn execute(&self, agent: &mut EntityAgent) {
        let position = agent
            .targets
            .first_mut()
            .and_then(|target| target.get(POSITION).and_then(PropertyValue::as_vec3));

        let Some(position) = position else {
            log::trace!("{} has a target without a position", agent.id());
            return;
        };

        agent.update_path(Some(position), false);
        agent.update_speed(1.0);
        agent.move_entity();
    }

    fn on_exit(&self, agent: &mut EntityAgent) {
        log::debug!("{} lost its targets", agent.id());
        agent.update_speed(0.0);
    }
}

/// Plays a clip at the entity when targets appear
#[derive(Debug, Clone)]
pub struct AlertState {
    clip: String,
    volume: f32,
}

impl AlertState {
    pub fn new(clip: impl Into<String>) -> Self {
        Self {
            clip: clip.into(),
            volume: 1.0,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }
}

impl StateBehaviour for AlertState {
    fn name(&self) -> &str {
        "alert"
    }

    fn validate(&self, agent: &EntityAgent) -> bool {
        agent.targets.count() > 0
    }

    fn on_enter(&self, agent: &mut EntityAgent) {
        let request = AudioRequest::new(self.clip.as_str())
            .with_volume(self.volume)
            .with_spatial(SpatialParams::at(agent.position()));
        if agent.play_sound(&request).is_none() {
            log::trace!("{} has no audio sink for {}", agent.id(), self.clip);
        }
    }
}

/// Build an [`EntityState`] from its configuration
pub fn build_state(config: &StateConfig) -> ConfigResult<EntityState> {
    let behaviour: Arc<dyn StateBehaviour> = match config.kind.as_str() {
        "idle" => Arc::new(IdleState),
        "patrol" => Arc::new(PatrolState),
        "attack" => Arc::new(AttackState),
        "alert" => {
            let clip = config.clip.clone().ok_or_else(|| {
                ConfigError::Validation("alert state needs a clip".to_string())
            })?;
            Arc::new(AlertState::new(clip).with_volume(config.volume))
        }
        other => return Err(ConfigError::UnknownState(other.to_string())),
    };

    Ok(EntityState::new(behaviour)
        .with_priority(config.priority)
        .with_blocking(config.blocking)
        .with_blocking_on_sleep(config.blocking_on_sleep)
        .with_check_on(config.check_on.clone()))
}

//! Entity states
//!
//! A state pairs scheduling data (priority, blocking flags, the check-on mask)
//! with a shared, stateless [`StateBehaviour`] strategy.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent::EntityAgent;
use crate::int_mask::IntMask;

/// Callback selector for [`EntityState::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateAction {
    Validate,
    OnEnter,
    Execute,
    OnExit,
}

/// Behaviour strategy of a state
pub trait StateBehaviour: Send + Sync {
    /// Name used in logs and configuration
    fn name(&self) -> &str;

    /// Whether the state may be active now
    fn validate(&self, _agent: &EntityAgent) -> bool {
        true
    }

    fn on_enter(&self, _agent: &mut EntityAgent) {}

    fn execute(&self, _agent: &mut EntityAgent) {}

    fn on_exit(&self, _agent: &mut EntityAgent) {}
}

/// A schedulable state of an entity controller
#[derive(Clone)]
pub struct EntityState {
    /// Higher runs earlier
    pub priority: i32,
    /// Block transitions while sleeping in this state
    pub blocking_on_sleep: bool,
    /// Block transitions while active
    pub blocking: bool,
    check_on: IntMask,
    id: usize,
    behaviour: Arc<dyn StateBehaviour>,
}

impl EntityState {
    pub fn new(behaviour: Arc<dyn StateBehaviour>) -> Self {
        Self {
            priority: 0,
            blocking_on_sleep: false,
            blocking: false,
            check_on: IntMask::new(),
            id: 0,
            behaviour,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_blocking_on_sleep(mut self, blocking: bool) -> Self {
        self.blocking_on_sleep = blocking;
        self
    }

    /// States from which this one may be entered
    pub fn with_check_on(mut self, check_on: IntMask) -> Self {
        self.check_on = check_on;
        self
    }

    /// Array position, assigned by [`bake_states`]
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn check_on(&self) -> &IntMask {
        &self.check_on
    }

    pub fn name(&self) -> &str {
        self.behaviour.name()
    }

    pub fn behaviour(&self) -> &Arc<dyn StateBehaviour> {
        &self.behaviour
    }

    /// Whether a transition from the state `from` is permitted
    pub fn accepts_from(&self, from: usize) -> bool {
        u32::try_from(from).is_ok_and(|id| self.check_on.contains(id))
    }

    /// Dispatch one callback. Returns the validation result for
    /// [`StateAction::Validate`] and `true` otherwise.
    pub fn run(&self, action: StateAction, agent: &mut EntityAgent) -> bool {
        match action {
            StateAction::Validate => self.behaviour.validate(agent),
            StateAction::OnEnter => {
                self.behaviour.on_enter(agent);
                true
            }
            StateAction::Execute => {
                self.behaviour.execute(agent);
                true
            }
            StateAction::OnExit => {
                self.behaviour.on_exit(agent);
                true
            }
        }
    }
}

impl fmt::Debug for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityState")
            .field("name", &self.behaviour.name())
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("blocking", &self.blocking)
            .field("blocking_on_sleep", &self.blocking_on_sleep)
            .field("check_on", &self.check_on)
            .finish()
    }
}

/// Assign ids, sanitize check-on masks and return the evaluation order.
///
/// Ids equal array positions. A mask loses its own id and anything outside
/// the array. The order sorts by descending priority and is stable.
pub fn bake_states(states: &mut [EntityState]) -> Vec<usize> {
    let len = states.len();

    for (id, state) in states.iter_mut().enumerate() {
        state.id = id;
        state.check_on.remove(id as u32);
        state.check_on.retain_max(len.saturating_sub(1) as u32);
        state.check_on.bake();
    }

    let mut order: Vec<usize> = (0..len).collect();
    order.sort_by_key(|&index| std::cmp::Reverse(states[index].priority));
    order
}

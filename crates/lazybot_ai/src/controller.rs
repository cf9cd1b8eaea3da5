//! Dual-tier prioritized state machine
//!
//! Every tick the controller evaluates its steady states, which may be active
//! concurrently, then lets at most one exclusive state pre-empt the active one:
//!
//! 1. due timers fire and queued damage is applied
//! 2. resources regenerate
//! 3. steady states enter, execute or exit by their own validation
//! 4. unless blocked, the first exclusive state in priority order that is not
//!    active, accepts the active state in its check-on mask and validates
//!    replaces the active state
//! 5. the active exclusive state executes

use lazybot_combat::BehaviourEvent;
use lazybot_core::EntityId;

use crate::agent::EntityAgent;
use crate::state::{bake_states, EntityState, StateAction};

/// State machine driving one entity
pub struct EntityController {
    agent: EntityAgent,
    steady: Vec<EntityState>,
    exclusive: Vec<EntityState>,
    steady_order: Vec<usize>,
    exclusive_order: Vec<usize>,
    steady_active: Vec<bool>,
    active: usize,
    started: bool,
}

impl EntityController {
    pub fn new(agent: EntityAgent) -> Self {
        Self {
            agent,
            steady: Vec::new(),
            exclusive: Vec::new(),
            steady_order: Vec::new(),
            exclusive_order: Vec::new(),
            steady_active: Vec::new(),
            active: 0,
            started: false,
        }
    }

    pub fn with_steady(mut self, state: EntityState) -> Self {
        self.steady.push(state);
        self
    }

    pub fn with_exclusive(mut self, state: EntityState) -> Self {
        self.exclusive.push(state);
        self
    }

    /// Index of the exclusive state active at start
    pub fn with_active(mut self, index: usize) -> Self {
        self.active = index;
        self
    }

    pub fn id(&self) -> EntityId {
        self.agent.id()
    }

    pub fn agent(&self) -> &EntityAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut EntityAgent {
        &mut self.agent
    }

    pub fn is_dead(&self) -> bool {
        self.agent.behaviour.is_dead()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn steady_states(&self) -> &[EntityState] {
        &self.steady
    }

    pub fn exclusive_states(&self) -> &[EntityState] {
        &self.exclusive
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_state(&self) -> Option<&EntityState> {
        self.exclusive.get(self.active)
    }

    pub fn is_steady_active(&self, index: usize) -> bool {
        self.steady_active.get(index).copied().unwrap_or(false)
    }

    /// Behaviour events since the last drain
    pub fn drain_events(&mut self) -> Vec<BehaviourEvent> {
        self.agent.behaviour.drain_events()
    }

    /// Bake both tiers, enter the initial state and link detection areas.
    ///
    /// Called by the first [`tick`](Self::tick) if not called before.
    pub fn start(&mut self) {
        if self.started {
            return;
        }

        self.steady_order = bake_states(&mut self.steady);
        self.exclusive_order = bake_states(&mut self.exclusive);

        if self.active >= self.exclusive.len() && !self.exclusive.is_empty() {
            log::warn!(
                "{}: initial state {} out of range, using 0",
                self.agent.id(),
                self.active
            );
            self.active = 0;
        }

        let id = self.agent.id();
        let link = self.agent.damage_link();
        self.agent.detection_areas.set_owner(id);
        self.agent.detection_areas.set_damage_link(link);

        self.on_state_change();
        self.run_exclusive(self.active, StateAction::OnEnter);
        self.activate_steady();

        self.started = true;
        log::debug!(
            "{} started in {}",
            id,
            self.active_state().map_or("<none>", EntityState::name)
        );
    }

    /// Advance the entity by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        if !self.started {
            self.start();
        }
        if self.is_dead() {
            return;
        }

        self.agent.begin_tick(dt);
        if self.is_dead() {
            return;
        }
        self.agent.behaviour.update(dt);

        self.update_steady();
        self.update_exclusive();

        self.run_exclusive(self.active, StateAction::Execute);
    }

    /// Force the active exclusive state, running exit and enter callbacks
    pub fn change_state(&mut self, index: usize) -> bool {
        if index >= self.exclusive.len() || index == self.active {
            return false;
        }
        self.switch_to(index);
        true
    }

    fn update_steady(&mut self) {
        for &index in &self.steady_order {
            let state = &self.steady[index];

            if state.behaviour().validate(&self.agent) {
                if !self.steady_active[index] {
                    self.steady_active[index] = true;
                    state.run(StateAction::OnEnter, &mut self.agent);
                }
                state.run(StateAction::Execute, &mut self.agent);
            } else if self.steady_active[index] {
                self.steady_active[index] = false;
                state.run(StateAction::OnExit, &mut self.agent);
            }
        }
    }

    fn update_exclusive(&mut self) {
        if self.agent.is_blocked() {
            return;
        }

        let current = self.active;
        let next = self.exclusive_order.iter().copied().find(|&index| {
            let candidate = &self.exclusive[index];
            index != current
                && candidate.accepts_from(current)
                && candidate.behaviour().validate(&self.agent)
        });

        if let Some(index) = next {
            self.switch_to(index);
        }
    }

    fn switch_to(&mut self, index: usize) {
        let from = self.active;
        self.run_exclusive(from, StateAction::OnExit);

        self.active = index;
        self.on_state_change();

        self.run_exclusive(index, StateAction::OnEnter);

        log::debug!(
            "{}: {} -> {}",
            self.agent.id(),
            self.exclusive.get(from).map_or("<none>", EntityState::name),
            self.exclusive[index].name()
        );
    }

    /// Reset sleep and adopt the blocking flags of the active state
    fn on_state_change(&mut self) {
        let Some(state) = self.exclusive.get(self.active) else {
            return;
        };

        self.agent.reset_sleep();
        self.agent
            .set_active_flags(state.blocking, state.blocking_on_sleep);
        self.agent.set_blocked(state.blocking);
    }

    fn activate_steady(&mut self) {
        self.steady_active = vec![false; self.steady.len()];

        for &index in &self.steady_order {
            let state = &self.steady[index];
            if !state.behaviour().validate(&self.agent) {
                continue;
            }

            self.steady_active[index] = true;
            state.run(StateAction::OnEnter, &mut self.agent);
            state.run(StateAction::Execute, &mut self.agent);
        }
    }

    fn run_exclusive(&mut self, index: usize, action: StateAction) {
        if let Some(state) = self.exclusive.get(index) {
            state.run(action, &mut self.agent);
        }
    }
}

impl std::fmt::Debug for EntityController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityController")
            .field("agent", &self.agent)
            .field("active", &self.active)
            .field("steady", &self.steady.len())
            .field("exclusive", &self.exclusive.len())
            .field("started", &self.started)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::StaticMover;
    use crate::int_mask::IntMask;
    use crate::state::StateBehaviour;
    use lazybot_combat::{EntityBehaviour, FloatEntityData};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Probe {
        name: &'static str,
        valid: Arc<AtomicBool>,
        log: Log,
    }

    impl Probe {
        fn new(name: &'static str, valid: bool, log: &Log) -> (Arc<Self>, Arc<AtomicBool>) {
            let flag = Arc::new(AtomicBool::new(valid));
            let probe = Arc::new(Self {
                name,
                valid: Arc::clone(&flag),
                log: Arc::clone(log),
            });
            (probe, flag)
        }

        fn record(&self, what: &str) {
            self.log.lock().push(format!("{}.{}", self.name, what));
        }
    }

    impl StateBehaviour for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn validate(&self, _agent: &EntityAgent) -> bool {
            self.valid.load(Ordering::SeqCst)
        }

        fn on_enter(&self, _agent: &mut EntityAgent) {
            self.record("enter");
        }

        fn execute(&self, _agent: &mut EntityAgent) {
            self.record("execute");
        }

        fn on_exit(&self, _agent: &mut EntityAgent) {
            self.record("exit");
        }
    }

    fn agent() -> EntityAgent {
        let behaviour = EntityBehaviour::new(
            FloatEntityData::new(100.0, 0.0, 100.0).with_low(10.0),
            FloatEntityData::new(10.0, 0.0, 10.0),
        );
        EntityAgent::new(EntityId(7), behaviour, Box::new(StaticMover::default()))
    }

    fn take(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.lock())
    }

    #[test]
    fn test_steady_reentry() {
        let log = Log::default();
        let (probe, valid) = Probe::new("s", true, &log);
        let mut controller =
            EntityController::new(agent()).with_steady(EntityState::new(probe));

        controller.start();
        assert_eq!(take(&log), vec!["s.enter", "s.execute"]);
        assert!(controller.is_steady_active(0));

        controller.tick(0.1);
        assert_eq!(take(&log), vec!["s.execute"]);

        valid.store(false, Ordering::SeqCst);
        controller.tick(0.1);
        assert_eq!(take(&log), vec!["s.exit"]);
        controller.tick(0.1);
        assert!(take(&log).is_empty());

        valid.store(true, Ordering::SeqCst);
        controller.tick(0.1);
        assert_eq!(take(&log), vec!["s.enter", "s.execute"]);
    }

    #[test]
    fn test_steady_activation_uses_state_index() {
        let log = Log::default();
        let (low, _) = Probe::new("low", false, &log);
        let (high, _) = Probe::new("high", true, &log);
        let mut controller = EntityController::new(agent())
            .with_steady(EntityState::new(low).with_priority(0))
            .with_steady(EntityState::new(high).with_priority(9));

        controller.start();
        assert!(!controller.is_steady_active(0));
        assert!(controller.is_steady_active(1));

        controller.tick(0.1);
        assert_eq!(take(&log), vec!["high.enter", "high.execute", "high.execute"]);
    }

    #[test]
    fn test_first_eligible_candidate_wins() {
        let log = Log::default();
        let (idle, _) = Probe::new("idle", true, &log);
        let (a, a_valid) = Probe::new("a", false, &log);
        let (b, _) = Probe::new("b", true, &log);
        let (c, _) = Probe::new("c", true, &log);

        let mut controller = EntityController::new(agent())
            .with_exclusive(EntityState::new(idle).with_check_on(IntMask::parse("1/2/3")))
            // Highest priority but invalid
            .with_exclusive(
                EntityState::new(a)
                    .with_priority(10)
                    .with_check_on(IntMask::parse("0")),
            )
            // Valid but does not accept idle
            .with_exclusive(
                EntityState::new(b)
                    .with_priority(8)
                    .with_check_on(IntMask::parse("1")),
            )
            .with_exclusive(
                EntityState::new(c)
                    .with_priority(5)
                    .with_check_on(IntMask::parse("0")),
            );

        controller.start();
        assert_eq!(take(&log), vec!["idle.enter"]);

        controller.tick(0.1);
        assert_eq!(controller.active_index(), 3);
        assert_eq!(take(&log), vec!["idle.exit", "c.enter", "c.execute"]);

        // a only accepts idle, so c hands over to idle first
        a_valid.store(true, Ordering::SeqCst);
        controller.tick(0.1);
        assert_eq!(controller.active_index(), 0);
        assert_eq!(take(&log), vec!["c.exit", "idle.enter", "idle.execute"]);

        controller.tick(0.1);
        assert_eq!(controller.active_index(), 1);
        assert_eq!(take(&log), vec!["idle.exit", "a.enter", "a.execute"]);
    }

    #[test]
    fn test_block_gates_scan_not_execute() {
        let log = Log::default();
        let (idle, _) = Probe::new("idle", true, &log);
        let (other, _) = Probe::new("other", true, &log);

        let mut controller = EntityController::new(agent())
            .with_exclusive(EntityState::new(idle).with_blocking(true))
            .with_exclusive(
                EntityState::new(other)
                    .with_priority(1)
                    .with_check_on(IntMask::parse("0")),
            );

        controller.start();
        take(&log);
        assert!(controller.agent().is_blocked());

        controller.tick(0.1);
        assert_eq!(controller.active_index(), 0);
        assert_eq!(take(&log), vec!["idle.execute"]);

        controller.agent_mut().make_instant_state_change(-1.0);
        controller.tick(0.1);
        assert_eq!(controller.active_index(), 1);
    }

    #[test]
    fn test_sleep_blocks_by_state_flag() {
        let log = Log::default();
        let (idle, _) = Probe::new("idle", true, &log);
        let (other, other_valid) = Probe::new("other", false, &log);

        let mut controller = EntityController::new(agent())
            .with_exclusive(EntityState::new(idle).with_blocking_on_sleep(true))
            .with_exclusive(
                EntityState::new(other)
                    .with_priority(1)
                    .with_check_on(IntMask::parse("0")),
            );
        controller.start();

        controller.agent_mut().turn_sleep(0.2);
        other_valid.store(true, Ordering::SeqCst);

        controller.tick(0.1);
        assert_eq!(controller.active_index(), 0);
        // Timer fires at the start of this tick, then the scan runs
        controller.tick(0.1);
        assert_eq!(controller.active_index(), 1);
        assert!(!controller.agent().is_sleep());
    }

    #[test]
    fn test_state_change_resets_sleep() {
        let log = Log::default();
        let (idle, _) = Probe::new("idle", true, &log);
        let (other, _) = Probe::new("other", true, &log);

        let mut controller = EntityController::new(agent())
            .with_exclusive(EntityState::new(idle))
            .with_exclusive(EntityState::new(other).with_blocking(true));
        controller.start();

        controller.agent_mut().turn_sleep(-1.0);
        assert!(controller.change_state(1));
        assert!(!controller.agent().is_sleep());
        assert!(controller.agent().is_blocked());
        assert!(!controller.change_state(1));
        assert!(!controller.change_state(5));
    }

    #[test]
    fn test_dead_entity_stops_ticking() {
        let log = Log::default();
        let (idle, _) = Probe::new("idle", true, &log);
        let mut controller = EntityController::new(agent()).with_exclusive(EntityState::new(idle));
        controller.start();
        take(&log);

        let link = controller.agent().damage_link();
        link(95.0);
        controller.tick(0.1);
        assert!(controller.is_dead());
        assert!(take(&log).is_empty());
        assert_eq!(controller.drain_events(), vec![BehaviourEvent::Died]);

        controller.tick(0.1);
        assert!(take(&log).is_empty());
    }

    #[test]
    fn test_detection_damage_reaches_owner() {
        use lazybot_sensing::DetectionArea;

        let log = Log::default();
        let (idle, _) = Probe::new("idle", true, &log);
        let mut agent = agent();
        agent.detection_areas.push(DetectionArea::new("head").with_damage_multiplier(2.0));

        let mut controller = EntityController::new(agent).with_exclusive(EntityState::new(idle));
        controller.start();

        let area = controller.agent().detection_areas.get(0).unwrap();
        assert_eq!(area.owner(), Some(EntityId(7)));
        area.perform_damage(10.0);

        controller.tick(0.1);
        assert_eq!(controller.agent().behaviour.health.value(), 80.0);
    }
}

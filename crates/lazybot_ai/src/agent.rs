//! Per-entity data reachable from state callbacks

use std::sync::Arc;

use glam::Vec3;
use lazybot_combat::EntityBehaviour;
use lazybot_core::{
    AreaId, AudioRequest, AudioSink, EntityId, PlaybackHandle, Result, Scheduler, TimerHandle,
    Transform,
};
use lazybot_sensing::{DamageLink, DetectionAreaContainer};
use parking_lot::Mutex;

use crate::navigation::NavigationContainer;
use crate::targets::{Target, TargetInfo, TargetType};

/// Movement backend of an entity
pub trait Mover: Send {
    fn transform(&self) -> Transform;

    fn position(&self) -> Vec3 {
        self.transform().position
    }

    /// Advance movement by `dt` seconds
    fn move_step(&mut self, dt: f32);

    /// Distance to the current destination
    fn distance(&self) -> f32;

    fn update_speed(&mut self, speed: f32);

    fn set_destination(&mut self, destination: Vec3);

    fn destination(&self) -> Option<Vec3>;
}

/// Damage received through detection areas, applied on the owner's next tick
#[derive(Debug, Default)]
pub struct DamageInbox {
    amounts: Vec<f32>,
}

impl DamageInbox {
    pub fn push(&mut self, amount: f32) {
        self.amounts.push(amount);
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, f32> {
        self.amounts.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SleepExpiry {
    /// End of `turn_sleep`
    Wake,
    /// End of `make_instant_state_change`
    Release,
}

/// Everything an entity's states can read and change
pub struct EntityAgent {
    id: EntityId,
    pub behaviour: EntityBehaviour,
    pub navigation: NavigationContainer,
    /// Index of the current navigation destination
    pub navigation_index: Option<usize>,
    pub targets: TargetInfo,
    pub detection_areas: DetectionAreaContainer,
    mover: Box<dyn Mover>,
    audio: Option<Box<dyn AudioSink>>,
    sleep: bool,
    block: bool,
    sleep_timer: Option<TimerHandle>,
    timers: Scheduler<SleepExpiry>,
    path_update_delay: f32,
    time_since_path_update: f32,
    delta_time: f32,
    active_blocking: bool,
    active_blocking_on_sleep: bool,
    inbox: Arc<Mutex<DamageInbox>>,
}

impl EntityAgent {
    pub fn new(id: EntityId, behaviour: EntityBehaviour, mover: Box<dyn Mover>) -> Self {
        Self {
            id,
            behaviour,
            navigation: NavigationContainer::new(),
            navigation_index: None,
            targets: TargetInfo::new(),
            detection_areas: DetectionAreaContainer::new(),
            mover,
            audio: None,
            sleep: false,
            block: false,
            sleep_timer: None,
            timers: Scheduler::new(),
            path_update_delay: 0.0,
            time_since_path_update: 0.0,
            delta_time: 0.0,
            active_blocking: false,
            active_blocking_on_sleep: false,
            inbox: Arc::new(Mutex::new(DamageInbox::default())),
        }
    }

    pub fn with_navigation(mut self, navigation: NavigationContainer) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn with_detection_areas(mut self, areas: DetectionAreaContainer) -> Self {
        self.detection_areas = areas;
        self
    }

    pub fn with_audio(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.audio = Some(sink);
        self
    }

    /// Minimum seconds between non-immediate path updates
    pub fn with_path_update_delay(mut self, seconds: f32) -> Self {
        self.path_update_delay = seconds.max(0.0);
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_sleep(&self) -> bool {
        self.sleep
    }

    pub fn is_blocked(&self) -> bool {
        self.block
    }

    pub fn set_blocked(&mut self, block: bool) {
        self.block = block;
    }

    /// Seconds of the tick in progress
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn transform(&self) -> Transform {
        self.mover.transform()
    }

    pub fn position(&self) -> Vec3 {
        self.mover.position()
    }

    pub fn mover(&self) -> &dyn Mover {
        self.mover.as_ref()
    }

    pub fn mover_mut(&mut self) -> &mut dyn Mover {
        self.mover.as_mut()
    }

    /// Advance movement by the current tick
    pub fn move_entity(&mut self) {
        self.mover.move_step(self.delta_time);
    }

    pub fn distance(&self) -> f32 {
        self.mover.distance()
    }

    pub fn update_speed(&mut self, speed: f32) {
        self.mover.update_speed(speed);
    }

    /// Send a destination to the mover. `None` re-sends the current one.
    ///
    /// Non-immediate updates are dropped until the path update delay has
    /// elapsed since the last accepted one.
    pub fn update_path(&mut self, destination: Option<Vec3>, immediate: bool) -> bool {
        if !immediate && self.time_since_path_update < self.path_update_delay {
            return false;
        }

        let Some(destination) = destination.or_else(|| self.mover.destination()) else {
            return false;
        };

        self.mover.set_destination(destination);
        self.time_since_path_update = 0.0;
        true
    }

    /// Head to the navigation point nearest to the entity
    pub fn on_update_path_destination(&mut self) -> Result<()> {
        let (position, index) = self.navigation.nearest_point(self.position())?;
        self.navigation_index = Some(index);
        self.update_path(Some(position), true);
        Ok(())
    }

    /// Head to the destination chosen by the navigation policy
    pub fn on_update_path_destination_next(&mut self) -> Result<()> {
        let (position, index) = self.navigation.destination(self.position())?;
        self.navigation_index = Some(index);
        self.update_path(Some(position), true);
        Ok(())
    }

    /// Suspend for `duration` seconds, or until [`wake_up`](Self::wake_up)
    /// when negative. Replaces any pending sleep.
    pub fn turn_sleep(&mut self, duration: f32) {
        self.reset_sleep();
        self.sleep = true;
        self.block = self.active_blocking_on_sleep;
        self.sleep_timer = self.timers.schedule(duration, SleepExpiry::Wake);
        log::debug!("{} sleeps for {}s", self.id, duration);
    }

    pub fn wake_up(&mut self) {
        self.reset_sleep();
        self.block = self.active_blocking;
    }

    /// Block every transition for `duration` seconds, then unblock
    /// regardless of the active state. A negative duration unblocks now.
    pub fn make_instant_state_change(&mut self, duration: f32) {
        self.reset_sleep();

        if duration < 0.0 {
            self.block = false;
            return;
        }

        self.sleep = true;
        self.block = true;
        self.sleep_timer = self.timers.schedule(duration, SleepExpiry::Release);
    }

    /// Whether a sleep timer is pending
    pub fn has_sleep_timer(&self) -> bool {
        self.sleep_timer
            .is_some_and(|handle| self.timers.is_pending(handle))
    }

    /// Drop the target snapshots captured by one searching area
    pub fn clear_target(&mut self, type_name: &str, area: AreaId) {
        if let Some(container) = self.targets.get_mut(type_name) {
            container.erase(area);
        }
    }

    /// Register a searching area's slot under its target type
    pub fn init_target_container(&mut self, target_type: &TargetType, area: AreaId) {
        self.targets.add_type(target_type.clone()).add_area(area);
    }

    /// Store a snapshot captured by `area`. Unknown types are registered.
    pub fn add_target(&mut self, target_type: &TargetType, area: AreaId, target: Target) {
        self.targets.add_type(target_type.clone()).add_target(area, target);
    }

    pub fn damage(&mut self, amount: f32) -> bool {
        self.behaviour.damage(amount)
    }

    /// Callback for detection areas that queues damage for the next tick
    pub fn damage_link(&self) -> DamageLink {
        let inbox = Arc::clone(&self.inbox);
        Arc::new(move |amount| inbox.lock().push(amount))
    }

    pub fn play_sound(&mut self, request: &AudioRequest) -> Option<PlaybackHandle> {
        self.audio.as_mut().map(|sink| sink.play(request))
    }

    pub fn stop_sound(&mut self, handle: PlaybackHandle, delay: f32) {
        if let Some(sink) = self.audio.as_mut() {
            if delay > 0.0 {
                sink.stop_delayed(handle, delay);
            } else {
                sink.stop(handle);
            }
        }
    }

    pub fn audio(&self) -> Option<&dyn AudioSink> {
        self.audio.as_deref()
    }

    /// Cache the scheduling flags of the active exclusive state
    pub(crate) fn set_active_flags(&mut self, blocking: bool, blocking_on_sleep: bool) {
        self.active_blocking = blocking;
        self.active_blocking_on_sleep = blocking_on_sleep;
    }

    /// Cancel the sleep timer and clear the sleep flag
    pub(crate) fn reset_sleep(&mut self) {
        self.sleep = false;
        if let Some(handle) = self.sleep_timer.take() {
            self.timers.cancel(handle);
        }
    }

    /// Start-of-tick bookkeeping: clocks, due timers and queued damage
    pub(crate) fn begin_tick(&mut self, dt: f32) {
        self.delta_time = dt;
        self.time_since_path_update += dt;

        for expiry in self.timers.advance(dt) {
            self.sleep_timer = None;
            self.sleep = false;
            self.block = match expiry {
                SleepExpiry::Wake => self.active_blocking,
                SleepExpiry::Release => false,
            };
            log::trace!("{} timer expired: {:?}", self.id, expiry);
        }

        let amounts: Vec<f32> = self.inbox.lock().drain().collect();
        for amount in amounts {
            self.behaviour.damage(amount);
        }
    }
}

impl std::fmt::Debug for EntityAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityAgent")
            .field("id", &self.id)
            .field("sleep", &self.sleep)
            .field("block", &self.block)
            .field("navigation_index", &self.navigation_index)
            .field("targets", &self.targets.count())
            .finish()
    }
}

/// A mover that stays where it is. Useful for stationary entities.
#[derive(Debug, Clone, Default)]
pub struct StaticMover {
    transform: Transform,
    destination: Option<Vec3>,
    speed: f32,
}

impl StaticMover {
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            destination: None,
            speed: 0.0,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }
}

impl Mover for StaticMover {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn move_step(&mut self, _dt: f32) {}

    fn distance(&self) -> f32 {
        self.destination
            .map_or(0.0, |d| d.distance(self.transform.position))
    }

    fn update_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn set_destination(&mut self, destination: Vec3) {
        self.destination = Some(destination);
    }

    fn destination(&self) -> Option<Vec3> {
        self.destination
    }
}

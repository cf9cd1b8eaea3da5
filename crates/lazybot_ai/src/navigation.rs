//! Waypoint navigation
//!
//! A [`NavigationContainer`] stores an ordered list of [`NavigationPoint`]s and
//! a cursor of `(previous, pending)` indices. Destinations are resolved by a
//! pluggable [`DestinationPolicy`].

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use lazybot_core::{Error, PointId, Result};
use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Role of a waypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    Undefined,
    #[default]
    Path,
    /// Temporary point owned by its container, destroyed on removal
    Suspicion,
    Target,
}

/// What to do on reaching a waypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointAction {
    #[default]
    Undefined,
    Continue,
    Stop,
    Attack,
}

/// A world position that one or more navigation points refer to
#[derive(Debug, Clone, PartialEq)]
pub struct IntermediatePoint {
    id: PointId,
    position: Vec3,
    destroyed: bool,
}

impl IntermediatePoint {
    pub fn new(id: PointId, position: Vec3) -> Self {
        Self {
            id,
            position,
            destroyed: false,
        }
    }

    /// Wrap into a shareable handle
    pub fn shared(id: PointId, position: Vec3) -> SharedPoint {
        Arc::new(RwLock::new(Self::new(id, position)))
    }

    pub fn id(&self) -> PointId {
        self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn destroy(&mut self) {
        self.destroyed = true;
    }
}

/// Shared handle to an [`IntermediatePoint`]
pub type SharedPoint = Arc<RwLock<IntermediatePoint>>;

/// One waypoint of a navigation path
#[derive(Debug, Clone)]
pub struct NavigationPoint {
    pub point_type: PointType,
    pub action: PointAction,
    pub priority: u8,
    point: Option<SharedPoint>,
    /// Seconds to wait on a Stop point
    pub transfer_delay: f32,
    /// Speed factor at the centre of the impact zone (0.0 - 1.0)
    pub min_impact_speed: f32,
    pub animation_speed: f32,
    /// Speed factor while travelling to this point (0.0 - 1.0)
    pub movement_speed: f32,
    /// Distance at which the point counts as reached
    pub accuracy_radius: f32,
    /// Radius of the deceleration zone; zero disables it
    pub impact_radius: f32,
}

impl NavigationPoint {
    pub fn new(point: SharedPoint) -> Self {
        Self {
            point_type: PointType::Path,
            action: PointAction::Undefined,
            priority: 0,
            point: Some(point),
            transfer_delay: 0.0,
            min_impact_speed: 1.0,
            animation_speed: 1.0,
            movement_speed: 1.0,
            accuracy_radius: 0.5,
            impact_radius: 0.0,
        }
    }

    /// A point with no position reference yet
    pub fn unlinked() -> Self {
        Self {
            point: None,
            ..Self::new(IntermediatePoint::shared(PointId(0), Vec3::ZERO))
        }
    }

    pub fn with_type(mut self, point_type: PointType) -> Self {
        self.point_type = point_type;
        self
    }

    pub fn with_action(mut self, action: PointAction) -> Self {
        self.action = action;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_transfer_delay(mut self, seconds: f32) -> Self {
        self.transfer_delay = seconds.max(0.0);
        self
    }

    pub fn with_movement_speed(mut self, factor: f32) -> Self {
        self.movement_speed = factor.clamp(0.0, 1.0);
        self
    }

    pub fn with_accuracy_radius(mut self, radius: f32) -> Self {
        self.accuracy_radius = radius.max(0.0);
        self
    }

    /// Decelerate to `min_speed` of the speed inside `radius`
    pub fn with_impact(mut self, radius: f32, min_speed: f32) -> Self {
        self.impact_radius = radius.max(0.0);
        self.min_impact_speed = min_speed.clamp(0.0, 1.0);
        self
    }

    pub fn point(&self) -> Option<&SharedPoint> {
        self.point.as_ref()
    }

    pub fn set_point(&mut self, point: SharedPoint) {
        self.point = Some(point);
    }

    /// Position of the referenced point
    pub fn position(&self) -> Result<Vec3> {
        let point = self
            .point
            .as_ref()
            .ok_or_else(|| Error::ReferenceMissing("navigation point has no position".into()))?;
        let point = point.read();
        if point.is_destroyed() {
            return Err(Error::ReferenceMissing(format!("point {} was destroyed", point.id())));
        }
        Ok(point.position())
    }

    /// Destroy the referenced point if this point owns it
    pub fn destroy_point(&self) {
        if self.point_type != PointType::Suspicion {
            return;
        }
        if let Some(point) = &self.point {
            point.write().destroy();
        }
    }

    /// `speed` damped inside the impact zone around `position`
    pub fn damp_speed(&self, speed: f32, position: Vec3) -> Result<f32> {
        if self.impact_radius <= 0.0 {
            return Ok(speed);
        }
        let distance = position.distance(self.position()?);
        if distance > self.impact_radius {
            return Ok(speed);
        }
        let t = distance / self.impact_radius;
        let slowest = speed * self.min_impact_speed;
        Ok(slowest + (speed - slowest) * t)
    }
}

/// Chooses the next destination of a container
pub trait DestinationPolicy: Send + Sync + fmt::Debug {
    /// Resolve a destination seen from `from`, updating the cursor
    fn select(&self, nav: &mut NavigationContainer, from: Vec3) -> Result<(Vec3, usize)>;
}

/// Walk points in order, or randomly when the container is random
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl DestinationPolicy for Sequential {
    fn select(&self, nav: &mut NavigationContainer, _from: Vec3) -> Result<(Vec3, usize)> {
        if nav.is_random() {
            nav.random_point()
        } else {
            nav.next_point()
        }
    }
}

/// Highest priority wins; among equal priorities the nearest one, where
/// points closer than `precision` to each other count as equally near and
/// the earlier index is kept. The previous point is never chosen again
/// unless it is the only one.
#[derive(Debug, Clone, Copy)]
pub struct PriorityNearness {
    pub precision: f32,
}

impl Default for PriorityNearness {
    fn default() -> Self {
        Self { precision: 0.1 }
    }
}

impl DestinationPolicy for PriorityNearness {
    fn select(&self, nav: &mut NavigationContainer, from: Vec3) -> Result<(Vec3, usize)> {
        if nav.is_random() {
            return nav.random_point();
        }
        if nav.is_empty() {
            return Err(Error::EmptyContainer("navigation container"));
        }

        let previous = nav.previous();
        let mut best: Option<(usize, u8, f32, Vec3)> = None;

        for (index, point) in nav.points().iter().enumerate() {
            if Some(index) == previous {
                continue;
            }
            let position = point.position()?;
            let distance = from.distance(position);

            let better = match best {
                None => true,
                Some((_, priority, best_distance, _)) => {
                    // Same priority: a later point wins unless it is farther by more than precision
                    point.priority > priority
                        || (point.priority == priority && distance - best_distance <= self.precision)
                }
            };
            if better {
                best = Some((index, point.priority, distance, position));
            }
        }

        let (index, position) = match best {
            Some((index, _, _, position)) => (index, position),
            // Only the previous point exists
            None => {
                let index = previous.unwrap_or(0);
                (index, nav.path_position(index)?)
            }
        };

        nav.set_cursor(index);
        Ok((position, index))
    }
}

/// Serializable choice of a built-in policy
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Sequential,
    PriorityNearness {
        #[serde(default = "default_precision")]
        precision: f32,
    },
}

fn default_precision() -> f32 {
    0.1
}

impl PolicyKind {
    pub fn build(self) -> Arc<dyn DestinationPolicy> {
        match self {
            Self::Sequential => Arc::new(Sequential),
            Self::PriorityNearness { precision } => Arc::new(PriorityNearness { precision }),
        }
    }
}

/// Ordered waypoint store with a destination cursor
pub struct NavigationContainer {
    points: Vec<NavigationPoint>,
    random: bool,
    startup_point: usize,
    previous: Option<usize>,
    pending: usize,
    policy: Arc<dyn DestinationPolicy>,
    rng: ChaCha8Rng,
}

impl NavigationContainer {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            random: false,
            startup_point: 0,
            previous: None,
            pending: 0,
            policy: Arc::new(Sequential),
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }

    pub fn with_points(mut self, points: impl IntoIterator<Item = NavigationPoint>) -> Self {
        self.points.extend(points);
        self
    }

    pub fn with_random(mut self, random: bool) -> Self {
        self.random = random;
        self
    }

    /// Index used as the first pending destination
    pub fn with_startup_point(mut self, index: usize) -> Self {
        self.startup_point = index;
        self.pending = index;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn DestinationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[NavigationPoint] {
        &self.points
    }

    pub fn is_random(&self) -> bool {
        self.random
    }

    pub fn set_random(&mut self, random: bool) {
        self.random = random;
    }

    pub fn startup_point(&self) -> usize {
        self.startup_point
    }

    /// Index of the last point handed out as a destination
    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    /// Index that the next sequential step will return
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn add(&mut self, point: NavigationPoint) {
        self.points.push(point);
    }

    /// Append and return the new index
    pub fn add_indexed(&mut self, point: NavigationPoint) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    /// Append every point, draining the source
    pub fn add_many(&mut self, points: &mut Vec<NavigationPoint>) {
        self.points.append(points);
    }

    /// Remove all points and reset the cursor
    pub fn clear(&mut self) {
        for point in &self.points {
            point.destroy_point();
        }
        self.points.clear();
        self.reset_to_zero();
    }

    pub fn reset_to_zero(&mut self) {
        self.pending = 0;
        self.previous = None;
    }

    /// Remove a point, destroying it if owned
    pub fn remove_at(&mut self, index: usize) -> Result<NavigationPoint> {
        if self.points.is_empty() {
            return Err(Error::EmptyContainer("navigation container"));
        }
        Error::check_index(index, self.points.len())?;

        let point = self.points.remove(index);
        point.destroy_point();

        self.previous = shift_after_removal(self.previous, index);
        if self.pending > index {
            self.pending -= 1;
        }
        if self.pending >= self.points.len() {
            self.pending = 0;
        }
        Ok(point)
    }

    /// Remove a point and keep an external index pointing at the same element.
    ///
    /// `relative` becomes `None` if it referred to the removed point.
    pub fn remove_at_relative(
        &mut self,
        index: usize,
        relative: &mut Option<usize>,
    ) -> Result<NavigationPoint> {
        let point = self.remove_at(index)?;
        *relative = shift_after_removal(*relative, index);
        Ok(point)
    }

    pub fn get_point(&self, index: usize) -> Result<&NavigationPoint> {
        if self.points.is_empty() {
            return Err(Error::EmptyContainer("navigation container"));
        }
        Error::check_index(index, self.points.len())?;
        Ok(&self.points[index])
    }

    pub fn get_point_mut(&mut self, index: usize) -> Result<&mut NavigationPoint> {
        if self.points.is_empty() {
            return Err(Error::EmptyContainer("navigation container"));
        }
        Error::check_index(index, self.points.len())?;
        Ok(&mut self.points[index])
    }

    pub fn path_position(&self, index: usize) -> Result<Vec3> {
        self.get_point(index)?.position()
    }

    /// The point most recently selected as destination
    pub fn destination_point(&self) -> Result<&NavigationPoint> {
        if self.points.is_empty() {
            return Err(Error::EmptyContainer("navigation container"));
        }
        let index = self
            .previous
            .ok_or_else(|| Error::ReferenceMissing("no destination selected".into()))?;
        self.get_point(index)
    }

    pub fn point_position(&self) -> Result<Vec3> {
        self.destination_point()?.position()
    }

    /// Nearest point to `from`. Becomes the destination; the one after it is pending.
    pub fn nearest_point(&mut self, from: Vec3) -> Result<(Vec3, usize)> {
        if self.points.is_empty() {
            return Err(Error::EmptyContainer("navigation container"));
        }

        let mut nearest = (f32::MAX, 0, Vec3::ZERO);
        for (index, point) in self.points.iter().enumerate() {
            let position = point.position()?;
            let distance = from.distance(position);
            if distance < nearest.0 {
                nearest = (distance, index, position);
            }
        }

        self.set_cursor(nearest.1);
        Ok((nearest.2, nearest.1))
    }

    /// Pending point, advancing the cursor with wrap-around
    pub fn next_point(&mut self) -> Result<(Vec3, usize)> {
        if self.points.is_empty() {
            return Err(Error::EmptyContainer("navigation container"));
        }

        let index = if self.pending < self.points.len() {
            self.pending
        } else {
            0
        };
        let position = self.points[index].position()?;
        self.set_cursor(index);
        Ok((position, index))
    }

    /// Uniformly random point other than the previous and pending ones.
    ///
    /// With fewer than three points the exclusion relaxes: first only the
    /// previous point is excluded, and a single point is always returned.
    pub fn random_point(&mut self) -> Result<(Vec3, usize)> {
        let len = self.points.len();
        if len == 0 {
            return Err(Error::EmptyContainer("navigation container"));
        }

        let mut candidates: Vec<usize> = (0..len)
            .filter(|i| Some(*i) != self.previous && *i != self.pending)
            .collect();
        if candidates.is_empty() {
            candidates = (0..len).filter(|i| Some(*i) != self.previous).collect();
        }

        let index = match candidates.len() {
            0 => 0,
            1 => candidates[0],
            n => candidates[self.rng.gen_range(0..n)],
        };

        let position = self.points[index].position()?;
        self.set_cursor(index);
        Ok((position, index))
    }

    /// Destination chosen by the configured policy
    pub fn destination(&mut self, from: Vec3) -> Result<(Vec3, usize)> {
        if self.points.is_empty() {
            return Err(Error::EmptyContainer("navigation container"));
        }
        let policy = Arc::clone(&self.policy);
        policy.select(self, from)
    }

    /// `speed` damped by every impact zone containing `position`
    pub fn calculate_speed_on_path(&self, speed: f32, position: Vec3) -> f32 {
        let mut speed = speed;
        for point in &self.points {
            match point.damp_speed(speed, position) {
                Ok(damped) => speed = damped,
                Err(err) => log::trace!("speed damping skipped: {}", err),
            }
        }
        speed
    }

    /// `speed` damped by the impact zone of one point
    pub fn calculate_speed_on_point(&self, speed: f32, position: Vec3, index: usize) -> Result<f32> {
        self.get_point(index)?.damp_speed(speed, position)
    }

    /// Make `index` the destination and the following point pending
    pub fn set_cursor(&mut self, index: usize) {
        self.previous = Some(index);
        self.pending = (index + 1) % self.points.len().max(1);
    }
}

fn shift_after_removal(cursor: Option<usize>, removed: usize) -> Option<usize> {
    match cursor {
        Some(i) if i == removed => None,
        Some(i) if i > removed => Some(i - 1),
        other => other,
    }
}

impl Default for NavigationContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NavigationContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationContainer")
            .field("points", &self.points.len())
            .field("random", &self.random)
            .field("previous", &self.previous)
            .field("pending", &self.pending)
            .field("policy", &self.policy)
            .finish()
    }
}

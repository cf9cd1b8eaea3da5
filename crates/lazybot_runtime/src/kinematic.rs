//! Kinematic movement on the XZ plane
//!
//! Turns toward the destination at a bounded angular speed and walks along
//! its forward axis. No physics, no path finding.

use glam::{Quat, Vec3};
use lazybot_ai::Mover;
use lazybot_core::Transform;

/// Distance under which the mover snaps onto its destination
const ARRIVAL_EPSILON: f32 = 1e-3;

/// Straight-line mover steering by yaw only
#[derive(Debug, Clone)]
pub struct KinematicMover {
    transform: Transform,
    destination: Option<Vec3>,
    /// Units per second at speed factor 1
    max_speed: f32,
    /// Degrees per second
    angular_speed: f32,
    speed: f32,
}

impl KinematicMover {
    pub fn new(transform: Transform, max_speed: f32) -> Self {
        Self {
            transform,
            destination: None,
            max_speed: max_speed.max(0.0),
            angular_speed: 360.0,
            speed: 0.0,
        }
    }

    pub fn with_angular_speed(mut self, degrees_per_second: f32) -> Self {
        self.angular_speed = degrees_per_second.max(0.0);
        self
    }

    /// Current speed in units per second
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    fn turn_towards(&mut self, direction: Vec3, dt: f32) {
        let yaw = direction.x.atan2(direction.z);
        let target = Quat::from_rotation_y(yaw);
        let angle = self.transform.rotation.angle_between(target);
        if angle < 1e-5 {
            self.transform.rotation = target;
            return;
        }

        let max_step = self.angular_speed.to_radians() * dt;
        if max_step >= angle {
            self.transform.rotation = target;
        } else {
            self.transform.rotation = self
                .transform
                .rotation
                .slerp(target, max_step / angle)
                .normalize();
        }
    }
}

impl Mover for KinematicMover {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn move_step(&mut self, dt: f32) {
        let Some(destination) = self.destination else {
            return;
        };
        if dt <= 0.0 {
            return;
        }

        let mut offset = destination - self.transform.position;
        offset.y = 0.0;
        let distance = offset.length();
        if distance <= ARRIVAL_EPSILON {
            self.transform.position.x = destination.x;
            self.transform.position.z = destination.z;
            return;
        }

        let direction = offset / distance;
        self.turn_towards(direction, dt);

        // Walk slower while still facing away
        let alignment = self.transform.forward().dot(direction).max(0.0);
        let step = (self.speed * dt).min(distance) * alignment;
        if distance - step <= ARRIVAL_EPSILON {
            self.transform.position.x = destination.x;
            self.transform.position.z = destination.z;
        } else {
            self.transform.position += self.transform.forward() * step;
        }
    }

    fn distance(&self) -> f32 {
        self.destination.map_or(0.0, |destination| {
            let mut offset = destination - self.transform.position;
            offset.y = 0.0;
            offset.length()
        })
    }

    /// `factor` of the maximum speed
    fn update_speed(&mut self, factor: f32) {
        self.speed = factor.max(0.0) * self.max_speed;
    }

    fn set_destination(&mut self, destination: Vec3) {
        self.destination = Some(destination);
    }

    fn destination(&self) -> Option<Vec3> {
        self.destination
    }
}

//! Bounded float resources

use serde::{Deserialize, Serialize};

use crate::error::{ResourceError, Result};

fn default_true() -> bool {
    true
}

/// A bounded float value with regeneration and locking.
///
/// `value` stays in `[min, max]` unless the resource is unlimited, in which
/// case changes always succeed and leave the value untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatEntityData {
    /// Current value
    #[serde(default)]
    value: f32,
    /// Startup value
    start: f32,
    /// Minimum acceptable value
    min: f32,
    /// Maximum acceptable value
    max: f32,
    /// Low threshold
    #[serde(default)]
    low: f32,
    /// Units regenerated per second
    #[serde(default)]
    regenerate_rate: f32,
    /// Rejects every change while set
    #[serde(default)]
    locked: bool,
    #[serde(default)]
    unlimited: bool,
    #[serde(default = "default_true")]
    regenerating: bool,
}

impl FloatEntityData {
    /// Create a resource starting at `start`. Inverted bounds are swapped.
    pub fn new(start: f32, min: f32, max: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let start = start.clamp(min, max);
        Self {
            value: start,
            start,
            min,
            max,
            low: min,
            regenerate_rate: 0.0,
            locked: false,
            unlimited: false,
            regenerating: true,
        }
    }

    /// Create a resource, rejecting inconsistent bounds
    pub fn try_new(start: f32, min: f32, max: f32) -> Result<Self> {
        if min > max {
            return Err(ResourceError::InvalidRange { min, max });
        }
        if start < min || start > max {
            return Err(ResourceError::StartOutOfRange { start, min, max });
        }
        Ok(Self::new(start, min, max))
    }

    pub fn with_low(mut self, low: f32) -> Self {
        self.low = low;
        self
    }

    pub fn with_regeneration(mut self, rate: f32) -> Self {
        self.regenerate_rate = rate;
        self
    }

    pub fn with_unlimited(mut self) -> Self {
        self.unlimited = true;
        self
    }

    /// Check bounds after deserialization and reset the value to start
    pub fn validated(mut self) -> Result<Self> {
        if self.min > self.max {
            return Err(ResourceError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        if self.start < self.min || self.start > self.max {
            return Err(ResourceError::StartOutOfRange {
                start: self.start,
                min: self.min,
                max: self.max,
            });
        }
        self.value = self.start;
        Ok(self)
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn low(&self) -> f32 {
        self.low
    }

    pub fn regenerate_rate(&self) -> f32 {
        self.regenerate_rate
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    pub fn set_unlimited(&mut self, unlimited: bool) {
        self.unlimited = unlimited;
    }

    pub fn is_regenerating(&self) -> bool {
        self.regenerating
    }

    pub fn set_regenerating(&mut self, regenerating: bool) {
        self.regenerating = regenerating;
    }

    /// At or below the low threshold
    pub fn is_low(&self) -> bool {
        self.value <= self.low
    }

    pub fn is_min(&self) -> bool {
        self.value <= self.min
    }

    pub fn is_max(&self) -> bool {
        self.value >= self.max
    }

    /// Fraction of the range currently filled (0.0 - 1.0)
    pub fn fraction(&self) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            1.0
        } else {
            (self.value - self.min) / span
        }
    }

    /// Whether `change(amount, false)` would apply
    pub fn is_changeable(&self, amount: f32) -> bool {
        if self.unlimited {
            return true;
        }
        let next = self.value + amount;
        next >= self.min && next <= self.max
    }

    /// Apply `amount`.
    ///
    /// Locked resources fail, unlimited ones succeed without mutation. Without
    /// `as_possible` the change only applies when the result stays in range;
    /// with it the result is clamped.
    pub fn change(&mut self, amount: f32, as_possible: bool) -> bool {
        if self.locked {
            return false;
        }
        if self.unlimited {
            return true;
        }
        if !as_possible && !self.is_changeable(amount) {
            return false;
        }

        self.value = (self.value + amount).clamp(self.min, self.max);
        true
    }

    /// Apply `regenerate_rate * dt` if regeneration is enabled.
    ///
    /// Returns `false` only when regeneration is disabled; a change
    /// rejected for leaving the range still counts as a regeneration step.
    pub fn regenerate(&mut self, dt: f32) -> bool {
        if !self.regenerating {
            return false;
        }
        self.change(self.regenerate_rate * dt, false);
        true
    }

    /// Restore the startup value and unlock
    pub fn reset(&mut self) {
        self.value = self.start;
        self.locked = false;
    }
}

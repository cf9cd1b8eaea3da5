//! Cooperative one-shot timers
//!
//! The scheduler never runs callbacks itself. Each tick the owner calls
//! [`Scheduler::advance`] and receives the payloads that became due, in due
//! order (ties keep scheduling order), and acts on them on its own thread.

use serde::{Deserialize, Serialize};

/// Cancellable handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

#[derive(Debug)]
struct Pending<T> {
    handle: TimerHandle,
    due: f64,
    payload: T,
}

/// One-shot timer queue advanced by simulated time
#[derive(Debug)]
pub struct Scheduler<T> {
    now: f64,
    next_handle: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_handle: 0,
            pending: Vec::new(),
        }
    }

    /// Current simulated time in seconds
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Schedule `payload` to fire after `delay` seconds.
    ///
    /// A negative delay schedules nothing and returns `None`.
    pub fn schedule(&mut self, delay: f32, payload: T) -> Option<TimerHandle> {
        if delay < 0.0 {
            return None;
        }

        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push(Pending {
            handle,
            due: self.now + delay as f64,
            payload,
        });
        log::trace!("timer {:?} scheduled in {}s", handle, delay);
        Some(handle)
    }

    /// Cancel a timer, returning its payload if it was still pending
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        let index = self.pending.iter().position(|p| p.handle == handle)?;
        Some(self.pending.remove(index).payload)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    /// Seconds left before `handle` fires
    pub fn remaining(&self, handle: TimerHandle) -> Option<f32> {
        self.pending
            .iter()
            .find(|p| p.handle == handle)
            .map(|p| (p.due - self.now).max(0.0) as f32)
    }

    /// Advance time by `dt` and drain every payload that became due
    pub fn advance(&mut self, dt: f32) -> Vec<T> {
        self.now += dt.max(0.0) as f64;

        let now = self.now;
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].due <= now {
                due.push(self.pending.remove(index));
            } else {
                index += 1;
            }
        }

        // Stable: equal due times keep insertion order
        due.sort_by(|a, b| a.due.total_cmp(&b.due));
        due.into_iter().map(|p| p.payload).collect()
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fires_when_due() {
        let mut timers = Scheduler::new();
        let handle = timers.schedule(0.5, 1).unwrap();

        assert!(timers.advance(0.25).is_empty());
        assert!(timers.is_pending(handle));
        assert_relative_eq!(timers.remaining(handle).unwrap(), 0.25);

        assert_eq!(timers.advance(0.25), vec![1]);
        assert!(!timers.is_pending(handle));
        assert!(timers.is_empty());
    }

    #[test]
    fn test_negative_delay_schedules_nothing() {
        let mut timers = Scheduler::new();
        assert!(timers.schedule(-1.0, ()).is_none());
        assert!(timers.is_empty());
    }

    #[test]
    fn test_zero_delay_fires_next_advance() {
        let mut timers = Scheduler::new();
        timers.schedule(0.0, "now");
        assert_eq!(timers.advance(0.0), vec!["now"]);
    }

    #[test]
    fn test_cancel() {
        let mut timers = Scheduler::new();
        let handle = timers.schedule(1.0, "a").unwrap();
        assert_eq!(timers.cancel(handle), Some("a"));
        assert_eq!(timers.cancel(handle), None);
        assert!(timers.advance(2.0).is_empty());
    }

    #[test]
    fn test_due_order_then_insertion_order() {
        let mut timers = Scheduler::new();
        timers.schedule(1.0, "late");
        timers.schedule(0.5, "first");
        timers.schedule(0.5, "second");
        assert_eq!(timers.advance(1.0), vec!["first", "second", "late"]);
    }
}

//! Typed identifiers

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create from a raw value
            #[inline]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw value
            #[inline]
            pub const fn raw(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

typed_id!(
    /// Identifier of a simulated entity
    EntityId,
    "e"
);

typed_id!(
    /// Identifier of a searching area, used as the key of captured target lists
    AreaId,
    "a"
);

typed_id!(
    /// Identifier of a shared waypoint
    PointId,
    "p"
);

/// Thread-safe monotonic id generator
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a generator starting at zero
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a generator starting at `first`
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Next raw value
    pub fn next_raw(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Next id converted into any typed id
    pub fn next<T: From<u64>>(&self) -> T {
        T::from(self.next_raw())
    }

    /// Reserve ids below `floor`, so later calls never return them
    pub fn reserve_below(&self, floor: u64) {
        self.next.fetch_max(floor, Ordering::Relaxed);
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_is_monotonic() {
        let gen = IdGenerator::new();
        let a: EntityId = gen.next();
        let b: EntityId = gen.next();
        assert_eq!(a.raw() + 1, b.raw());
    }

    #[test]
    fn test_reserve_below() {
        let gen = IdGenerator::new();
        gen.reserve_below(10);
        let id: AreaId = gen.next();
        assert_eq!(id, AreaId(10));
        gen.reserve_below(5);
        assert_eq!(gen.next_raw(), 11);
    }

    #[test]
    fn test_display() {
        assert_eq!(EntityId(3).to_string(), "e3");
        assert_eq!(format!("{:?}", PointId(7)), "PointId(7)");
    }
}

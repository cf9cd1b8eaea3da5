//! # lazybot_core - LazyBot Core
//!
//! Shared primitives used by every LazyBot crate:
//! - **Ids**: typed identifiers for entities, areas and waypoints
//! - **Errors**: the structural error taxonomy surfaced to callers
//! - **Values**: tagged property values stored in target snapshots
//! - **Scheduler**: cancellable one-shot timers driven by the tick loop
//! - **Collaborators**: audio sink and transform contracts implemented by the host
//!
//! ## Example
//!
//! ```ignore
//! use lazybot_core::prelude::*;
//!
//! let mut timers: Scheduler<&str> = Scheduler::new();
//! let handle = timers.schedule(0.5, "wake").unwrap();
//! assert!(timers.advance(0.25).is_empty());
//! assert_eq!(timers.advance(0.25), vec!["wake"]);
//! assert!(!timers.is_pending(handle));
//! ```

pub mod audio;
pub mod error;
pub mod id;
pub mod scheduler;
pub mod transform;
pub mod value;

pub use audio::*;
pub use error::*;
pub use id::*;
pub use scheduler::*;
pub use transform::*;
pub use value::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::audio::{AudioRequest, AudioSink, PlaybackHandle, SpatialParams};
    pub use crate::error::{Error, Result};
    pub use crate::id::{AreaId, EntityId, IdGenerator, PointId};
    pub use crate::scheduler::{Scheduler, TimerHandle};
    pub use crate::transform::Transform;
    pub use crate::value::{PropertyId, PropertyValue};
    pub use glam::{Quat, Vec3};
}

//! # lazybot_combat - Entity Resources
//!
//! Health and stamina for simulated entities.
//!
//! ## Features
//!
//! - **Bounded resources**: values clamped to `[min, max]` unless unlimited
//! - **Locking**: locked resources reject every change
//! - **Regeneration**: per-second rate applied each tick
//! - **Death**: terminal transition when health drops to its low threshold
//!
//! ## Example
//!
//! ```ignore
//! use lazybot_combat::prelude::*;
//!
//! let mut behaviour = EntityBehaviour::new(
//!     FloatEntityData::new(100.0, 0.0, 100.0).with_low(10.0),
//!     FloatEntityData::new(50.0, 0.0, 50.0).with_regeneration(5.0),
//! );
//!
//! behaviour.damage(95.0);
//! assert!(behaviour.is_dead());
//! assert!(!behaviour.do_stamina_action(1.0));
//! ```

pub mod behaviour;
pub mod error;
pub mod resource;

pub use behaviour::*;
pub use error::*;
pub use resource::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::behaviour::{BehaviourEvent, EntityBehaviour};
    pub use crate::error::{ResourceError, Result};
    pub use crate::resource::FloatEntityData;
}

//! # lazybot_ai - Entity Decision Making
//!
//! The state machine at the heart of every LazyBot entity.
//!
//! ## Features
//!
//! - **Dual-tier state machine**: concurrent steady states plus one exclusive
//!   state chosen by priority and check-on masks
//! - **Sleep and block**: timed suspension of transitions via cooperative timers
//! - **Navigation**: waypoint containers with sequential, random and
//!   priority-nearness destination policies
//! - **Target tracking**: per-type, per-area snapshots with lazy fill
//! - **Entity registry**: property providers and periodic dead-entity sweeps
//!
//! ## Example
//!
//! ```ignore
//! use lazybot_ai::prelude::*;
//!
//! let agent = EntityAgent::new(id, behaviour, Box::new(mover))
//!     .with_navigation(path);
//!
//! let mut controller = EntityController::new(agent)
//!     .with_exclusive(EntityState::new(patrol).with_check_on(IntMask::parse("1")))
//!     .with_exclusive(EntityState::new(attack).with_priority(10).with_check_on(IntMask::parse("0")));
//!
//! controller.tick(1.0 / 60.0);
//! ```

pub mod agent;
pub mod controller;
pub mod error;
pub mod int_mask;
pub mod navigation;
pub mod registry;
pub mod state;
pub mod targets;

pub use agent::*;
pub use controller::*;
pub use error::*;
pub use int_mask::*;
pub use navigation::*;
pub use registry::*;
pub use state::*;
pub use targets::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::{EntityAgent, Mover, StaticMover};
    pub use crate::controller::EntityController;
    pub use crate::error::FillError;
    pub use crate::int_mask::IntMask;
    pub use crate::navigation::{
        DestinationPolicy, IntermediatePoint, NavigationContainer, NavigationPoint, PointAction,
        PointType, PolicyKind, PriorityNearness, Sequential, SharedPoint,
    };
    pub use crate::registry::{EntityManager, PropertyProvider, HEALTH, POSITION, STAMINA};
    pub use crate::state::{EntityState, StateAction, StateBehaviour};
    pub use crate::targets::{FillFn, Target, TargetContainer, TargetInfo, TargetType};
}

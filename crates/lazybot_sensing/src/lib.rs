//! # lazybot_sensing - Detection and Searching
//!
//! How entities are sensed and how they sense others.
//!
//! ## Features
//!
//! - **Detection areas**: per-entity probes with Enabled/Found/Disabled state
//!   and one-tick decay of the Found status
//! - **Damage and sound links**: callbacks installed by the owner, scaled per area
//! - **Searching areas**: periodic scans over tagged candidates
//! - **Validator chains**: distance, field of view, line of sight, layer, activity
//!
//! ## Example
//!
//! ```ignore
//! use lazybot_sensing::prelude::*;
//!
//! let mut view = SearchingArea::new(AreaId(0), EntityId(1), AreaData::new(10.0, 90.0))
//!     .with_target_type("enemy")
//!     .with_update_rate(0.25)
//!     .with_validators(ValidatorKind::standard_chain());
//!
//! if let Some(report) = view.tick(dt, &world) {
//!     for hit in &report.hits {
//!         println!("saw {}", hit.entity);
//!     }
//! }
//! ```

pub mod detection;
pub mod host;
pub mod searching;
pub mod validator;

pub use detection::*;
pub use host::*;
pub use searching::*;
pub use validator::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::detection::{
        DamageLink, DetectionArea, DetectionAreaContainer, DetectionState, SoundLink,
    };
    pub use crate::host::SpatialQuery;
    pub use crate::searching::{AreaData, ObservationType, ScanReport, SearchingArea, TargetHit};
    pub use crate::validator::{DetectionValidator, Probe, Searcher, ValidatorKind};
    pub use lazybot_core::{AreaId, EntityId};
}

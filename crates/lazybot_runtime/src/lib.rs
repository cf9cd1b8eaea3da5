//! # lazybot_runtime - Headless LazyBot World
//!
//! Everything needed to run LazyBot entities without an engine.
//!
//! ## Features
//!
//! - **Scene files**: TOML or JSON descriptions of waypoints, obstacles,
//!   target types and entities
//! - **World loop**: entity ticks, periodic scans, detection decay and
//!   dead-entity sweeps in a fixed order
//! - **Built-in states**: idle, patrol, attack and alert
//! - **Kinematic mover**: turn-then-walk movement on the ground plane
//! - **Logging audio sink**: records clip requests instead of playing them
//!
//! ## Example
//!
//! ```ignore
//! use lazybot_runtime::prelude::*;
//!
//! let scene = load_scene("scenes/demo.toml")?;
//! let mut world = World::from_config(&scene)?;
//! world.run(600);
//!
//! for entity in world.summary() {
//!     println!("{} is {}", entity.name, entity.state);
//! }
//! ```

pub mod audio;
pub mod config;
pub mod kinematic;
pub mod states;
pub mod world;

pub use audio::*;
pub use config::*;
pub use kinematic::*;
pub use states::*;
pub use world::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::audio::{AudioEvent, AudioJournal, LoggingAudioSink};
    pub use crate::config::{load_scene, parse_scene, parse_scene_json, ConfigError, SceneConfig};
    pub use crate::kinematic::KinematicMover;
    pub use crate::states::{build_state, AlertState, AttackState, IdleState, PatrolState};
    pub use crate::world::{EntitySummary, Obstacle, World};
}

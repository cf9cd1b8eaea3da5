//! Agent error types

use lazybot_core::EntityId;
use thiserror::Error;

/// Failures while resolving deferred target data
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FillError {
    #[error("entity {0} no longer exists")]
    EntityGone(EntityId),

    #[error("{0}")]
    Other(String),
}

//! Resource configuration errors

use thiserror::Error;

/// Errors raised when a resource is configured inconsistently
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResourceError {
    #[error("resource range is empty: min {min} > max {max}")]
    InvalidRange { min: f32, max: f32 },

    #[error("start value {start} outside [{min}, {max}]")]
    StartOutOfRange { start: f32, min: f32, max: f32 },
}

/// Result type for resource configuration
pub type Result<T> = std::result::Result<T, ResourceError>;

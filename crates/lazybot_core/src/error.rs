//! Structural errors shared by the LazyBot crates

use thiserror::Error;

/// Errors that indicate a misconfigured scene and must reach the caller.
///
/// Validation rejections and failed lazy target fills are not errors;
/// they are reported as plain `bool` outcomes where they happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Operation requires at least one element
    #[error("operation on empty {0}")]
    EmptyContainer(&'static str),

    /// Explicit index outside the valid range
    #[error("index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A required linked object is absent
    #[error("missing reference: {0}")]
    ReferenceMissing(String),
}

impl Error {
    /// Fails with [`Error::IndexOutOfRange`] unless `index < len`
    pub fn check_index(index: usize, len: usize) -> Result<()> {
        if index < len {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange { index, len })
        }
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

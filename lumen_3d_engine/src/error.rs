//! Error types for the Lumen3D engine
//!
//! Recoverable failures only. Contract violations (unbound pins, pin indices
//! out of range, null handles) are panics, not errors.

use std::fmt;

/// Result type for Lumen3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lumen3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error reported by the render engine or resource factory
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (unknown handle, unknown technique, bad descriptor)
    InvalidResource(String),

    /// Initialization failed (engine context, stage construction)
    InitializationFailed(String),

    /// Post-process graph wiring is invalid (cycle, several writers for one slot)
    GraphError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::GraphError(msg) => write!(f, "Post-process graph error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

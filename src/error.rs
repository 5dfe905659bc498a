//! # Error types
//!
//! Two layers of errors exist in this crate:
//!
//! - [`EngineError`] is raised by an [`Engine`](crate::engine::Engine)
//!   implementation. These errors belong to the native side and are passed
//!   through to the caller untouched.
//! - [`ComputeError`] is raised by the configuration layer itself when user
//!   input fails validation, and wraps engine errors transparently.

use thiserror::Error;

/// Errors reported by the analysis engine
///
/// The configuration layer never translates these, it only forwards them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The accumulator was asked to drop a type it never tracked
    #[error("accumulator {accumulator} does not track type '{type_id}'")]
    UntrackedType { accumulator: u64, type_id: String },

    /// The accumulator handle is not known to the engine
    #[error("unknown accumulator handle {0}")]
    UnknownAccumulator(u64),

    /// The trajectory handle is not known to the engine
    #[error("unknown trajectory handle {0}")]
    UnknownTrajectory(u64),

    /// The accumulator does not support the requested instruction
    #[error("{kind} accumulator does not support {instruction}")]
    Unsupported {
        kind: &'static str,
        instruction: &'static str,
    },

    /// Failure injected into a recording engine
    #[error("injected failure in {0}")]
    Injected(&'static str),
}

/// Errors raised while creating or configuring a compute
#[derive(Error, Debug)]
pub enum ComputeError {
    /// A parameter had the wrong kind of value, e.g. a non-boolean weighting flag
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A type was removed that was never added
    #[error("type '{type_id}' is not selected in compute '{compute}'")]
    NotFound { compute: String, type_id: String },

    /// An explicit compute name is already registered on the trajectory
    #[error("a compute named '{0}' is already registered on this trajectory")]
    NameCollision(String),

    /// The trajectory that owned the compute has been dropped
    #[error("compute '{0}' is detached from its trajectory")]
    Detached(String),

    /// Errors coming from the analysis engine
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// An analysis plan could not be parsed
    #[error("plan parse error: {0}")]
    Plan(#[from] toml::de::Error),

    /// I/O errors while reading an analysis plan
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the configuration layer
pub type Result<T> = std::result::Result<T, ComputeError>;

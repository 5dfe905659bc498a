//! # trajcompute - analysis compute configuration for MD trajectories
//!
//! `trajcompute` sets up analysis computes (density profiles, mean squared
//! displacement) on a molecular dynamics trajectory and hands the numerical
//! work to an external analysis engine.
//!
//! ## Features
//!
//! - Registry-driven compute creation with automatic, monotonically increasing names
//! - Configurable policy for explicit name collisions
//! - Rust-side mirror of each compute's configuration, replayable onto a new trajectory
//! - Engine boundary as a trait, with a recording engine for dry runs and tests
//! - TOML analysis plans
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use trajcompute::{Compute, ComputeRegistry, DensityProfileOptions, RecordingEngine, Trajectory};
//!
//! let engine = Rc::new(RecordingEngine::new());
//! let trajectory = Trajectory::new(engine.clone(), engine.open_trajectory("run-1"));
//! let mut registry = ComputeRegistry::new();
//!
//! let mut profile = registry
//!     .density(&trajectory, DensityProfileOptions::new().bins([0, 0, 100]).types(["O"]))
//!     .unwrap();
//! assert_eq!(profile.name(), "0");
//!
//! // Move the same configuration onto another trajectory
//! let rerun = Trajectory::new(engine.clone(), engine.open_trajectory("run-2"));
//! profile.construct(&rerun).unwrap();
//! assert!(rerun.has_compute("0"));
//! ```

// Compute surface and the concrete computes
pub use compute::{Compute, ComputeDescriptor, ComputeKind, TypeSelection};
pub use density::{DensityProfile, DensityProfileOptions};
// Native engine boundary and the recording backend
pub use engine::{
    AccumulatorHandle, AccumulatorKind, AccumulatorRecord, Engine, Instruction, Operation,
    RecordingEngine, TrajectoryHandle,
};
// Errors
pub use error::{ComputeError, EngineError, Result};
// Plans, registry and trajectory context
pub use plan::{AnalysisPlan, ComputeSpec};
pub use registry::{CollisionPolicy, ComputeRegistry, RegistryConfig};
pub use trajectory::Trajectory;

// The 'msd' feature enables the mean squared displacement compute
#[cfg(feature = "msd")]
pub use msd::{MeanSquaredDisplacement, MsdOptions};

// Modules
pub mod compute;
pub mod density;
pub mod engine;
pub mod error;
pub mod plan;
pub mod registry;
pub mod trajectory;

#[cfg(feature = "msd")]
pub mod msd;

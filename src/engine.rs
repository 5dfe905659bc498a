//! # Analysis engine boundary
//!
//! The numerical work of every compute (binning, displacement sums, result
//! files) happens inside an external analysis engine. This module defines the
//! narrow surface the configuration layer talks to:
//!
//! - [`Engine`] creates native accumulators on a trajectory, forwards type and
//!   weighting instructions to them, and registers them under a name.
//! - [`TrajectoryHandle`] and [`AccumulatorHandle`] are opaque native handles.
//! - [`RecordingEngine`] is an in-process implementation that keeps a log of
//!   every instruction it accepted and the state each accumulator would hold.
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use trajcompute::{ComputeRegistry, DensityProfileOptions, RecordingEngine, Trajectory};
//!
//! let engine = Rc::new(RecordingEngine::new());
//! let trajectory = Trajectory::new(engine.clone(), engine.open_trajectory("water"));
//!
//! let mut registry = ComputeRegistry::new();
//! registry
//!     .density(&trajectory, DensityProfileOptions::new().types(["O"]))
//!     .unwrap();
//!
//! assert!(!engine.instructions().is_empty());
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use glam::UVec3;
use indexmap::IndexMap;

use crate::error::EngineError;

/// Result alias for engine calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Opaque handle to a native trajectory context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrajectoryHandle(u64);

impl TrajectoryHandle {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrajectoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "traj#{}", self.0)
    }
}

/// Opaque handle to a native accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccumulatorHandle(u64);

impl AccumulatorHandle {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccumulatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acc#{}", self.0)
    }
}

/// The native analysis engine
///
/// All methods take `&self`; implementations own their interior state.
/// Errors are returned as-is to the caller of the compute operation that
/// triggered them.
pub trait Engine {
    /// Short name for log output
    fn backend_name(&self) -> &str;

    /// Create a density-profile accumulator bound to `trajectory`
    fn create_density_profile(
        &self,
        trajectory: TrajectoryHandle,
        file_name: &str,
        bins: UVec3,
    ) -> EngineResult<AccumulatorHandle>;

    /// Create a mean-squared-displacement accumulator bound to `trajectory`
    fn create_mean_squared_displacement(
        &self,
        trajectory: TrajectoryHandle,
        file_name: &str,
        origins: u32,
    ) -> EngineResult<AccumulatorHandle>;

    /// Track an additional particle type
    fn add_type(&self, accumulator: AccumulatorHandle, type_id: &str) -> EngineResult<()>;

    /// Stop tracking a particle type; fails if the type is not tracked
    fn delete_type(&self, accumulator: AccumulatorHandle, type_id: &str) -> EngineResult<()>;

    /// Enable or disable mass weighting
    fn set_mass_weighting(&self, accumulator: AccumulatorHandle, enabled: bool)
        -> EngineResult<()>;

    /// Attach the accumulator to the trajectory's compute collection under `name`
    ///
    /// A second registration under the same name replaces the first.
    fn register_compute(
        &self,
        trajectory: TrajectoryHandle,
        accumulator: AccumulatorHandle,
        name: &str,
    ) -> EngineResult<()>;

    /// Detach `name` from the trajectory's compute collection
    ///
    /// Only removes the entry if it still refers to `accumulator`; otherwise a no-op.
    fn unregister_compute(
        &self,
        trajectory: TrajectoryHandle,
        accumulator: AccumulatorHandle,
        name: &str,
    ) -> EngineResult<()>;
}

/// Operations of the [`Engine`] trait, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    AddType,
    DeleteType,
    SetMassWeighting,
    Register,
    Unregister,
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::AddType => "add_type",
            Operation::DeleteType => "delete_type",
            Operation::SetMassWeighting => "set_mass_weighting",
            Operation::Register => "register_compute",
            Operation::Unregister => "unregister_compute",
        }
    }
}

/// An instruction accepted by a [`RecordingEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    CreateDensityProfile {
        trajectory: TrajectoryHandle,
        accumulator: AccumulatorHandle,
        file_name: String,
        bins: UVec3,
    },
    CreateMeanSquaredDisplacement {
        trajectory: TrajectoryHandle,
        accumulator: AccumulatorHandle,
        file_name: String,
        origins: u32,
    },
    AddType {
        accumulator: AccumulatorHandle,
        type_id: String,
    },
    DeleteType {
        accumulator: AccumulatorHandle,
        type_id: String,
    },
    SetMassWeighting {
        accumulator: AccumulatorHandle,
        enabled: bool,
    },
    RegisterCompute {
        trajectory: TrajectoryHandle,
        accumulator: AccumulatorHandle,
        name: String,
    },
    UnregisterCompute {
        trajectory: TrajectoryHandle,
        accumulator: AccumulatorHandle,
        name: String,
    },
}

impl Instruction {
    /// The accumulator this instruction targets
    pub fn accumulator(&self) -> AccumulatorHandle {
        match self {
            Instruction::CreateDensityProfile { accumulator, .. }
            | Instruction::CreateMeanSquaredDisplacement { accumulator, .. }
            | Instruction::AddType { accumulator, .. }
            | Instruction::DeleteType { accumulator, .. }
            | Instruction::SetMassWeighting { accumulator, .. }
            | Instruction::RegisterCompute { accumulator, .. }
            | Instruction::UnregisterCompute { accumulator, .. } => *accumulator,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::CreateDensityProfile {
                trajectory,
                accumulator,
                file_name,
                bins,
            } => write!(
                f,
                "{accumulator} = DensityProfile({trajectory}, \"{file_name}\", [{}, {}, {}])",
                bins.x, bins.y, bins.z
            ),
            Instruction::CreateMeanSquaredDisplacement {
                trajectory,
                accumulator,
                file_name,
                origins,
            } => write!(
                f,
                "{accumulator} = MeanSquaredDisplacement({trajectory}, \"{file_name}\", {origins})"
            ),
            Instruction::AddType {
                accumulator,
                type_id,
            } => write!(f, "{accumulator}.add_type(\"{type_id}\")"),
            Instruction::DeleteType {
                accumulator,
                type_id,
            } => write!(f, "{accumulator}.delete_type(\"{type_id}\")"),
            Instruction::SetMassWeighting {
                accumulator,
                enabled,
            } => write!(f, "{accumulator}.set_mass_weighting({enabled})"),
            Instruction::RegisterCompute {
                trajectory,
                accumulator,
                name,
            } => write!(f, "{trajectory}.register_compute({accumulator}, \"{name}\")"),
            Instruction::UnregisterCompute {
                trajectory,
                accumulator,
                name,
            } => write!(f, "{trajectory}.unregister_compute({accumulator}, \"{name}\")"),
        }
    }
}

/// Kind-specific parameters of a recorded accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorKind {
    DensityProfile { bins: UVec3 },
    MeanSquaredDisplacement { origins: u32 },
}

impl AccumulatorKind {
    fn label(&self) -> &'static str {
        match self {
            AccumulatorKind::DensityProfile { .. } => "density profile",
            AccumulatorKind::MeanSquaredDisplacement { .. } => "mean squared displacement",
        }
    }
}

/// Snapshot of the state a native accumulator holds
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatorRecord {
    pub kind: AccumulatorKind,
    pub trajectory: TrajectoryHandle,
    pub file_name: String,
    /// Tracked types in the order they were added
    pub types: Vec<String>,
    pub mass_weighting: bool,
}

#[derive(Debug, Default)]
struct TrajectoryRecord {
    label: String,
    computes: IndexMap<String, AccumulatorHandle>,
}

#[derive(Debug, Default)]
struct RecorderState {
    next_trajectory: u64,
    next_accumulator: u64,
    trajectories: HashMap<u64, TrajectoryRecord>,
    accumulators: HashMap<u64, AccumulatorRecord>,
    log: Vec<Instruction>,
    fail_on: Option<Operation>,
}

impl RecorderState {
    fn check_injected(&mut self, op: Operation) -> EngineResult<()> {
        if self.fail_on == Some(op) {
            self.fail_on = None;
            return Err(EngineError::Injected(op.label()));
        }
        Ok(())
    }

    fn create(
        &mut self,
        trajectory: TrajectoryHandle,
        file_name: &str,
        kind: AccumulatorKind,
    ) -> EngineResult<AccumulatorHandle> {
        self.check_injected(Operation::Create)?;
        if !self.trajectories.contains_key(&trajectory.id()) {
            return Err(EngineError::UnknownTrajectory(trajectory.id()));
        }

        let accumulator = AccumulatorHandle(self.next_accumulator);
        self.next_accumulator += 1;
        self.accumulators.insert(
            accumulator.id(),
            AccumulatorRecord {
                kind,
                trajectory,
                file_name: file_name.to_string(),
                types: Vec::new(),
                mass_weighting: false,
            },
        );

        let instruction = match kind {
            AccumulatorKind::DensityProfile { bins } => Instruction::CreateDensityProfile {
                trajectory,
                accumulator,
                file_name: file_name.to_string(),
                bins,
            },
            AccumulatorKind::MeanSquaredDisplacement { origins } => {
                Instruction::CreateMeanSquaredDisplacement {
                    trajectory,
                    accumulator,
                    file_name: file_name.to_string(),
                    origins,
                }
            }
        };
        self.log.push(instruction);
        Ok(accumulator)
    }

    fn record_mut(
        &mut self,
        accumulator: AccumulatorHandle,
    ) -> EngineResult<&mut AccumulatorRecord> {
        self.accumulators
            .get_mut(&accumulator.id())
            .ok_or(EngineError::UnknownAccumulator(accumulator.id()))
    }
}

/// An engine that records instructions instead of computing anything
///
/// Accumulators behave like their native counterparts as far as bookkeeping
/// goes: adding a tracked type is a no-op, deleting an untracked type fails,
/// and mass weighting is only accepted by density profiles.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    state: RefCell<RecorderState>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an empty trajectory context labelled `label`
    pub fn open_trajectory(&self, label: &str) -> TrajectoryHandle {
        let mut state = self.state.borrow_mut();
        let handle = TrajectoryHandle(state.next_trajectory);
        state.next_trajectory += 1;
        state.trajectories.insert(
            handle.id(),
            TrajectoryRecord {
                label: label.to_string(),
                computes: IndexMap::new(),
            },
        );
        handle
    }

    /// Label given to a trajectory when it was opened
    pub fn trajectory_label(&self, trajectory: TrajectoryHandle) -> Option<String> {
        self.state
            .borrow()
            .trajectories
            .get(&trajectory.id())
            .map(|t| t.label.clone())
    }

    /// Every instruction accepted so far, in order
    pub fn instructions(&self) -> Vec<Instruction> {
        self.state.borrow().log.clone()
    }

    /// Instructions that targeted one accumulator
    pub fn instructions_for(&self, accumulator: AccumulatorHandle) -> Vec<Instruction> {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|i| i.accumulator() == accumulator)
            .cloned()
            .collect()
    }

    /// Current state of an accumulator
    pub fn accumulator(&self, accumulator: AccumulatorHandle) -> Option<AccumulatorRecord> {
        self.state
            .borrow()
            .accumulators
            .get(&accumulator.id())
            .cloned()
    }

    /// Computes registered on a trajectory, by name
    pub fn registered(&self, trajectory: TrajectoryHandle) -> Vec<(String, AccumulatorHandle)> {
        self.state
            .borrow()
            .trajectories
            .get(&trajectory.id())
            .map(|t| t.computes.iter().map(|(n, a)| (n.clone(), *a)).collect())
            .unwrap_or_default()
    }

    /// Make the next call of `op` fail with [`EngineError::Injected`]
    pub fn fail_on(&self, op: Operation) {
        self.state.borrow_mut().fail_on = Some(op);
    }
}

impl Engine for RecordingEngine {
    fn backend_name(&self) -> &str {
        "recording"
    }

    fn create_density_profile(
        &self,
        trajectory: TrajectoryHandle,
        file_name: &str,
        bins: UVec3,
    ) -> EngineResult<AccumulatorHandle> {
        self.state
            .borrow_mut()
            .create(trajectory, file_name, AccumulatorKind::DensityProfile { bins })
    }

    fn create_mean_squared_displacement(
        &self,
        trajectory: TrajectoryHandle,
        file_name: &str,
        origins: u32,
    ) -> EngineResult<AccumulatorHandle> {
        self.state.borrow_mut().create(
            trajectory,
            file_name,
            AccumulatorKind::MeanSquaredDisplacement { origins },
        )
    }

    fn add_type(&self, accumulator: AccumulatorHandle, type_id: &str) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.check_injected(Operation::AddType)?;
        let record = state.record_mut(accumulator)?;
        if !record.types.iter().any(|t| t == type_id) {
            record.types.push(type_id.to_string());
        }
        state.log.push(Instruction::AddType {
            accumulator,
            type_id: type_id.to_string(),
        });
        Ok(())
    }

    fn delete_type(&self, accumulator: AccumulatorHandle, type_id: &str) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.check_injected(Operation::DeleteType)?;
        let record = state.record_mut(accumulator)?;
        let Some(pos) = record.types.iter().position(|t| t == type_id) else {
            return Err(EngineError::UntrackedType {
                accumulator: accumulator.id(),
                type_id: type_id.to_string(),
            });
        };
        record.types.remove(pos);
        state.log.push(Instruction::DeleteType {
            accumulator,
            type_id: type_id.to_string(),
        });
        Ok(())
    }

    fn set_mass_weighting(
        &self,
        accumulator: AccumulatorHandle,
        enabled: bool,
    ) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.check_injected(Operation::SetMassWeighting)?;
        let record = state.record_mut(accumulator)?;
        if let AccumulatorKind::MeanSquaredDisplacement { .. } = record.kind {
            return Err(EngineError::Unsupported {
                kind: record.kind.label(),
                instruction: "mass weighting",
            });
        }
        record.mass_weighting = enabled;
        state.log.push(Instruction::SetMassWeighting {
            accumulator,
            enabled,
        });
        Ok(())
    }

    fn register_compute(
        &self,
        trajectory: TrajectoryHandle,
        accumulator: AccumulatorHandle,
        name: &str,
    ) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.check_injected(Operation::Register)?;
        if !state.accumulators.contains_key(&accumulator.id()) {
            return Err(EngineError::UnknownAccumulator(accumulator.id()));
        }
        let record = state
            .trajectories
            .get_mut(&trajectory.id())
            .ok_or(EngineError::UnknownTrajectory(trajectory.id()))?;
        record.computes.insert(name.to_string(), accumulator);
        state.log.push(Instruction::RegisterCompute {
            trajectory,
            accumulator,
            name: name.to_string(),
        });
        Ok(())
    }

    fn unregister_compute(
        &self,
        trajectory: TrajectoryHandle,
        accumulator: AccumulatorHandle,
        name: &str,
    ) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.check_injected(Operation::Unregister)?;
        let record = state
            .trajectories
            .get_mut(&trajectory.id())
            .ok_or(EngineError::UnknownTrajectory(trajectory.id()))?;
        // Someone else registered under this name since
        if record.computes.get(name) != Some(&accumulator) {
            return Ok(());
        }
        record.computes.shift_remove(name);
        state.log.push(Instruction::UnregisterCompute {
            trajectory,
            accumulator,
            name: name.to_string(),
        });
        Ok(())
    }
}

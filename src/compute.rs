//! # Compute descriptors
//!
//! Shared pieces of every analysis compute: the [`ComputeDescriptor`] (name,
//! output file, binding to a trajectory and its native accumulator), the
//! ordered [`TypeSelection`] mirror, and the object-safe [`Compute`] trait.

use std::fmt;
use std::rc::Weak;

use indexmap::IndexSet;
use tracing::debug;

use crate::engine::{AccumulatorHandle, Engine};
use crate::error::{ComputeError, Result};
use crate::registry::CollisionPolicy;
use crate::trajectory::{Trajectory, TrajectoryInner};

/// The kinds of compute this crate can configure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeKind {
    DensityProfile,
    MeanSquaredDisplacement,
}

impl fmt::Display for ComputeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeKind::DensityProfile => write!(f, "density"),
            ComputeKind::MeanSquaredDisplacement => write!(f, "msd"),
        }
    }
}

/// Name, output file and native binding of a compute
#[derive(Debug)]
pub struct ComputeDescriptor {
    name: String,
    file_name: String,
    trajectory: Weak<TrajectoryInner>,
    accumulator: AccumulatorHandle,
    policy: CollisionPolicy,
}

impl ComputeDescriptor {
    pub(crate) fn new(
        name: String,
        file_name: String,
        trajectory: &Trajectory,
        accumulator: AccumulatorHandle,
        policy: CollisionPolicy,
    ) -> Self {
        Self {
            name,
            file_name,
            trajectory: trajectory.downgrade(),
            accumulator,
            policy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output file name passed through to the engine
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Native accumulator currently backing this compute
    pub fn accumulator(&self) -> AccumulatorHandle {
        self.accumulator
    }

    /// Owning trajectory, if it is still alive
    pub fn trajectory(&self) -> Option<Trajectory> {
        Trajectory::upgrade(&self.trajectory)
    }

    pub fn is_bound(&self) -> bool {
        self.trajectory.strong_count() > 0
    }

    /// Owning trajectory, or [`ComputeError::Detached`]
    pub(crate) fn bound(&self) -> Result<Trajectory> {
        self.trajectory().ok_or_else(|| ComputeError::Detached(self.name.clone()))
    }

    /// Apply the collision policy before rebinding onto `trajectory`
    ///
    /// Our own registration on the same trajectory never counts as a collision.
    pub(crate) fn check_rebind(&self, trajectory: &Trajectory) -> Result<()> {
        if trajectory.accumulator(&self.name) == Some(self.accumulator)
            && Trajectory::upgrade(&self.trajectory).is_some_and(|t| t.ptr_eq(trajectory))
        {
            return Ok(());
        }
        trajectory.check_name(&self.name, self.policy)
    }

    /// Switch to `accumulator` on `trajectory`, once it is registered there
    ///
    /// The registration left on the previous trajectory is dropped first.
    pub(crate) fn rebind(
        &mut self,
        trajectory: &Trajectory,
        accumulator: AccumulatorHandle,
    ) -> Result<()> {
        // Rebuilding in place already replaced the entry, so this is a no-op there
        if let Some(previous) = self.trajectory() {
            previous.forget(&self.name, self.accumulator)?;
        }
        self.trajectory = trajectory.downgrade();
        self.accumulator = accumulator;
        Ok(())
    }
}

/// Ordered, duplicate-free set of selected particle types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSelection {
    types: IndexSet<String>,
}

impl TypeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains(type_id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.types.iter().cloned().collect()
    }

    /// Forward and record every type not yet selected
    ///
    /// A type is recorded only after the engine accepted it, so an engine error
    /// midway through a batch leaves the earlier types applied.
    pub(crate) fn add<I>(&mut self, descriptor: &ComputeDescriptor, types: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let trajectory = descriptor.bound()?;
        for type_id in types {
            let type_id = type_id.as_ref();
            // Already selected: the engine ignores it too
            if self.types.contains(type_id) {
                continue;
            }
            // Engine first, then the mirror
            trajectory
                .engine()
                .add_type(descriptor.accumulator(), type_id)?;
            debug!(compute = descriptor.name(), type_id, "type added");
            self.types.insert(type_id.to_string());
        }
        Ok(())
    }

    /// Forward and record the removal of every listed type
    ///
    /// The whole batch is checked before anything is forwarded: a type that
    /// is not selected, or is listed twice, fails with [`ComputeError::NotFound`].
    pub(crate) fn delete<I>(&mut self, descriptor: &ComputeDescriptor, types: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let trajectory = descriptor.bound()?;

        // Validate the whole batch before touching the engine
        let mut requested: IndexSet<String> = IndexSet::new();
        for type_id in types {
            let type_id = type_id.as_ref();
            if !self.types.contains(type_id) || !requested.insert(type_id.to_string()) {
                return Err(ComputeError::NotFound {
                    compute: descriptor.name().to_string(),
                    type_id: type_id.to_string(),
                });
            }
        }

        // Forward in request order, keeping the order of what remains
        for type_id in &requested {
            trajectory
                .engine()
                .delete_type(descriptor.accumulator(), type_id)?;
            debug!(compute = descriptor.name(), type_id = %type_id, "type deleted");
            self.types.shift_remove(type_id);
        }
        Ok(())
    }

    /// Re-apply every selected type to a fresh accumulator
    pub(crate) fn replay(&self, engine: &dyn Engine, accumulator: AccumulatorHandle) -> Result<()> {
        for type_id in &self.types {
            engine.add_type(accumulator, type_id)?;
        }
        Ok(())
    }
}

/// Common surface of all computes
pub trait Compute {
    fn descriptor(&self) -> &ComputeDescriptor;

    fn kind(&self) -> ComputeKind;

    fn selected_types(&self) -> &TypeSelection;

    /// Rebuild the native accumulator on `trajectory` and replay the full
    /// configuration onto it
    ///
    /// On failure the compute keeps its previous binding.
    fn construct(&mut self, trajectory: &Trajectory) -> Result<()>;

    fn name(&self) -> &str {
        self.descriptor().name()
    }
}

//! # Mean squared displacement compute
//!
//! Measures how far particles of the selected types move away from their
//! position at a set of time origins. A new time origin starts every
//! `origins` frames. The engine writes one result file per selected type.

use tracing::info;

use crate::compute::{Compute, ComputeDescriptor, ComputeKind, TypeSelection};
use crate::error::{ComputeError, Result};
use crate::registry::CollisionPolicy;
use crate::trajectory::Trajectory;

/// Output file name used when none is given
pub const DEFAULT_FILE_NAME: &str = "msd";

/// Options for creating a [`MeanSquaredDisplacement`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsdOptions {
    pub(crate) name: Option<String>,
    file_name: String,
    origins: u32,
    types: Vec<String>,
}

impl Default for MsdOptions {
    fn default() -> Self {
        Self {
            name: None,
            file_name: DEFAULT_FILE_NAME.to_string(),
            origins: 1,
            types: Vec::new(),
        }
    }
}

impl MsdOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Frames between consecutive time origins, at least 1
    pub fn origins(mut self, origins: u32) -> Self {
        self.origins = origins;
        self
    }

    pub fn types<I>(mut self, types: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }
}

/// A configured mean squared displacement
#[derive(Debug)]
pub struct MeanSquaredDisplacement {
    descriptor: ComputeDescriptor,
    origins: u32,
    types: TypeSelection,
}

impl MeanSquaredDisplacement {
    pub(crate) fn create(
        trajectory: &Trajectory,
        name: String,
        policy: CollisionPolicy,
        options: MsdOptions,
    ) -> Result<Self> {
        if options.origins == 0 {
            return Err(ComputeError::InvalidArgument(
                "time origin spacing must be at least 1 frame".to_string(),
            ));
        }
        trajectory.check_name(&name, policy)?;

        let accumulator = trajectory.engine().create_mean_squared_displacement(
            trajectory.handle(),
            &options.file_name,
            options.origins,
        )?;

        let mut msd = Self {
            descriptor: ComputeDescriptor::new(
                name,
                options.file_name,
                trajectory,
                accumulator,
                policy,
            ),
            origins: options.origins,
            types: TypeSelection::new(),
        };
        msd.add_type(&options.types)?;

        trajectory.register(msd.descriptor.name(), accumulator)?;
        Ok(msd)
    }

    pub fn origins(&self) -> u32 {
        self.origins
    }

    /// Select additional types; already selected types are skipped
    pub fn add_type<I>(&mut self, types: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.types.add(&self.descriptor, types)
    }

    /// Deselect types, failing with [`ComputeError::NotFound`] if any is not selected
    pub fn delete_type<I>(&mut self, types: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.types.delete(&self.descriptor, types)
    }
}

impl Compute for MeanSquaredDisplacement {
    fn descriptor(&self) -> &ComputeDescriptor {
        &self.descriptor
    }

    fn kind(&self) -> ComputeKind {
        ComputeKind::MeanSquaredDisplacement
    }

    fn selected_types(&self) -> &TypeSelection {
        &self.types
    }

    fn construct(&mut self, trajectory: &Trajectory) -> Result<()> {
        self.descriptor.check_rebind(trajectory)?;

        // Fresh accumulator on the target trajectory
        let engine = trajectory.engine();
        let accumulator = engine.create_mean_squared_displacement(
            trajectory.handle(),
            self.descriptor.file_name(),
            self.origins,
        )?;
        self.types.replay(&**engine, accumulator)?;
        trajectory.register(self.descriptor.name(), accumulator)?;

        // Swap only once everything above succeeded
        self.descriptor.rebind(trajectory, accumulator)?;
        info!(
            compute = self.descriptor.name(),
            trajectory = %trajectory.handle(),
            %accumulator,
            "mean squared displacement rebuilt"
        );
        Ok(())
    }
}

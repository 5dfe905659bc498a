//! # Density profile compute
//!
//! Bins particle positions along the three box axes and accumulates a number
//! or mass density per bin. The binning itself happens in the engine; this
//! module owns the configuration: bin counts, the selected particle types and
//! whether contributions are weighted by mass.
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use trajcompute::{Compute, ComputeRegistry, DensityProfileOptions, RecordingEngine, Trajectory};
//!
//! let engine = Rc::new(RecordingEngine::new());
//! let trajectory = Trajectory::new(engine.clone(), engine.open_trajectory("water"));
//! let mut registry = ComputeRegistry::new();
//!
//! let mut profile = registry
//!     .density(
//!         &trajectory,
//!         DensityProfileOptions::new()
//!             .bins([1, 1, 50])
//!             .types(["O", "H"])
//!             .weight(Some(true)),
//!     )
//!     .unwrap();
//!
//! profile.delete_type(["H"]).unwrap();
//! profile.mass_weight(None).unwrap();
//!
//! assert_eq!(profile.selected_types().to_vec(), vec!["O".to_string()]);
//! assert!(!profile.mass_weighting_enabled());
//! ```

use glam::UVec3;
use tracing::{debug, info};

use crate::compute::{Compute, ComputeDescriptor, ComputeKind, TypeSelection};
use crate::error::{ComputeError, Result};
use crate::registry::CollisionPolicy;
use crate::trajectory::Trajectory;

/// Output file name used when none is given
pub const DEFAULT_FILE_NAME: &str = "density";

/// Options for creating a [`DensityProfile`]
///
/// Follows the builder pattern; every setter consumes and returns the options.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityProfileOptions {
    pub(crate) name: Option<String>,
    file_name: String,
    bins: UVec3,
    types: Vec<String>,
    weight: Option<bool>,
}

impl Default for DensityProfileOptions {
    fn default() -> Self {
        Self {
            name: None,
            file_name: DEFAULT_FILE_NAME.to_string(),
            bins: UVec3::ZERO,
            types: Vec::new(),
            weight: Some(true),
        }
    }
}

impl DensityProfileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit compute name; an automatic name is used otherwise
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Output file name passed to the engine
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Number of bins along x, y and z
    pub fn bins(mut self, bins: [u32; 3]) -> Self {
        self.bins = UVec3::from_array(bins);
        self
    }

    /// Types selected at creation
    pub fn types<I>(mut self, types: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Mass weighting flag; `None` disables it
    pub fn weight(mut self, weight: Option<bool>) -> Self {
        self.weight = weight;
        self
    }
}

/// A configured density profile
#[derive(Debug)]
pub struct DensityProfile {
    descriptor: ComputeDescriptor,
    bins: UVec3,
    types: TypeSelection,
    mass_weighting: bool,
}

impl DensityProfile {
    /// Create the native accumulator, apply the initial configuration and
    /// register it under `name`
    pub(crate) fn create(
        trajectory: &Trajectory,
        name: String,
        policy: CollisionPolicy,
        options: DensityProfileOptions,
    ) -> Result<Self> {
        trajectory.check_name(&name, policy)?;

        let accumulator = trajectory.engine().create_density_profile(
            trajectory.handle(),
            &options.file_name,
            options.bins,
        )?;

        let mut profile = Self {
            descriptor: ComputeDescriptor::new(
                name,
                options.file_name,
                trajectory,
                accumulator,
                policy,
            ),
            bins: options.bins,
            types: TypeSelection::new(),
            mass_weighting: true,
        };
        profile.add_type(&options.types)?;
        profile.mass_weight(options.weight)?;

        trajectory.register(profile.descriptor.name(), accumulator)?;
        Ok(profile)
    }

    /// Number of bins along x, y and z
    pub fn bins(&self) -> UVec3 {
        self.bins
    }

    pub fn mass_weighting_enabled(&self) -> bool {
        self.mass_weighting
    }

    /// Select additional types; already selected types are skipped
    ///
    /// Scalars must be wrapped: `profile.add_type(["O"])`.
    pub fn add_type<I>(&mut self, types: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.types.add(&self.descriptor, types)
    }

    /// Deselect types
    ///
    /// Fails with [`ComputeError::NotFound`] without changing anything if
    /// any listed type is not selected.
    pub fn delete_type<I>(&mut self, types: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.types.delete(&self.descriptor, types)
    }

    /// Turn mass weighting on or off; `None` turns it off
    pub fn mass_weight(&mut self, weight: Option<bool>) -> Result<()> {
        let enabled = weight.unwrap_or(false);
        let trajectory = self.descriptor.bound()?;
        trajectory
            .engine()
            .set_mass_weighting(self.descriptor.accumulator(), enabled)?;
        debug!(compute = self.descriptor.name(), enabled, "mass weighting set");
        self.mass_weighting = enabled;
        Ok(())
    }

    /// Like [`mass_weight`](Self::mass_weight), for loosely typed input
    ///
    /// Anything other than a boolean or an absent value is rejected with
    /// [`ComputeError::InvalidArgument`] and the current flag is kept.
    pub fn mass_weight_value(&mut self, value: Option<&toml::Value>) -> Result<()> {
        let weight = weight_from_value(value)?;
        self.mass_weight(weight)
    }
}

/// Strict conversion of a loosely typed weighting flag
pub(crate) fn weight_from_value(value: Option<&toml::Value>) -> Result<Option<bool>> {
    match value {
        None => Ok(None),
        Some(toml::Value::Boolean(flag)) => Ok(Some(*flag)),
        Some(other) => Err(ComputeError::InvalidArgument(format!(
            "mass weighting must be true or false, got {}",
            other.type_str()
        ))),
    }
}

impl Compute for DensityProfile {
    fn descriptor(&self) -> &ComputeDescriptor {
        &self.descriptor
    }

    fn kind(&self) -> ComputeKind {
        ComputeKind::DensityProfile
    }

    fn selected_types(&self) -> &TypeSelection {
        &self.types
    }

    fn construct(&mut self, trajectory: &Trajectory) -> Result<()> {
        self.descriptor.check_rebind(trajectory)?;

        // Fresh accumulator on the target trajectory
        let engine = trajectory.engine();
        let accumulator = engine.create_density_profile(
            trajectory.handle(),
            self.descriptor.file_name(),
            self.bins,
        )?;

        // Replay types in selection order, then the weighting flag
        self.types.replay(&**engine, accumulator)?;
        engine.set_mass_weighting(accumulator, self.mass_weighting)?;
        trajectory.register(self.descriptor.name(), accumulator)?;

        // Swap only once everything above succeeded
        self.descriptor.rebind(trajectory, accumulator)?;
        info!(
            compute = self.descriptor.name(),
            trajectory = %trajectory.handle(),
            %accumulator,
            "density profile rebuilt"
        );
        Ok(())
    }
}

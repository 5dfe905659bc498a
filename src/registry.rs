//! # Compute registry
//!
//! [`ComputeRegistry`] is the factory every compute is created through. It
//! owns the counter used to name computes that were not given an explicit
//! name, and the policy applied when an explicit name is already taken on the
//! target trajectory.
//!
//! The registry is an ordinary value: create one at startup and pass it to
//! the code that builds computes. Two registries never share a counter.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::compute::Compute;
use crate::density::{DensityProfile, DensityProfileOptions};
use crate::error::Result;
#[cfg(feature = "msd")]
use crate::msd::{MeanSquaredDisplacement, MsdOptions};
use crate::trajectory::Trajectory;

/// What to do when a compute name is already registered on a trajectory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Register anyway; the engine replaces the earlier compute
    #[default]
    Overwrite,
    /// Fail with [`ComputeError::NameCollision`](crate::ComputeError::NameCollision)
    Reject,
}

/// Registry settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub collision_policy: CollisionPolicy,
}

/// Factory for computes
#[derive(Debug, Default)]
pub struct ComputeRegistry {
    config: RegistryConfig,
    counter: u64,
}

impl ComputeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self { config, counter: 0 }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        self.config.collision_policy
    }

    /// Number of automatic names handed out so far
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Use `name` verbatim, or take the next automatic name
    pub(crate) fn resolve_name(&mut self, name: Option<String>) -> String {
        match name {
            Some(name) => name,
            None => {
                let name = self.counter.to_string();
                self.counter += 1;
                name
            }
        }
    }

    /// Create a density profile bound to `trajectory`
    pub fn density(
        &mut self,
        trajectory: &Trajectory,
        options: DensityProfileOptions,
    ) -> Result<DensityProfile> {
        let policy = self.collision_policy();
        let explicit = options.name.clone();
        let name = self.resolve_name(explicit);
        let profile = DensityProfile::create(trajectory, name, policy, options)?;
        info!(
            compute = profile.name(),
            trajectory = %trajectory.handle(),
            accumulator = %profile.descriptor().accumulator(),
            "density profile created"
        );
        Ok(profile)
    }

    /// Create a mean squared displacement compute bound to `trajectory`
    #[cfg(feature = "msd")]
    pub fn mean_squared_displacement(
        &mut self,
        trajectory: &Trajectory,
        options: MsdOptions,
    ) -> Result<MeanSquaredDisplacement> {
        let policy = self.collision_policy();
        let explicit = options.name.clone();
        let name = self.resolve_name(explicit);
        let msd = MeanSquaredDisplacement::create(trajectory, name, policy, options)?;
        info!(
            compute = msd.name(),
            trajectory = %trajectory.handle(),
            accumulator = %msd.descriptor().accumulator(),
            "mean squared displacement created"
        );
        Ok(msd)
    }
}

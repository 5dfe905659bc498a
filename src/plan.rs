//! # Analysis plans
//!
//! An [`AnalysisPlan`] describes, in TOML, the registry settings and the
//! computes to attach to a trajectory:
//!
//! ```toml
//! [registry]
//! collision_policy = "reject"
//!
//! [[compute]]
//! kind = "density"
//! file_name = "water"
//! bins = [1, 1, 50]
//! types = ["O", "H"]
//! weight = true
//!
//! [[compute]]
//! kind = "msd"
//! origins = 10
//! types = ["O"]
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::compute::Compute;
use crate::density::{self, DensityProfileOptions};
use crate::error::Result;
#[cfg(feature = "msd")]
use crate::msd::MsdOptions;
use crate::registry::{ComputeRegistry, RegistryConfig};
use crate::trajectory::Trajectory;

/// Registry settings plus the computes to create
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisPlan {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default, rename = "compute")]
    pub computes: Vec<ComputeSpec>,
}

/// One `[[compute]]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComputeSpec {
    Density(DensitySpec),
    #[cfg(feature = "msd")]
    Msd(MsdSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DensitySpec {
    pub name: Option<String>,
    pub file_name: Option<String>,
    #[serde(default)]
    pub bins: [u32; 3],
    #[serde(default)]
    pub types: Vec<String>,
    /// Kept loosely typed so a non-boolean can be reported as an invalid argument
    pub weight: Option<toml::Value>,
}

#[cfg(feature = "msd")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MsdSpec {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub origins: Option<u32>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl AnalysisPlan {
    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml(&source)
    }

    /// A fresh registry configured from the `[registry]` table
    pub fn registry(&self) -> ComputeRegistry {
        ComputeRegistry::with_config(self.registry.clone())
    }

    /// Create every compute of the plan on `trajectory`, in order
    ///
    /// Stops at the first compute that fails; computes created before it stay
    /// registered on the trajectory.
    pub fn build(
        &self,
        registry: &mut ComputeRegistry,
        trajectory: &Trajectory,
    ) -> Result<Vec<Box<dyn Compute>>> {
        let mut computes: Vec<Box<dyn Compute>> = Vec::with_capacity(self.computes.len());
        for spec in &self.computes {
            let compute: Box<dyn Compute> = match spec {
                ComputeSpec::Density(spec) => {
                    Box::new(registry.density(trajectory, spec.options()?)?)
                }
                #[cfg(feature = "msd")]
                ComputeSpec::Msd(spec) => {
                    Box::new(registry.mean_squared_displacement(trajectory, spec.options())?)
                }
            };
            computes.push(compute);
        }
        info!(count = computes.len(), trajectory = %trajectory.handle(), "plan built");
        Ok(computes)
    }
}

impl DensitySpec {
    /// Validate the table and turn it into creation options
    pub fn options(&self) -> Result<DensityProfileOptions> {
        let mut options = DensityProfileOptions::new()
            .bins(self.bins)
            .types(self.types.iter().cloned());
        if let Some(name) = &self.name {
            options = options.name(name.clone());
        }
        if let Some(file_name) = &self.file_name {
            options = options.file_name(file_name.clone());
        }
        // An absent key keeps the default of weighting by mass
        if let Some(weight) = &self.weight {
            options = options.weight(density::weight_from_value(Some(weight))?);
        }
        Ok(options)
    }
}

#[cfg(feature = "msd")]
impl MsdSpec {
    pub fn options(&self) -> MsdOptions {
        let mut options = MsdOptions::new().types(self.types.iter().cloned());
        if let Some(name) = &self.name {
            options = options.name(name.clone());
        }
        if let Some(file_name) = &self.file_name {
            options = options.file_name(file_name.clone());
        }
        if let Some(origins) = self.origins {
            options = options.origins(origins);
        }
        options
    }
}

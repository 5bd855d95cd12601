//! Configuration of the device endpoint.
//!
//! Sources are merged with increasing priority:
//! 1. Default values (hardcoded)
//! 2. File named by `CONFIG_PATH`
//! 3. Explicit override file ([`NodeConfig::with_override_config`])
//! 4. Environment variables prefixed `BACNODE__` (highest priority)

mod cov;
mod device;
mod monitoring;
mod simulation;
pub use cov::*;
pub use device::*;
pub use monitoring::*;
pub use simulation::*;


//---
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NodeConfig {
    /// Device identity and log location
    #[serde(default)]
    pub device: DeviceConfig,
    /// Change-of-value coordinator tuning
    #[serde(default)]
    pub cov: CovConfig,
    /// Metrics settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Demo value driver
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl NodeConfig {
    /// Builds the configuration from defaults, the optional `CONFIG_PATH`
    /// file and `BACNODE__*` environment variables, then validates it.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&path));
        }

        let config: Self = builder.add_source(env_source()).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Layers the file at `path` over `self`. Environment variables keep
    /// the highest priority.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path).required(true))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.device.validate()?;
        self.cov.validate()?;
        self.monitoring.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("BACNODE")
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

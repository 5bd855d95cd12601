use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Sine-wave driver writing `AI:0.PresentValue = AV:0.PresentValue * sin(t)`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_interval")]
    pub interval_in_ms: u64,

    /// Increment of `t` per tick
    #[serde(default = "default_step")]
    pub step: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_in_ms: default_interval(),
            step: default_step(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.interval_in_ms == 0 {
            return Err(Error::InvalidConfig("simulation interval_in_ms must be greater than 0".into()));
        }
        if !self.step.is_finite() {
            return Err(Error::InvalidConfig("simulation step must be finite".into()));
        }
        Ok(())
    }
}

fn default_interval() -> u64 {
    1000
}
fn default_step() -> f64 {
    0.1
}

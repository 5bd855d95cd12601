use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Tuning of the change-of-value coordinator
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CovConfig {
    /// Debounce slots whose job finished longer ago than this are evicted.
    /// 0 keeps every slot for the lifetime of the process.
    #[serde(default = "default_slot_idle_timeout")]
    pub slot_idle_timeout_in_secs: u64,

    /// How often the idle-slot sweeper runs
    #[serde(default = "default_slot_sweep_interval")]
    pub slot_sweep_interval_in_secs: u64,

    /// Delivery budget for subscriptions with an indefinite lifetime
    #[serde(default = "default_indefinite_delivery_timeout")]
    pub indefinite_delivery_timeout_in_ms: u64,
}

impl Default for CovConfig {
    fn default() -> Self {
        Self {
            slot_idle_timeout_in_secs: default_slot_idle_timeout(),
            slot_sweep_interval_in_secs: default_slot_sweep_interval(),
            indefinite_delivery_timeout_in_ms: default_indefinite_delivery_timeout(),
        }
    }
}

impl CovConfig {
    pub fn validate(&self) -> Result<()> {
        if self.slot_idle_timeout_in_secs > 0 && self.slot_sweep_interval_in_secs == 0 {
            return Err(Error::InvalidConfig(
                "slot_sweep_interval_in_secs must be greater than 0 when slot eviction is enabled".into(),
            ));
        }

        if self.indefinite_delivery_timeout_in_ms == 0 {
            return Err(Error::InvalidConfig(
                "indefinite_delivery_timeout_in_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn slot_idle_timeout(&self) -> Option<Duration> {
        (self.slot_idle_timeout_in_secs > 0).then(|| Duration::from_secs(self.slot_idle_timeout_in_secs))
    }

    pub fn indefinite_delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.indefinite_delivery_timeout_in_ms)
    }
}

fn default_slot_idle_timeout() -> u64 {
    300
}
fn default_slot_sweep_interval() -> u64 {
    60
}
fn default_indefinite_delivery_timeout() -> u64 {
    3000
}

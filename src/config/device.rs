use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::MAX_INSTANCE;
use crate::constants::MIN_APDU_LENGTH;
use crate::Error;
use crate::Result;
use crate::Segmentation;

/// Identity the endpoint announces in I-Am and reports as the initiating
/// device of COV notifications.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_device_id")]
    pub device_id: u32,

    #[serde(default = "default_object_name")]
    pub object_name: String,

    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,

    /// Largest APDU accepted, in bytes
    #[serde(default = "default_max_apdu")]
    pub max_apdu: u32,

    #[serde(default = "default_segmentation")]
    pub segmentation: Segmentation,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            object_name: default_object_name(),
            vendor_id: default_vendor_id(),
            max_apdu: default_max_apdu(),
            segmentation: default_segmentation(),
            log_dir: default_log_dir(),
        }
    }
}

impl DeviceConfig {
    /// Validates device identity
    /// # Errors
    /// Returns `Error::InvalidConfig` if any configuration rules are violated
    pub fn validate(&self) -> Result<()> {
        if self.device_id > MAX_INSTANCE {
            return Err(Error::InvalidConfig(format!(
                "device_id {} exceeds the maximum instance number {}",
                self.device_id, MAX_INSTANCE
            )));
        }

        if self.object_name.trim().is_empty() {
            return Err(Error::InvalidConfig("object_name cannot be empty".into()));
        }

        if self.max_apdu < MIN_APDU_LENGTH {
            return Err(Error::InvalidConfig(format!(
                "max_apdu {} is below the protocol minimum {}",
                self.max_apdu, MIN_APDU_LENGTH
            )));
        }

        if self.log_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("log_dir path cannot be empty".into()));
        }

        Ok(())
    }
}

fn default_device_id() -> u32 {
    1234
}
fn default_object_name() -> String {
    "bacnode".to_string()
}
fn default_vendor_id() -> u16 {
    260
}
fn default_max_apdu() -> u32 {
    1476
}
fn default_segmentation() -> Segmentation {
    Segmentation::None
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::Error;
use crate::Result;

/// Prometheus exporter settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub prometheus_enabled: bool,

    /// Port of the `/metrics` endpoint
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: false,
            prometheus_port: default_prometheus_port(),
        }
    }
}

impl MonitoringConfig {
    /// Port to serve metrics on, `None` while the exporter is off.
    pub fn metrics_port(&self) -> Option<u16> {
        self.prometheus_enabled.then_some(self.prometheus_port)
    }

    /// # Errors
    /// `Error::InvalidConfig` for port 0 or a privileged port while the
    /// exporter is enabled.
    pub fn validate(&self) -> Result<()> {
        let Some(port) = self.metrics_port() else {
            if self.prometheus_port != default_prometheus_port() {
                warn!(
                    port = self.prometheus_port,
                    "prometheus_port is set but the exporter is disabled"
                );
            }
            return Ok(());
        };

        match port {
            0 => Err(Error::InvalidConfig("prometheus_port cannot be 0 when enabled".into())),
            1..=1023 => Err(Error::InvalidConfig(format!(
                "prometheus_port {port} is privileged, pick a port >= 1024"
            ))),
            _ => Ok(()),
        }
    }
}

fn default_prometheus_port() -> u16 {
    9100
}

use async_trait::async_trait;
use tracing::debug;
use tracing::info;

use crate::Address;
use crate::CovNotification;
use crate::Response;
use crate::Result;
use crate::Transport;

/// Transport that only logs outbound traffic.
///
/// Used when the endpoint runs without a datalink, e.g. in simulation mode.
/// Every notification counts as acknowledged.
#[derive(Debug, Clone)]
pub struct TracingTransport {
    broadcast: Address,
}

impl TracingTransport {
    pub fn new(broadcast: Address) -> Self {
        Self { broadcast }
    }
}

impl Default for TracingTransport {
    fn default() -> Self {
        Self::new(Address::new(0xFFFF, Vec::new()))
    }
}

#[async_trait]
impl Transport for TracingTransport {
    fn broadcast_address(&self) -> Address {
        self.broadcast.clone()
    }

    async fn send_response(
        &self,
        to: Address,
        response: Response,
    ) -> Result<()> {
        debug!(%to, kind = response.kind(), ?response, "send response");
        Ok(())
    }

    async fn notify(
        &self,
        notification: CovNotification,
    ) -> Result<bool> {
        info!(
            to = %notification.address,
            object = %notification.monitored_object,
            confirmed = notification.confirmed,
            time_remaining = notification.time_remaining,
            values = notification.values.len(),
            "cov notification"
        );
        Ok(true)
    }
}

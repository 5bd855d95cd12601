//! Outbound network boundary.
//!
//! Responses and COV notifications leave the endpoint only through
//! [`Transport`]. Every call is bounded by its caller: the dispatcher sends
//! responses inline, the COV coordinator wraps each [`Transport::notify`]
//! in its per-subscriber delivery budget.

mod messages;
mod tracing_transport;

#[cfg(test)]
mod tracing_transport_test;

pub use messages::*;
pub use tracing_transport::*;

//---
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Address;
use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Address a request arrives from when it was broadcast on the local
    /// network.
    fn broadcast_address(&self) -> Address;

    /// Sends a response PDU to `to`.
    async fn send_response(
        &self,
        to: Address,
        response: Response,
    ) -> Result<()>;

    /// Delivers one COV notification.
    ///
    /// For confirmed notifications the future resolves once the subscriber
    /// answered: `Ok(true)` on acknowledgement, `Ok(false)` when it
    /// refused. Unconfirmed notifications resolve `Ok(true)` once sent.
    async fn notify(
        &self,
        notification: CovNotification,
    ) -> Result<bool>;
}

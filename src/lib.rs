//! Concurrency core of a BACnet-style device endpoint.
//!
//! Two pieces carry the behaviour:
//! - [`Dispatcher`] takes decoded requests, runs each on its own task and
//!   serializes access per object through [`ObjectLocks`].
//! - [`CovCoordinator`] turns committed writes into change-of-value
//!   notifications, debounced per `(object, property)` and delivered to
//!   every subscriber independently.
//!
//! [`NodeBuilder`] wires them to an [`ObjectStore`], a
//! [`SubscriptionRegistry`] and a [`Transport`].

mod config;
mod cov;
mod dispatcher;
mod errors;
mod network;
mod node;
mod simulation;
mod storage;
mod subscription;
mod types;

pub(crate) mod constants;
pub mod metrics;
pub mod utils;

pub use config::*;
pub use cov::*;
pub use dispatcher::*;
pub use errors::*;
pub use network::*;
pub use node::*;
pub use simulation::*;
pub use storage::*;
pub use subscription::*;
pub use types::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
#[cfg(test)]
pub use test_utils::*;

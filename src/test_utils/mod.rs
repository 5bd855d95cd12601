//! Shared fixtures for unit tests: a scriptable transport, a store wrapper
//! that counts reads, and a fully wired endpoint over the sample device.
mod counting_store;
mod fixture;
mod recording_transport;

pub use counting_store::*;
pub use fixture::*;
pub use recording_transport::*;

//! Inbound request handling.
//!
//! Every request runs on its own task. Requests touching the same object
//! are serialized through [`crate::ObjectLocks`]; requests on different
//! objects proceed in parallel.

mod bindings;
mod dispatcher;
mod request;


pub use bindings::*;
pub use dispatcher::*;
pub use request::*;

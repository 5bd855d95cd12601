//! Change-of-value notification.
//!
//! Writes are debounced per `(object, property)`: a newer write cancels the
//! pending job for the same key and schedules a replacement, so subscribers
//! see the value current when the surviving job runs. Delivery to each
//! subscriber runs on its own task with its own time budget.

mod coordinator;
mod debounce;


pub use coordinator::*;
pub use debounce::*;

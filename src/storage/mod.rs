//! Object store boundary.
//!
//! The store owns object and property data plus its validation rules. The
//! dispatcher and the COV coordinator only talk to it through
//! [`ObjectStore`], always while holding the object's lock from
//! [`ObjectLocks`].

pub mod adaptors;
mod object_locks;


pub use adaptors::*;
pub use object_locks::*;

//---
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::ObjectId;
use crate::PropertyId;
use crate::PropertyReference;
use crate::PropertyValue;
use crate::Result;
use crate::Value;

/// Callback fired by the store after a successful write.
pub trait WriteListener: Send + Sync + 'static {
    fn notify_write(
        &self,
        object_id: ObjectId,
        property_id: PropertyId,
    );
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Resolves an identifier to a known object.
    async fn find_object(
        &self,
        object_id: ObjectId,
    ) -> Result<Option<ObjectId>>;

    /// Every object held by the store, device object included.
    fn object_ids(&self) -> Vec<ObjectId>;

    /// Reads one property. Access refusals come back as
    /// `Error::Access`; anything else is a store fault.
    async fn read_property(
        &self,
        object_id: ObjectId,
        property: PropertyReference,
    ) -> Result<Vec<Value>>;

    /// Complete property snapshot of one object.
    async fn read_all_properties(
        &self,
        object_id: ObjectId,
    ) -> Result<Vec<PropertyValue>>;

    /// Writes one property and, on success, fires the write listeners
    /// registered for the object before returning.
    async fn write_property(
        &self,
        object_id: ObjectId,
        value: PropertyValue,
    ) -> Result<()>;

    fn register_write_listener(
        &self,
        object_id: ObjectId,
        listener: Arc<dyn WriteListener>,
    ) -> Result<()>;
}

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use crate::MemObjectStore;
use crate::ObjectId;
use crate::ObjectStore;
use crate::PropertyReference;
use crate::PropertyValue;
use crate::Result;
use crate::Value;
use crate::WriteListener;

/// Delegates to a [`MemObjectStore`] and counts read calls.
#[derive(Debug)]
pub struct CountingStore {
    pub inner: Arc<MemObjectStore>,
    reads: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<MemObjectStore>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn find_object(
        &self,
        object_id: ObjectId,
    ) -> Result<Option<ObjectId>> {
        self.inner.find_object(object_id).await
    }

    fn object_ids(&self) -> Vec<ObjectId> {
        self.inner.object_ids()
    }

    async fn read_property(
        &self,
        object_id: ObjectId,
        property: PropertyReference,
    ) -> Result<Vec<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_property(object_id, property).await
    }

    async fn read_all_properties(
        &self,
        object_id: ObjectId,
    ) -> Result<Vec<PropertyValue>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_all_properties(object_id).await
    }

    async fn write_property(
        &self,
        object_id: ObjectId,
        value: PropertyValue,
    ) -> Result<()> {
        self.inner.write_property(object_id, value).await
    }

    fn register_write_listener(
        &self,
        object_id: ObjectId,
        listener: Arc<dyn WriteListener>,
    ) -> Result<()> {
        self.inner.register_write_listener(object_id, listener)
    }
}

use std::sync::Arc;

use crate::Address;
use crate::CountingStore;
use crate::CovConfig;
use crate::CovCoordinator;
use crate::DeviceConfig;
use crate::Dispatcher;
use crate::MemObjectStore;
use crate::MemSubscriptionRegistry;
use crate::ObjectId;
use crate::ObjectLocks;
use crate::ObjectStore;
use crate::ObjectType;
use crate::PropertyId;
use crate::PropertyReference;
use crate::PropertyValue;
use crate::RecordingTransport;
use crate::Result;
use crate::SubscribeRequest;
use crate::Subscription;
use crate::SubscriptionRegistry;
use crate::Value;

pub fn av0() -> ObjectId {
    ObjectId::new(ObjectType::ANALOG_VALUE, 0)
}

pub fn ai0() -> ObjectId {
    ObjectId::new(ObjectType::ANALOG_INPUT, 0)
}

pub fn peer(n: u8) -> Address {
    Address::local(vec![10, 0, 0, n, 0xBA, 0xC0])
}

pub fn subscribe_request(
    address: Address,
    object_id: ObjectId,
    property_id: PropertyId,
    lifetime: u32,
) -> SubscribeRequest {
    SubscribeRequest {
        address,
        invoke_id: 1,
        process_id: 18,
        object_id,
        property: PropertyReference::new(property_id),
        cancellation: false,
        issue_confirmed: true,
        lifetime,
        cov_increment: None,
    }
}

/// Sample device wired the way the node wires it, with a recording
/// transport. Must be created inside a tokio runtime.
pub struct Fixture {
    pub device: DeviceConfig,
    pub mem: Arc<MemObjectStore>,
    pub store: Arc<CountingStore>,
    pub registry: Arc<MemSubscriptionRegistry>,
    pub transport: Arc<RecordingTransport>,
    pub locks: Arc<ObjectLocks>,
    pub coordinator: CovCoordinator,
    pub dispatcher: Dispatcher,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_cov_config(CovConfig::default())
    }

    pub fn with_cov_config(config: CovConfig) -> Self {
        let device = DeviceConfig::default();
        let mem = Arc::new(MemObjectStore::basic_device(&device));
        let store = Arc::new(CountingStore::new(mem.clone()));
        let registry = Arc::new(MemSubscriptionRegistry::new());
        let transport = Arc::new(RecordingTransport::new());
        let locks = Arc::new(ObjectLocks::new());

        let coordinator = CovCoordinator::new(
            store.clone(),
            registry.clone(),
            transport.clone(),
            locks.clone(),
            ObjectId::device(device.device_id),
            config,
        )
        .expect("fixture runs inside a runtime");
        for object_id in store.object_ids() {
            store
                .register_write_listener(object_id, Arc::new(coordinator.clone()))
                .expect("object exists");
        }

        let dispatcher = Dispatcher::new(
            store.clone(),
            registry.clone(),
            transport.clone(),
            locks.clone(),
            coordinator.clone(),
            device.clone(),
        );

        Self {
            device,
            mem,
            store,
            registry,
            transport,
            locks,
            coordinator,
            dispatcher,
        }
    }

    pub fn device_id(&self) -> ObjectId {
        ObjectId::device(self.device.device_id)
    }

    /// Registers a confirmed subscription directly in the registry.
    pub fn subscribe(
        &self,
        address: Address,
        object_id: ObjectId,
        property_id: PropertyId,
        lifetime: u32,
    ) -> Subscription {
        self.registry
            .subscribe(subscribe_request(address, object_id, property_id, lifetime))
            .expect("not a cancellation")
    }

    /// Writes through the store, as a local writer not holding the object
    /// lock would.
    pub async fn write(
        &self,
        object_id: ObjectId,
        property_id: PropertyId,
        value: Value,
    ) -> Result<()> {
        self.store
            .write_property(object_id, PropertyValue::new(property_id, vec![value]))
            .await
    }
}

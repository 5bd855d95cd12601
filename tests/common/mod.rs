//! Fixtures shared by the end-to-end scenarios.

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use bacnode::Address;
use bacnode::CovNotification;
use bacnode::DeviceConfig;
use bacnode::MemObjectStore;
use bacnode::MemSubscriptionRegistry;
use bacnode::NetworkError;
use bacnode::Node;
use bacnode::NodeBuilder;
use bacnode::NodeConfig;
use bacnode::ObjectId;
use bacnode::ObjectStore;
use bacnode::ObjectType;
use bacnode::PropertyReference;
use bacnode::PropertyValue;
use bacnode::Response;
use bacnode::Result;
use bacnode::Transport;
use bacnode::Value;
use bacnode::WriteListener;
use parking_lot::Mutex;
use tokio::sync::watch;

pub fn av0() -> ObjectId {
    ObjectId::new(ObjectType::ANALOG_VALUE, 0)
}

pub fn ai0() -> ObjectId {
    ObjectId::new(ObjectType::ANALOG_INPUT, 0)
}

pub fn peer(n: u8) -> Address {
    Address::local(vec![192, 168, 1, n, 0xBA, 0xC0])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    Acks,
    Fails,
    Silent,
}

#[derive(Debug, Default)]
pub struct TestTransport {
    peers: Mutex<HashMap<Address, Peer>>,
    responses: Mutex<Vec<(Address, Response)>>,
    notifications: Mutex<Vec<CovNotification>>,
    calls: AtomicUsize,
}

impl TestTransport {
    pub fn set_peer(
        &self,
        address: &Address,
        peer: Peer,
    ) {
        self.peers.lock().insert(address.clone(), peer);
    }

    pub fn responses(&self) -> Vec<(Address, Response)> {
        self.responses.lock().clone()
    }

    pub fn notifications(&self) -> Vec<CovNotification> {
        self.notifications.lock().clone()
    }

    /// Every transport call, responses included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for TestTransport {
    fn broadcast_address(&self) -> Address {
        Address::local(vec![255, 255, 255, 255, 0xBA, 0xC0])
    }

    async fn send_response(
        &self,
        to: Address,
        response: Response,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses.lock().push((to, response));
        Ok(())
    }

    async fn notify(
        &self,
        notification: CovNotification,
    ) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let address = notification.address.clone();
        self.notifications.lock().push(notification);
        let peer = self.peers.lock().get(&address).copied().unwrap_or(Peer::Acks);
        match peer {
            Peer::Acks => Ok(true),
            Peer::Fails => Err(NetworkError::SendFailed {
                address,
                reason: "host unreachable".into(),
            }
            .into()),
            Peer::Silent => {
                std::future::pending::<()>().await;
                Ok(true)
            }
        }
    }
}

/// Sample device store that counts reads.
#[derive(Debug)]
pub struct CountingStore {
    inner: MemObjectStore,
    reads: AtomicUsize,
}

impl CountingStore {
    pub fn sample() -> Self {
        Self {
            inner: MemObjectStore::basic_device(&DeviceConfig::default()),
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

pub struct TestNode {
    pub node: Arc<Node>,
    pub store: Arc<CountingStore>,
    pub registry: Arc<MemSubscriptionRegistry>,
    pub transport: Arc<TestTransport>,
    // dropping the sender would stop the node
    _shutdown_tx: watch::Sender<()>,
}

impl TestNode {
    pub fn start() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let store = Arc::new(CountingStore::sample());
        let registry = Arc::new(MemSubscriptionRegistry::new());
        let transport = Arc::new(TestTransport::default());

        let node = NodeBuilder::init(NodeConfig::default(), shutdown_rx)
            .store(store.clone())
            .registry(registry.clone())
            .transport(transport.clone())
            .build()
            .expect("node builds")
            .ready()
            .expect("node is ready");

        Self {
            node,
            store,
            registry,
            transport,
            _shutdown_tx: shutdown_tx,
        }
    }

    pub async fn settle(&self) {
        self.node.coordinator().drain().await;
    }
}

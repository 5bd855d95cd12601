//! Assembles a [`Node`] from configuration.
//!
//! Defaults are the in-memory sample device, the in-memory subscription
//! registry and the logging transport; each can be replaced before
//! [`NodeBuilder::build`].
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let node = NodeBuilder::new(None, shutdown_rx.clone())?
//!     .transport(my_datalink)
//!     .build()?
//!     .start_metrics_server(shutdown_rx)
//!     .ready()?;
//! node.run().await?;
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::constants::METRICS_SERVER_TASK;
use crate::constants::SIMULATION_TASK;
use crate::constants::SLOT_SWEEPER_TASK;
use crate::metrics;
use crate::utils::async_task::spawn_task;
use crate::CovCoordinator;
use crate::Dispatcher;
use crate::Error;
use crate::MemObjectStore;
use crate::MemSubscriptionRegistry;
use crate::Node;
use crate::NodeConfig;
use crate::ObjectId;
use crate::ObjectLocks;
use crate::ObjectStore;
use crate::Result;
use crate::SimulationWorker;
use crate::SubscriptionRegistry;
use crate::TracingTransport;
use crate::Transport;
use crate::SUPPORTED_SERVICES;

pub struct NodeBuilder {
    pub(super) config: NodeConfig,
    pub(super) store: Option<Arc<dyn ObjectStore>>,
    pub(super) registry: Option<Arc<dyn SubscriptionRegistry>>,
    pub(super) transport: Option<Arc<dyn Transport>>,
    pub(super) shutdown_signal: watch::Receiver<()>,

    pub(super) node: Option<Arc<Node>>,
}

impl NodeBuilder {
    /// Loads [`NodeConfig`] from its sources, optionally layering the file
    /// at `config_path` on top.
    pub fn new(
        config_path: Option<&str>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Result<Self> {
        let mut config = NodeConfig::new()?;
        if let Some(p) = config_path {
            info!("with_override_config from: {}", p);
            config = config.with_override_config(p)?;
        }
        Ok(Self::init(config, shutdown_signal))
    }

    pub fn init(
        config: NodeConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            store: None,
            registry: None,
            transport: None,
            shutdown_signal,
            node: None,
        }
    }

    /// Replaces the sample device store. A custom store publishes its own
    /// supported-services bitmap.
    pub fn store(
        mut self,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    pub fn registry(
        mut self,
        registry: Arc<dyn SubscriptionRegistry>,
    ) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn transport(
        mut self,
        transport: Arc<dyn Transport>,
    ) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Wires the components and spawns the background tasks. Must run
    /// inside a tokio runtime.
    pub fn build(mut self) -> Result<Self> {
        let device_id = ObjectId::device(self.config.device.device_id);

        let store: Arc<dyn ObjectStore> = match self.store.take() {
            Some(store) => store,
            None => {
                let store = MemObjectStore::basic_device(&self.config.device);
                store.publish_services_supported(device_id, &SUPPORTED_SERVICES)?;
                Arc::new(store)
            }
        };
        let registry: Arc<dyn SubscriptionRegistry> = match self.registry.take() {
            Some(registry) => registry,
            None => Arc::new(MemSubscriptionRegistry::new()),
        };
        let transport: Arc<dyn Transport> = match self.transport.take() {
            Some(transport) => transport,
            None => Arc::new(TracingTransport::default()),
        };
        let locks = Arc::new(ObjectLocks::new());

        let coordinator = CovCoordinator::new(
            store.clone(),
            registry.clone(),
            transport.clone(),
            locks.clone(),
            device_id,
            self.config.cov.clone(),
        )?;
        let listener = Arc::new(coordinator.clone());
        for object_id in store.object_ids() {
            store.register_write_listener(object_id, listener.clone())?;
        }

        let dispatcher = Dispatcher::new(
            store.clone(),
            registry,
            transport,
            locks.clone(),
            coordinator.clone(),
            self.config.device.clone(),
        );

        let mut tasks = Vec::new();
        let sweeper = coordinator.clone();
        let shutdown = self.shutdown_signal.clone();
        tasks.push(spawn_task(SLOT_SWEEPER_TASK, async move {
            sweeper.run_slot_sweeper(shutdown).await
        }));

        if self.config.simulation.enabled {
            let worker = SimulationWorker::new(store, locks, self.config.simulation.clone());
            tasks.push(spawn_task(SIMULATION_TASK, worker.run(self.shutdown_signal.clone())));
        }

        info!(%device_id, "node built");
        self.node = Some(Arc::new(Node::new(
            self.config.clone(),
            dispatcher,
            coordinator,
            tasks,
            self.shutdown_signal.clone(),
        )));
        Ok(self)
    }

    /// Serves `/metrics` when `monitoring.prometheus_enabled` is set.
    pub fn start_metrics_server(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        if let Some(port) = self.config.monitoring.metrics_port() {
            let handle = spawn_task(METRICS_SERVER_TASK, async move {
                metrics::start_server(port, shutdown_signal).await;
                Ok(())
            });
            if let Some(node) = &self.node {
                node.track_task(handle);
            }
        }
        self
    }

    pub fn ready(self) -> Result<Arc<Node>> {
        self.node
            .ok_or_else(|| Error::Fatal("node must be built before it is ready".to_string()))
    }
}

//! A running device endpoint.
//!
//! The node owns the dispatcher and the COV coordinator plus the handles of
//! its background tasks. [`Node::run`] blocks until the shutdown signal and
//! then drains pending notification work.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;
use tracing::warn;

use crate::Address;
use crate::CovCoordinator;
use crate::Dispatcher;
use crate::NodeConfig;
use crate::Request;
use crate::Response;
use crate::Result;

pub struct Node {
    pub config: NodeConfig,
    dispatcher: Dispatcher,
    coordinator: CovCoordinator,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_signal: watch::Receiver<()>,
    ready: AtomicBool,
}

impl Node {
    pub(crate) fn new(
        config: NodeConfig,
        dispatcher: Dispatcher,
        coordinator: CovCoordinator,
        tasks: Vec<JoinHandle<()>>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            coordinator,
            tasks: Mutex::new(tasks),
            shutdown_signal,
            ready: AtomicBool::new(false),
        }
    }

    pub(crate) fn track_task(
        &self,
        handle: JoinHandle<()>,
    ) {
        self.tasks.lock().push(handle);
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn coordinator(&self) -> &CovCoordinator {
        &self.coordinator
    }

    /// Entry point for the datalink: hands one decoded request to the
    /// dispatcher.
    pub fn dispatch(
        &self,
        from: Address,
        request: Request,
    ) -> JoinHandle<Option<Response>> {
        self.dispatcher.dispatch(from, request)
    }

    pub async fn run(&self) -> Result<()> {
        self.set_ready(true);
        info!(device_id = self.config.device.device_id, "node is serving");

        let mut shutdown = self.shutdown_signal.clone();
        // a dropped sender counts as shutdown too
        let _ = shutdown.changed().await;
        self.set_ready(false);

        info!("shutdown requested, draining cov jobs");
        self.coordinator.drain().await;

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!("background task ended abnormally: {:?}", e);
            }
        }
        info!("node stopped");
        Ok(())
    }

    pub fn set_ready(
        &self,
        is_ready: bool,
    ) {
        self.ready.store(is_ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

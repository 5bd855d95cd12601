use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::DebounceKey;
use super::DebounceTable;
use crate::metrics::COV_DELIVERIES_TOTAL;
use crate::metrics::COV_JOBS_TOTAL;
use crate::metrics::COV_SLOTS;
use crate::metrics::SUBSCRIBERS_REMOVED_TOTAL;
use crate::CovConfig;
use crate::CovNotification;
use crate::NetworkError;
use crate::ObjectId;
use crate::ObjectLocks;
use crate::ObjectStore;
use crate::PropertyId;
use crate::PropertyValue;
use crate::Result;
use crate::Subscription;
use crate::SubscriptionRegistry;
use crate::SystemError;
use crate::Transport;
use crate::WriteListener;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Result of one notification delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Subscriber answered with a negative acknowledgement
    Rejected,
    Failed,
    TimedOut,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::Rejected => "rejected",
            DeliveryOutcome::Failed => "failed",
            DeliveryOutcome::TimedOut => "timed_out",
        }
    }
}

/// Debounces writes and fans notifications out to subscribers.
///
/// Cheap to clone; clones share the debounce table.
#[derive(Clone)]
pub struct CovCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn ObjectStore>,
    registry: Arc<dyn SubscriptionRegistry>,
    transport: Arc<dyn Transport>,
    locks: Arc<ObjectLocks>,
    device_id: ObjectId,
    config: CovConfig,
    slots: DebounceTable,
    runtime: Handle,
}

impl CovCoordinator {
    /// Must be called from within a tokio runtime; jobs are spawned on it
    /// even when writes are notified from outside.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        registry: Arc<dyn SubscriptionRegistry>,
        transport: Arc<dyn Transport>,
        locks: Arc<ObjectLocks>,
        device_id: ObjectId,
        config: CovConfig,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| SystemError::RuntimeUnavailable)?;
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                registry,
                transport,
                locks,
                device_id,
                config,
                slots: DebounceTable::default(),
                runtime,
            }),
        })
    }

    /// Records a committed write and schedules the notification job for
    /// `(object_id, property_id)`, superseding any pending one.
    ///
    /// Returns immediately; nothing that happens in the job reaches the
    /// writer.
    pub fn notify_write(
        &self,
        object_id: ObjectId,
        property_id: PropertyId,
    ) {
        let key = DebounceKey::new(object_id, property_id);
        let generation = self.inner.slots.schedule(key, |token, generation| {
            let inner = self.inner.clone();
            self.inner
                .runtime
                .spawn(async move { inner.run_job(key, token, generation).await })
        });

        if generation > 1 {
            COV_JOBS_TOTAL.with_label_values(&["superseded"]).inc();
        }
        COV_JOBS_TOTAL.with_label_values(&["scheduled"]).inc();
        COV_SLOTS.set(self.inner.slots.len() as i64);
        trace!(%object_id, %property_id, generation, "cov job scheduled");
    }

    /// Sends the notification that follows a successful subscribe.
    ///
    /// Unlike debounced jobs, a failure here is returned to the caller and
    /// does not unregister the subscriber.
    pub async fn send_initial_notification(
        &self,
        subscription: &Subscription,
    ) -> Result<bool> {
        let property = subscription.monitored_property.property_id;
        let object = subscription.monitored_object;

        let snapshot = {
            let _guard = self.inner.locks.lock(object).await;
            self.inner.read_values(object, property).await?
        };

        let notification = self.inner.notification_for(subscription, property, &snapshot);
        let budget = self.inner.delivery_budget(subscription);
        match timeout(budget, self.inner.transport.notify(notification)).await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout {
                address: subscription.address.clone(),
                duration: budget,
            }
            .into()),
        }
    }

    /// Waits until every scheduled job, superseded ones included, has
    /// finished.
    pub async fn drain(&self) {
        while self.inner.slots.has_pending() {
            sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    /// Evicts slots that are idle for at least `max_idle`; returns how many.
    pub fn evict_idle(
        &self,
        max_idle: Duration,
    ) -> usize {
        let evicted = self.inner.slots.evict_idle(max_idle);
        COV_SLOTS.set(self.inner.slots.len() as i64);
        if evicted > 0 {
            debug!(evicted, "idle debounce slots evicted");
        }
        evicted
    }

    /// Periodic idle-slot eviction until `shutdown` fires. Returns at once
    /// when eviction is disabled.
    pub async fn run_slot_sweeper(
        &self,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        let Some(max_idle) = self.inner.config.slot_idle_timeout() else {
            info!("debounce slot eviction disabled");
            return Ok(());
        };
        let period = Duration::from_secs(self.inner.config.slot_sweep_interval_in_secs);
        let mut ticker = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("slot sweeper stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.evict_idle(max_idle);
                }
            }
        }
    }

    pub fn slot_count(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn slot_generation(
        &self,
        key: DebounceKey,
    ) -> Option<u64> {
        self.inner.slots.generation(&key)
    }
}

impl WriteListener for CovCoordinator {
    fn notify_write(
        &self,
        object_id: ObjectId,
        property_id: PropertyId,
    ) {
        CovCoordinator::notify_write(self, object_id, property_id);
    }
}

impl std::fmt::Debug for CovCoordinator {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CovCoordinator")
            .field("device_id", &self.inner.device_id)
            .field("slots", &self.inner.slots.len())
            .finish()
    }
}

impl Inner {
    async fn run_job(
        self: Arc<Self>,
        key: DebounceKey,
        token: CancellationToken,
        generation: u64,
    ) {
        if token.is_cancelled() {
            trace!(object = %key.object, property = %key.property, generation, "cov job superseded before start");
            return;
        }

        self.registry.prune_expired();
        let subscribers: Vec<Subscription> = self
            .registry
            .subscribers_for(key.object)
            .into_iter()
            .filter(|s| s.monitors(key.property))
            .collect();
        if subscribers.is_empty() {
            trace!(object = %key.object, property = %key.property, "no subscribers");
            return;
        }

        let snapshot = {
            let _guard = self.locks.lock(key.object).await;
            if token.is_cancelled() {
                trace!(object = %key.object, generation, "cov job superseded before read");
                return;
            }
            match self.read_values(key.object, key.property).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(object = %key.object, property = %key.property, "cov read failed, nobody notified: {:?}", e);
                    return;
                }
            }
        };
        COV_JOBS_TOTAL.with_label_values(&["read"]).inc();

        let mut deliveries = JoinSet::new();
        for subscription in subscribers {
            if token.is_cancelled() {
                debug!(object = %key.object, generation, "cov fan-out stopped by a newer write");
                break;
            }
            let notification = self.notification_for(&subscription, key.property, &snapshot);
            if notification.values.is_empty() {
                continue;
            }
            let inner = self.clone();
            deliveries.spawn(async move { inner.deliver(subscription, notification).await });
        }

        while let Some(joined) = deliveries.join_next().await {
            if let Err(e) = joined {
                error!("cov delivery task failed: {:?}", e);
            }
        }
    }

    async fn read_values(
        &self,
        object: ObjectId,
        property: PropertyId,
    ) -> Result<Vec<PropertyValue>> {
        if property.is_all() {
            return self.store.read_all_properties(object).await;
        }
        let values = self.store.read_property(object, property.into()).await?;
        Ok(vec![PropertyValue::new(property, values)])
    }

    /// Payload for one subscriber. A whole-object snapshot is narrowed to
    /// the subscriber's property when it watches a single one.
    fn notification_for(
        &self,
        subscription: &Subscription,
        property: PropertyId,
        snapshot: &[PropertyValue],
    ) -> CovNotification {
        let monitored = subscription.monitored_property.property_id;
        let values = if property.is_all() && !monitored.is_all() {
            snapshot
                .iter()
                .filter(|v| v.property.property_id == monitored)
                .cloned()
                .collect()
        } else {
            snapshot.to_vec()
        };

        CovNotification {
            address: subscription.address.clone(),
            process_id: subscription.process_id,
            device_id: self.device_id,
            monitored_object: subscription.monitored_object,
            time_remaining: subscription.time_remaining_secs(),
            confirmed: subscription.issue_confirmed,
            values,
        }
    }

    fn delivery_budget(
        &self,
        subscription: &Subscription,
    ) -> Duration {
        subscription
            .time_remaining()
            .unwrap_or_else(|| self.config.indefinite_delivery_timeout())
    }

    async fn deliver(
        &self,
        subscription: Subscription,
        notification: CovNotification,
    ) -> DeliveryOutcome {
        let address = subscription.address.clone();
        let budget = self.delivery_budget(&subscription);
        let send = AssertUnwindSafe(self.transport.notify(notification)).catch_unwind();

        let outcome = match timeout(budget, send).await {
            Ok(Ok(Ok(true))) => DeliveryOutcome::Delivered,
            Ok(Ok(Ok(false))) => {
                warn!(%address, "cov notification rejected");
                DeliveryOutcome::Rejected
            }
            Ok(Ok(Err(e))) => {
                warn!(%address, "cov notification failed: {:?}", e);
                DeliveryOutcome::Failed
            }
            Ok(Err(_)) => {
                error!(%address, "cov notification panicked");
                DeliveryOutcome::Failed
            }
            Err(_) => {
                warn!(%address, ?budget, "cov notification timed out");
                DeliveryOutcome::TimedOut
            }
        };

        COV_DELIVERIES_TOTAL.with_label_values(&[outcome.as_str()]).inc();
        if outcome != DeliveryOutcome::Delivered {
            let removed = self.registry.unregister(&address);
            SUBSCRIBERS_REMOVED_TOTAL
                .with_label_values(&[outcome.as_str()])
                .inc_by(removed as u64);
        }
        outcome
    }
}

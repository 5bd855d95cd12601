use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use tracing::info;

use crate::Address;
use crate::ObjectId;
use crate::SubscribeRequest;
use crate::Subscription;
use crate::SubscriptionRegistry;

/// Registry behind a single lock, so every read is a consistent snapshot
/// across objects.
#[derive(Debug, Default)]
pub struct MemSubscriptionRegistry {
    subscriptions: RwLock<HashMap<ObjectId, Vec<Subscription>>>,
}

impl MemSubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of live subscriptions
    pub fn len(&self) -> usize {
        self.subscriptions.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SubscriptionRegistry for MemSubscriptionRegistry {
    fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Option<Subscription> {
        let mut subscriptions = self.subscriptions.write();

        if request.cancellation {
            if let Some(list) = subscriptions.get_mut(&request.object_id) {
                list.retain(|s| !s.matches(&request));
                if list.is_empty() {
                    subscriptions.remove(&request.object_id);
                }
            }
            debug!(
                address = %request.address,
                process_id = request.process_id,
                object_id = %request.object_id,
                "subscription cancelled"
            );
            return None;
        }

        let list = subscriptions.entry(request.object_id).or_default();
        if let Some(existing) = list.iter_mut().find(|s| s.matches(&request)) {
            *existing = Subscription::from_request(&request);
            debug!(
                address = %request.address,
                object_id = %request.object_id,
                lifetime = request.lifetime,
                "subscription renewed"
            );
            return Some(existing.clone());
        }

        let subscription = Subscription::from_request(&request);
        list.push(subscription.clone());
        info!(
            address = %request.address,
            process_id = request.process_id,
            object_id = %request.object_id,
            property = %request.property,
            confirmed = request.issue_confirmed,
            lifetime = request.lifetime,
            "subscription added"
        );
        Some(subscription)
    }

    fn subscribers_for(
        &self,
        object_id: ObjectId,
    ) -> Vec<Subscription> {
        self.subscriptions.read().get(&object_id).cloned().unwrap_or_default()
    }

    fn prune_expired(&self) -> usize {
        let mut subscriptions = self.subscriptions.write();
        let mut removed = 0;
        subscriptions.retain(|_, list| {
            let before = list.len();
            list.retain(|s| !s.is_expired());
            removed += before - list.len();
            !list.is_empty()
        });
        if removed > 0 {
            debug!(removed, "expired subscriptions pruned");
        }
        removed
    }

    fn unregister(
        &self,
        address: &Address,
    ) -> usize {
        let mut subscriptions = self.subscriptions.write();
        let mut removed = 0;
        subscriptions.retain(|_, list| {
            let before = list.len();
            list.retain(|s| &s.address != address);
            removed += before - list.len();
            !list.is_empty()
        });
        if removed > 0 {
            info!(%address, removed, "receiver unregistered");
        }
        removed
    }
}

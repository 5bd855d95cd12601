//! Subscription registry boundary.
//!
//! The registry alone decides who watches what and for how long. The COV
//! coordinator reads snapshots from it and unregisters receivers whose
//! delivery failed; the dispatcher forwards subscribe requests to it.

mod mem_registry;


pub use mem_registry::*;

//---
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tokio::time::Instant;

use crate::Address;
use crate::ObjectId;
use crate::PropertyId;
use crate::PropertyReference;

/// Fields of a SubscribeCOV / SubscribeCOVProperty request as handed to the
/// registry. Whole-object subscriptions carry [`PropertyId::ALL`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeRequest {
    pub address: Address,
    pub invoke_id: u8,
    pub process_id: u32,
    pub object_id: ObjectId,
    pub property: PropertyReference,
    pub cancellation: bool,
    pub issue_confirmed: bool,
    /// Seconds; 0 means indefinite
    pub lifetime: u32,
    pub cov_increment: Option<f32>,
}

/// One registered observer.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub address: Address,
    pub process_id: u32,
    pub monitored_object: ObjectId,
    pub monitored_property: PropertyReference,
    pub issue_confirmed: bool,
    /// Seconds; 0 means indefinite
    pub lifetime: u32,
    pub cov_increment: Option<f32>,
    pub start: Instant,
}

impl Subscription {
    pub fn from_request(request: &SubscribeRequest) -> Self {
        Self {
            address: request.address.clone(),
            process_id: request.process_id,
            monitored_object: request.object_id,
            monitored_property: request.property,
            issue_confirmed: request.issue_confirmed,
            lifetime: request.lifetime,
            cov_increment: request.cov_increment,
            start: Instant::now(),
        }
    }

    /// Same subscriber process watching the same object property.
    pub fn matches(
        &self,
        request: &SubscribeRequest,
    ) -> bool {
        self.address == request.address
            && self.process_id == request.process_id
            && self.monitored_object == request.object_id
            && self.monitored_property == request.property
    }

    /// `None` for indefinite subscriptions.
    pub fn time_remaining(&self) -> Option<Duration> {
        if self.lifetime == 0 {
            return None;
        }
        Some(Duration::from_secs(u64::from(self.lifetime)).saturating_sub(self.start.elapsed()))
    }

    /// Remaining lifetime as reported in notifications: 0 for indefinite,
    /// otherwise whole seconds, at least 1 until expiry.
    pub fn time_remaining_secs(&self) -> u32 {
        match self.time_remaining() {
            None => 0,
            Some(d) if d.is_zero() => 0,
            Some(d) => (d.as_secs() as u32).max(1),
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.time_remaining(), Some(d) if d.is_zero())
    }

    /// Whether a change of `property_id` concerns this subscription.
    pub fn monitors(
        &self,
        property_id: PropertyId,
    ) -> bool {
        self.monitored_property.property_id.is_all()
            || property_id.is_all()
            || self.monitored_property.property_id == property_id
    }
}

#[cfg_attr(test, automock)]
pub trait SubscriptionRegistry: Send + Sync + 'static {
    /// Creates, renews or (for cancellations) removes a subscription.
    /// Returns the live subscription, `None` after a cancellation.
    fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> Option<Subscription>;

    /// Consistent snapshot of the subscriptions on one object.
    fn subscribers_for(
        &self,
        object_id: ObjectId,
    ) -> Vec<Subscription>;

    /// Drops expired subscriptions; returns how many were removed.
    fn prune_expired(&self) -> usize;

    /// Removes every subscription held by `address`; returns how many.
    fn unregister(
        &self,
        address: &Address,
    ) -> usize;
}

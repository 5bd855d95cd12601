use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::Address;
use crate::CovNotification;
use crate::NetworkError;
use crate::Response;
use crate::Result;
use crate::Transport;

/// How a subscriber reacts to notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Accept,
    Reject,
    Fail,
    /// Never answers
    Hang,
    Panic,
}

/// Everything handed to the transport, in send order.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Response(Address, Response),
    Notification(CovNotification),
}

/// Transport that records everything sent and answers notifications per
/// receiver address. Unknown receivers accept.
#[derive(Debug)]
pub struct RecordingTransport {
    broadcast: Address,
    behaviours: Mutex<HashMap<Address, Behaviour>>,
    sent: Mutex<Vec<Sent>>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            broadcast: broadcast_address(),
            behaviours: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
        }
    }
}

pub fn broadcast_address() -> Address {
    Address::local(vec![0xFF, 0xFF, 0xFF, 0xFF, 0xBA, 0xC0])
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_behaviour(
        &self,
        address: &Address,
        behaviour: Behaviour,
    ) {
        self.behaviours.lock().insert(address.clone(), behaviour);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn responses(&self) -> Vec<(Address, Response)> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Response(to, response) => Some((to.clone(), response.clone())),
                Sent::Notification(_) => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<CovNotification> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Notification(n) => Some(n.clone()),
                Sent::Response(..) => None,
            })
            .collect()
    }

    pub fn notifications_for(
        &self,
        address: &Address,
    ) -> Vec<CovNotification> {
        self.notifications()
            .into_iter()
            .filter(|n| &n.address == address)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn broadcast_address(&self) -> Address {
        self.broadcast.clone()
    }

    async fn send_response(
        &self,
        to: Address,
        response: Response,
    ) -> Result<()> {
        self.sent.lock().push(Sent::Response(to, response));
        Ok(())
    }

    async fn notify(
        &self,
        notification: CovNotification,
    ) -> Result<bool> {
        let address = notification.address.clone();
        self.sent.lock().push(Sent::Notification(notification));
        let behaviour = self
            .behaviours
            .lock()
            .get(&address)
            .copied()
            .unwrap_or(Behaviour::Accept);

        match behaviour {
            Behaviour::Accept => Ok(true),
            Behaviour::Reject => Ok(false),
            Behaviour::Fail => Err(NetworkError::SendFailed {
                address,
                reason: "unreachable".to_string(),
            }
            .into()),
            Behaviour::Hang => {
                std::future::pending::<()>().await;
                Ok(true)
            }
            Behaviour::Panic => panic!("transport exploded for {address}"),
        }
    }
}

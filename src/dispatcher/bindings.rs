use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::Address;
use crate::ObjectId;
use crate::Segmentation;

/// What a peer device announced in its I-Am.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceBinding {
    pub address: Address,
    pub max_apdu: u32,
    pub segmentation: Segmentation,
    pub vendor_id: u16,
    pub seen_at: Instant,
}

/// Device-id to address table learned from received I-Am messages.
#[derive(Debug, Default)]
pub struct AddressBindings {
    bindings: DashMap<ObjectId, DeviceBinding>,
}

impl AddressBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records or refreshes the binding of `device_id`. A device that moved
    /// replaces its previous address.
    pub fn record(
        &self,
        device_id: ObjectId,
        address: Address,
        max_apdu: u32,
        segmentation: Segmentation,
        vendor_id: u16,
    ) {
        debug!(%device_id, %address, "device binding recorded");
        self.bindings.insert(
            device_id,
            DeviceBinding {
                address,
                max_apdu,
                segmentation,
                vendor_id,
                seen_at: Instant::now(),
            },
        );
    }

    pub fn lookup(
        &self,
        device_id: &ObjectId,
    ) -> Option<DeviceBinding> {
        self.bindings.get(device_id).map(|b| b.clone())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

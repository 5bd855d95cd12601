use crate::ConfirmedService;
use crate::ObjectId;
use crate::PropertyReference;
use crate::PropertyValue;
use crate::ReadAccessSpecification;
use crate::Segmentation;

/// Decoded service request handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ReadProperty {
        invoke_id: u8,
        object_id: ObjectId,
        property: PropertyReference,
    },
    ReadPropertyMultiple {
        invoke_id: u8,
        specs: Vec<ReadAccessSpecification>,
    },
    WriteProperty {
        invoke_id: u8,
        object_id: ObjectId,
        value: PropertyValue,
    },
    /// SubscribeCOV when `property` is `None`, SubscribeCOVProperty
    /// otherwise.
    SubscribeCov {
        invoke_id: u8,
        process_id: u32,
        object_id: ObjectId,
        property: Option<PropertyReference>,
        cancellation: bool,
        issue_confirmed: bool,
        /// Seconds; 0 means indefinite
        lifetime: u32,
        cov_increment: Option<f32>,
    },
    WhoIs {
        low_limit: Option<u32>,
        high_limit: Option<u32>,
    },
    IAm {
        device_id: ObjectId,
        max_apdu: u32,
        segmentation: Segmentation,
        vendor_id: u16,
    },
}

impl Request {
    /// Service the request answers to; `None` for unconfirmed services.
    pub fn confirmed_service(&self) -> Option<ConfirmedService> {
        match self {
            Request::ReadProperty { .. } => Some(ConfirmedService::ReadProperty),
            Request::ReadPropertyMultiple { .. } => Some(ConfirmedService::ReadPropertyMultiple),
            Request::WriteProperty { .. } => Some(ConfirmedService::WriteProperty),
            Request::SubscribeCov { property: None, .. } => Some(ConfirmedService::SubscribeCov),
            Request::SubscribeCov { property: Some(_), .. } => Some(ConfirmedService::SubscribeCovProperty),
            Request::WhoIs { .. } | Request::IAm { .. } => None,
        }
    }

    pub fn invoke_id(&self) -> Option<u8> {
        match self {
            Request::ReadProperty { invoke_id, .. }
            | Request::ReadPropertyMultiple { invoke_id, .. }
            | Request::WriteProperty { invoke_id, .. }
            | Request::SubscribeCov { invoke_id, .. } => Some(*invoke_id),
            Request::WhoIs { .. } | Request::IAm { .. } => None,
        }
    }

    /// Metric and log label
    pub fn service_name(&self) -> &'static str {
        match self {
            Request::ReadProperty { .. } => "read_property",
            Request::ReadPropertyMultiple { .. } => "read_property_multiple",
            Request::WriteProperty { .. } => "write_property",
            Request::SubscribeCov { property: None, .. } => "subscribe_cov",
            Request::SubscribeCov { property: Some(_), .. } => "subscribe_cov_property",
            Request::WhoIs { .. } => "who_is",
            Request::IAm { .. } => "i_am",
        }
    }
}

use crate::Address;
use crate::ConfirmedService;
use crate::ErrorClass;
use crate::ErrorCode;
use crate::ObjectId;
use crate::PropertyReference;
use crate::PropertyValue;
use crate::Segmentation;
use crate::Value;

/// One change-of-value notification, addressed to a single subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct CovNotification {
    pub address: Address,
    pub process_id: u32,
    pub device_id: ObjectId,
    pub monitored_object: ObjectId,
    /// Remaining subscription lifetime in seconds, 0 for indefinite
    pub time_remaining: u32,
    pub confirmed: bool,
    pub values: Vec<PropertyValue>,
}

/// Objects and properties requested by one read-multiple entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadAccessSpecification {
    pub object_id: ObjectId,
    pub properties: Vec<PropertyReference>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyResult {
    pub property: PropertyReference,
    pub value: std::result::Result<Vec<Value>, ErrorCode>,
}

/// Result for one [`ReadAccessSpecification`], in request order.
///
/// `results` is `Err` when the object itself could not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadAccessResult {
    pub object_id: ObjectId,
    pub results: std::result::Result<Vec<PropertyResult>, ErrorCode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    ReadProperty {
        invoke_id: u8,
        object_id: ObjectId,
        property: PropertyReference,
        values: Vec<Value>,
    },
    ReadPropertyMultiple {
        invoke_id: u8,
        results: Vec<ReadAccessResult>,
    },
    SimpleAck {
        invoke_id: u8,
        service: ConfirmedService,
    },
    Error {
        invoke_id: u8,
        service: ConfirmedService,
        class: ErrorClass,
        code: ErrorCode,
    },
    IAm {
        device_id: ObjectId,
        max_apdu: u32,
        segmentation: Segmentation,
        vendor_id: u16,
        broadcast: bool,
    },
}

impl Response {
    pub fn error(
        invoke_id: u8,
        service: ConfirmedService,
        code: ErrorCode,
    ) -> Self {
        Response::Error {
            invoke_id,
            service,
            class: code.class(),
            code,
        }
    }

    /// Invoke id of confirmed-service answers; `None` for unconfirmed PDUs.
    pub fn invoke_id(&self) -> Option<u8> {
        match self {
            Response::ReadProperty { invoke_id, .. }
            | Response::ReadPropertyMultiple { invoke_id, .. }
            | Response::SimpleAck { invoke_id, .. }
            | Response::Error { invoke_id, .. } => Some(*invoke_id),
            Response::IAm { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Response::Error { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Response::ReadProperty { .. } => "read_property_ack",
            Response::ReadPropertyMultiple { .. } => "read_property_multiple_ack",
            Response::SimpleAck { .. } => "simple_ack",
            Response::Error { .. } => "error",
            Response::IAm { .. } => "i_am",
        }
    }
}

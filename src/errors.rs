//! Error hierarchy of the device endpoint.
//!
//! Internal failures travel as [`Error`]. At the point a response must be
//! sent to a remote caller they are collapsed into an [`ErrorCode`] (plus an
//! [`ErrorClass`]) via [`Error::error_code`]; faults that have no protocol
//! meaning degrade to [`ErrorCode::Other`].

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

use crate::Address;
use crate::ObjectId;
use crate::PropertyReference;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (storage, network, task runtime)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Object or property access refused by the object store
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    /// Components that spawn work must be created inside a tokio runtime
    #[error("No tokio runtime available")]
    RuntimeUnavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The object store cannot serve requests at all
    #[error("Object store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Stored data does not match the object model
    #[error("Object {object} is inconsistent: {reason}")]
    Inconsistent { object: ObjectId, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Peer did not answer within its time budget
    #[error("Delivery to {address} timed out after {duration:?}")]
    Timeout { address: Address, duration: Duration },

    /// Transport-level send failure
    #[error("Failed to send to {address}: {reason}")]
    SendFailed { address: Address, reason: String },

    /// Peer answered with a reject/abort/error PDU
    #[error("Peer {address} rejected the request: {reason}")]
    Rejected { address: Address, reason: String },

    #[error("{0}")]
    SignalSendFailed(String),
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Unknown object {0}")]
    UnknownObject(ObjectId),

    #[error("Unknown property {property} on {object}")]
    UnknownProperty {
        object: ObjectId,
        property: PropertyReference,
    },

    #[error("Write access denied for {property} on {object}")]
    WriteAccessDenied {
        object: ObjectId,
        property: PropertyReference,
    },

    #[error("Value out of range for {property} on {object}")]
    ValueOutOfRange {
        object: ObjectId,
        property: PropertyReference,
    },

    #[error("Invalid array index for {property} on {object}")]
    InvalidArrayIndex {
        object: ObjectId,
        property: PropertyReference,
    },

    #[error("Invalid data type for {property} on {object}")]
    InvalidDataType {
        object: ObjectId,
        property: PropertyReference,
    },
}

/// Protocol-level error class sent alongside an [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Device,
    Object,
    Property,
    Services,
}

/// Enumerated outcome codes surfaced to remote callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UnknownObject,
    UnknownProperty,
    AccessDenied,
    OutOfRange,
    SubscriptionFailed,
    DeliveryTimeout,
    DeliveryFailed,
    Other,
}

impl ErrorCode {
    pub fn class(&self) -> ErrorClass {
        match self {
            ErrorCode::UnknownObject => ErrorClass::Object,
            ErrorCode::UnknownProperty | ErrorCode::AccessDenied | ErrorCode::OutOfRange => {
                ErrorClass::Property
            }
            ErrorCode::SubscriptionFailed => ErrorClass::Services,
            ErrorCode::DeliveryTimeout | ErrorCode::DeliveryFailed | ErrorCode::Other => {
                ErrorClass::Device
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnknownObject => "unknown_object",
            ErrorCode::UnknownProperty => "unknown_property",
            ErrorCode::AccessDenied => "access_denied",
            ErrorCode::OutOfRange => "out_of_range",
            ErrorCode::SubscriptionFailed => "subscription_failed",
            ErrorCode::DeliveryTimeout => "delivery_timeout",
            ErrorCode::DeliveryFailed => "delivery_failed",
            ErrorCode::Other => "other",
        }
    }
}

impl AccessError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AccessError::UnknownObject(_) => ErrorCode::UnknownObject,
            AccessError::UnknownProperty { .. } => ErrorCode::UnknownProperty,
            AccessError::WriteAccessDenied { .. } => ErrorCode::AccessDenied,
            AccessError::ValueOutOfRange { .. } => ErrorCode::OutOfRange,
            AccessError::InvalidArrayIndex { .. } | AccessError::InvalidDataType { .. } => ErrorCode::Other,
        }
    }
}

impl Error {
    /// Collapses this error into the code reported to a remote caller.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Error::Access(e) => e.error_code(),
            Error::System(SystemError::Network(NetworkError::Timeout { .. })) => ErrorCode::DeliveryTimeout,
            Error::System(SystemError::Network(_)) => ErrorCode::DeliveryFailed,
            _ => ErrorCode::Other,
        }
    }

    /// `true` for refusals that belong to one property or object; `false`
    /// for faults that should abort the whole request.
    pub fn is_access(&self) -> bool {
        matches!(self, Error::Access(_))
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::System(SystemError::Network(e))
    }
}

impl From<JoinError> for Error {
    fn from(e: JoinError) -> Self {
        Error::System(SystemError::TaskFailed(e))
    }
}

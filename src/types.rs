//! Identifiers and application values shared by the dispatcher, the COV
//! coordinator and the store/registry adaptors.
//!
//! Object types and property identifiers are open numeric newtypes with
//! named constants, so proprietary identifiers pass through untouched.

use std::fmt;
use std::net::IpAddr;
use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectType(pub u16);

impl ObjectType {
    pub const ANALOG_INPUT: Self = Self(0);
    pub const ANALOG_OUTPUT: Self = Self(1);
    pub const ANALOG_VALUE: Self = Self(2);
    pub const BINARY_INPUT: Self = Self(3);
    pub const BINARY_OUTPUT: Self = Self(4);
    pub const BINARY_VALUE: Self = Self(5);
    pub const DEVICE: Self = Self(8);
    pub const MULTI_STATE_INPUT: Self = Self(13);
    pub const MULTI_STATE_VALUE: Self = Self(19);

    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::ANALOG_INPUT => "analog-input",
            Self::ANALOG_OUTPUT => "analog-output",
            Self::ANALOG_VALUE => "analog-value",
            Self::BINARY_INPUT => "binary-input",
            Self::BINARY_OUTPUT => "binary-output",
            Self::BINARY_VALUE => "binary-value",
            Self::DEVICE => "device",
            Self::MULTI_STATE_INPUT => "multi-state-input",
            Self::MULTI_STATE_VALUE => "multi-state-value",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "proprietary-{}", self.0),
        }
    }
}

/// Identifies an object on the device (type + instance).
///
/// Immutable once assigned; used as the key of object locks and debounce
/// slots, so equality is purely structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    pub object_type: ObjectType,
    pub instance: u32,
}

impl ObjectId {
    pub const fn new(
        object_type: ObjectType,
        instance: u32,
    ) -> Self {
        Self {
            object_type,
            instance,
        }
    }

    pub const fn device(instance: u32) -> Self {
        Self::new(ObjectType::DEVICE, instance)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.instance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub u32);

impl PropertyId {
    /// Sentinel meaning "every property of the object".
    pub const ALL: Self = Self(8);
    pub const COV_INCREMENT: Self = Self(22);
    pub const DESCRIPTION: Self = Self(28);
    pub const OBJECT_IDENTIFIER: Self = Self(75);
    pub const OBJECT_LIST: Self = Self(76);
    pub const OBJECT_NAME: Self = Self(77);
    pub const OBJECT_TYPE: Self = Self(79);
    pub const OUT_OF_SERVICE: Self = Self(81);
    pub const PRESENT_VALUE: Self = Self(85);
    pub const PRIORITY_ARRAY: Self = Self(87);
    pub const PROTOCOL_SERVICES_SUPPORTED: Self = Self(97);
    pub const RELINQUISH_DEFAULT: Self = Self(104);
    pub const SEGMENTATION_SUPPORTED: Self = Self(107);
    pub const STATUS_FLAGS: Self = Self(111);
    pub const UNITS: Self = Self(117);
    pub const VENDOR_IDENTIFIER: Self = Self(120);

    pub fn is_all(&self) -> bool {
        *self == Self::ALL
    }

    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::ALL => "all",
            Self::COV_INCREMENT => "cov-increment",
            Self::DESCRIPTION => "description",
            Self::OBJECT_IDENTIFIER => "object-identifier",
            Self::OBJECT_LIST => "object-list",
            Self::OBJECT_NAME => "object-name",
            Self::OBJECT_TYPE => "object-type",
            Self::OUT_OF_SERVICE => "out-of-service",
            Self::PRESENT_VALUE => "present-value",
            Self::PRIORITY_ARRAY => "priority-array",
            Self::PROTOCOL_SERVICES_SUPPORTED => "protocol-services-supported",
            Self::RELINQUISH_DEFAULT => "relinquish-default",
            Self::SEGMENTATION_SUPPORTED => "segmentation-supported",
            Self::STATUS_FLAGS => "status-flags",
            Self::UNITS => "units",
            Self::VENDOR_IDENTIFIER => "vendor-identifier",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for PropertyId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "property-{}", self.0),
        }
    }
}

/// A property, optionally narrowed to one array element.
///
/// `array_index == Some(0)` addresses the array length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyReference {
    pub property_id: PropertyId,
    pub array_index: Option<u32>,
}

impl PropertyReference {
    pub const fn new(property_id: PropertyId) -> Self {
        Self {
            property_id,
            array_index: None,
        }
    }

    pub const fn element(
        property_id: PropertyId,
        index: u32,
    ) -> Self {
        Self {
            property_id,
            array_index: Some(index),
        }
    }
}

impl From<PropertyId> for PropertyReference {
    fn from(property_id: PropertyId) -> Self {
        Self::new(property_id)
    }
}

impl fmt::Display for PropertyReference {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.array_index {
            Some(index) => write!(f, "{}[{}]", self.property_id, index),
            None => write!(f, "{}", self.property_id),
        }
    }
}

/// Tagged application value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Unsigned(u32),
    Signed(i32),
    Real(f32),
    Double(f64),
    CharacterString(String),
    Enumerated(u32),
    BitString(Vec<bool>),
    ObjectId(ObjectId),
}

impl Value {
    /// Numeric view used by range checks and the simulation worker.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Unsigned(v) => Some(f64::from(*v)),
            Value::Signed(v) => Some(f64::from(*v)),
            Value::Real(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Enumerated(v) => Some(f64::from(*v)),
            _ => None,
        }
    }
}

/// Values of one property, as carried by read results, writes and COV
/// notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub property: PropertyReference,
    pub values: Vec<Value>,
    /// Write priority (1..=16); ignored on reads.
    pub priority: Option<u8>,
}

impl PropertyValue {
    pub fn new(
        property: impl Into<PropertyReference>,
        values: Vec<Value>,
    ) -> Self {
        Self {
            property: property.into(),
            values,
            priority: None,
        }
    }

    pub fn with_priority(
        mut self,
        priority: u8,
    ) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Opaque network address of a peer: network number plus MAC bytes.
///
/// For BACnet/IP the MAC is the 4-byte IPv4 address followed by the
/// big-endian UDP port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub network: u16,
    pub mac: Vec<u8>,
}

impl Address {
    pub fn new(
        network: u16,
        mac: Vec<u8>,
    ) -> Self {
        Self { network, mac }
    }

    pub fn local(mac: Vec<u8>) -> Self {
        Self::new(0, mac)
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        let mut mac = match addr.ip() {
            IpAddr::V4(ip) => ip.octets().to_vec(),
            IpAddr::V6(ip) => ip.octets().to_vec(),
        };
        mac.extend_from_slice(&addr.port().to_be_bytes());
        Self::local(mac)
    }
}

impl fmt::Display for Address {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.mac.len() == 6 {
            let m = &self.mac;
            let port = u16::from_be_bytes([m[4], m[5]]);
            write!(f, "{}.{}.{}.{}:{}", m[0], m[1], m[2], m[3], port)?;
        } else {
            for b in &self.mac {
                write!(f, "{:02x}", b)?;
            }
        }
        if self.network != 0 {
            write!(f, "@{}", self.network)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segmentation {
    Both,
    Transmit,
    Receive,
    None,
}

impl Segmentation {
    pub fn as_enumerated(&self) -> u32 {
        match self {
            Segmentation::Both => 0,
            Segmentation::Transmit => 1,
            Segmentation::Receive => 2,
            Segmentation::None => 3,
        }
    }
}

/// Confirmed services answered by the dispatcher; tags acks and error
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmedService {
    ReadProperty,
    ReadPropertyMultiple,
    WriteProperty,
    SubscribeCov,
    SubscribeCovProperty,
}

/// Bit positions of the protocol-services-supported bit string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceSupported {
    ConfirmedCovNotification = 1,
    SubscribeCov = 5,
    ReadProperty = 12,
    ReadPropertyMultiple = 14,
    WriteProperty = 15,
    IAm = 26,
    UnconfirmedCovNotification = 28,
    WhoIs = 34,
    SubscribeCovProperty = 38,
}

pub const SERVICES_SUPPORTED_BITS: usize = 41;

/// Encodes a set of supported services as the device's bit string value.
pub fn services_supported_bits(services: &[ServiceSupported]) -> Value {
    let mut bits = vec![false; SERVICES_SUPPORTED_BITS];
    for service in services {
        bits[*service as usize] = true;
    }
    Value::BitString(bits)
}

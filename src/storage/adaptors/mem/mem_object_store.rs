//! In-memory object store.
//!
//! Holds a static device model: objects are defined up front with
//! [`MemObject`] and never created or deleted over the network. Each
//! property carries its own access rule (read-only, writable, writable
//! within a numeric range).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use tracing::trace;

use crate::constants::SIMULATION_SOURCE_INSTANCE;
use crate::constants::SIMULATION_TARGET_INSTANCE;
use crate::services_supported_bits;
use crate::AccessError;
use crate::DeviceConfig;
use crate::ObjectId;
use crate::ObjectStore;
use crate::ObjectType;
use crate::PropertyId;
use crate::PropertyReference;
use crate::PropertyValue;
use crate::Result;
use crate::ServiceSupported;
use crate::Value;
use crate::WriteListener;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Access {
    ReadOnly,
    Writable,
    Range { min: f64, max: f64 },
}

#[derive(Debug, Clone)]
struct PropertyEntry {
    values: Vec<Value>,
    access: Access,
}

/// Definition of one object, inserted with [`MemObjectStore::insert`].
#[derive(Debug, Clone)]
pub struct MemObject {
    id: ObjectId,
    properties: BTreeMap<PropertyId, PropertyEntry>,
}

impl MemObject {
    /// Starts an object with its identifier, name and type properties.
    pub fn new(
        id: ObjectId,
        name: &str,
    ) -> Self {
        Self {
            id,
            properties: BTreeMap::new(),
        }
        .read_only(PropertyId::OBJECT_IDENTIFIER, vec![Value::ObjectId(id)])
        .read_only(PropertyId::OBJECT_NAME, vec![Value::CharacterString(name.to_string())])
        .read_only(PropertyId::OBJECT_TYPE, vec![Value::Enumerated(u32::from(id.object_type.0))])
    }

    pub fn read_only(
        self,
        property_id: PropertyId,
        values: Vec<Value>,
    ) -> Self {
        self.with(property_id, values, Access::ReadOnly)
    }

    pub fn writable(
        self,
        property_id: PropertyId,
        values: Vec<Value>,
    ) -> Self {
        self.with(property_id, values, Access::Writable)
    }

    /// Writable, numeric values only, each within `min..=max`.
    pub fn writable_in_range(
        self,
        property_id: PropertyId,
        values: Vec<Value>,
        min: f64,
        max: f64,
    ) -> Self {
        self.with(property_id, values, Access::Range { min, max })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    fn with(
        mut self,
        property_id: PropertyId,
        values: Vec<Value>,
        access: Access,
    ) -> Self {
        self.properties.insert(property_id, PropertyEntry { values, access });
        self
    }
}

struct StoredObject {
    properties: BTreeMap<PropertyId, PropertyEntry>,
    listeners: Vec<Arc<dyn WriteListener>>,
}

#[derive(Default)]
pub struct MemObjectStore {
    objects: RwLock<BTreeMap<ObjectId, StoredObject>>,
}

impl std::fmt::Debug for MemObjectStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("MemObjectStore")
            .field("objects", &self.objects.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl MemObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device object plus `AV:0` (coefficient, writable 0..=100) and
    /// `AI:0` (simulated input) as served by the sample endpoint.
    pub fn basic_device(config: &DeviceConfig) -> Self {
        let device_id = ObjectId::device(config.device_id);
        let source = ObjectId::new(ObjectType::ANALOG_VALUE, SIMULATION_SOURCE_INSTANCE);
        let target = ObjectId::new(ObjectType::ANALOG_INPUT, SIMULATION_TARGET_INSTANCE);

        let store = Self::new();
        store.insert(
            MemObject::new(device_id, &config.object_name)
                .read_only(PropertyId::VENDOR_IDENTIFIER, vec![Value::Unsigned(u32::from(config.vendor_id))])
                .read_only(
                    PropertyId::SEGMENTATION_SUPPORTED,
                    vec![Value::Enumerated(config.segmentation.as_enumerated())],
                )
                .read_only(PropertyId::PROTOCOL_SERVICES_SUPPORTED, vec![services_supported_bits(&[])])
                .read_only(
                    PropertyId::OBJECT_LIST,
                    vec![Value::ObjectId(device_id), Value::ObjectId(source), Value::ObjectId(target)],
                ),
        );
        store.insert(
            MemObject::new(source, "Coefficient")
                .writable_in_range(PropertyId::PRESENT_VALUE, vec![Value::Real(1.0)], 0.0, 100.0)
                .read_only(PropertyId::STATUS_FLAGS, vec![Value::BitString(vec![false; 4])])
                .read_only(PropertyId::UNITS, vec![Value::Enumerated(95)]),
        );
        store.insert(
            MemObject::new(target, "Sine")
                .writable(PropertyId::PRESENT_VALUE, vec![Value::Real(0.0)])
                .read_only(PropertyId::STATUS_FLAGS, vec![Value::BitString(vec![false; 4])])
                .read_only(PropertyId::UNITS, vec![Value::Enumerated(95)])
                .writable(PropertyId::DESCRIPTION, vec![Value::CharacterString("AV:0 * sin(t)".into())]),
        );
        store
    }

    /// Adds or replaces an object. Listeners of a replaced object are kept.
    pub fn insert(
        &self,
        object: MemObject,
    ) {
        let mut objects = self.objects.write();
        let listeners = objects.remove(&object.id).map(|o| o.listeners).unwrap_or_default();
        debug!(object_id = %object.id, properties = object.properties.len(), "object inserted");
        objects.insert(
            object.id,
            StoredObject {
                properties: object.properties,
                listeners,
            },
        );
    }

    /// Sets a property without access checks (device-local updates such as
    /// the supported-services bitmap). Listeners fire as for network writes.
    pub fn set_local(
        &self,
        object_id: ObjectId,
        property_id: PropertyId,
        values: Vec<Value>,
    ) -> Result<()> {
        let listeners = {
            let mut objects = self.objects.write();
            let object = objects.get_mut(&object_id).ok_or(AccessError::UnknownObject(object_id))?;
            let entry = object.properties.get_mut(&property_id).ok_or(AccessError::UnknownProperty {
                object: object_id,
                property: property_id.into(),
            })?;
            entry.values = values;
            object.listeners.clone()
        };
        fire(&listeners, object_id, property_id);
        Ok(())
    }

    /// Publishes the services the dispatcher answers on the device object.
    pub fn publish_services_supported(
        &self,
        device_id: ObjectId,
        services: &[ServiceSupported],
    ) -> Result<()> {
        self.set_local(
            device_id,
            PropertyId::PROTOCOL_SERVICES_SUPPORTED,
            vec![services_supported_bits(services)],
        )
    }
}

fn fire(
    listeners: &[Arc<dyn WriteListener>],
    object_id: ObjectId,
    property_id: PropertyId,
) {
    for listener in listeners {
        listener.notify_write(object_id, property_id);
    }
}

fn check_range(
    values: &[Value],
    min: f64,
    max: f64,
    object: ObjectId,
    property: PropertyReference,
) -> std::result::Result<(), AccessError> {
    for value in values {
        match value.as_f64() {
            Some(v) if v >= min && v <= max => {}
            Some(_) => return Err(AccessError::ValueOutOfRange { object, property }),
            None => return Err(AccessError::InvalidDataType { object, property }),
        }
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for MemObjectStore {
    async fn find_object(
        &self,
        object_id: ObjectId,
    ) -> Result<Option<ObjectId>> {
        Ok(self.objects.read().contains_key(&object_id).then_some(object_id))
    }

    fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.read().keys().copied().collect()
    }

    async fn read_property(
        &self,
        object_id: ObjectId,
        property: PropertyReference,
    ) -> Result<Vec<Value>> {
        let objects = self.objects.read();
        let object = objects.get(&object_id).ok_or(AccessError::UnknownObject(object_id))?;
        let entry = object
            .properties
            .get(&property.property_id)
            .ok_or(AccessError::UnknownProperty {
                object: object_id,
                property,
            })?;

        match property.array_index {
            None => Ok(entry.values.clone()),
            Some(0) => Ok(vec![Value::Unsigned(entry.values.len() as u32)]),
            Some(index) => entry
                .values
                .get(index as usize - 1)
                .map(|v| vec![v.clone()])
                .ok_or_else(|| {
                    AccessError::InvalidArrayIndex {
                        object: object_id,
                        property,
                    }
                    .into()
                }),
        }
    }

    async fn read_all_properties(
        &self,
        object_id: ObjectId,
    ) -> Result<Vec<PropertyValue>> {
        let objects = self.objects.read();
        let object = objects.get(&object_id).ok_or(AccessError::UnknownObject(object_id))?;
        Ok(object
            .properties
            .iter()
            .map(|(id, entry)| PropertyValue::new(*id, entry.values.clone()))
            .collect())
    }

    async fn write_property(
        &self,
        object_id: ObjectId,
        value: PropertyValue,
    ) -> Result<()> {
        let property = value.property;
        let listeners = {
            let mut objects = self.objects.write();
            let object = objects.get_mut(&object_id).ok_or(AccessError::UnknownObject(object_id))?;
            let entry = object
                .properties
                .get_mut(&property.property_id)
                .ok_or(AccessError::UnknownProperty {
                    object: object_id,
                    property,
                })?;

            match entry.access {
                Access::ReadOnly => {
                    return Err(AccessError::WriteAccessDenied {
                        object: object_id,
                        property,
                    }
                    .into())
                }
                Access::Range { min, max } => check_range(&value.values, min, max, object_id, property)?,
                Access::Writable => {}
            }
            if value.values.is_empty() {
                return Err(AccessError::InvalidDataType {
                    object: object_id,
                    property,
                }
                .into());
            }

            match property.array_index {
                None => entry.values = value.values,
                Some(index) => {
                    let slot = (index as usize)
                        .checked_sub(1)
                        .and_then(|i| entry.values.get_mut(i))
                        .ok_or(AccessError::InvalidArrayIndex {
                            object: object_id,
                            property,
                        })?;
                    *slot = value.values.into_iter().next().unwrap_or(Value::Null);
                }
            }
            trace!(%object_id, %property, priority = ?value.priority, "property written");
            object.listeners.clone()
        };

        fire(&listeners, object_id, property.property_id);
        Ok(())
    }

    fn register_write_listener(
        &self,
        object_id: ObjectId,
        listener: Arc<dyn WriteListener>,
    ) -> Result<()> {
        let mut objects = self.objects.write();
        let object = objects.get_mut(&object_id).ok_or(AccessError::UnknownObject(object_id))?;
        object.listeners.push(listener);
        Ok(())
    }
}

//! Clients for the interfaces every bus peer implements
//! (`org.freedesktop.DBus.Properties`, `org.freedesktop.DBus.ObjectManager`)
//! and for the bus daemon's `NameOwnerChanged` signal.

use crate::connection::Connection;
use crate::error::RuntimeResult;
use crate::message::{MessageReader, SignalMessage};
use crate::value::Value;
use futures::{future, Stream, StreamExt};
use indexmap::IndexMap;

pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";
pub const OBJECT_MANAGER_INTERFACE: &str = "org.freedesktop.DBus.ObjectManager";
pub const BUS_NAME: &str = "org.freedesktop.DBus";
pub const BUS_PATH: &str = "/org/freedesktop/DBus";

/// Properties of each interface on an object, keyed by interface name
pub type InterfaceProperties = IndexMap<String, IndexMap<String, Value>>;

/// `PropertiesChanged(s interface, a{sv} changed, as invalidated)`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub interface: String,
    pub changed: IndexMap<String, Value>,
    pub invalidated: Vec<String>,
    pub path: String,
    pub sender: String,
}

impl PropertyChange {
    pub fn decode(mut signal: SignalMessage) -> RuntimeResult<Self> {
        Ok(Self {
            interface: signal.read_string()?,
            changed: signal.read_string_variant_dict()?,
            invalidated: signal.read_string_array()?,
            path: signal.path,
            sender: signal.sender,
        })
    }
}

/// `NameOwnerChanged(s name, s old_owner, s new_owner)`; empty owners
/// become `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameOwnerChange {
    pub name: String,
    pub old_owner: Option<String>,
    pub new_owner: Option<String>,
}

impl NameOwnerChange {
    pub fn decode(mut signal: SignalMessage) -> RuntimeResult<Self> {
        let non_empty = |owner: String| if owner.is_empty() { None } else { Some(owner) };
        Ok(Self {
            name: signal.read_string()?,
            old_owner: non_empty(signal.read_string()?),
            new_owner: non_empty(signal.read_string()?),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfacesAdded {
    pub path: String,
    pub interfaces: InterfaceProperties,
}

impl InterfacesAdded {
    pub fn decode(mut signal: SignalMessage) -> RuntimeResult<Self> {
        Ok(Self {
            path: signal.read_object_path()?,
            interfaces: read_interface_properties(&mut signal)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfacesRemoved {
    pub path: String,
    pub interfaces: Vec<String>,
}

impl InterfacesRemoved {
    pub fn decode(mut signal: SignalMessage) -> RuntimeResult<Self> {
        Ok(Self {
            path: signal.read_object_path()?,
            interfaces: signal.read_string_array()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObject {
    pub path: String,
    pub interfaces: InterfaceProperties,
}

fn read_interface_properties<R: MessageReader>(reader: &mut R) -> RuntimeResult<InterfaceProperties> {
    reader.read_dict(
        "{sa{sv}}",
        |message| message.read_string(),
        |message| message.read_string_variant_dict(),
    )
}

impl Connection {
    /// `PropertiesChanged` signals, optionally limited to one object path
    /// and one interface
    pub fn property_changes(
        &self,
        path: Option<&str>,
        interface: Option<&str>,
    ) -> RuntimeResult<impl Stream<Item = RuntimeResult<PropertyChange>>> {
        let wanted = interface.map(str::to_string);
        let stream = self.subscribe(PROPERTIES_INTERFACE, "PropertiesChanged", path, None)?;
        Ok(stream.map(PropertyChange::decode).filter(move |change| {
            let keep = match (change, &wanted) {
                (Ok(change), Some(wanted)) => change.interface == *wanted,
                _ => true,
            };
            future::ready(keep)
        }))
    }

    /// Ownership changes of bus names, optionally for a single name
    pub fn name_owner_changes(
        &self,
        name: Option<&str>,
    ) -> RuntimeResult<impl Stream<Item = RuntimeResult<NameOwnerChange>>> {
        let wanted = name.map(str::to_string);
        let stream = self.subscribe(BUS_NAME, "NameOwnerChanged", Some(BUS_PATH), None)?;
        Ok(stream.map(NameOwnerChange::decode).filter(move |change| {
            let keep = match (change, &wanted) {
                (Ok(change), Some(wanted)) => change.name == *wanted,
                _ => true,
            };
            future::ready(keep)
        }))
    }
}

/// Client for `org.freedesktop.DBus.ObjectManager` on one object
#[derive(Debug, Clone)]
pub struct ObjectManager {
    bus: Connection,
    destination: String,
    path: String,
}

impl ObjectManager {
    pub fn new(bus: Connection, destination: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bus,
            destination: destination.into(),
            path: path.into(),
        }
    }

    pub async fn get_managed_objects(&self) -> RuntimeResult<IndexMap<String, ManagedObject>> {
        let call = self.bus.new_method_call(
            &self.destination,
            &self.path,
            OBJECT_MANAGER_INTERFACE,
            "GetManagedObjects",
        );
        let mut reply = call.await_reply(&self.bus).await?;
        let raw = reply.read_dict(
            "{oa{sa{sv}}}",
            |message| message.read_object_path(),
            |message| read_interface_properties(message),
        )?;

        Ok(raw
            .into_iter()
            .map(|(path, interfaces)| {
                let object = ManagedObject {
                    path: path.clone(),
                    interfaces,
                };
                (path, object)
            })
            .collect())
    }

    pub fn interfaces_added(
        &self,
    ) -> RuntimeResult<impl Stream<Item = RuntimeResult<InterfacesAdded>>> {
        let stream = self.bus.subscribe(
            OBJECT_MANAGER_INTERFACE,
            "InterfacesAdded",
            Some(self.path.as_str()),
            Some(self.destination.as_str()),
        )?;
        Ok(stream.map(InterfacesAdded::decode))
    }

    pub fn interfaces_removed(
        &self,
    ) -> RuntimeResult<impl Stream<Item = RuntimeResult<InterfacesRemoved>>> {
        let stream = self.bus.subscribe(
            OBJECT_MANAGER_INTERFACE,
            "InterfacesRemoved",
            Some(self.path.as_str()),
            Some(self.destination.as_str()),
        )?;
        Ok(stream.map(InterfacesRemoved::decode))
    }
}

// Generated by busgen from usb.xml. Do not edit.

use busgen_runtime::{Connection, IndexMap, MessageReader, MessageWriter, RuntimeResult, Stream, StreamExt, Value};

#[derive(Debug, Clone)]
pub struct UsbPortal {
    bus: Connection,
    destination: String,
    path: String,
}

#[allow(non_snake_case)]
impl UsbPortal {
    pub const INTERFACE_NAME: &'static str = "org.freedesktop.portal.Usb";

    pub fn new(bus: Connection, destination: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bus,
            destination: destination.into(),
            path: path.into(),
        }
    }

    pub async fn createSession(&self, options: IndexMap<String, Value>) -> RuntimeResult<String> {
        let mut method_call = self.bus.new_method_call(&self.destination, &self.path, Self::INTERFACE_NAME, "CreateSession");
        method_call.write_map_variant(&options)?;
        let mut reply = method_call.await_reply(&self.bus).await?;
        reply.read_object_path()
    }

    pub async fn enumerateDevices(&self, options: IndexMap<String, Value>) -> RuntimeResult<Vec<(String, IndexMap<String, Value>)>> {
        let mut method_call = self.bus.new_method_call(&self.destination, &self.path, Self::INTERFACE_NAME, "EnumerateDevices");
        method_call.write_map_variant(&options)?;
        let mut reply = method_call.await_reply(&self.bus).await?;
        reply.read_struct_pair_array("(sa{sv})", |message| message.read_string(), |message| message.read_string_variant_dict())
    }

    pub async fn acquireDevices(&self, parentWindow: String, devices: Vec<(String, IndexMap<String, Value>)>, options: IndexMap<String, Value>) -> RuntimeResult<String> {
        let mut method_call = self.bus.new_method_call(&self.destination, &self.path, Self::INTERFACE_NAME, "AcquireDevices");
        method_call.write_string(&parentWindow)?;
        method_call.write_struct_pair_array("(sa{sv})", &devices, |message, value| message.write_string(value), |message, value| message.write_map_variant(value))?;
        method_call.write_map_variant(&options)?;
        let mut reply = method_call.await_reply(&self.bus).await?;
        reply.read_object_path()
    }

    pub async fn finishAcquireDevices(&self, objectPath: String, options: IndexMap<String, Value>) -> RuntimeResult<usb_portal::FinishAcquireDevicesResult> {
        let mut method_call = self.bus.new_method_call(&self.destination, &self.path, Self::INTERFACE_NAME, "FinishAcquireDevices");
        method_call.write_object_path(&objectPath)?;
        method_call.write_map_variant(&options)?;
        let mut reply = method_call.await_reply(&self.bus).await?;
        Ok(usb_portal::FinishAcquireDevicesResult {
            results: reply.read_struct_pair_array("(sa{sv})", |message| message.read_string(), |message| message.read_string_variant_dict())?,
            finished: reply.read_bool()?,
        })
    }

    pub async fn releaseDevices(&self, devices: Vec<String>, options: IndexMap<String, Value>) -> RuntimeResult<()> {
        let mut method_call = self.bus.new_method_call(&self.destination, &self.path, Self::INTERFACE_NAME, "ReleaseDevices");
        method_call.write_string_array(&devices)?;
        method_call.write_map_variant(&options)?;
        method_call.await_reply(&self.bus).await?;
        Ok(())
    }

    pub fn deviceEvents(&self) -> RuntimeResult<impl Stream<Item = RuntimeResult<usb_portal::DeviceEventsEvent>>> {
        let stream = self.bus.subscribe(Self::INTERFACE_NAME, "DeviceEvents", Some(self.path.as_str()), Some(self.destination.as_str()))?;
        Ok(stream.map(|mut signal| -> RuntimeResult<usb_portal::DeviceEventsEvent> {
            Ok(usb_portal::DeviceEventsEvent {
                sessionHandle: signal.read_object_path()?,
                events: signal.read_struct_triple_array("(ssa{sv})", |message| message.read_string(), |message| message.read_string(), |message| message.read_string_variant_dict())?,
            })
        }))
    }

    pub async fn getVersion(&self) -> RuntimeResult<u32> {
        self.bus.get_property::<u32>(&self.destination, &self.path, Self::INTERFACE_NAME, "version").await
    }
}

pub mod usb_portal {
    use super::{IndexMap, Value};

    #[derive(Debug, Clone, PartialEq)]
    pub struct FinishAcquireDevicesResult {
        pub results: Vec<(String, IndexMap<String, Value>)>,
        pub finished: bool,
    }

    #[allow(non_snake_case)]
    #[derive(Debug, Clone, PartialEq)]
    pub struct DeviceEventsEvent {
        pub sessionHandle: String,
        pub events: Vec<(String, String, IndexMap<String, Value>)>,
    }
}

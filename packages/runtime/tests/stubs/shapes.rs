// Generated by busgen from shapes.xml. Do not edit.

use busgen_runtime::{Connection, IndexMap, MessageReader, MessageWriter, RuntimeResult, Stream, StreamExt, Value};

#[derive(Debug, Clone)]
pub struct Shapes {
    bus: Connection,
    destination: String,
    path: String,
}

#[allow(non_snake_case)]
impl Shapes {
    pub const INTERFACE_NAME: &'static str = "org.example.Shapes";

    pub fn new(bus: Connection, destination: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bus,
            destination: destination.into(),
            path: path.into(),
        }
    }

    pub async fn resize(&self, bounds: Vec<u32>, label: Vec<String>) -> RuntimeResult<Vec<u32>> {
        let mut method_call = self.bus.new_method_call(&self.destination, &self.path, Self::INTERFACE_NAME, "Resize");
        method_call.write_struct("(uuuu)", |message| { message.write_u32(bounds[0])?; message.write_u32(bounds[1])?; message.write_u32(bounds[2])?; message.write_u32(bounds[3])?; Ok(()) })?;
        method_call.write_struct("(s)", |message| message.write_string(&label[0]))?;
        let mut reply = method_call.await_reply(&self.bus).await?;
        reply.read_struct("(uuuu)", |message| Ok(vec![message.read_u32()?, message.read_u32()?, message.read_u32()?, message.read_u32()?]))
    }

    pub async fn describe(&self, layer: Vec<Value>) -> RuntimeResult<Vec<Value>> {
        let mut method_call = self.bus.new_method_call(&self.destination, &self.path, Self::INTERFACE_NAME, "Describe");
        method_call.write_struct("(s(subh)uu)", |message| { message.write_string(&layer[0].cast::<String>()?)?; message.write_struct("(subh)", |message| { message.write_string(&layer[1].cast::<Vec<Value>>()?[0].cast::<String>()?)?; message.write_u32(layer[1].cast::<Vec<Value>>()?[1].cast::<u32>()?)?; message.write_bool(layer[1].cast::<Vec<Value>>()?[2].cast::<bool>()?)?; message.write_fd(layer[1].cast::<Vec<Value>>()?[3].cast::<i32>()?)?; Ok(()) })?; message.write_u32(layer[2].cast::<u32>()?)?; message.write_u32(layer[3].cast::<u32>()?)?; Ok(()) })?;
        let mut reply = method_call.await_reply(&self.bus).await?;
        reply.read_struct("(sa{sv}ub)", |message| Ok(vec![Value::from(message.read_string()?), Value::from(message.read_string_variant_dict()?), Value::from(message.read_u32()?), Value::from(message.read_bool()?)]))
    }

    pub async fn post(&self, message_: Vec<Value>, entries: Vec<Vec<Value>>) -> RuntimeResult<Vec<Vec<Value>>> {
        let mut method_call = self.bus.new_method_call(&self.destination, &self.path, Self::INTERFACE_NAME, "Post");
        method_call.write_struct("(subh)", |message| { message.write_string(&message_[0].cast::<String>()?)?; message.write_u32(message_[1].cast::<u32>()?)?; message.write_bool(message_[2].cast::<bool>()?)?; message.write_fd(message_[3].cast::<i32>()?)?; Ok(()) })?;
        method_call.write_struct_array("(subh)", &entries, |message, item| { message.write_string(&item[0].cast::<String>()?)?; message.write_u32(item[1].cast::<u32>()?)?; message.write_bool(item[2].cast::<bool>()?)?; message.write_fd(item[3].cast::<i32>()?)?; Ok(()) })?;
        let mut reply = method_call.await_reply(&self.bus).await?;
        reply.read_struct_array("(subh)", |message| Ok(vec![Value::from(message.read_string()?), Value::from(message.read_u32()?), Value::from(message.read_bool()?), Value::Fd(message.read_fd()?)]))
    }

    pub async fn group(&self, groups: IndexMap<String, Value>) -> RuntimeResult<IndexMap<String, Value>> {
        let mut method_call = self.bus.new_method_call(&self.destination, &self.path, Self::INTERFACE_NAME, "Group");
        method_call.write_dict("{sa(suu)}", &groups, |message, key| message.write_string(key), |message, value| message.write_typed_value("a(suu)", value))?;
        let mut reply = method_call.await_reply(&self.bus).await?;
        reply.read_dict("{sa(suu)}", |message| message.read_string(), |message| message.read_dynamic_value())
    }

    pub async fn mix(&self, values: Vec<Value>, pair: (Value, Value)) -> RuntimeResult<shapes::MixResult> {
        let mut method_call = self.bus.new_method_call(&self.destination, &self.path, Self::INTERFACE_NAME, "Mix");
        method_call.write_array("v", &values, |message, item| message.write_variant(item))?;
        method_call.write_struct_pair(&pair, |message, value| message.write_variant(value), |message, value| message.write_variant(value))?;
        let mut reply = method_call.await_reply(&self.bus).await?;
        Ok(shapes::MixResult {
            values: reply.read_array("v", |message| message.read_variant())?,
            pair: reply.read_struct_pair(|message| message.read_variant(), |message| message.read_variant())?,
        })
    }

    pub fn moved(&self) -> RuntimeResult<impl Stream<Item = RuntimeResult<shapes::MovedEvent>>> {
        let stream = self.bus.subscribe(Self::INTERFACE_NAME, "Moved", Some(self.path.as_str()), Some(self.destination.as_str()))?;
        Ok(stream.map(|mut signal| -> RuntimeResult<shapes::MovedEvent> {
            Ok(shapes::MovedEvent {
                handle: signal.read_object_path()?,
                layer: signal.read_struct("(s(subh)uu)", |message| Ok(vec![Value::from(message.read_string()?), Value::from_fields(message.read_struct("(subh)", |message| Ok(vec![Value::from(message.read_string()?), Value::from(message.read_u32()?), Value::from(message.read_bool()?), Value::Fd(message.read_fd()?)]))?), Value::from(message.read_u32()?), Value::from(message.read_u32()?)]))?,
            })
        }))
    }

    pub async fn getBounds(&self) -> RuntimeResult<Vec<u32>> {
        self.bus.get_property::<Vec<u32>>(&self.destination, &self.path, Self::INTERFACE_NAME, "Bounds").await
    }

    pub async fn setBounds(&self, value: Vec<u32>) -> RuntimeResult<()> {
        self.bus.set_property(&self.destination, &self.path, Self::INTERFACE_NAME, "Bounds", "(uuuu)", Value::from_fields(value)).await
    }

    pub async fn getLayers(&self) -> RuntimeResult<Vec<Vec<Value>>> {
        self.bus.get_property::<Vec<Vec<Value>>>(&self.destination, &self.path, Self::INTERFACE_NAME, "Layers").await
    }

    pub async fn setLayers(&self, value: Vec<Vec<Value>>) -> RuntimeResult<()> {
        self.bus.set_property(&self.destination, &self.path, Self::INTERFACE_NAME, "Layers", "a(suuu)", Value::from_field_lists(value)).await
    }
}

pub mod shapes {
    use super::{Value};

    #[derive(Debug, Clone, PartialEq)]
    pub struct MixResult {
        pub values: Vec<Value>,
        pub pair: (Value, Value),
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct MovedEvent {
        pub handle: String,
        pub layer: Vec<Value>,
    }
}

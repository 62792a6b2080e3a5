//! # busgen-runtime
//!
//! Everything a generated client stub calls into: the [`Connection`] handle,
//! the message read/write catalogue ([`MessageWriter`], [`MessageReader`]),
//! dynamic [`Value`]s and signal subscriptions.
//!
//! ```rust
//! use busgen_runtime::{Body, MessageReader, MessageWriter};
//!
//! let mut body = Body::new();
//! body.write_object_path("/org/freedesktop/portal/desktop").unwrap();
//! assert_eq!(body.read_object_path().unwrap(), "/org/freedesktop/portal/desktop");
//! ```

pub mod connection;
pub mod error;
pub mod message;
pub mod standard;
pub mod subscription;
pub mod transport;
pub mod value;

pub use connection::{Connection, SignalHandle, SignalStream};
pub use error::{RuntimeError, RuntimeResult};
pub use message::{
    Body, ContainerKind, MessageReader, MessageWriter, MethodCall, Reply, SignalMessage, Token,
};
pub use standard::{
    InterfacesAdded, InterfacesRemoved, ManagedObject, NameOwnerChange, ObjectManager,
    PropertyChange,
};
pub use subscription::{MatchRule, MatchState, Subscriber, SubscriberId, SubscriptionTable};
pub use transport::{MockTransport, Transport};
pub use value::{FromValue, Value};

// Re-exported so generated code only depends on this crate
pub use futures::{Stream, StreamExt};
pub use indexmap::IndexMap;

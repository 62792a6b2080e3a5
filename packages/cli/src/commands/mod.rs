pub mod compile;
pub mod init;
pub mod inspect;

pub use compile::{compile, CompileArgs};
pub use init::{init, InitArgs};
pub use inspect::{inspect, InspectArgs};

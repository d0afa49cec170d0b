// src/communication/mod.rs - Message plumbing between tasks and to the outside

pub mod channel;
pub mod echo_server;

pub use channel::{link, DeviceLink, PlannerLink, ACK_TOKEN};
pub use echo_server::EchoServer;

//! ScopeBridge Library
//!
//! Relays a serial-connected device to any number of WebSocket
//! subscribers. Device lines are broadcast to every subscriber; subscriber
//! messages go back to the device unless a reserved control prefix routes
//! them to the mount controller or to a snapshot file.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::domain::error::{RelayError, RelayResult};
pub use crate::domain::config::RelayConfig;
pub use crate::domain::types::{LinkState, SubscriberId};
pub use crate::core::relay::{ControlMessage, ControlSinks, Relay, RelayEvent, Route};

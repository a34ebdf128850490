use crate::domain::types::SubscriberId;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Discrete inputs to the relay loop.
///
/// Every producer (WebSocket sessions, the serial reader, the device
/// writer) talks to the relay only through these events, so relay state is
/// touched by exactly one task.
#[derive(Debug)]
pub enum RelayEvent {
    /// A subscriber finished its handshake
    Connected {
        id: SubscriberId,
        addr: SocketAddr,
        outbox: mpsc::UnboundedSender<String>,
    },
    /// A subscriber closed or failed
    Disconnected { id: SubscriberId },
    /// Raw text received from a subscriber
    FromSubscriber { id: SubscriberId, message: String },
    /// One complete line read from the device
    FromDevice { line: String },
    /// The device link hit an I/O error and will not be reopened
    DeviceClosed { reason: String },
}

pub type EventSender = mpsc::UnboundedSender<RelayEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<RelayEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

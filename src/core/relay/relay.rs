use crate::core::relay::control::ControlMessage;
use crate::core::relay::event::{EventReceiver, RelayEvent};
use crate::core::relay::subscriber::{Subscriber, SubscriberSet};
use crate::domain::config::SinkConfig;
use crate::domain::types::{LinkState, SubscriberId};
use crate::infrastructure::sink::{FileSink, Outlet, WriteMode};
use std::future::Future;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Where a subscriber message ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Logged,
    MoveScope,
    Position,
    Telemetry,
    Device,
    Dropped,
}

/// Outlets for the three side-effecting control prefixes
#[derive(Debug)]
pub struct ControlSinks {
    pub move_scope: Outlet,
    pub position: Outlet,
    pub telemetry: Outlet,
}

impl ControlSinks {
    /// Spawn file writers for the configured paths. Must run inside a Tokio runtime.
    pub fn from_config(config: &SinkConfig) -> Self {
        Self {
            move_scope: Outlet::spawn(FileSink::new(&config.move_scope_path, WriteMode::Append)),
            position: Outlet::spawn(FileSink::new(&config.position_path, WriteMode::Overwrite)),
            telemetry: Outlet::spawn(FileSink::new(&config.telemetry_path, WriteMode::Overwrite)),
        }
    }

    pub async fn close(self) {
        self.move_scope.close().await;
        self.position.close().await;
        self.telemetry.close().await;
    }
}

/// Fans device lines out to subscribers and routes subscriber messages.
///
/// The relay owns all shared state: the subscriber set, the device outlet
/// and the control sinks. It is driven one event at a time, either directly
/// through the operation methods or by [`Relay::run`].
#[derive(Debug)]
pub struct Relay {
    subscribers: SubscriberSet,
    device: Option<Outlet>,
    device_name: Option<String>,
    device_state: LinkState,
    sinks: ControlSinks,
}

impl Relay {
    pub fn new(sinks: ControlSinks) -> Self {
        Self {
            subscribers: SubscriberSet::new(),
            device: None,
            device_name: None,
            device_state: LinkState::Absent,
            sinks,
        }
    }

    /// Install the writer for an opened device link
    pub fn attach_device(&mut self, port_name: impl Into<String>, outlet: Outlet) {
        let port_name = port_name.into();
        if let Some(previous) = self.device.replace(outlet) {
            warn!(
                "Replacing device link {} with {}",
                previous.name(),
                port_name
            );
        }
        self.device_name = Some(port_name);
        self.device_state = LinkState::Open;
    }

    pub fn device_state(&self) -> LinkState {
        self.device_state
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    pub fn subscribers(&self) -> &SubscriberSet {
        &self.subscribers
    }

    pub fn connect(
        &mut self,
        id: SubscriberId,
        addr: SocketAddr,
        outbox: mpsc::UnboundedSender<String>,
    ) -> bool {
        let added = self.subscribers.insert(Subscriber::new(id, addr, outbox));
        if added {
            info!(
                "New websocket connection {} from {} ({} active)",
                id,
                addr,
                self.subscribers.len()
            );
        } else {
            warn!("Subscriber {} is already connected", id);
        }
        added
    }

    pub fn disconnect(&mut self, id: &SubscriberId) -> bool {
        match self.subscribers.remove(id) {
            Some(subscriber) => {
                info!(
                    "Websocket connection {} from {} closed after {:?} ({} active)",
                    id,
                    subscriber.addr,
                    subscriber.connected_at.elapsed(),
                    self.subscribers.len()
                );
                true
            }
            None => {
                debug!("Subscriber {} already removed", id);
                false
            }
        }
    }

    /// Broadcast one device line; returns the number of subscribers it was queued to
    pub fn from_device(&self, line: &str) -> usize {
        if self.device_state == LinkState::Closed {
            debug!("Ignoring line from closed device link: {}", line);
            return 0;
        }

        info!("Received from serial: {}", line);
        if self.subscribers.is_empty() {
            return 0;
        }
        self.subscribers.broadcast(line)
    }

    /// Route one subscriber message by its reserved prefix
    pub fn from_subscriber(&self, message: &str) -> Route {
        match ControlMessage::parse(message) {
            ControlMessage::Log(text) => {
                info!("{}", text);
                Route::Logged
            }
            ControlMessage::MoveScope(payload) => {
                info!("{}", message);
                self.sinks.move_scope.send(payload);
                Route::MoveScope
            }
            ControlMessage::Position(payload) => {
                debug!("Position snapshot: {}", payload);
                self.sinks.position.send(payload);
                Route::Position
            }
            ControlMessage::Telemetry(payload) => {
                debug!("Telemetry snapshot: {}", payload);
                self.sinks.telemetry.send(payload);
                Route::Telemetry
            }
            ControlMessage::Passthrough(payload) => match &self.device {
                Some(device) if self.device_state.is_open() => {
                    info!("Sending to serial: {}", payload);
                    device.send(payload);
                    Route::Device
                }
                _ => {
                    warn!(
                        "Dropped message for the {} device link: {}",
                        self.device_state, payload
                    );
                    Route::Dropped
                }
            },
        }
    }

    /// Mark the device link closed after an I/O failure. No reconnect is attempted.
    pub fn device_closed(&mut self, reason: &str) {
        if self.device_state == LinkState::Closed {
            debug!("Device link already closed: {}", reason);
            return;
        }

        error!("Serial port error: {}", reason);
        error!(
            "Serial port {} closed; restart scopebridge to communicate with the device again",
            self.device_name.as_deref().unwrap_or("<unknown>")
        );
        self.device_state = LinkState::Closed;
        // dropping the outlet ends its writer task once queued writes finish
        self.device = None;
    }

    /// Apply one event
    pub fn handle(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connected { id, addr, outbox } => {
                self.connect(id, addr, outbox);
            }
            RelayEvent::Disconnected { id } => {
                self.disconnect(&id);
            }
            RelayEvent::FromSubscriber { id, message } => {
                debug!("Message from {}: {}", id, message);
                self.from_subscriber(&message);
            }
            RelayEvent::FromDevice { line } => {
                self.from_device(&line);
            }
            RelayEvent::DeviceClosed { reason } => self.device_closed(&reason),
        }
    }

    /// Process events until every producer is gone or `shutdown` resolves
    pub async fn run<F>(mut self, mut events: EventReceiver, shutdown: F) -> Self
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => {
                        info!("All event producers gone, stopping relay");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("Relay received shutdown signal");
                    break;
                }
            }
        }

        self
    }

    /// Drop all subscribers and flush every outlet
    pub async fn shutdown(mut self) {
        let dropped = self.subscribers.clear();
        if dropped > 0 {
            info!("Closed {} websocket connection(s)", dropped);
        }

        if let Some(device) = self.device.take() {
            device.close().await;
        }
        self.sinks.close().await;

        info!("Relay stopped");
    }
}

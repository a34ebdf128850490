// Relay module - Device-to-subscriber fan-out and control routing
pub mod control;
pub mod event;
pub mod relay;
pub mod subscriber;

pub use control::{ControlKind, ControlMessage, CONTROL_PREFIXES};
pub use event::{event_channel, EventReceiver, EventSender, RelayEvent};
pub use relay::{ControlSinks, Relay, Route};
pub use subscriber::{Subscriber, SubscriberSet};

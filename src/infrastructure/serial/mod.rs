// Serial module - Device discovery and the serial device link
pub mod discovery;
pub mod line;
pub mod link;

pub use discovery::{discover, list_port_names, select_port};
pub use line::LineBuffer;
pub use link::{DeviceLink, SerialSink};

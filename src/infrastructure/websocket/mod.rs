// WebSocket module - Subscriber transport
pub mod server;

pub use server::WsServer;

use std::net::SocketAddr;
use thiserror::Error;

/// ScopeBridge unified error type
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to bind {addr}: {source}{}", bind_hint(.source, .addr))]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Server error: {message}")]
    Server { message: String },

    #[error("Device link error: {message}")]
    Device { message: String },

    #[error("Relay channel closed")]
    ChannelClosed,

    #[error("Output error: {0}")]
    Output(String),
}

pub type RelayResult<T> = Result<T, RelayError>;

fn bind_hint(source: &std::io::Error, addr: &SocketAddr) -> String {
    match source.kind() {
        std::io::ErrorKind::AddrInUse => format!(
            " (port {} is already in use, select a different port, e.g. --port {})",
            addr.port(),
            addr.port().saturating_add(1)
        ),
        std::io::ErrorKind::PermissionDenied if addr.port() < 1024 => {
            " (no permission to listen here, try a port number higher than 1024)".to_string()
        }
        std::io::ErrorKind::PermissionDenied => " (no permission to listen here)".to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_suggests_next_port() {
        let error = RelayError::Bind {
            addr: "127.0.0.1:8081".parse().unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };

        let display = error.to_string();
        assert!(display.contains("127.0.0.1:8081"));
        assert!(display.contains("--port 8082"));
    }

    #[test]
    fn test_bind_error_privileged_port_hint() {
        let error = RelayError::Bind {
            addr: "0.0.0.0:80".parse().unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };

        assert!(error.to_string().contains("higher than 1024"));
    }
}

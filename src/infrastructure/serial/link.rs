use crate::core::relay::event::{EventSender, RelayEvent};
use crate::domain::config::{DeviceConfig, FlowControlConfig, ParityConfig};
use crate::domain::error::{RelayError, RelayResult};
use crate::domain::types::LinkState;
use crate::infrastructure::serial::line::LineBuffer;
use crate::infrastructure::sink::{Outlet, Sink};
use async_trait::async_trait;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Build the port settings from configuration
pub fn port_builder(port_name: &str, config: &DeviceConfig) -> RelayResult<serialport::SerialPortBuilder> {
    let mut builder = serialport::new(port_name, config.baud_rate);

    builder = builder.data_bits(match config.data_bits {
        5 => serialport::DataBits::Five,
        6 => serialport::DataBits::Six,
        7 => serialport::DataBits::Seven,
        8 => serialport::DataBits::Eight,
        other => {
            return Err(RelayError::Config {
                message: format!("Invalid data bits: {}", other),
            })
        }
    });

    builder = builder.stop_bits(match config.stop_bits {
        1 => serialport::StopBits::One,
        2 => serialport::StopBits::Two,
        other => {
            return Err(RelayError::Config {
                message: format!("Invalid stop bits: {}", other),
            })
        }
    });

    builder = builder.parity(match config.parity {
        ParityConfig::None => serialport::Parity::None,
        ParityConfig::Even => serialport::Parity::Even,
        ParityConfig::Odd => serialport::Parity::Odd,
    });

    builder = builder.flow_control(match config.flow_control {
        FlowControlConfig::None => serialport::FlowControl::None,
        FlowControlConfig::Software => serialport::FlowControl::Software,
        FlowControlConfig::Hardware => serialport::FlowControl::Hardware,
    });

    Ok(builder.timeout(Duration::from_millis(config.read_timeout_ms.max(1))))
}

/// Writer half of the device link.
///
/// A failed write closes the port, stops the reader sharing `running` and
/// reports [`RelayEvent::DeviceClosed`]; later writes fail fast without
/// touching the hardware.
pub struct SerialSink {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
    running: Arc<AtomicBool>,
    events: EventSender,
}

impl SerialSink {
    pub fn new(
        port_name: impl Into<String>,
        port: Box<dyn SerialPort>,
        running: Arc<AtomicBool>,
        events: EventSender,
    ) -> Self {
        Self {
            port_name: port_name.into(),
            port: Some(port),
            running,
            events,
        }
    }

    /// Drop the port and stop the reader
    fn shut_down(&mut self, reason: String) {
        self.port = None;
        self.running.store(false, Ordering::Relaxed);
        if self.events.send(RelayEvent::DeviceClosed { reason }).is_err() {
            debug!("Relay gone, device close not reported");
        }
    }
}

#[async_trait]
impl Sink for SerialSink {
    fn describe(&self) -> String {
        format!("serial port {}", self.port_name)
    }

    async fn write(&mut self, payload: &[u8]) -> RelayResult<()> {
        let mut port = self.port.take().ok_or_else(|| RelayError::Device {
            message: format!("{} is closed", self.port_name),
        })?;

        let data = payload.to_vec();
        let (port, result) = tokio::task::spawn_blocking(move || {
            let result = port.write_all(&data).and_then(|_| port.flush());
            (port, result)
        })
        .await
        .map_err(|e| RelayError::Device {
            message: format!("serial write task failed: {}", e),
        })?;

        match result {
            Ok(()) => {
                debug!("Sent {} bytes over serial", payload.len());
                self.port = Some(port);
                Ok(())
            }
            Err(e) => {
                drop(port);
                self.shut_down(format!("write to {} failed: {}", self.port_name, e));
                Err(e.into())
            }
        }
    }
}

/// The physical serial connection: a blocking line reader plus a writer outlet
pub struct DeviceLink {
    port_name: String,
    baud_rate: u32,
    state: LinkState,
    running: Arc<AtomicBool>,
    rx_handle: tokio::task::JoinHandle<()>,
}

impl DeviceLink {
    /// Open `port_name` and start the reader.
    ///
    /// Every complete line becomes a [`RelayEvent::FromDevice`]. A read error
    /// ends the reader and reports [`RelayEvent::DeviceClosed`]. The returned
    /// outlet is the only way to write to the device.
    pub fn open(port_name: &str, config: &DeviceConfig, events: EventSender) -> RelayResult<(Self, Outlet)> {
        debug!("Device link {} -> {}", LinkState::Absent, LinkState::Opening);

        let port = port_builder(port_name, config)?.open()?;
        let baud_rate = port.baud_rate().unwrap_or(config.baud_rate);
        let reader = port.try_clone()?;

        info!("Serial port {} open.  Data rate: {}", port_name, baud_rate);

        let running = Arc::new(AtomicBool::new(true));
        let rx_handle = Self::spawn_reader(
            port_name.to_string(),
            reader,
            LineBuffer::with_limit(&config.line_terminator, config.max_line_length),
            Arc::clone(&running),
            events.clone(),
        );

        let outlet = Outlet::spawn(SerialSink::new(port_name, port, Arc::clone(&running), events));

        Ok((
            Self {
                port_name: port_name.to_string(),
                baud_rate,
                state: LinkState::Open,
                running,
                rx_handle,
            },
            outlet,
        ))
    }

    fn spawn_reader(
        port_name: String,
        mut port: Box<dyn SerialPort>,
        mut lines: LineBuffer,
        running: Arc<AtomicBool>,
        events: EventSender,
    ) -> tokio::task::JoinHandle<()> {
        tokio::task::spawn_blocking(move || {
            let mut buffer = vec![0u8; 1024];

            while running.load(Ordering::Relaxed) {
                match port.read(&mut buffer) {
                    Ok(0) => continue,
                    Ok(n) => {
                        debug!("Received {} bytes over serial", n);
                        for line in lines.push(&buffer[..n]) {
                            if events.send(RelayEvent::FromDevice { line }).is_err() {
                                debug!("Relay gone, stopping serial reader for {}", port_name);
                                return;
                            }
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                    Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        error!("Failed to read from serial port {}: {}", port_name, e);
                        if events
                            .send(RelayEvent::DeviceClosed {
                                reason: format!("read from {} failed: {}", port_name, e),
                            })
                            .is_err()
                        {
                            debug!("Relay gone, device close not reported");
                        }
                        break;
                    }
                }
            }
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn state(&self) -> LinkState {
        if self.state.is_open() && (!self.running.load(Ordering::Relaxed) || self.rx_handle.is_finished()) {
            LinkState::Closed
        } else {
            self.state
        }
    }

    /// Stop the reader. The writer outlet is closed separately by its owner.
    pub async fn close(mut self) {
        self.running.store(false, Ordering::Relaxed);

        if let Err(e) = (&mut self.rx_handle).await {
            warn!("Serial reader for {} completed with error: {}", self.port_name, e);
        }

        self.state = LinkState::Closed;
        info!("Serial port {} closed", self.port_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::relay::event::event_channel;

    fn test_config() -> DeviceConfig {
        DeviceConfig::default()
    }

    #[tokio::test]
    async fn test_open_fails_gracefully() {
        let (events, _receiver) = event_channel();

        // /dev/null is not a serial port
        let result = DeviceLink::open("/dev/null", &test_config(), events);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_open_missing_port() {
        let (events, _receiver) = event_channel();
        let result = DeviceLink::open("/dev/does-not-exist-scopebridge", &test_config(), events);
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_write_stops_reader() {
        // pseudo-terminals may be unavailable in some sandboxes
        let Ok((master, _slave)) = serialport::TTYPort::pair() else {
            return;
        };
        let (events, mut receiver) = event_channel();
        let running = Arc::new(AtomicBool::new(true));
        let mut sink = SerialSink::new("/dev/ptmx", Box::new(master), Arc::clone(&running), events);

        sink.shut_down("write failed".to_string());

        assert!(!running.load(Ordering::Relaxed));
        assert!(matches!(
            receiver.try_recv(),
            Ok(RelayEvent::DeviceClosed { .. })
        ));
        assert!(matches!(
            sink.write(b"late").await,
            Err(RelayError::Device { .. })
        ));
    }

    #[test]
    fn test_invalid_data_bits() {
        let config = DeviceConfig {
            data_bits: 9,
            ..DeviceConfig::default()
        };
        assert!(matches!(
            port_builder("/dev/ttyUSB0", &config),
            Err(RelayError::Config { .. })
        ));
    }

    #[test]
    fn test_invalid_stop_bits() {
        let config = DeviceConfig {
            stop_bits: 3,
            ..DeviceConfig::default()
        };
        assert!(port_builder("/dev/ttyUSB0", &config).is_err());
    }

    #[test]
    fn test_valid_builder() {
        let config = DeviceConfig {
            parity: ParityConfig::Even,
            flow_control: FlowControlConfig::Hardware,
            ..DeviceConfig::default()
        };
        assert!(port_builder("/dev/ttyUSB0", &config).is_ok());
    }
}

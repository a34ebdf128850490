use crate::cli::args::OutputFormat;
use crate::domain::config::RelayConfig;
use serde::Serialize;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_ports(&self, ports: &[PortEntry]) -> Result<(), OutputError>;
    fn write_config(&self, config: &RelayConfig) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
}

impl From<OutputError> for crate::domain::error::RelayError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// One serial port as reported by `scopebridge ports`
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct PortEntry {
    #[tabled(rename = "Port")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Selected")]
    pub selected: bool,
}

impl PortEntry {
    pub fn from_info(info: &serialport::SerialPortInfo, selected: Option<&str>) -> Self {
        let kind = match &info.port_type {
            serialport::SerialPortType::UsbPort(usb) => match &usb.product {
                Some(product) => format!("USB ({})", product),
                None => format!("USB {:04x}:{:04x}", usb.vid, usb.pid),
            },
            serialport::SerialPortType::PciPort => "PCI".to_string(),
            serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            serialport::SerialPortType::Unknown => "Unknown".to_string(),
        };

        Self {
            name: info.port_name.clone(),
            kind,
            selected: selected == Some(info.port_name.as_str()),
        }
    }
}

#[derive(Tabled)]
struct ConfigTableRow {
    #[tabled(rename = "Setting")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn config_rows(config: &RelayConfig) -> Vec<ConfigTableRow> {
    let row = |key: &str, value: String| ConfigTableRow {
        key: key.to_string(),
        value,
    };

    vec![
        row("log_level", config.global.log_level.clone()),
        row("listen", config.server.bind_addr().to_string()),
        row("port_patterns", config.device.port_patterns.join(", ")),
        row(
            "port_override",
            config.device.port_override.clone().unwrap_or_else(|| "-".to_string()),
        ),
        row("baud_rate", config.device.baud_rate.to_string()),
        row("line_terminator", format!("{:?}", config.device.line_terminator)),
        row("move_scope_path", config.sinks.move_scope_path.display().to_string()),
        row("position_path", config.sinks.position_path.display().to_string()),
        row("telemetry_path", config.sinks.telemetry_path.display().to_string()),
    ]
}

/// Render serial ports in the requested format
pub fn render_ports(format: OutputFormat, ports: &[PortEntry]) -> Result<String, OutputError> {
    Ok(match format {
        OutputFormat::Text => {
            if ports.is_empty() {
                "No serial ports found".to_string()
            } else {
                let mut text = String::from("Available serial ports:");
                for port in ports {
                    let marker = if port.selected { " *" } else { "" };
                    text.push_str(&format!("\n  {} [{}]{}", port.name, port.kind, marker));
                }
                text
            }
        }
        OutputFormat::Json => serde_json::to_string_pretty(ports)?,
        OutputFormat::Table => Table::new(ports.to_vec()).to_string(),
    })
}

/// Render the effective configuration in the requested format
pub fn render_config(format: OutputFormat, config: &RelayConfig) -> Result<String, OutputError> {
    Ok(match format {
        OutputFormat::Text => toml::to_string_pretty(config)?,
        OutputFormat::Json => serde_json::to_string_pretty(config)?,
        OutputFormat::Table => Table::new(config_rows(config)).to_string(),
    })
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_ports(&self, ports: &[PortEntry]) -> Result<(), OutputError> {
        println!("{}", render_ports(self.format, ports)?);
        Ok(())
    }

    fn write_config(&self, config: &RelayConfig) -> Result<(), OutputError> {
        println!("{}", render_config(self.format, config)?);
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "message": message }));
            }
            _ => println!("{}", message),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports() -> Vec<PortEntry> {
        vec![
            PortEntry {
                name: "/dev/ttyS0".to_string(),
                kind: "PCI".to_string(),
                selected: false,
            },
            PortEntry {
                name: "/dev/tty.usbmodem1421".to_string(),
                kind: "USB (Arduino Uno)".to_string(),
                selected: true,
            },
        ]
    }

    #[test]
    fn test_render_ports_text() {
        let text = render_ports(OutputFormat::Text, &ports()).unwrap();
        assert!(text.starts_with("Available serial ports:"));
        assert!(text.contains("/dev/tty.usbmodem1421 [USB (Arduino Uno)] *"));
        assert!(text.contains("/dev/ttyS0 [PCI]"));
        assert_eq!(render_ports(OutputFormat::Text, &[]).unwrap(), "No serial ports found");
    }

    #[test]
    fn test_render_ports_json() {
        let json = render_ports(OutputFormat::Json, &ports()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[1]["name"], "/dev/tty.usbmodem1421");
        assert_eq!(value[1]["selected"], true);
    }

    #[test]
    fn test_render_ports_table() {
        let table = render_ports(OutputFormat::Table, &ports()).unwrap();
        assert!(table.contains("Port"));
        assert!(table.contains("/dev/ttyS0"));
    }

    #[test]
    fn test_render_config_formats() {
        let config = RelayConfig::default();

        let text = render_config(OutputFormat::Text, &config).unwrap();
        assert!(text.contains("baud_rate = 38400"));

        let json = render_config(OutputFormat::Json, &config).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["server"]["port"], 8081);

        let table = render_config(OutputFormat::Table, &config).unwrap();
        assert!(table.contains("0.0.0.0:8081"));
    }

    #[test]
    fn test_port_entry_from_info() {
        let info = serialport::SerialPortInfo {
            port_name: "COM4".to_string(),
            port_type: serialport::SerialPortType::PciPort,
        };
        let entry = PortEntry::from_info(&info, Some("COM4"));
        assert_eq!(entry.kind, "PCI");
        assert!(entry.selected);
        assert!(!PortEntry::from_info(&info, None).selected);
    }
}

use crate::domain::config::DeviceConfig;
use tracing::{info, warn};

/// Pick the port to open from the names the OS reports.
///
/// Candidates are tried in order; for each one the first port whose name
/// contains it wins. Returns `None` when nothing matches.
pub fn select_port(ports: &[String], candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|candidate| {
        ports
            .iter()
            .find(|port| port.contains(candidate))
            .cloned()
    })
}

/// Names of the serial ports currently present
pub fn list_port_names() -> Result<Vec<String>, serialport::Error> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|port| port.port_name).collect())
}

/// Enumerate serial ports and select the device to relay.
///
/// A missing device is not an error: the relay runs without a device link
/// and drops device-directed traffic.
pub fn discover(config: &DeviceConfig) -> Option<String> {
    let ports = match list_port_names() {
        Ok(ports) => ports,
        Err(e) => {
            warn!("Failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    };

    info!("Connected serial port names: {}", ports.join(" , "));

    let selected = select_port(&ports, &config.candidates());
    match &selected {
        Some(port) => info!("Selected serial port {}", port),
        None => warn!(
            "No device appears to be connected to any serial port (looked for {:?}); \
             messages for the device will go nowhere",
            config.candidates()
        ),
    }
    selected
}

use crate::cli::args::{unescape_terminator, Args, Command, ConfigCommand, ServeArgs};
use crate::cli::output::{ConsoleWriter, OutputWriter, PortEntry};
use crate::core::relay::{event_channel, ControlSinks, EventSender, Relay};
use crate::domain::config::{DeviceConfig, GlobalConfig, RelayConfig};
use crate::domain::error::{RelayError, RelayResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::{discover, select_port, DeviceLink};
use crate::infrastructure::websocket::WsServer;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Execute CLI command
pub async fn execute_command(args: Args) -> Result<(), RelayError> {
    let writer = ConsoleWriter::new(args.output);

    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new();
    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(Path::new(config_path))?
    } else {
        config_manager.load_config()?
    };

    // Initialize logging
    if !args.quiet {
        setup_logging(&config.global, args.verbose)?;
    }

    match args.command {
        Command::Serve(serve_args) => {
            let mut config = config;
            apply_serve_overrides(&mut config, &serve_args);
            serve(config, serve_args.no_device).await
        }
        Command::Ports => list_ports(&writer, &config.device),
        Command::Config(config_args) => {
            execute_config_command(config_args.command, &writer, &config, &config_manager)
        }
        Command::Version => {
            writer.write_message(&format!("scopebridge {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

/// Fold command-line overrides into the loaded configuration
pub fn apply_serve_overrides(config: &mut RelayConfig, args: &ServeArgs) {
    if let Some(port_name) = &args.port_name {
        config.device.port_override = Some(port_name.clone());
    }
    if let Some(bind) = args.bind {
        config.server.bind_host = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(baud) = args.baud {
        config.device.baud_rate = baud;
    }
    if let Some(terminator) = &args.terminator {
        config.device.line_terminator = unescape_terminator(terminator);
    }
}

/// Run the relay until Ctrl+C.
///
/// Only a failure to bind the WebSocket listener is fatal; a missing or
/// unopenable device leaves the relay running without a device link.
pub async fn serve(config: RelayConfig, no_device: bool) -> RelayResult<()> {
    let mut server = WsServer::bind(config.server.bind_addr()).await?;
    let (events, receiver) = event_channel();
    let mut relay = Relay::new(ControlSinks::from_config(&config.sinks));

    let device_link = if no_device {
        info!("Device link disabled; messages for the device will be dropped");
        None
    } else {
        open_device(&config.device, &events, &mut relay)
    };

    server.start(events)?;
    info!(
        "ScopeBridge relay running. Connect to ws://{}/",
        server.get_bind_addr()
    );

    let relay = relay.run(receiver, shutdown_signal()).await;

    server.stop().await;
    relay.shutdown().await;
    if let Some(link) = device_link {
        link.close().await;
    }

    info!("ScopeBridge stopped");
    Ok(())
}

fn open_device(config: &DeviceConfig, events: &EventSender, relay: &mut Relay) -> Option<DeviceLink> {
    let port_name = discover(config)?;

    match DeviceLink::open(&port_name, config, events.clone()) {
        Ok((link, outlet)) => {
            info!("Now connected to the device on serial port {}", port_name);
            relay.attach_device(port_name, outlet);
            Some(link)
        }
        Err(e) => {
            error!("Failed to open serial port {}: {}", port_name, e);
            warn!("Running without a device link; messages for the device will go nowhere");
            None
        }
    }
}

/// Resolves on the first Ctrl+C; a second Ctrl+C exits immediately with status 1
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("ScopeBridge shutting down (press Ctrl+C again to force)");
            tokio::spawn(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("ScopeBridge force kill");
                    std::process::exit(1);
                }
            });
        }
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn list_ports(writer: &ConsoleWriter, config: &DeviceConfig) -> Result<(), RelayError> {
    let ports = serialport::available_ports()?;

    let names: Vec<String> = ports.iter().map(|port| port.port_name.clone()).collect();
    let selected = select_port(&names, &config.candidates());

    let entries: Vec<PortEntry> = ports
        .iter()
        .map(|info| PortEntry::from_info(info, selected.as_deref()))
        .collect();

    writer.write_ports(&entries)?;
    Ok(())
}

fn execute_config_command(
    command: ConfigCommand,
    writer: &ConsoleWriter,
    config: &RelayConfig,
    config_manager: &ConfigManager,
) -> Result<(), RelayError> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(())
        }
        ConfigCommand::Path => {
            let describe = |path: Option<&PathBuf>| {
                path.map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string())
            };
            writer.write_message(&format!(
                "global: {}\nproject: {}\nactive: {}",
                describe(config_manager.get_global_config_path_ref()),
                describe(config_manager.get_project_config_path()),
                describe(config_manager.active_config_path()),
            ))?;
            Ok(())
        }
        ConfigCommand::Init { dir } => {
            let dir = match dir {
                Some(dir) => PathBuf::from(dir),
                None => std::env::current_dir()?,
            };
            let path = config_manager.init_project_config(&dir)?;
            writer.write_message(&format!("Created {}", path.display()))?;
            Ok(())
        }
    }
}

fn setup_logging(config: &GlobalConfig, verbose: bool) -> Result<(), RelayError> {
    init_logging(&config.log_level, verbose).map_err(|e| RelayError::Config {
        message: format!("Failed to initialize logging: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_overrides() {
        let mut config = RelayConfig::default();
        let args = ServeArgs {
            port_name: Some("ttyACM0".to_string()),
            bind: Some("127.0.0.1".parse().unwrap()),
            port: Some(9100),
            baud: Some(9600),
            terminator: Some("\\n".to_string()),
            no_device: false,
        };

        apply_serve_overrides(&mut config, &args);

        assert_eq!(config.device.port_override.as_deref(), Some("ttyACM0"));
        assert_eq!(config.server.bind_addr().to_string(), "127.0.0.1:9100");
        assert_eq!(config.device.baud_rate, 9600);
        assert_eq!(config.device.line_terminator, "\n");
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = RelayConfig::default();
        apply_serve_overrides(&mut config, &ServeArgs::default());

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.device.baud_rate, 38400);
        assert!(config.device.port_override.is_none());
    }
}

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Command line arguments for ScopeBridge
#[derive(Parser, Debug)]
#[command(
    name = "scopebridge",
    version = env!("CARGO_PKG_VERSION"),
    about = "Serial-to-WebSocket relay for the ALTAIR transceiver",
    long_about = "Relays every line from a serial-connected device to all WebSocket subscribers and routes subscriber messages back to the device, the telescope mount, or position/telemetry snapshot files."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay
    Serve(ServeArgs),
    /// List available serial ports
    Ports,
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Relay arguments; each overrides the matching configuration value
#[derive(ClapArgs, Debug, Default)]
pub struct ServeArgs {
    /// Serial port name (or part of it) to prefer over the configured patterns
    pub port_name: Option<String>,

    /// Interface for the WebSocket listener
    #[arg(short, long)]
    pub bind: Option<IpAddr>,

    /// WebSocket listening port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Serial baud rate
    #[arg(long)]
    pub baud: Option<u32>,

    /// Inbound line terminator (escapes \r and \n are understood)
    #[arg(long)]
    pub terminator: Option<String>,

    /// Run without opening any serial device
    #[arg(long)]
    pub no_device: bool,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Show which configuration files are used
    Path,
    /// Create default project configuration
    Init {
        /// Directory to create .scopebridge/config.toml in
        #[arg(short, long)]
        dir: Option<String>,
    },
}

/// Expand `\r`, `\n` and `\t` escapes typed on the command line
pub fn unescape_terminator(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('r') => result.push('\r'),
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_override() {
        let args = Args::parse_from(["scopebridge", "serve", "ttyACM0", "--port", "9000", "--baud", "9600"]);
        match args.command {
            Command::Serve(serve) => {
                assert_eq!(serve.port_name.as_deref(), Some("ttyACM0"));
                assert_eq!(serve.port, Some(9000));
                assert_eq!(serve.baud, Some(9600));
                assert!(!serve.no_device);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = Args::parse_from(["scopebridge", "ports", "-v", "--output", "json"]);
        assert!(args.verbose);
        assert_eq!(args.output, OutputFormat::Json);
        assert!(matches!(args.command, Command::Ports));
    }

    #[test]
    fn test_invalid_bind_rejected() {
        assert!(Args::try_parse_from(["scopebridge", "serve", "--bind", "not-an-ip"]).is_err());
    }

    #[test]
    fn test_unescape_terminator() {
        assert_eq!(unescape_terminator("\\r\\n"), "\r\n");
        assert_eq!(unescape_terminator("\\n"), "\n");
        assert_eq!(unescape_terminator(";"), ";");
        assert_eq!(unescape_terminator("\\x"), "\\x");
        assert_eq!(unescape_terminator("a\\"), "a\\");
    }
}

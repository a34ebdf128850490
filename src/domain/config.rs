use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// ScopeBridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// WebSocket listener
    #[serde(default)]
    pub server: ServerConfig,
    /// Serial device selection and line settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Control-message sinks
    #[serde(default)]
    pub sinks: SinkConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// WebSocket listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_bind_host")]
    pub bind_host: IpAddr,
    /// Listening port
    #[serde(default = "default_ws_port")]
    pub port: u16,
}

/// Serial device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Substrings matched against port names during discovery, in order
    #[serde(default = "default_port_patterns")]
    pub port_patterns: Vec<String>,
    /// Explicit port name (or substring) preferred over the patterns
    #[serde(default)]
    pub port_override: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: ParityConfig,
    #[serde(default = "default_flow_control")]
    pub flow_control: FlowControlConfig,
    /// Inbound line delimiter
    #[serde(default = "default_line_terminator")]
    pub line_terminator: String,
    /// Blocking read timeout, also the stop-flag polling interval
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    /// Longest inbound line kept while waiting for a terminator
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

/// Parity configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    None,
    Odd,
    Even,
}

/// Flow control configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlConfig {
    None,
    Hardware,
    Software,
}

/// Destinations for control messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// `MOVESCOPE: ` payloads are appended here (motor controller port)
    #[serde(default = "default_move_scope_path")]
    pub move_scope_path: PathBuf,
    /// `ALTAIRPOS: ` snapshot, overwritten on every update
    #[serde(default = "default_position_path")]
    pub position_path: PathBuf,
    /// `ALTAIRDATA: ` snapshot, overwritten on every update
    #[serde(default = "default_telemetry_path")]
    pub telemetry_path: PathBuf,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_ws_port() -> u16 {
    8081
}

fn default_port_patterns() -> Vec<String> {
    vec!["tty.usbmodem".to_string(), "COM4".to_string()]
}

fn default_baud_rate() -> u32 {
    38400
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_parity() -> ParityConfig {
    ParityConfig::None
}

fn default_flow_control() -> FlowControlConfig {
    FlowControlConfig::None
}

fn default_line_terminator() -> String {
    "\r\n".to_string()
}

fn default_read_timeout() -> u64 {
    100
}

/// Bytes buffered for one inbound line before it is discarded
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

fn default_move_scope_path() -> PathBuf {
    PathBuf::from("/dev/tty.usbserial")
}

fn default_position_path() -> PathBuf {
    snapshot_dir().join("altairpos.txt")
}

fn default_telemetry_path() -> PathBuf {
    snapshot_dir().join("altairdata.txt")
}

#[cfg(windows)]
fn snapshot_dir() -> PathBuf {
    std::env::temp_dir()
}

#[cfg(not(windows))]
fn snapshot_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            port: default_ws_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.port)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port_patterns: default_port_patterns(),
            port_override: None,
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: default_parity(),
            flow_control: default_flow_control(),
            line_terminator: default_line_terminator(),
            read_timeout_ms: default_read_timeout(),
            max_line_length: default_max_line_length(),
        }
    }
}

impl DeviceConfig {
    /// Discovery candidates: the override first, then the configured patterns
    pub fn candidates(&self) -> Vec<&str> {
        self.port_override
            .iter()
            .map(String::as_str)
            .chain(self.port_patterns.iter().map(String::as_str))
            .filter(|candidate| !candidate.is_empty())
            .collect()
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            move_scope_path: default_move_scope_path(),
            position_path: default_position_path(),
            telemetry_path: default_telemetry_path(),
        }
    }
}

impl Default for ParityConfig {
    fn default() -> Self {
        default_parity()
    }
}

impl Default for FlowControlConfig {
    fn default() -> Self {
        default_flow_control()
    }
}

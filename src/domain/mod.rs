// Domain module - Configuration, errors and shared value types
pub mod config;
pub mod error;
pub mod types;

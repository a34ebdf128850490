// Core module - Relay logic independent of transports
pub mod relay;

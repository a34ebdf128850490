// Logging module - Logging infrastructure
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use std::io;

/// Filter directive for the configured level; `verbose` forces debug
pub fn filter_directive(log_level: &str, verbose: bool) -> String {
    let level = if verbose {
        "debug"
    } else {
        match log_level {
            "error" | "warn" | "info" | "debug" | "trace" => log_level,
            _ => "info",
        }
    };
    format!("scopebridge={},warn", level)
}

/// Initialize logging system. `RUST_LOG` overrides the configured level.
pub fn init_logging(log_level: &str, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level, verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true)
        )
        .try_init()?;

    tracing::debug!("ScopeBridge logging system initialized");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive("warn", false), "scopebridge=warn,warn");
        assert_eq!(filter_directive("warn", true), "scopebridge=debug,warn");
        assert_eq!(filter_directive("loud", false), "scopebridge=info,warn");
    }

    #[test]
    fn test_logging_init() {
        // A second initialisation reports an error instead of panicking
        let _first = init_logging("info", false);
        assert!(init_logging("info", false).is_err());
    }
}

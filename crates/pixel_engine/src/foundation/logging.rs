//! Logging setup
//!
//! The crate logs through the `log` facade; binaries pick the backend. These
//! helpers install `env_logger`, with `RUST_LOG` still able to override the
//! level per module.

pub use log::{debug, error, info, trace, warn, LevelFilter};

/// Initialize logging at `info`, or whatever `RUST_LOG` says
pub fn init() {
    init_with_level(LevelFilter::Info);
}

/// Initialize logging with a default level
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_with_level(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if builder.try_init().is_err() {
        debug!("Logger already initialized, keeping it");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_with_level(LevelFilter::Debug);
        init();
        info!("logging initialized twice");
    }
}

//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Default filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info";

/// Initialize the logging system
///
/// Installs `env_logger` with an `info` default filter; `RUST_LOG` overrides it.
/// Calling this more than once is harmless.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or(DEFAULT_FILTER);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logging: logger already installed");
    }
}

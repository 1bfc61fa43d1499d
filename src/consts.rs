//! Project-wide constants.

use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Route that accepts scripts.
pub const COMMANDS_ROUTE: &str = "/api/commands";

/// Response body for a request with no script lines.
pub const EMPTY_SCRIPT_RESPONSE: &str = "-";

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Upper bound on a single step, including peers a POST forwards to.
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 100;

/// Connect timeout for TCP probes and outbound HTTP.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default config location: `<config dir>/relayprobe/config.toml`.
/// `None` when the platform has no config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("relayprobe").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consts_are_non_empty() {
        assert!(!VERSION.is_empty());
        assert!(COMMANDS_ROUTE.starts_with('/'));
        assert_eq!(EMPTY_SCRIPT_RESPONSE, "-");
    }

    #[test]
    fn default_config_path_is_namespaced() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("relayprobe/config.toml"));
        }
    }
}

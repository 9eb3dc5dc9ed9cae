//! Process configuration from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `PORT` | `3000` | Status page port |
//! | `SESSION_DIR` | `./session` | Credentials directory |
//! | `GATEWAY_URL` | `ws://127.0.0.1:8765` | Transport gateway |
//! | `REACTION_SYMBOLS` | built-in set | Comma-separated reaction symbols |
//! | `STATUS_REACTOR_DEBUG` | unset | Debug logging when `RUST_LOG` is unset |

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};
use crate::reactor::DEFAULT_SYMBOLS;

// ============================================================================
// Constants
// ============================================================================

/// Default status page port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default credentials directory.
pub const DEFAULT_SESSION_DIR: &str = "./session";

/// Default gateway URL.
pub const DEFAULT_GATEWAY_URL: &str = "ws://127.0.0.1:8765";

// ============================================================================
// Config
// ============================================================================

/// Validated process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Status page port.
    pub port: u16,
    /// Directory holding the credential snapshot.
    pub session_dir: PathBuf,
    /// WebSocket URL of the transport gateway.
    pub gateway_url: Url,
    /// Reaction symbol set.
    pub reaction_symbols: Vec<String>,
    /// Verbose logging.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            session_dir: PathBuf::from(DEFAULT_SESSION_DIR),
            gateway_url: Url::parse(DEFAULT_GATEWAY_URL).expect("default gateway URL is valid"),
            reaction_symbols: DEFAULT_SYMBOLS.iter().map(|s| (*s).to_string()).collect(),
            debug: false,
        }
    }
}

impl Config {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(port) = get("PORT") {
            config.port = port
                .parse()
                .map_err(|_| Error::config(format!("PORT must be a port number, got '{port}'")))?;
        }

        if let Some(dir) = get("SESSION_DIR") {
            config.session_dir = PathBuf::from(dir);
        }

        if let Some(url) = get("GATEWAY_URL") {
            config.gateway_url = Url::parse(&url)
                .map_err(|e| Error::config(format!("GATEWAY_URL is not a valid URL: {e}")))?;
        }

        if let Some(symbols) = get("REACTION_SYMBOLS") {
            config.reaction_symbols = symbols
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.debug = get("STATUS_REACTOR_DEBUG").is_some_and(|v| v != "0" && v != "false");

        config.validate()?;
        Ok(config)
    }

    /// Sets the status page port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the credentials directory.
    #[inline]
    #[must_use]
    pub fn with_session_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.session_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Sets the gateway URL.
    #[inline]
    #[must_use]
    pub fn with_gateway_url(mut self, url: Url) -> Self {
        self.gateway_url = url;
        self
    }

    /// Sets the reaction symbols.
    #[inline]
    #[must_use]
    pub fn with_reaction_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reaction_symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the port is 0
    /// - [`Error::Config`] if the gateway URL is not `ws://` or `wss://`
    /// - [`Error::Config`] if the symbol set is empty
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config("PORT must be greater than 0"));
        }

        if !matches!(self.gateway_url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "GATEWAY_URL must use ws:// or wss://, got '{}'",
                self.gateway_url
            )));
        }

        if self.reaction_symbols.iter().all(|s| s.trim().is_empty()) {
            return Err(Error::config("REACTION_SYMBOLS must name at least one symbol"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use rustc_hash::FxHashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: FxHashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.session_dir, PathBuf::from("./session"));
        assert_eq!(config.gateway_url.as_str(), "ws://127.0.0.1:8765/");
        assert_eq!(config.reaction_symbols.len(), 5);
        assert!(!config.debug);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("SESSION_DIR", "/var/lib/reactor"),
            ("GATEWAY_URL", "wss://gateway.internal/ws"),
            ("REACTION_SYMBOLS", "👍, 🎉 ,,"),
            ("STATUS_REACTOR_DEBUG", "1"),
        ]))
        .expect("config");

        assert_eq!(config.port, 8080);
        assert_eq!(config.session_dir, PathBuf::from("/var/lib/reactor"));
        assert_eq!(config.gateway_url.scheme(), "wss");
        assert_eq!(config.reaction_symbols, ["👍", "🎉"]);
        assert!(config.debug);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = Config::from_lookup(lookup(&[("PORT", "  "), ("SESSION_DIR", "")]))
            .expect("config");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.session_dir, PathBuf::from(DEFAULT_SESSION_DIR));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PORT", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PORT", "70000")])).is_err());
        assert!(Config::from_lookup(lookup(&[("GATEWAY_URL", "http://x")])).is_err());
        assert!(Config::from_lookup(lookup(&[("GATEWAY_URL", "not a url")])).is_err());
        assert!(Config::from_lookup(lookup(&[("REACTION_SYMBOLS", " , ")])).is_err());
    }

    #[test]
    fn test_builders_then_validate() {
        let config = Config::default()
            .with_port(0)
            .with_session_dir("/tmp/s")
            .with_reaction_symbols(["⭐"]);
        assert!(config.validate().is_err());
        assert!(config.with_port(1).validate().is_ok());
    }
}

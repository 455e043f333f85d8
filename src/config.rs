//! Session configuration.
//!
//! `SessionConfig` carries everything needed to (re)establish a session:
//! the bridge address, the version range offered during HELLO, the
//! destination specifier, and the I2CP options passed through verbatim.

use crate::constants::{
    DEFAULT_MAX_VERSION, DEFAULT_MIN_VERSION, DEFAULT_SAM_HOST, DEFAULT_SAM_PORT,
    TRANSIENT_DESTINATION,
};

/// Destination specifier for SESSION CREATE.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DestinationSpec {
    /// Ask the bridge to mint a fresh destination.
    #[default]
    Transient,
    /// Reuse a caller-supplied private destination key.
    PrivateKey(String),
}

impl DestinationSpec {
    /// Wire form of the `DESTINATION=` parameter.
    pub fn as_param(&self) -> &str {
        match self {
            DestinationSpec::Transient => TRANSIENT_DESTINATION,
            DestinationSpec::PrivateKey(key) => key,
        }
    }

    /// Whether this specifier asks the bridge to mint the destination.
    pub fn is_transient(&self) -> bool {
        matches!(self, DestinationSpec::Transient)
    }
}

/// Configuration for a SAM stream session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Tunnel nickname, passed as `inbound.nickname`.
    pub nickname: String,
    /// SAM bridge host.
    pub sam_host: String,
    /// SAM bridge TCP port.
    pub sam_port: u16,
    /// Destination the session binds to.
    pub destination: DestinationSpec,
    /// I2CP options passed verbatim into SESSION CREATE.
    pub options: String,
    /// Lowest protocol version offered during HELLO.
    pub min_version: String,
    /// Highest protocol version offered during HELLO.
    pub max_version: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            nickname: String::new(),
            sam_host: DEFAULT_SAM_HOST.to_string(),
            sam_port: DEFAULT_SAM_PORT,
            destination: DestinationSpec::Transient,
            options: String::new(),
            min_version: DEFAULT_MIN_VERSION.to_string(),
            max_version: DEFAULT_MAX_VERSION.to_string(),
        }
    }
}

impl SessionConfig {
    /// Create a config for `nickname` with default bridge settings.
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            ..Self::default()
        }
    }

    /// Set the SAM bridge host.
    pub fn with_sam_host(mut self, host: impl Into<String>) -> Self {
        self.sam_host = host.into();
        self
    }

    /// Set the SAM bridge port.
    pub fn with_sam_port(mut self, port: u16) -> Self {
        self.sam_port = port;
        self
    }

    /// Set the destination specifier.
    pub fn with_destination(mut self, destination: DestinationSpec) -> Self {
        self.destination = destination;
        self
    }

    /// Set the I2CP options string.
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    /// Set the protocol version range offered during HELLO.
    pub fn with_version_range(
        mut self,
        min_version: impl Into<String>,
        max_version: impl Into<String>,
    ) -> Self {
        self.min_version = min_version.into();
        self.max_version = max_version.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::new("testapp");
        assert_eq!(config.nickname, "testapp");
        assert_eq!(config.sam_host, DEFAULT_SAM_HOST);
        assert_eq!(config.sam_port, DEFAULT_SAM_PORT);
        assert_eq!(config.destination, DestinationSpec::Transient);
        assert_eq!(config.min_version, "3.0");
        assert_eq!(config.max_version, "3.1");
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = SessionConfig::new("app")
            .with_sam_host("10.0.0.1")
            .with_sam_port(7657)
            .with_options("inbound.length=1")
            .with_version_range("3.0", "3.3");
        assert_eq!(config.sam_host, "10.0.0.1");
        assert_eq!(config.sam_port, 7657);
        assert_eq!(config.options, "inbound.length=1");
        assert_eq!(config.max_version, "3.3");
    }

    #[test]
    fn test_destination_spec_param() {
        assert_eq!(DestinationSpec::Transient.as_param(), "TRANSIENT");
        assert!(DestinationSpec::Transient.is_transient());

        let spec = DestinationSpec::PrivateKey("privkey".into());
        assert_eq!(spec.as_param(), "privkey");
        assert!(!spec.is_transient());
    }
}

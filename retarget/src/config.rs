//! Session configuration.

use std::net::{IpAddr, SocketAddr};

use wire::Limits;

use crate::error::{SessionError, SessionResult};
use crate::types::StreamingMode;

/// Port the peer listens on unless told otherwise.
pub const DEFAULT_PEER_PORT: u16 = 16094;

/// Configuration for one [`crate::Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Port used when the address has none.
    pub peer_port: u16,
    /// Authoritative table at startup.
    pub mode: StreamingMode,
    /// Wire limits for reassembly and decoding.
    pub limits: Limits,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            peer_port: DEFAULT_PEER_PORT,
            mode: StreamingMode::default(),
            limits: Limits::default(),
        }
    }
}

impl SessionConfig {
    /// Creates a config suitable for testing with smaller wire limits.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            limits: Limits::for_testing(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: StreamingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Parses an IP literal or `ip:port`, falling back to [`Self::peer_port`].
    pub fn resolve_address(&self, address: &str) -> SessionResult<SocketAddr> {
        let trimmed = address.trim();
        if let Ok(ip) = trimmed.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.peer_port));
        }
        trimmed
            .parse::<SocketAddr>()
            .map_err(|err| SessionError::InvalidAddress {
                address: address.to_string(),
                reason: err.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port() {
        assert_eq!(SessionConfig::default().peer_port, 16094);
    }

    #[test]
    fn testing_config_shrinks_limits_only() {
        let config = SessionConfig::for_testing();
        assert_eq!(config.limits, Limits::for_testing());
        assert_eq!(config.peer_port, DEFAULT_PEER_PORT);
        assert_eq!(config.mode, StreamingMode::default());
    }

    #[test]
    fn ip_literal_uses_default_port() {
        let addr = SessionConfig::default().resolve_address("127.0.0.1").unwrap();
        assert_eq!(addr, "127.0.0.1:16094".parse().unwrap());
    }

    #[test]
    fn explicit_port_wins() {
        let addr = SessionConfig::default()
            .resolve_address(" 10.0.0.2:9000 ")
            .unwrap();
        assert_eq!(addr.port(), 9000);
    }

    #[test]
    fn ipv6_literal() {
        let addr = SessionConfig::default().resolve_address("::1").unwrap();
        assert_eq!(addr.port(), DEFAULT_PEER_PORT);
        assert!(addr.is_ipv6());
    }

    #[test]
    fn malformed_address_is_rejected() {
        for address in ["", "localhost", "1.2.3", "1.2.3.4:port"] {
            let err = SessionConfig::default().resolve_address(address).unwrap_err();
            assert!(matches!(err, SessionError::InvalidAddress { .. }), "{address}");
        }
    }
}

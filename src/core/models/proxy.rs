use crate::core::errors::{KeyflockError, Result};

/// A validated SOCKS5 egress endpoint.
///
/// Built from the raw host/port strings a keylist record stores, at the
/// point of use. Construction failing means no network call is attempted
/// with the broken configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

impl ProxyConfig {
    /// Validate a host/port pair. Ports must be in 1-65535.
    pub fn parse(host: &str, port: &str) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(KeyflockError::InvalidProxyConfig {
                detail: "proxy host is empty".into(),
            });
        }

        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| KeyflockError::InvalidProxyConfig {
                detail: format!("'{port}' is not a valid port (expected 1-65535)"),
            })?;
        if port == 0 {
            return Err(KeyflockError::InvalidProxyConfig {
                detail: "port 0 is not usable".into(),
            });
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Render as a socks5h:// URL. The `h` variant resolves DNS through
    /// the proxy, so keylists hosted on .onion addresses work.
    pub fn socks_url(&self) -> String {
        format!("socks5h://{}:{}", self.host, self.port)
    }
}

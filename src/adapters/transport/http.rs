use std::time::Duration;

use crate::core::errors::{KeyflockError, Result};
use crate::core::models::proxy::ProxyConfig;
use crate::core::traits::transport::Transport;

/// HTTP(S) transport backed by reqwest, with optional SOCKS5 egress.
///
/// A client is built per fetch so each request gets its own timeout and
/// proxy configuration; keylist fetches are rare enough that connection
/// reuse buys nothing.
pub struct HttpTransport;

impl HttpTransport {
    pub fn new() -> Self {
        Self
    }

    fn build_client(
        url: &str,
        proxy: Option<&ProxyConfig>,
        timeout: Duration,
    ) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("keyflock/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy.socks_url()).map_err(|e| {
                KeyflockError::InvalidProxyConfig {
                    detail: e.to_string(),
                }
            })?;
            builder = builder.proxy(proxy);
        }

        builder.build().map_err(|e| KeyflockError::NetworkError {
            url: url.to_string(),
            reason: format!("Failed to create HTTP client: {e}"),
        })
    }

    fn classify(url: &str, e: reqwest::Error) -> KeyflockError {
        if e.is_timeout() {
            KeyflockError::NetworkTimeout {
                url: url.to_string(),
            }
        } else {
            KeyflockError::NetworkError {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn fetch(
        &self,
        url: &str,
        proxy: Option<&ProxyConfig>,
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        let client = Self::build_client(url, proxy, timeout)?;

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| KeyflockError::NetworkError {
                url: url.to_string(),
                reason: format!("Failed to create async runtime: {e}"),
            })?;

        rt.block_on(async {
            let resp = client
                .get(url)
                .send()
                .await
                .map_err(|e| Self::classify(url, e))?;

            if !resp.status().is_success() {
                return Err(KeyflockError::NetworkError {
                    url: url.to_string(),
                    reason: format!("Server returned status {}", resp.status()),
                });
            }

            resp.bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| Self::classify(url, e))
        })
    }
}

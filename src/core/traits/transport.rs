use std::time::Duration;

use crate::core::errors::Result;
use crate::core::models::proxy::ProxyConfig;

/// Port for fetching a URL's bytes, optionally through a SOCKS5 proxy.
///
/// Implementations live in `adapters::transport`. This layer never
/// retries; retry policy belongs to the callers.
pub trait Transport: Send + Sync {
    /// Fetch the body at `url` within `timeout`.
    ///
    /// Fails with `NetworkTimeout` when the deadline is exceeded and
    /// `NetworkError` for transport failures or non-2xx responses, both
    /// carrying the failing URL.
    fn fetch(&self, url: &str, proxy: Option<&ProxyConfig>, timeout: Duration)
    -> Result<Vec<u8>>;
}

/// All domain errors for keyflock.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum KeyflockError {
    #[error(
        "'{input}' is not a valid authority key fingerprint\n\n  \
         Expected a 40-character hex OpenPGP fingerprint. Spaces and a\n  \
         leading '0x' are allowed and ignored."
    )]
    InvalidFingerprint { input: String },

    #[error("Invalid SOCKS5 proxy configuration: {detail}")]
    InvalidProxyConfig { detail: String },

    #[error("Request timed out: {url}")]
    NetworkTimeout { url: String },

    #[error("Network request failed: {url}\n\n  {reason}")]
    NetworkError { url: String, reason: String },

    #[error(
        "Could not fetch the authority key {fingerprint} from the keyserver\n\n  \
         {reason}\n\n  \
         Check the fingerprint, the keyserver address, and your connection."
    )]
    AuthorityKeyFetchFailed { fingerprint: String, reason: String },

    #[error(
        "Could not fetch the keylist from {url}\n\n  \
         {reason}\n\n  \
         The keylist and its .sig file must both be reachable."
    )]
    KeylistFetchFailed { url: String, reason: String },

    #[error(
        "Keylist signature verification FAILED\n\n  \
         {reason}\n\n  \
         The keylist is not signed by the authority key, so it cannot be\n  \
         trusted. Do not add this keylist unless you know why this happened."
    )]
    SignatureVerificationFailed { reason: String },

    #[error("Keylist parse error on line {line_number}: {line}")]
    KeylistParseError { line_number: usize, line: String },

    #[error("Key {fingerprint} was not found on the keyserver")]
    KeyNotFoundOnServer { fingerprint: String },

    #[error("Could not fetch key {fingerprint}: {reason}")]
    KeyFetchFailed { fingerprint: String, reason: String },

    #[error("gpg operation failed: {reason}")]
    KeyringFailed { reason: String },

    #[error("A sync for {url} is already in progress")]
    AlreadyInProgress { url: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("A keylist with address {url} is already configured")]
    KeylistExists { url: String },

    #[error(
        "No keylist with address {url} is configured\n\n  \
         Run 'keyflock status' to see configured keylists."
    )]
    KeylistNotFound { url: String },

    #[error("Invalid settings: {detail}")]
    InvalidSettings { detail: String },

    #[error("Sync finished with {failed} of {total} keylists failing")]
    SyncIncomplete { failed: usize, total: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KeyflockError>;

use crate::core::errors::Result;
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::outcome::{KeyImportResult, KeyMetadata};
use crate::core::models::proxy::ProxyConfig;

/// Port over the external keyring toolchain (gpg).
///
/// All operations are synchronous and may be network-bound; callers run
/// them from worker threads, never from a thread driving user
/// interaction.
pub trait KeyringClient: Send + Sync {
    /// Retrieve a key's material from a keyserver by fingerprint,
    /// without touching the local keyring.
    fn fetch_key(
        &self,
        fingerprint: &Fingerprint,
        keyserver: &str,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Vec<u8>>;

    /// Import or refresh key material in the local keyring, reporting
    /// which fingerprints were newly added vs already present.
    fn import_key(&self, key_material: &[u8]) -> Result<KeyImportResult>;

    /// Verify a detached signature over `data` against the expected
    /// signer. Fails closed: toolchain errors, ambiguous signers, and
    /// fingerprint mismatches are all verification failures, never
    /// success.
    fn verify_detached_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        signer: &Fingerprint,
    ) -> Result<()>;

    /// Expiry/revocation state of a key already in the local keyring.
    fn key_metadata(&self, fingerprint: &Fingerprint) -> Result<KeyMetadata>;
}

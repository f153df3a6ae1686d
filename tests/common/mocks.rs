//! Scripted in-memory implementations of the Transport and
//! KeyringClient ports, with call counters so tests can assert that
//! input validation happens before any network access.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use keyflock::core::errors::{KeyflockError, Result};
use keyflock::core::models::fingerprint::Fingerprint;
use keyflock::core::models::outcome::{KeyImportResult, KeyMetadata};
use keyflock::core::models::proxy::ProxyConfig;
use keyflock::core::traits::keyring::KeyringClient;
use keyflock::core::traits::transport::Transport;

enum Scripted {
    Body(Vec<u8>),
    Timeout,
    Error(String),
}

/// Transport serving scripted responses keyed by URL.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Body(body.to_vec()));
    }

    pub fn time_out(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Timeout);
    }

    pub fn fail(&self, url: &str, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Error(reason.to_string()));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn fetch(
        &self,
        url: &str,
        _proxy: Option<&ProxyConfig>,
        _timeout: Duration,
    ) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.responses.lock().unwrap().get(url) {
            Some(Scripted::Body(body)) => Ok(body.clone()),
            Some(Scripted::Timeout) => Err(KeyflockError::NetworkTimeout {
                url: url.to_string(),
            }),
            Some(Scripted::Error(reason)) => Err(KeyflockError::NetworkError {
                url: url.to_string(),
                reason: reason.clone(),
            }),
            None => Err(KeyflockError::NetworkError {
                url: url.to_string(),
                reason: "no response scripted for this URL".into(),
            }),
        }
    }
}

/// Keyring client over an in-memory "keyserver" and "local keyring".
///
/// Key material is the fingerprint itself as UTF-8, which keeps the
/// fetch/import round understandable: `import_key` re-parses the
/// material to know which fingerprint it holds.
#[derive(Default)]
pub struct MockKeyring {
    server_keys: Mutex<HashSet<String>>,
    local_keys: Mutex<HashSet<String>>,
    /// Keys present locally but with fresher data on the server; the
    /// next import reports them as updated.
    stale_keys: Mutex<HashSet<String>>,
    broken_keys: Mutex<HashSet<String>>,
    metadata: Mutex<HashMap<String, KeyMetadata>>,
    /// (data, signature, signer) tuples that verify.
    trusted_sigs: Mutex<Vec<(Vec<u8>, Vec<u8>, String)>>,
    keyserver_down: AtomicBool,
    /// While set, fetch_key blocks; lets tests hold a pass open.
    hold: AtomicBool,
    fetch_calls: AtomicUsize,
    verify_calls: AtomicUsize,
}

impl MockKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a key fetchable from the keyserver.
    pub fn serve_key(&self, fpr: &Fingerprint) {
        self.server_keys.lock().unwrap().insert(fpr.to_string());
    }

    /// Pretend the key is already in the local keyring.
    pub fn preload_local(&self, fpr: &Fingerprint) {
        self.local_keys.lock().unwrap().insert(fpr.to_string());
    }

    /// The server has fresher data for an already-imported key.
    pub fn mark_stale(&self, fpr: &Fingerprint) {
        self.stale_keys.lock().unwrap().insert(fpr.to_string());
    }

    /// Fetching this key fails with a transport-ish error.
    pub fn break_key(&self, fpr: &Fingerprint) {
        self.broken_keys.lock().unwrap().insert(fpr.to_string());
    }

    pub fn set_metadata(&self, fpr: &Fingerprint, expired: bool, revoked: bool) {
        self.metadata
            .lock()
            .unwrap()
            .insert(fpr.to_string(), KeyMetadata { expired, revoked });
    }

    /// Register a (data, signature, signer) combination as valid.
    pub fn trust_signature(&self, data: &[u8], signature: &[u8], signer: &Fingerprint) {
        self.trusted_sigs.lock().unwrap().push((
            data.to_vec(),
            signature.to_vec(),
            signer.to_string(),
        ));
    }

    pub fn set_keyserver_down(&self, down: bool) {
        self.keyserver_down.store(down, Ordering::SeqCst);
    }

    pub fn set_hold(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn has_local(&self, fpr: &Fingerprint) -> bool {
        self.local_keys.lock().unwrap().contains(fpr.as_str())
    }
}

impl KeyringClient for MockKeyring {
    fn fetch_key(
        &self,
        fingerprint: &Fingerprint,
        _keyserver: &str,
        _proxy: Option<&ProxyConfig>,
    ) -> Result<Vec<u8>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        while self.hold.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(2));
        }

        if self.keyserver_down.load(Ordering::SeqCst) {
            return Err(KeyflockError::KeyFetchFailed {
                fingerprint: fingerprint.to_string(),
                reason: "connection refused".into(),
            });
        }
        if self
            .broken_keys
            .lock()
            .unwrap()
            .contains(fingerprint.as_str())
        {
            return Err(KeyflockError::KeyFetchFailed {
                fingerprint: fingerprint.to_string(),
                reason: "keyserver receive failed".into(),
            });
        }
        if self
            .server_keys
            .lock()
            .unwrap()
            .contains(fingerprint.as_str())
        {
            Ok(fingerprint.as_str().as_bytes().to_vec())
        } else {
            Err(KeyflockError::KeyNotFoundOnServer {
                fingerprint: fingerprint.to_string(),
            })
        }
    }

    fn import_key(&self, key_material: &[u8]) -> Result<KeyImportResult> {
        let text = std::str::from_utf8(key_material).map_err(|_| KeyflockError::KeyringFailed {
            reason: "mock key material is not UTF-8".into(),
        })?;
        let fpr = Fingerprint::parse(text)?;

        let mut result = KeyImportResult::default();
        let newly_added = self.local_keys.lock().unwrap().insert(fpr.to_string());
        if newly_added {
            result.imported.push(fpr);
        } else if self.stale_keys.lock().unwrap().remove(fpr.as_str()) {
            result.updated.push(fpr);
        } else {
            result.unchanged.push(fpr);
        }
        Ok(result)
    }

    fn verify_detached_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        signer: &Fingerprint,
    ) -> Result<()> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let trusted = self.trusted_sigs.lock().unwrap();
        let ok = trusted
            .iter()
            .any(|(d, s, who)| d == data && s == signature && who == signer.as_str());
        if ok {
            Ok(())
        } else {
            Err(KeyflockError::SignatureVerificationFailed {
                reason: "signature did not verify against the authority key".into(),
            })
        }
    }

    fn key_metadata(&self, fingerprint: &Fingerprint) -> Result<KeyMetadata> {
        Ok(self
            .metadata
            .lock()
            .unwrap()
            .get(fingerprint.as_str())
            .copied()
            .unwrap_or_default())
    }
}

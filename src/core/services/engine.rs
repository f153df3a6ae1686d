use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::Utc;

use crate::core::errors::KeyflockError;
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::keylist::{KeylistConfig, KeylistRecord, parse_keylist};
use crate::core::models::outcome::{
    KeyOutcome, KeyStatus, StatusKind, StatusNote, SyncOutcome, SyncReport,
};
use crate::core::models::proxy::ProxyConfig;
use crate::core::traits::keyring::KeyringClient;
use crate::core::traits::transport::Transport;

/// Upper bound on concurrent record syncs. Resource courtesy only;
/// correctness relies solely on each record's own guard.
const MAX_WORKERS: usize = 4;

/// Clears the record's syncing flag on every exit path, including
/// unwinding.
struct SyncGuard<'a>(&'a KeylistRecord);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.finish_sync();
    }
}

/// Recurring synchronization over already-trusted keylists.
///
/// Each pass re-fetches the authority key, re-verifies the keylist
/// signature, and then imports every member key best-effort: one bad
/// key never aborts the rest of the list. Trust is never revoked by a
/// failed refresh; a keylist that stops verifying is reported as a
/// warning while the previously imported keys stay in place.
pub struct SyncEngine {
    transport: Arc<dyn Transport>,
    keyring: Arc<dyn KeyringClient>,
    /// Process-wide default keyserver.
    keyserver: String,
    timeout: Duration,
}

impl SyncEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        keyring: Arc<dyn KeyringClient>,
        keyserver: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            keyring,
            keyserver: keyserver.into(),
            timeout,
        }
    }

    /// Sync a single record, guarded against re-entrancy: a record
    /// already being synced reports `AlreadyInProgress` and is left
    /// untouched.
    pub fn sync_one(&self, record: &KeylistRecord) -> SyncReport {
        let url = record.config.url.clone();
        if !record.begin_sync() {
            return SyncReport {
                url,
                outcome: SyncOutcome::AlreadyInProgress,
            };
        }
        let _guard = SyncGuard(record);

        let outcome = self.run_pass(&record.config);
        record.apply(&outcome, Utc::now());
        SyncReport { url, outcome }
    }

    /// Fan `sync_one` out over all records on a bounded worker pool.
    /// The stop flag cancels the pass at record boundaries; records
    /// not yet started produce no report.
    pub fn sync_all(&self, records: &[KeylistRecord], stop: &AtomicBool) -> Vec<SyncReport> {
        if records.is_empty() {
            return Vec::new();
        }

        let queue: Mutex<VecDeque<(usize, &KeylistRecord)>> =
            Mutex::new(records.iter().enumerate().collect());
        let results: Mutex<Vec<Option<SyncReport>>> =
            Mutex::new((0..records.len()).map(|_| None).collect());
        let workers = records.len().min(MAX_WORKERS);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        if stop.load(Ordering::SeqCst) {
                            break;
                        }
                        let next = queue
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .pop_front();
                        let Some((idx, record)) = next else { break };
                        let report = self.sync_one(record);
                        results.lock().unwrap_or_else(PoisonError::into_inner)[idx] =
                            Some(report);
                    }
                });
            }
        });

        results
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .flatten()
            .collect()
    }

    fn run_pass(&self, config: &KeylistConfig) -> SyncOutcome {
        let proxy = match config.proxy() {
            Ok(proxy) => proxy,
            Err(e) => {
                return SyncOutcome::Failed(StatusNote::new(
                    StatusKind::InvalidProxyConfig,
                    e.to_string(),
                ));
            }
        };
        let keyserver = config.keyserver_or(&self.keyserver);

        // Refresh the authority key first; without it the signature
        // check below would be meaningless.
        let authority = &config.fingerprint;
        let material = match self.keyring.fetch_key(authority, keyserver, proxy.as_ref()) {
            Ok(material) => material,
            Err(e) => {
                return SyncOutcome::Failed(StatusNote::new(
                    StatusKind::AuthorityKeyFetchFailed,
                    e.to_string(),
                ));
            }
        };
        if let Err(e) = self.keyring.import_key(&material) {
            return SyncOutcome::Failed(StatusNote::new(
                StatusKind::AuthorityKeyFetchFailed,
                e.to_string(),
            ));
        }

        let keylist = match self.fetch_url(&config.url, proxy.as_ref()) {
            Ok(bytes) => bytes,
            Err(note) => return SyncOutcome::Failed(note),
        };
        let signature = match self.fetch_url(&config.sig_url(), proxy.as_ref()) {
            Ok(bytes) => bytes,
            Err(note) => return SyncOutcome::Failed(note),
        };

        // From here on the server has answered; what's left are trust
        // and content problems, reported as warnings so a broken or
        // hijacked host can't silently unwind existing keyrings.
        if let Err(e) = self
            .keyring
            .verify_detached_signature(&keylist, &signature, authority)
        {
            return SyncOutcome::Degraded(StatusNote::new(
                StatusKind::SignatureVerificationFailed,
                e.to_string(),
            ));
        }

        let members = match parse_keylist(&keylist) {
            Ok(members) => members,
            Err(e) => {
                return SyncOutcome::Degraded(StatusNote::new(
                    StatusKind::KeylistParseError,
                    e.to_string(),
                ));
            }
        };

        let outcomes = members
            .iter()
            .map(|fpr| self.sync_key(fpr, keyserver, proxy.as_ref()))
            .collect();
        SyncOutcome::Synced(outcomes)
    }

    fn fetch_url(
        &self,
        url: &str,
        proxy: Option<&ProxyConfig>,
    ) -> std::result::Result<Vec<u8>, StatusNote> {
        self.transport
            .fetch(url, proxy, self.timeout)
            .map_err(|e| StatusNote::from_error(&e))
    }

    fn sync_key(
        &self,
        fingerprint: &Fingerprint,
        keyserver: &str,
        proxy: Option<&ProxyConfig>,
    ) -> KeyOutcome {
        let material = match self.keyring.fetch_key(fingerprint, keyserver, proxy) {
            Ok(material) => material,
            Err(KeyflockError::KeyNotFoundOnServer { .. }) => {
                return KeyOutcome::new(fingerprint.clone(), KeyStatus::NotFound);
            }
            Err(e) => {
                return KeyOutcome::with_detail(
                    fingerprint.clone(),
                    KeyStatus::FetchFailed,
                    e.to_string(),
                );
            }
        };

        let import = match self.keyring.import_key(&material) {
            Ok(import) => import,
            Err(e) => {
                return KeyOutcome::with_detail(
                    fingerprint.clone(),
                    KeyStatus::FetchFailed,
                    e.to_string(),
                );
            }
        };
        let status = import.status_of(fingerprint);

        // Expired/revoked keys stay imported (gpg tracks that state),
        // but they are surfaced so the user sees them.
        match self.keyring.key_metadata(fingerprint) {
            Ok(meta) if meta.revoked => KeyOutcome::new(fingerprint.clone(), KeyStatus::Revoked),
            Ok(meta) if meta.expired => KeyOutcome::new(fingerprint.clone(), KeyStatus::Expired),
            Ok(_) => KeyOutcome::new(fingerprint.clone(), status),
            Err(e) => KeyOutcome::with_detail(
                fingerprint.clone(),
                status,
                format!("metadata check failed: {e}"),
            ),
        }
    }
}

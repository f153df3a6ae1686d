use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{KeyflockError, Result};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::outcome::{StatusNote, SyncOutcome};
use crate::core::models::proxy::ProxyConfig;

/// Static configuration of one keylist, as entered by the user.
///
/// The proxy host/port are kept as raw strings and validated into a
/// [`ProxyConfig`] at the point of use, so a record with a broken proxy
/// setting can still be listed and edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeylistConfig {
    /// The authority key fingerprint this keylist is anchored to.
    pub fingerprint: Fingerprint,
    /// Address of the keylist manifest.
    pub url: String,
    /// Keyserver override; empty means use the process-wide default.
    #[serde(default)]
    pub keyserver: String,
    #[serde(default)]
    pub use_proxy: bool,
    #[serde(default)]
    pub proxy_host: String,
    #[serde(default)]
    pub proxy_port: String,
}

impl KeylistConfig {
    /// The detached signature address: always exactly `url` + ".sig".
    pub fn sig_url(&self) -> String {
        format!("{}.sig", self.url)
    }

    /// Resolve the proxy setting, validating host and port first.
    pub fn proxy(&self) -> Result<Option<ProxyConfig>> {
        if !self.use_proxy {
            return Ok(None);
        }
        ProxyConfig::parse(&self.proxy_host, &self.proxy_port).map(Some)
    }

    /// The keyserver to use, falling back to the given default.
    pub fn keyserver_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.keyserver.trim().is_empty() {
            default
        } else {
            &self.keyserver
        }
    }
}

/// Live sync state of one keylist, mutated by every engine pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeylistStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<DateTime<Utc>>,
    /// Last hard failure (network, authority key), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StatusNote>,
    /// Last soft failure (verification, parse), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<StatusNote>,
}

/// One configured keylist plus its sync state.
///
/// The `syncing` flag is the single piece of state shared between
/// concurrent sync attempts; it is only reachable through
/// [`begin_sync`](Self::begin_sync) / [`finish_sync`](Self::finish_sync),
/// and the check-then-set in `begin_sync` is atomic.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeylistRecord {
    #[serde(flatten)]
    pub config: KeylistConfig,
    #[serde(default)]
    status: Mutex<KeylistStatus>,
    #[serde(skip)]
    syncing: AtomicBool,
}

impl KeylistRecord {
    pub fn new(config: KeylistConfig) -> Self {
        Self {
            config,
            status: Mutex::new(KeylistStatus::default()),
            syncing: AtomicBool::new(false),
        }
    }

    /// True while a sync or validation of this record is in flight.
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Claim this record for a sync pass. Returns false if another pass
    /// already holds it.
    pub fn begin_sync(&self) -> bool {
        self.syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the record. Must run on every exit path of a pass.
    pub fn finish_sync(&self) {
        self.syncing.store(false, Ordering::SeqCst);
    }

    /// Snapshot of the current sync state.
    pub fn status(&self) -> KeylistStatus {
        self.lock_status().clone()
    }

    /// Replace the sync state wholesale (settings-store merge).
    pub fn set_status(&self, status: KeylistStatus) {
        *self.lock_status() = status;
    }

    /// Record a pass outcome: every terminal path stamps `last_checked`;
    /// only a verified pass stamps `last_synced` and clears both notes.
    /// The displayed note is always the latest outcome, so a failure
    /// replaces a stale warning and vice versa.
    pub fn apply(&self, outcome: &SyncOutcome, now: DateTime<Utc>) {
        let mut status = self.lock_status();
        match outcome {
            SyncOutcome::AlreadyInProgress => {}
            SyncOutcome::Failed(note) => {
                status.last_checked = Some(now);
                status.error = Some(note.clone());
                status.warning = None;
            }
            SyncOutcome::Degraded(note) => {
                status.last_checked = Some(now);
                status.warning = Some(note.clone());
                status.error = None;
            }
            SyncOutcome::Synced(_) => {
                status.last_checked = Some(now);
                status.last_synced = Some(now);
                status.error = None;
                status.warning = None;
            }
        }
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, KeylistStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Aggregate "keylists are syncing" flag, e.g. for a status indicator.
pub fn any_syncing(records: &[KeylistRecord]) -> bool {
    records.iter().any(|r| r.is_syncing())
}

/// Parse a keylist body: UTF-8 text, one fingerprint per line, blank
/// lines and `#` comments ignored, whitespace trimmed per line. Order
/// is preserved. A line that is not a well-formed fingerprint fails the
/// whole parse, naming the offending line.
pub fn parse_keylist(bytes: &[u8]) -> Result<Vec<Fingerprint>> {
    let text = std::str::from_utf8(bytes).map_err(|_| KeyflockError::KeylistParseError {
        line_number: 0,
        line: "keylist is not valid UTF-8".into(),
    })?;

    let mut fingerprints = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fpr =
            Fingerprint::parse(line).map_err(|_| KeyflockError::KeylistParseError {
                line_number: idx + 1,
                line: line.to_string(),
            })?;
        fingerprints.push(fpr);
    }
    Ok(fingerprints)
}

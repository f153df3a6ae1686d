use serde::{Deserialize, Serialize};

use crate::core::errors::KeyflockError;
use crate::core::models::fingerprint::Fingerprint;

/// Record-level failure taxonomy, persisted in the settings file so the
/// last outcome survives restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    InvalidProxyConfig,
    NetworkTimeout,
    NetworkError,
    AuthorityKeyFetchFailed,
    KeylistFetchFailed,
    SignatureVerificationFailed,
    KeylistParseError,
}

impl StatusKind {
    /// True for failures that mean trust may actually be broken, as
    /// opposed to the server being temporarily unreachable.
    pub fn hard(&self) -> bool {
        matches!(self, StatusKind::SignatureVerificationFailed)
    }
}

/// A classified failure plus its human-readable detail, stored on the
/// record's `error` or `warning` slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNote {
    pub kind: StatusKind,
    pub detail: String,
}

impl StatusNote {
    pub fn new(kind: StatusKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Classify an engine error into a record-level note.
    pub fn from_error(err: &KeyflockError) -> Self {
        let kind = match err {
            KeyflockError::InvalidProxyConfig { .. } => StatusKind::InvalidProxyConfig,
            KeyflockError::NetworkTimeout { .. } => StatusKind::NetworkTimeout,
            KeyflockError::AuthorityKeyFetchFailed { .. } => StatusKind::AuthorityKeyFetchFailed,
            KeyflockError::KeylistFetchFailed { .. } => StatusKind::KeylistFetchFailed,
            KeyflockError::SignatureVerificationFailed { .. } => {
                StatusKind::SignatureVerificationFailed
            }
            KeyflockError::KeylistParseError { .. } => StatusKind::KeylistParseError,
            _ => StatusKind::NetworkError,
        };
        Self::new(kind, err.to_string())
    }
}

/// What happened to one member key during a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Imported,
    Updated,
    Unchanged,
    Expired,
    Revoked,
    FetchFailed,
    NotFound,
}

impl KeyStatus {
    /// Statuses worth highlighting even when the pass as a whole succeeded.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            KeyStatus::Expired | KeyStatus::Revoked | KeyStatus::FetchFailed | KeyStatus::NotFound
        )
    }
}

/// Per-fingerprint result of one sync pass.
#[derive(Debug, Clone)]
pub struct KeyOutcome {
    pub fingerprint: Fingerprint,
    pub status: KeyStatus,
    pub detail: Option<String>,
}

impl KeyOutcome {
    pub fn new(fingerprint: Fingerprint, status: KeyStatus) -> Self {
        Self {
            fingerprint,
            status,
            detail: None,
        }
    }

    pub fn with_detail(fingerprint: Fingerprint, status: KeyStatus, detail: String) -> Self {
        Self {
            fingerprint,
            status,
            detail: Some(detail),
        }
    }
}

/// Which fingerprints a keyring import added, refreshed, or left alone.
#[derive(Debug, Clone, Default)]
pub struct KeyImportResult {
    pub imported: Vec<Fingerprint>,
    pub updated: Vec<Fingerprint>,
    pub unchanged: Vec<Fingerprint>,
}

impl KeyImportResult {
    /// Classify a single fingerprint against this import result.
    pub fn status_of(&self, fingerprint: &Fingerprint) -> KeyStatus {
        if self.imported.contains(fingerprint) {
            KeyStatus::Imported
        } else if self.updated.contains(fingerprint) {
            KeyStatus::Updated
        } else {
            KeyStatus::Unchanged
        }
    }
}

/// Expiry/revocation state of a key in the local keyring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyMetadata {
    pub expired: bool,
    pub revoked: bool,
}

/// Terminal result of one `sync_one` pass over a record.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Rejected by the re-entrancy guard; not a failure.
    AlreadyInProgress,
    /// The pass failed before the keylist could be verified; recorded as
    /// the record's `error`.
    Failed(StatusNote),
    /// The keylist was fetched but did not verify or parse; recorded as
    /// the record's `warning`. Previously imported keys stay trusted.
    Degraded(StatusNote),
    /// The keylist verified; per-key outcomes, possibly mixed.
    Synced(Vec<KeyOutcome>),
}

/// One record's result from a sync pass, keyed by keylist address.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub url: String,
    pub outcome: SyncOutcome,
}

impl SyncReport {
    /// True if the pass did not reach a verified keylist.
    pub fn failed(&self) -> bool {
        matches!(
            self.outcome,
            SyncOutcome::Failed(_) | SyncOutcome::Degraded(_)
        )
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::errors::{KeyflockError, Result};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::keylist::{KeylistConfig, parse_keylist};
use crate::core::traits::keyring::KeyringClient;
use crate::core::traits::transport::Transport;

/// Raw user input for a keylist add/edit, exactly as entered. Nothing
/// here is validated yet; that is the validator's first step.
#[derive(Debug, Clone)]
pub struct ValidatorParams {
    pub fingerprint: String,
    pub url: String,
    /// Keyserver override; empty means use the validator's default.
    pub keyserver: String,
    pub use_proxy: bool,
    pub proxy_host: String,
    pub proxy_port: String,
}

/// Progress steps reported while a validation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorPhase {
    FetchingAuthorityKey,
    FetchingKeylist,
    VerifyingSignature,
    ParsingFingerprints,
}

impl ValidatorPhase {
    pub fn describe(&self) -> &'static str {
        match self {
            ValidatorPhase::FetchingAuthorityKey => "Fetching authority key from keyserver...",
            ValidatorPhase::FetchingKeylist => "Downloading keylist and signature...",
            ValidatorPhase::VerifyingSignature => "Verifying keylist signature...",
            ValidatorPhase::ParsingFingerprints => "Reading fingerprints...",
        }
    }
}

/// Successful validation output: the normalized record configuration
/// plus the verified member fingerprints, in file order.
#[derive(Debug, Clone)]
pub struct ValidatedKeylist {
    pub config: KeylistConfig,
    pub members: Vec<Fingerprint>,
}

/// One-shot trust establishment for a new or edited keylist.
///
/// Chains: fingerprint syntax check, authority key fetch + import,
/// keylist + detached signature fetch, signature verification,
/// fingerprint parsing. Any step failing is terminal for the attempt;
/// the caller may retry by re-invoking. The authority key import is
/// deliberately left in place even when a later step fails: caching a
/// public key grants no trust by itself.
pub struct AuthorityValidator {
    transport: Arc<dyn Transport>,
    keyring: Arc<dyn KeyringClient>,
    /// Process-wide default keyserver.
    keyserver: String,
    timeout: Duration,
}

impl AuthorityValidator {
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

    /// Run the whole workflow on the calling thread.
    pub fn validate(&self, params: &ValidatorParams) -> Result<ValidatedKeylist> {
        self.run(params, &|_| {}, &AtomicBool::new(false))
    }

    /// Run the workflow on a worker thread, returning a cancellable
    /// handle. Phase transitions arrive on [`ValidatorHandle::phases`].
    pub fn start(&self, params: ValidatorParams) -> ValidatorHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let (phase_tx, phase_rx) = mpsc::channel();
        let worker = Self {
            transport: Arc::clone(&self.transport),
            keyring: Arc::clone(&self.keyring),
            keyserver: self.keyserver.clone(),
            timeout: self.timeout,
        };
        let flag = Arc::clone(&cancel);

        let join = thread::spawn(move || {
            let report = move |phase: ValidatorPhase| {
                let _ = phase_tx.send(phase);
            };
            worker.run(&params, &report, &flag)
        });

        ValidatorHandle {
            cancel,
            phases: phase_rx,
            join: Some(join),
        }
    }

    fn run(
        &self,
        params: &ValidatorParams,
        report: &dyn Fn(ValidatorPhase),
        cancel: &AtomicBool,
    ) -> Result<ValidatedKeylist> {
        // Input validation first; nothing below runs with bad input and
        // no network access happens before this point.
        let authority = Fingerprint::parse(&params.fingerprint)?;
        let config = KeylistConfig {
            fingerprint: authority.clone(),
            url: params.url.clone(),
            keyserver: params.keyserver.clone(),
            use_proxy: params.use_proxy,
            proxy_host: params.proxy_host.clone(),
            proxy_port: params.proxy_port.clone(),
        };
        let proxy = config.proxy()?;
        let keyserver = config.keyserver_or(&self.keyserver);

        checkpoint(cancel)?;
        report(ValidatorPhase::FetchingAuthorityKey);
        let material = self
            .keyring
            .fetch_key(&authority, keyserver, proxy.as_ref())
            .map_err(|e| KeyflockError::AuthorityKeyFetchFailed {
                fingerprint: authority.to_string(),
                reason: e.to_string(),
            })?;
        self.keyring.import_key(&material)?;

        checkpoint(cancel)?;
        report(ValidatorPhase::FetchingKeylist);
        let keylist = self
            .transport
            .fetch(&config.url, proxy.as_ref(), self.timeout)
            .map_err(|e| KeyflockError::KeylistFetchFailed {
                url: config.url.clone(),
                reason: e.to_string(),
            })?;
        let sig_url = config.sig_url();
        let signature = self
            .transport
            .fetch(&sig_url, proxy.as_ref(), self.timeout)
            .map_err(|e| KeyflockError::KeylistFetchFailed {
                url: sig_url.clone(),
                reason: e.to_string(),
            })?;

        checkpoint(cancel)?;
        report(ValidatorPhase::VerifyingSignature);
        self.keyring
            .verify_detached_signature(&keylist, &signature, &authority)
            .map_err(|e| match e {
                verification @ KeyflockError::SignatureVerificationFailed { .. } => verification,
                other => KeyflockError::SignatureVerificationFailed {
                    reason: other.to_string(),
                },
            })?;

        checkpoint(cancel)?;
        report(ValidatorPhase::ParsingFingerprints);
        let members = parse_keylist(&keylist)?;

        Ok(ValidatedKeylist { config, members })
    }
}

fn checkpoint(cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::SeqCst) {
        Err(KeyflockError::Cancelled)
    } else {
        Ok(())
    }
}

/// Handle on an in-flight validation.
///
/// Dropping the handle without waiting abandons the workflow: the
/// worker keeps running to completion but its result goes nowhere.
/// After [`cancel`](Self::cancel), [`wait`](Self::wait) always returns
/// `None`; a late result is discarded, never delivered.
pub struct ValidatorHandle {
    cancel: Arc<AtomicBool>,
    phases: Receiver<ValidatorPhase>,
    join: Option<JoinHandle<Result<ValidatedKeylist>>>,
}

impl ValidatorHandle {
    /// Stop delivering results. In-flight network operations are
    /// allowed to finish; the workflow stops at the next step boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Phase transition events; the channel closes when the worker
    /// finishes.
    pub fn phases(&self) -> &Receiver<ValidatorPhase> {
        &self.phases
    }

    /// Block until the workflow finishes. `None` means the result was
    /// discarded (cancelled, or the worker died).
    pub fn wait(mut self) -> Option<Result<ValidatedKeylist>> {
        let join = self.join.take()?;
        let result = join.join().ok()?;
        if self.cancel.load(Ordering::SeqCst) {
            return None;
        }
        match result {
            Err(KeyflockError::Cancelled) => None,
            other => Some(other),
        }
    }
}

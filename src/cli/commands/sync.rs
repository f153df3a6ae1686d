use std::path::Path;
use std::sync::atomic::AtomicBool;

use crate::cli::output;
use crate::config::settings::Settings;
use crate::core::errors::{KeyflockError, Result};
use crate::core::models::outcome::{KeyOutcome, KeyStatus, SyncOutcome, SyncReport};

/// Execute the `keyflock sync` command: one pass over all keylists, or
/// a single one when `--url` is given. Updated timestamps and outcomes
/// are persisted back to the settings file.
pub fn execute(settings_path: &Path, url: Option<&str>) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    if settings.keylists.is_empty() {
        output::warning("No keylists configured. Add one with 'keyflock add'.");
        return Ok(());
    }

    let engine = super::build_engine(&settings);
    output::header("Syncing keylists");

    let reports = match url {
        Some(url) => {
            let record = settings
                .find(url)
                .ok_or_else(|| KeyflockError::KeylistNotFound {
                    url: url.to_string(),
                })?;
            vec![engine.sync_one(record)]
        }
        None => engine.sync_all(&settings.keylists, &AtomicBool::new(false)),
    };

    for report in &reports {
        print_report(report);
    }
    settings.save(settings_path)?;

    let failed = reports.iter().filter(|r| r.failed()).count();
    if failed > 0 {
        return Err(KeyflockError::SyncIncomplete {
            failed,
            total: reports.len(),
        });
    }
    Ok(())
}

/// Print one record's result, per-key warnings included.
pub(crate) fn print_report(report: &SyncReport) {
    match &report.outcome {
        SyncOutcome::AlreadyInProgress => {
            output::warning(&format!("{}: sync already in progress, skipped", report.url));
        }
        SyncOutcome::Failed(note) => {
            output::error(&format!("{}: {}", report.url, note.detail));
        }
        SyncOutcome::Degraded(note) if note.kind.hard() => {
            output::error(&format!("{}: {}", report.url, note.detail));
        }
        SyncOutcome::Degraded(note) => {
            output::warning(&format!("{}: {}", report.url, note.detail));
        }
        SyncOutcome::Synced(outcomes) => {
            output::success(&format!("{}: {}", report.url, describe_keys(outcomes)));
            for outcome in outcomes.iter().filter(|o| o.status.is_warning()) {
                let what = match outcome.status {
                    KeyStatus::Expired => "is expired",
                    KeyStatus::Revoked => "has been REVOKED",
                    KeyStatus::NotFound => "was not found on the keyserver",
                    _ => "could not be fetched",
                };
                match &outcome.detail {
                    Some(detail) => {
                        output::warning(&format!("{} {what}: {detail}", outcome.fingerprint));
                    }
                    None => output::warning(&format!("{} {what}", outcome.fingerprint)),
                }
            }
        }
    }
}

/// One-line summary of a pass, for daemon logs.
pub(crate) fn summary_line(report: &SyncReport) -> String {
    match &report.outcome {
        SyncOutcome::AlreadyInProgress => format!("{}: already in progress", report.url),
        SyncOutcome::Failed(note) | SyncOutcome::Degraded(note) => {
            format!("{}: {:?}", report.url, note.kind)
        }
        SyncOutcome::Synced(outcomes) => {
            format!("{}: {}", report.url, describe_keys(outcomes))
        }
    }
}

fn describe_keys(outcomes: &[KeyOutcome]) -> String {
    let count = |status: KeyStatus| outcomes.iter().filter(|o| o.status == status).count();
    let mut parts = Vec::new();
    for (status, label) in [
        (KeyStatus::Imported, "imported"),
        (KeyStatus::Updated, "updated"),
        (KeyStatus::Expired, "expired"),
        (KeyStatus::Revoked, "revoked"),
        (KeyStatus::FetchFailed, "failed"),
        (KeyStatus::NotFound, "missing"),
    ] {
        let n = count(status);
        if n > 0 {
            parts.push(format!("{n} {label}"));
        }
    }
    if parts.is_empty() {
        format!("{} keys up to date", outcomes.len())
    } else {
        format!("{} keys ({})", outcomes.len(), parts.join(", "))
    }
}

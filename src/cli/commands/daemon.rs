use std::path::Path;

use crate::adapters::keyring::gpg::GpgClient;
use crate::cli::output;
use crate::config::settings::Settings;
use crate::core::errors::{KeyflockError, Result};
use crate::core::models::keylist::KeylistStatus;
use crate::core::services::scheduler::Scheduler;

/// Execute the `keyflock daemon` command: sync immediately, then keep
/// syncing on the configured interval until the process is stopped.
///
/// Records are reloaded from the settings file before every pass, so
/// keylists added or removed with the CLI while the daemon runs are
/// picked up at the next pass. Pass results for records removed in the
/// meantime are discarded, never written back.
pub fn execute(settings_path: &Path) -> Result<()> {
    let settings = Settings::load(settings_path)?;

    if !GpgClient::new().is_available() {
        return Err(KeyflockError::KeyringFailed {
            reason: "gpg binary not found on PATH".into(),
        });
    }

    let engine = super::build_engine(&settings);
    output::timestamped(&format!(
        "keyflock daemon started, syncing every {} hour(s)",
        settings.sync.update_interval_hours.max(1)
    ));

    let source_path = settings_path.to_path_buf();
    let save_path = settings_path.to_path_buf();

    let scheduler = Scheduler::start(
        engine,
        settings.interval(),
        move || match Settings::load(&source_path) {
            Ok(settings) => settings.keylists,
            Err(e) => {
                output::error(&format!("Failed to load settings: {e}"));
                Vec::new()
            }
        },
        move |records, reports| {
            for report in &reports {
                output::timestamped(&super::sync::summary_line(report));
            }

            let statuses: Vec<(String, KeylistStatus)> = records
                .iter()
                .map(|r| (r.config.url.clone(), r.status()))
                .collect();
            match Settings::load(&save_path) {
                Ok(mut current) => {
                    current.adopt_statuses(&statuses);
                    if let Err(e) = current.save(&save_path) {
                        output::error(&format!("Failed to save settings: {e}"));
                    }
                }
                Err(e) => output::error(&format!("Failed to save settings: {e}")),
            }
        },
    );

    // First pass right away; afterwards the interval takes over.
    scheduler.sync_now();

    loop {
        std::thread::park();
    }
}

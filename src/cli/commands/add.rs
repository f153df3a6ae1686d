use std::path::Path;

use crate::cli::output;
use crate::config::settings::Settings;
use crate::core::errors::{KeyflockError, Result};
use crate::core::models::keylist::KeylistRecord;
use crate::core::services::validator::ValidatorParams;

/// Execute the `keyflock add` command.
///
/// Runs the one-time trust establishment: fetch the authority key,
/// fetch the keylist and its detached signature, verify, parse. Only
/// when all of that succeeds is the record adopted — synced once and
/// persisted. A failure persists nothing.
pub fn execute(
    settings_path: &Path,
    fingerprint: &str,
    url: &str,
    keyserver: Option<&str>,
    proxy_host: Option<&str>,
    proxy_port: Option<&str>,
) -> Result<()> {
    let mut settings = Settings::load(settings_path)?;
    if settings.find(url).is_some() {
        return Err(KeyflockError::KeylistExists {
            url: url.to_string(),
        });
    }

    output::header("Adding keylist");

    let validator = super::build_validator(&settings);
    let handle = validator.start(ValidatorParams {
        fingerprint: fingerprint.to_string(),
        url: url.to_string(),
        keyserver: keyserver.unwrap_or_default().to_string(),
        use_proxy: proxy_host.is_some(),
        proxy_host: proxy_host.unwrap_or_default().to_string(),
        proxy_port: proxy_port.unwrap_or_default().to_string(),
    });

    let sp = output::spinner("Validating keylist...");
    for phase in handle.phases().iter() {
        sp.set_message(phase.describe());
    }
    sp.finish_and_clear();

    let validated = match handle.wait() {
        Some(Ok(validated)) => validated,
        Some(Err(e)) => return Err(e),
        None => return Err(KeyflockError::Cancelled),
    };
    output::success(&format!(
        "Keylist verified: {} member keys, signed by {}",
        validated.members.len(),
        validated.config.fingerprint
    ));

    // Adoption sync: populate the keyring right away instead of waiting
    // for the first scheduled pass.
    let record = KeylistRecord::new(validated.config);
    let engine = super::build_engine(&settings);
    let sp = output::spinner("Importing member keys...");
    let report = engine.sync_one(&record);
    sp.finish_and_clear();
    super::sync::print_report(&report);

    settings.keylists.push(record);
    settings.save(settings_path)?;
    output::success("Keylist saved");
    Ok(())
}

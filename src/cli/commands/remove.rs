use std::path::Path;

use crate::cli::output;
use crate::config::settings::Settings;
use crate::core::errors::{KeyflockError, Result};

/// Execute the `keyflock remove` command. Stops syncing the keylist;
/// keys it already imported are left in the keyring, removing them is
/// the user's call via gpg itself.
pub fn execute(settings_path: &Path, url: &str) -> Result<()> {
    let mut settings = Settings::load(settings_path)?;
    if !settings.remove(url) {
        return Err(KeyflockError::KeylistNotFound {
            url: url.to_string(),
        });
    }
    settings.save(settings_path)?;

    output::success(&format!("Removed keylist {url}"));
    output::detail("Keys already imported remain in your keyring.");
    Ok(())
}

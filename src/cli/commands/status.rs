use std::path::Path;

use colored::Colorize;

use crate::cli::output;
use crate::config::settings::Settings;
use crate::core::errors::Result;
use crate::core::models::keylist::any_syncing;

/// Execute the `keyflock status` command. Entirely offline.
pub fn execute(settings_path: &Path) -> Result<()> {
    let settings = Settings::load(settings_path)?;

    output::header("Keylists");
    if settings.keylists.is_empty() {
        println!("  No keylists configured. Add one with 'keyflock add'.");
        return Ok(());
    }

    for record in &settings.keylists {
        println!("\n  {}", record.config.url.bold());
        output::detail(&format!("authority {}", record.config.fingerprint));
        if !record.config.keyserver.trim().is_empty() {
            output::detail(&format!("keyserver {}", record.config.keyserver));
        }
        if record.config.use_proxy {
            output::detail(&format!(
                "via SOCKS5 proxy {}:{}",
                record.config.proxy_host, record.config.proxy_port
            ));
        }

        let status = record.status();
        match status.last_synced {
            Some(t) => output::detail(&format!(
                "last synced {}",
                t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
            )),
            None => output::detail("never synced"),
        }
        if let Some(t) = status.last_checked {
            output::detail(&format!(
                "last checked {}",
                t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
            ));
        }

        if let Some(note) = &status.error {
            output::error(&note.detail);
        }
        if let Some(note) = &status.warning {
            if note.kind.hard() {
                output::error(&note.detail);
            } else {
                output::warning(&note.detail);
            }
        }
        if record.is_syncing() {
            output::detail("sync in progress");
        }
    }

    if any_syncing(&settings.keylists) {
        println!();
        output::warning("Keylists are currently syncing.");
    }
    Ok(())
}

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{KeyflockError, Result};
use crate::core::models::keylist::{KeylistRecord, KeylistStatus};

/// Keyserver used when neither the settings file nor the record
/// overrides it.
pub const DEFAULT_KEYSERVER: &str = "hkps://keys.openpgp.org";

/// Top-level keyflock configuration, read from `settings.toml`.
///
/// The file doubles as the persisted state store: each keylist entry
/// carries its last-checked/last-synced timestamps and last outcome,
/// so status survives restarts.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default, rename = "keylist", skip_serializing_if = "Vec::is_empty")]
    pub keylists: Vec<KeylistRecord>,
}

/// The `[sync]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    /// Hours between scheduled passes; clamped to a minimum of 1.
    #[serde(default = "default_interval_hours")]
    pub update_interval_hours: u64,
    /// Process-wide default keyserver.
    #[serde(default = "default_keyserver")]
    pub keyserver: String,
    /// Per-request transport timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            update_interval_hours: default_interval_hours(),
            keyserver: default_keyserver(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_interval_hours() -> u64 {
    3
}

fn default_keyserver() -> String {
    DEFAULT_KEYSERVER.to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

impl Settings {
    /// Default settings location, e.g. `~/.config/keyflock/settings.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| KeyflockError::InvalidSettings {
            detail: "Could not determine the config directory".into(),
        })?;
        Ok(config_dir.join("keyflock").join("settings.toml"))
    }

    /// Load settings; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| KeyflockError::InvalidSettings {
            detail: format!("Failed to parse {}: {e}", path.display()),
        })
    }

    /// Write settings via temp-file-then-rename so a crash mid-write
    /// cannot truncate the store.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| KeyflockError::InvalidSettings {
                detail: format!("Failed to serialize settings: {e}"),
            })?;

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent)?;
                parent
            }
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path).map_err(|e| KeyflockError::Io(e.error))?;
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync.update_interval_hours.max(1) * 3600)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.sync.timeout_secs.max(1))
    }

    pub fn find(&self, url: &str) -> Option<&KeylistRecord> {
        self.keylists.iter().find(|k| k.config.url == url)
    }

    /// Drop the record for `url`. Returns false if none matched.
    pub fn remove(&mut self, url: &str) -> bool {
        let before = self.keylists.len();
        self.keylists.retain(|k| k.config.url != url);
        self.keylists.len() != before
    }

    /// Copy sync state from a finished pass into the matching records.
    /// Results for records no longer configured are discarded.
    pub fn adopt_statuses(&mut self, synced: &[(String, KeylistStatus)]) {
        for (url, status) in synced {
            if let Some(record) = self.keylists.iter().find(|k| &k.config.url == url) {
                record.set_status(status.clone());
            }
        }
    }
}

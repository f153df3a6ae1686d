use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use crate::core::errors::{KeyflockError, Result};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::outcome::{KeyImportResult, KeyMetadata};
use crate::core::models::proxy::ProxyConfig;
use crate::core::traits::keyring::KeyringClient;

/// Keyring client that shells out to the system `gpg` binary.
///
/// Requires GnuPG 2.x on the system. Machine-readable output is
/// requested with `--status-fd 1` / `--with-colons` and parsed here;
/// the parsers are pure functions, unit-tested against captured gpg
/// transcripts.
pub struct GpgClient {
    /// Path to the gpg binary (defaults to "gpg").
    gpg_path: PathBuf,
}

impl GpgClient {
    /// Create a new client using the default `gpg` binary.
    pub fn new() -> Self {
        Self {
            gpg_path: PathBuf::from("gpg"),
        }
    }

    /// Create a new client with a custom gpg binary path.
    pub fn with_path(gpg_path: PathBuf) -> Self {
        Self { gpg_path }
    }

    /// Check if gpg is available on the system.
    pub fn is_available(&self) -> bool {
        Command::new(&self.gpg_path)
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.gpg_path);
        cmd.arg("--batch");
        cmd
    }

    /// Run a prepared gpg command, optionally piping data to stdin.
    /// Only spawn-level failures error here; callers inspect the exit
    /// status themselves because several operations (verify, recv) need
    /// the output of a failing run.
    fn run(cmd: &mut Command, stdin_data: Option<&[u8]>) -> Result<Output> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| KeyflockError::KeyringFailed {
            reason: format!("Failed to run gpg: {e}"),
        })?;

        if let Some(data) = stdin_data {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(data)
                    .map_err(|e| KeyflockError::KeyringFailed {
                        reason: format!("Failed to write to gpg stdin: {e}"),
                    })?;
            }
        } else {
            drop(child.stdin.take());
        }

        child
            .wait_with_output()
            .map_err(|e| KeyflockError::KeyringFailed {
                reason: format!("gpg process failed: {e}"),
            })
    }

    fn expect_success(output: Output) -> Result<Vec<u8>> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KeyflockError::KeyringFailed {
                reason: format!("gpg exited with error: {}", stderr.trim()),
            });
        }
        Ok(output.stdout)
    }
}

impl Default for GpgClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringClient for GpgClient {
    fn fetch_key(
        &self,
        fingerprint: &Fingerprint,
        keyserver: &str,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Vec<u8>> {
        // Receive into an ephemeral homedir so the user keyring is not
        // touched; import_key decides what actually lands there.
        let homedir = tempfile::tempdir().map_err(|e| KeyflockError::KeyringFailed {
            reason: format!("Failed to create temporary gpg home: {e}"),
        })?;

        let mut recv = self.command();
        recv.arg("--homedir")
            .arg(homedir.path())
            .arg("--keyserver")
            .arg(keyserver);
        if let Some(proxy) = proxy {
            recv.arg("--keyserver-options")
                .arg(format!("http-proxy={}", proxy.socks_url()));
        }
        recv.arg("--recv-keys").arg(fingerprint.as_str());

        let output = Self::run(&mut recv, None)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_recv_failure(fingerprint, stderr.trim()));
        }

        let mut export = self.command();
        export
            .arg("--homedir")
            .arg(homedir.path())
            .arg("--armor")
            .arg("--export")
            .arg(fingerprint.as_str());

        let material = Self::expect_success(Self::run(&mut export, None)?)?;
        if material.is_empty() {
            return Err(KeyflockError::KeyNotFoundOnServer {
                fingerprint: fingerprint.to_string(),
            });
        }
        Ok(material)
    }

    fn import_key(&self, key_material: &[u8]) -> Result<KeyImportResult> {
        let mut import = self.command();
        import.arg("--import").arg("--status-fd").arg("1");

        let stdout = Self::expect_success(Self::run(&mut import, Some(key_material))?)?;
        parse_import_status(&String::from_utf8_lossy(&stdout))
    }

    fn verify_detached_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        signer: &Fingerprint,
    ) -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| KeyflockError::KeyringFailed {
            reason: format!("Failed to create temporary directory: {e}"),
        })?;
        let data_path = dir.path().join("keylist");
        let sig_path = dir.path().join("keylist.sig");
        std::fs::write(&data_path, data)?;
        std::fs::write(&sig_path, signature)?;

        let mut verify = self.command();
        verify
            .arg("--status-fd")
            .arg("1")
            .arg("--verify")
            .arg(&sig_path)
            .arg(&data_path);

        let output = Self::run(&mut verify, None)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => "gpg rejected the signature".to_string(),
                s => s.to_string(),
            };
            return Err(KeyflockError::SignatureVerificationFailed { reason });
        }

        check_valid_signer(&String::from_utf8_lossy(&output.stdout), signer)
    }

    fn key_metadata(&self, fingerprint: &Fingerprint) -> Result<KeyMetadata> {
        let mut list = self.command();
        list.arg("--with-colons")
            .arg("--list-keys")
            .arg(fingerprint.as_str());

        let stdout = Self::expect_success(Self::run(&mut list, None)?)?;
        Ok(parse_key_validity(&String::from_utf8_lossy(&stdout)))
    }
}

fn classify_recv_failure(fingerprint: &Fingerprint, stderr: &str) -> KeyflockError {
    let lowered = stderr.to_ascii_lowercase();
    if lowered.contains("not found") || lowered.contains("no data") {
        KeyflockError::KeyNotFoundOnServer {
            fingerprint: fingerprint.to_string(),
        }
    } else {
        KeyflockError::KeyFetchFailed {
            fingerprint: fingerprint.to_string(),
            reason: stderr.to_string(),
        }
    }
}

/// Parse `IMPORT_OK` status lines into an import result.
///
/// Line format: `[GNUPG:] IMPORT_OK <flags> <fingerprint>` where flags
/// is a bitmask: 0 = unchanged, bit 0 = entirely new key, other bits =
/// new uids/signatures/subkeys on an existing key.
fn parse_import_status(status: &str) -> Result<KeyImportResult> {
    let mut result = KeyImportResult::default();
    for line in status.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("[GNUPG:]") || parts.next() != Some("IMPORT_OK") {
            continue;
        }
        let (Some(flags), Some(fpr)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(flags) = flags.parse::<u32>() else {
            continue;
        };
        let Ok(fpr) = Fingerprint::parse(fpr) else {
            continue;
        };

        if flags == 0 {
            result.unchanged.push(fpr);
        } else if flags & 1 != 0 {
            result.imported.push(fpr);
        } else {
            result.updated.push(fpr);
        }
    }

    if result.imported.is_empty() && result.updated.is_empty() && result.unchanged.is_empty() {
        return Err(KeyflockError::KeyringFailed {
            reason: "gpg reported no imported keys".into(),
        });
    }
    Ok(result)
}

/// Check `VALIDSIG` status lines against the expected signer.
///
/// Format: `[GNUPG:] VALIDSIG <sig-fpr> <date> ... <primary-fpr>`. The
/// signature may come from a signing subkey, in which case the primary
/// fingerprint (last field) is the one matching the authority. Exactly
/// one valid signature is required; zero or several is a failure.
fn check_valid_signer(status: &str, signer: &Fingerprint) -> Result<()> {
    let sigs: Vec<(&str, &str)> = status
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                ["[GNUPG:]", "VALIDSIG", sig_fpr, .., primary_fpr] => {
                    Some((*sig_fpr, *primary_fpr))
                }
                _ => None,
            }
        })
        .collect();

    match sigs.as_slice() {
        [] => Err(KeyflockError::SignatureVerificationFailed {
            reason: "gpg reported no valid signature".into(),
        }),
        [(sig_fpr, primary_fpr)] => {
            if *sig_fpr == signer.as_str() || *primary_fpr == signer.as_str() {
                Ok(())
            } else {
                Err(KeyflockError::SignatureVerificationFailed {
                    reason: format!(
                        "keylist is signed by {primary_fpr}, not by the authority key {signer}"
                    ),
                })
            }
        }
        _ => Err(KeyflockError::SignatureVerificationFailed {
            reason: format!("ambiguous signature: {} signers found", sigs.len()),
        }),
    }
}

/// Extract expiry/revocation from `--with-colons` listing output. The
/// validity field of the `pub` record is `e` for expired, `r` for
/// revoked.
fn parse_key_validity(colons: &str) -> KeyMetadata {
    for line in colons.lines() {
        if !line.starts_with("pub:") {
            continue;
        }
        let validity = line.split(':').nth(1).unwrap_or("");
        return KeyMetadata {
            expired: validity.contains('e'),
            revoked: validity.contains('r'),
        };
    }
    KeyMetadata::default()
}

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{KeyflockError, Result};

static FINGERPRINT_RE: OnceLock<Regex> = OnceLock::new();

fn fingerprint_re() -> &'static Regex {
    FINGERPRINT_RE.get_or_init(|| Regex::new("^[0-9A-F]{40}$").expect("static pattern"))
}

/// A normalized OpenPGP v4 public-key fingerprint: 40 uppercase hex digits.
///
/// User input is accepted with interior whitespace (the common
/// 4-character grouping) and an optional leading `0x`, both stripped
/// during parsing. Once constructed, a `Fingerprint` is always in
/// canonical form, so comparisons are plain string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Normalize and syntax-check a candidate fingerprint.
    pub fn parse(input: &str) -> Result<Self> {
        let stripped: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let stripped = stripped
            .strip_prefix("0x")
            .or_else(|| stripped.strip_prefix("0X"))
            .unwrap_or(&stripped);
        let normalized = stripped.to_ascii_uppercase();

        if !fingerprint_re().is_match(&normalized) {
            return Err(KeyflockError::InvalidFingerprint {
                input: input.to_string(),
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = KeyflockError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = KeyflockError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Fingerprint> for String {
    fn from(fpr: Fingerprint) -> Self {
        fpr.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_hex() {
        let fpr = Fingerprint::parse("927F419567FC5CE5E29520B2126838368A4E3B5D").unwrap();
        assert_eq!(fpr.as_str(), "927F419567FC5CE5E29520B2126838368A4E3B5D");
    }

    #[test]
    fn normalizes_grouping_prefix_and_case() {
        let fpr =
            Fingerprint::parse("0x927f 4195 67fc 5ce5 e295  20b2 1268 3836 8a4e 3b5d").unwrap();
        assert_eq!(fpr.as_str(), "927F419567FC5CE5E29520B2126838368A4E3B5D");
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            Fingerprint::parse(""),
            Err(KeyflockError::InvalidFingerprint { .. })
        ));
    }

    #[test]
    fn rejects_short_key_id() {
        // 16-hex key IDs are spoofable and are not accepted as anchors
        assert!(Fingerprint::parse("126838368A4E3B5D").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!(Fingerprint::parse("ZZZF419567FC5CE5E29520B2126838368A4E3B5D").is_err());
    }
}

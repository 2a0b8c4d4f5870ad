//! Ledger configuration.
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid (if
//! unhelpful) config; `validate` rejects values the ledger cannot run with.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DarkVaultError;
use crate::identity::Identity;

/// Default lifetime of a decryption session: one day.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// The ledger's own identity. It is granted access to every key handle
    /// it stores.
    pub ledger_identity: Identity,
    /// When set, every event is also appended to this JSON-lines file.
    pub event_log_path: Option<PathBuf>,
    /// Lifetime clients request for decryption sessions.
    pub session_ttl_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ledger_identity: Identity::ZERO,
            event_log_path: None,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}

impl LedgerConfig {
    /// A default config for the given ledger identity.
    pub fn for_ledger(ledger_identity: Identity) -> Self {
        Self {
            ledger_identity,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, DarkVaultError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| DarkVaultError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DarkVaultError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), DarkVaultError> {
        if self.ledger_identity == Identity::ZERO {
            return Err(DarkVaultError::Config(
                "ledger_identity must be non-zero".into(),
            ));
        }
        if self.session_ttl_secs == 0 {
            return Err(DarkVaultError::Config(
                "session_ttl_secs must be positive".into(),
            ));
        }
        let representable = i64::try_from(self.session_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
            .is_some();
        if !representable {
            return Err(DarkVaultError::Config(format!(
                "session_ttl_secs {} exceeds the representable time range",
                self.session_ttl_secs
            )));
        }
        Ok(())
    }

    /// Session lifetime as a `chrono` duration, saturating at `i64::MAX` seconds.
    pub fn session_ttl(&self) -> chrono::Duration {
        let secs = i64::try_from(self.session_ttl_secs).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_json_with_defaults() {
        let config = LedgerConfig::from_json_str(
            r#"{ "ledger_identity": "0x00000000000000000000000000000000000000c0" }"#,
        )
        .unwrap();
        assert_eq!(config.ledger_identity, Identity::with_last_byte(0xc0));
        assert_eq!(config.session_ttl_secs, DEFAULT_SESSION_TTL_SECS);
        assert!(config.event_log_path.is_none());
    }

    #[test]
    fn rejects_zero_identity_and_ttl() {
        assert!(matches!(
            LedgerConfig::from_json_str("{}"),
            Err(DarkVaultError::Config(_))
        ));

        let mut config = LedgerConfig::for_ledger(Identity::repeat_byte(0xC0));
        config.session_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_ttl_past_the_calendar() {
        let mut config = LedgerConfig::for_ledger(Identity::repeat_byte(0xC0));
        for ttl in [u64::MAX, i64::MAX as u64, 10_000_000_000_000] {
            config.session_ttl_secs = ttl;
            assert!(
                matches!(config.validate(), Err(DarkVaultError::Config(_))),
                "accepted ttl {ttl}"
            );
        }

        config.session_ttl_secs = 10 * 365 * 24 * 60 * 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            LedgerConfig::from_json_str("{ not json"),
            Err(DarkVaultError::Config(_))
        ));
    }
}

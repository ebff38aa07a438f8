//! Session configuration

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::account::MAX_BALANCE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory the transaction file is written to at logout
    pub output_dir: PathBuf,

    /// Highest balance an account may reach, in cents
    pub max_balance: i64,

    /// Per-session limits for standard logins
    pub limits: Limits,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            max_balance: MAX_BALANCE,
            limits: Limits::default(),
        }
    }
}

/// Running totals a standard login may not exceed within one session, in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub withdrawal: i64,
    pub transfer: i64,
    pub paybill: i64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // 500.00, 1000.00 and 2000.00
            withdrawal: 50_000,
            transfer: 100_000,
            paybill: 200_000,
        }
    }
}

impl SessionConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_BALANCE).contains(&self.max_balance) {
            return Err(ConfigError::Invalid(format!(
                "max_balance must be within 0..={}",
                MAX_BALANCE
            )));
        }
        let limits = [
            ("withdrawal", self.limits.withdrawal),
            ("transfer", self.limits.transfer),
            ("paybill", self.limits.paybill),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, limit)| *limit < 0) {
            return Err(ConfigError::Invalid(format!(
                "limits.{} must not be negative",
                name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(SessionConfig::from_toml("").unwrap(), SessionConfig::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = SessionConfig::from_toml(
            r#"
            output_dir = "/tmp/out"

            [limits]
            withdrawal = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.limits.withdrawal, 100);
        assert_eq!(config.limits.transfer, 100_000);
        assert_eq!(config.max_balance, MAX_BALANCE);
    }

    #[test]
    fn oversized_max_balance_is_invalid() {
        assert!(matches!(
            SessionConfig::from_toml("max_balance = 1000000000"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn negative_limit_is_invalid() {
        assert!(matches!(
            SessionConfig::from_toml("[limits]\npaybill = -1"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_document_is_parse_error() {
        assert!(matches!(
            SessionConfig::from_toml("max_balance = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SessionConfig::from_file(&dir.path().join("absent.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}

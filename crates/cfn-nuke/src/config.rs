//! Removal configuration loaded from JSON
//!
//! Every field has a default, so an empty object (or no file at all) is a
//! valid configuration. The key names used by older nuke configs are
//! accepted as aliases for the two switches.

use crate::wait::WaitConfig;
use cfn_nuke_common::defaults::{
    DEFAULT_ADMIN_POLICY_ARN, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INITIAL_DELAY_MS,
    DEFAULT_POLL_MAX_DELAY_SECS, DEFAULT_ROLE_PROPAGATION_DELAY_MS, DEFAULT_WAIT_TIMEOUT_SECS,
    MAX_DELAY_MS, MAX_POLL_DELAY_SECS, MAX_WAIT_TIMEOUT_SECS,
    default_admin_policy_arn, default_max_attempts, default_poll_initial_delay_ms,
    default_poll_max_delay_secs, default_role_propagation_delay_ms, default_wait_timeout_secs,
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Settings for stack removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RemovalConfig {
    /// Turn termination protection off when it blocks a delete
    #[serde(default, alias = "DisableDeletionProtection")]
    #[garde(skip)]
    pub disable_deletion_protection: bool,

    /// Delete through a temporary admin service role
    #[serde(
        default,
        alias = "EnableAutomaticRoleManagment",
        alias = "EnableAutomaticRoleManagement"
    )]
    #[garde(skip)]
    pub enable_automatic_role_management: bool,

    #[serde(default = "default_max_attempts")]
    #[garde(range(min = 1))]
    pub max_attempts: u32,

    /// Ceiling for each individual stack wait
    #[serde(default = "default_wait_timeout_secs")]
    #[garde(range(min = 1, max = MAX_WAIT_TIMEOUT_SECS))]
    pub wait_timeout_secs: u64,

    #[serde(default = "default_poll_initial_delay_ms")]
    #[garde(range(min = 1, max = MAX_DELAY_MS))]
    pub poll_initial_delay_ms: u64,

    #[serde(default = "default_poll_max_delay_secs")]
    #[garde(range(min = 1, max = MAX_POLL_DELAY_SECS))]
    pub poll_max_delay_secs: u64,

    /// Pause after creating a service role before using it
    #[serde(default = "default_role_propagation_delay_ms")]
    #[garde(range(max = MAX_DELAY_MS))]
    pub role_propagation_delay_ms: u64,

    /// Managed policy attached to provisioned service roles
    #[serde(default = "default_admin_policy_arn")]
    #[garde(length(min = 1))]
    pub admin_policy_arn: String,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            disable_deletion_protection: false,
            enable_automatic_role_management: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait_timeout_secs: DEFAULT_WAIT_TIMEOUT_SECS,
            poll_initial_delay_ms: DEFAULT_POLL_INITIAL_DELAY_MS,
            poll_max_delay_secs: DEFAULT_POLL_MAX_DELAY_SECS,
            role_propagation_delay_ms: DEFAULT_ROLE_PROPAGATION_DELAY_MS,
            admin_policy_arn: DEFAULT_ADMIN_POLICY_ARN.to_string(),
        }
    }
}

/// Why a configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl RemovalConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a configuration document
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validated()
    }

    /// Check field constraints, returning the config unchanged when they hold.
    ///
    /// Call again after applying command-line overrides.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()
            .map_err(|report| ConfigError::Invalid(report.to_string()))?;
        Ok(self)
    }

    /// Backoff and timeout settings for stack waits
    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig {
            initial_delay: Duration::from_millis(self.poll_initial_delay_ms),
            max_delay: Duration::from_secs(self.poll_max_delay_secs),
            timeout: Duration::from_secs(self.wait_timeout_secs),
        }
    }

    pub fn role_propagation_delay(&self) -> Duration {
        Duration::from_millis(self.role_propagation_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = RemovalConfig::from_json("{}").unwrap();
        assert_eq!(config, RemovalConfig::default());
        assert!(!config.disable_deletion_protection);
        assert!(!config.enable_automatic_role_management);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(
            config.admin_policy_arn,
            "arn:aws:iam::aws:policy/AdministratorAccess"
        );
    }

    #[test]
    fn test_legacy_key_names() {
        let config = RemovalConfig::from_json(
            r#"{"DisableDeletionProtection": true, "EnableAutomaticRoleManagment": true}"#,
        )
        .unwrap();
        assert!(config.disable_deletion_protection);
        assert!(config.enable_automatic_role_management);

        let config =
            RemovalConfig::from_json(r#"{"EnableAutomaticRoleManagement": true}"#).unwrap();
        assert!(config.enable_automatic_role_management);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = RemovalConfig::from_json(r#"{"max_atempts": 5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = RemovalConfig::from_json(r#"{"max_attempts": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("max_attempts")));
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let err = RemovalConfig::from_json(r#"{"wait_timeout_secs": 18446744073709551615}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("wait_timeout_secs")));

        let err = RemovalConfig::from_json(r#"{"poll_max_delay_secs": 86400}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("poll_max_delay_secs")));

        let config = RemovalConfig::from_json(r#"{"wait_timeout_secs": 86400}"#).unwrap();
        assert_eq!(config.wait_timeout_secs, 86_400);
    }

    #[test]
    fn test_empty_policy_rejected() {
        let err = RemovalConfig::from_json(r#"{"admin_policy_arn": ""}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_wait_config_conversion() {
        let config = RemovalConfig {
            wait_timeout_secs: 60,
            poll_initial_delay_ms: 250,
            poll_max_delay_secs: 10,
            ..Default::default()
        };
        let wait = config.wait_config();
        assert_eq!(wait.timeout, Duration::from_secs(60));
        assert_eq!(wait.initial_delay, Duration::from_millis(250));
        assert_eq!(wait.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_load_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "disable_deletion_protection": true,
                "max_attempts": 5,
                "wait_timeout_secs": 900
            }}"#
        )
        .unwrap();

        let config = RemovalConfig::load(file.path()).unwrap();
        assert!(config.disable_deletion_protection);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.wait_timeout_secs, 900);
        assert_eq!(config.poll_max_delay_secs, 30);
    }

    #[test]
    fn test_missing_file() {
        let err = RemovalConfig::load(Path::new("/nonexistent/cfn-nuke.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

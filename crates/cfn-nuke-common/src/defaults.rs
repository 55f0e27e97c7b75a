//! Default configuration values
//!
//! Shared by the config file loader and the CLI so both agree on defaults.

/// Maximum delete attempts per stack
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Ceiling for any single stack wait, in seconds (5 minutes)
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 300;

/// Largest accepted wait ceiling, in seconds (one day)
pub const MAX_WAIT_TIMEOUT_SECS: u64 = 86_400;

/// First delay between status polls, in milliseconds
pub const DEFAULT_POLL_INITIAL_DELAY_MS: u64 = 5_000;

/// Cap on the delay between status polls, in seconds
pub const DEFAULT_POLL_MAX_DELAY_SECS: u64 = 30;

/// Largest accepted first or capped poll delay, in seconds
pub const MAX_POLL_DELAY_SECS: u64 = 3_600;

/// [`MAX_POLL_DELAY_SECS`] in milliseconds, for the millisecond settings
pub const MAX_DELAY_MS: u64 = MAX_POLL_DELAY_SECS * 1_000;

/// Pause after creating a service role so IAM can propagate it, in milliseconds
pub const DEFAULT_ROLE_PROPAGATION_DELAY_MS: u64 = 1_000;

/// Managed policy attached to provisioned service roles
pub const DEFAULT_ADMIN_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AdministratorAccess";

/// Prefix for provisioned service role names
pub const SERVICE_ROLE_PREFIX: &str = "nuke-service-role-CFS";

/// IAM role name length limit
pub const MAX_ROLE_NAME_LEN: usize = 64;

/// Number of stacks the CLI removes at once
pub const DEFAULT_CONCURRENCY: usize = 4;

// Serde default functions for struct field defaults

pub fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

pub fn default_wait_timeout_secs() -> u64 {
    DEFAULT_WAIT_TIMEOUT_SECS
}

pub fn default_poll_initial_delay_ms() -> u64 {
    DEFAULT_POLL_INITIAL_DELAY_MS
}

pub fn default_poll_max_delay_secs() -> u64 {
    DEFAULT_POLL_MAX_DELAY_SECS
}

pub fn default_role_propagation_delay_ms() -> u64 {
    DEFAULT_ROLE_PROPAGATION_DELAY_MS
}

pub fn default_admin_policy_arn() -> String {
    DEFAULT_ADMIN_POLICY_ARN.to_string()
}

//! cfn-nuke-common - Shared types and utilities
//!
//! Types shared by the orchestrator and its CLI, without any AWS SDK
//! dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values
//! - [`properties`]: Ordered display properties with RFC 3339 timestamps
//! - [`status`]: CloudFormation stack status taxonomy
//! - [`tags`]: Tag constants for provisioned service roles

pub mod defaults;
pub mod properties;
pub mod status;
pub mod tags;

// Re-export commonly used types
pub use properties::Properties;
pub use status::{StackStatus, StatusCategory, Transition};

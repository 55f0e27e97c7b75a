//! AWS resource tag constants for cfn-nuke
//!
//! Service roles created by cfn-nuke carry these tags so a leaked role can
//! be traced back to the stack it was created for.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `cfn-nuke:tool` | Static identifier ("cfn-nuke") |
//! | `cfn-nuke:stack-name` | Stack the role was provisioned for |
//! | `cfn-nuke:created-at` | RFC 3339 creation timestamp |

/// Tag key for tool identification
pub const TAG_TOOL: &str = "cfn-nuke:tool";

/// Tag value for tool identification
pub const TAG_TOOL_VALUE: &str = "cfn-nuke";

/// Tag key for the owning stack name
pub const TAG_STACK_NAME: &str = "cfn-nuke:stack-name";

/// Tag key for creation timestamp (RFC 3339 format)
pub const TAG_CREATED_AT: &str = "cfn-nuke:created-at";

/// Standard tags for a service role provisioned for `stack_name`
pub fn service_role_tags(
    stack_name: &str,
    created_at: chrono::DateTime<chrono::Utc>,
) -> Vec<(&'static str, String)> {
    vec![
        (TAG_TOOL, TAG_TOOL_VALUE.to_string()),
        (TAG_STACK_NAME, stack_name.to_string()),
        (TAG_CREATED_AT, created_at.to_rfc3339()),
    ]
}

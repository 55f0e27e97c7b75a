//! Provider error classification
//!
//! The deletion state machine only cares about a handful of failure kinds:
//! the stack or role is gone, the delete was refused by termination
//! protection, or something else went wrong. Classification uses the SDK's
//! `.code()` / `.message()` metadata and only falls back to scanning the
//! Debug output when no typed SDK error is in the chain.

use thiserror::Error;

/// Provider failure kinds the orchestrator branches on
#[derive(Debug, Clone, Error)]
pub enum AwsError {
    /// The stack, role, or policy attachment does not exist
    #[error("{resource_type} not found: {resource_id}")]
    NotFound {
        resource_type: &'static str,
        resource_id: String,
    },

    #[error("entity already exists")]
    AlreadyExists,

    #[error("request throttled")]
    Throttled,

    /// DeleteStack refused because termination protection is on
    #[error("Stack [{stack_name}] cannot be deleted while TerminationProtection is enabled")]
    TerminationProtected { stack_name: String },

    /// Anything else, with the raw code when there was one
    #[error("provider error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, AwsError::AlreadyExists)
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, AwsError::Throttled)
    }

    /// True only for the protection refusal naming exactly `stack_name`
    pub fn is_termination_protected(&self, stack_name: &str) -> bool {
        matches!(self, AwsError::TerminationProtected { stack_name: s } if s == stack_name)
    }
}

/// IAM and CloudFormation codes for a missing entity
const NOT_FOUND_CODES: &[&str] = &["NoSuchEntity", "StackNotFoundException"];

const ALREADY_EXISTS_CODES: &[&str] = &["EntityAlreadyExists", "AlreadyExistsException"];

const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// CloudFormation reports missing stacks and protection refusals under this code
const VALIDATION_ERROR: &str = "ValidationError";

const PROTECTION_PREFIX: &str = "Stack [";
const PROTECTION_SUFFIX: &str = "] cannot be deleted while TerminationProtection is enabled";

/// Classify a provider failure from its error code and message
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("no error message").to_string();

    let Some(code) = code else {
        return AwsError::Sdk {
            code: None,
            message,
        };
    };

    if NOT_FOUND_CODES.contains(&code) {
        return AwsError::NotFound {
            resource_type: "entity",
            resource_id: message,
        };
    }
    if ALREADY_EXISTS_CODES.contains(&code) {
        return AwsError::AlreadyExists;
    }
    if THROTTLING_CODES.contains(&code) {
        return AwsError::Throttled;
    }
    if code == VALIDATION_ERROR {
        if let Some(stack_name) = protected_stack_name(&message) {
            return AwsError::TerminationProtected { stack_name };
        }
        if message.contains("does not exist") {
            return AwsError::NotFound {
                resource_type: "stack",
                resource_id: message,
            };
        }
    }
    AwsError::Sdk {
        code: Some(code.to_string()),
        message,
    }
}

/// Stack name inside a termination-protection refusal, if `message` is one
fn protected_stack_name(message: &str) -> Option<String> {
    let start = message.find(PROTECTION_PREFIX)? + PROTECTION_PREFIX.len();
    let rest = &message[start..];
    let end = rest.find(PROTECTION_SUFFIX)?;
    Some(rest[..end].to_string())
}

/// Classify an `anyhow::Error` returned by a provider call.
///
/// Looks through the cause chain for an [`AwsError`] or an SDK error from
/// one of the operations this crate calls; otherwise parses the code and
/// message out of the Debug output.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AwsError {
    use aws_sdk_cloudformation::error::ProvideErrorMetadata;
    use aws_sdk_cloudformation::operation as cfn;
    use aws_sdk_iam::operation as iam;

    macro_rules! try_sdk {
        ($cause:expr, $sdk:ident, $op:ty) => {
            if let Some(e) = $cause.downcast_ref::<$sdk::error::SdkError<$op>>() {
                return classify_aws_error(e.code(), e.message());
            }
        };
    }

    for cause in error.chain() {
        if let Some(classified) = cause.downcast_ref::<AwsError>() {
            return classified.clone();
        }
        try_sdk!(cause, aws_sdk_cloudformation, cfn::describe_stacks::DescribeStacksError);
        try_sdk!(cause, aws_sdk_cloudformation, cfn::delete_stack::DeleteStackError);
        try_sdk!(
            cause,
            aws_sdk_cloudformation,
            cfn::list_stack_resources::ListStackResourcesError
        );
        try_sdk!(
            cause,
            aws_sdk_cloudformation,
            cfn::update_termination_protection::UpdateTerminationProtectionError
        );
        try_sdk!(cause, aws_sdk_iam, iam::get_role::GetRoleError);
        try_sdk!(cause, aws_sdk_iam, iam::create_role::CreateRoleError);
        try_sdk!(cause, aws_sdk_iam, iam::attach_role_policy::AttachRolePolicyError);
        try_sdk!(cause, aws_sdk_iam, iam::detach_role_policy::DetachRolePolicyError);
        try_sdk!(cause, aws_sdk_iam, iam::delete_role::DeleteRoleError);
    }

    let rendered = format!("{error:?}");
    match code_in_debug(&rendered) {
        Some(code) => {
            let message = quoted_field(&rendered, "message: Some(\"")
                .unwrap_or_else(|| error.to_string());
            classify_aws_error(Some(&code), Some(&message))
        }
        None => AwsError::Sdk {
            code: None,
            message: error.to_string(),
        },
    }
}

/// Error code from a Debug rendering: a known code anywhere, else a `code: Some("...")` field
fn code_in_debug(rendered: &str) -> Option<String> {
    NOT_FOUND_CODES
        .iter()
        .chain(ALREADY_EXISTS_CODES)
        .chain(THROTTLING_CODES)
        .chain([&VALIDATION_ERROR])
        .find(|code| rendered.contains(**code))
        .map(|code| code.to_string())
        .or_else(|| quoted_field(rendered, "code: Some(\""))
}

fn quoted_field(rendered: &str, marker: &str) -> Option<String> {
    let start = rendered.find(marker)? + marker.len();
    let rest = &rendered[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entities() {
        assert!(classify_aws_error(Some("NoSuchEntity"), Some("role gone")).is_not_found());
        assert!(
            classify_aws_error(
                Some("ValidationError"),
                Some("Stack with id web does not exist"),
            )
            .is_not_found()
        );
    }

    #[test]
    fn termination_protection_signature() {
        let err = classify_aws_error(
            Some("ValidationError"),
            Some("Stack [web-prod] cannot be deleted while TerminationProtection is enabled"),
        );
        assert!(err.is_termination_protected("web-prod"));
        assert!(!err.is_termination_protected("web"));
        assert_eq!(
            err.to_string(),
            "Stack [web-prod] cannot be deleted while TerminationProtection is enabled"
        );
    }

    #[test]
    fn other_validation_errors_stay_generic() {
        let err = classify_aws_error(Some("ValidationError"), Some("Role arn is invalid"));
        assert!(matches!(err, AwsError::Sdk { code: Some(ref c), .. } if c == "ValidationError"));
    }

    #[test]
    fn conflict_and_rate_codes() {
        assert!(classify_aws_error(Some("EntityAlreadyExists"), None).is_already_exists());
        assert!(classify_aws_error(Some("Throttling"), Some("Rate exceeded")).is_throttled());
        assert!(matches!(
            classify_aws_error(Some("DeleteConflict"), Some("in use")),
            AwsError::Sdk { code: Some(_), .. }
        ));
        assert!(matches!(
            classify_aws_error(None, Some("timeout")),
            AwsError::Sdk { code: None, .. }
        ));
    }

    #[test]
    fn classified_error_inside_context() {
        let err = anyhow::Error::new(AwsError::TerminationProtected {
            stack_name: "web".to_string(),
        })
        .context("Failed to delete stack web");
        assert!(classify_anyhow_error(&err).is_termination_protected("web"));
    }

    #[test]
    fn protection_refusal_from_debug_output() {
        let err = anyhow::anyhow!(
            r#"ServiceError {{ code: Some("ValidationError"), message: Some("Stack [api] cannot be deleted while TerminationProtection is enabled") }}"#
        );
        assert!(classify_anyhow_error(&err).is_termination_protected("api"));
    }

    #[test]
    fn unknown_code_from_debug_output() {
        let rendered = r#"ServiceError { code: Some("InsufficientCapabilities"), message: "x" }"#;
        assert_eq!(
            code_in_debug(rendered).as_deref(),
            Some("InsufficientCapabilities")
        );
        assert!(code_in_debug("connection reset by peer").is_none());
    }
}

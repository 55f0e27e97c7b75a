//! Removal errors and outcomes

use crate::wait::WaitError;
use thiserror::Error;

/// How a successful removal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The stack was absent or `DELETE_COMPLETE` on the first probe
    AlreadyDeleted,
    /// Our delete call succeeded; `attempts` counts the attempts used
    Deleted { attempts: u32 },
    /// A delete started elsewhere finished while we waited
    DeletionCompleted,
}

/// Terminal failure of a stack removal
#[derive(Debug, Error)]
pub enum RemoveError {
    #[error(
        "stack {stack_name} cannot be deleted while termination protection is enabled (disable_deletion_protection is off)"
    )]
    ProtectionBlocked {
        stack_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("stack {stack_name} might not be deleted after {attempts} attempts")]
    AttemptsExhausted {
        stack_name: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to provision service role {role_name}")]
    RoleProvisioning {
        role_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to remove service role {role_name}{}", describe_primary(.primary))]
    RoleTeardown {
        role_name: String,
        #[source]
        source: anyhow::Error,
        /// The removal error, when the removal itself also failed
        primary: Option<Box<RemoveError>>,
    },

    #[error("waiting on stack {stack_name} failed")]
    Wait {
        stack_name: String,
        #[source]
        source: WaitError,
    },

    #[error("provider call for stack {stack_name} failed")]
    Provider {
        stack_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("removal of stack {stack_name} cancelled")]
    Cancelled { stack_name: String },
}

fn describe_primary(primary: &Option<Box<RemoveError>>) -> String {
    match primary {
        Some(e) => format!(" after removal failed: {e}"),
        None => String::new(),
    }
}

impl RemoveError {
    /// True when the removal stopped because the cancellation token fired
    pub fn is_cancelled(&self) -> bool {
        match self {
            RemoveError::Cancelled { .. } => true,
            RemoveError::Wait { source, .. } => source.is_cancelled(),
            RemoveError::RoleTeardown {
                primary: Some(primary),
                ..
            } => primary.is_cancelled(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teardown_message_includes_primary() {
        let err = RemoveError::RoleTeardown {
            role_name: "nuke-service-role-CFS-web".to_string(),
            source: anyhow::anyhow!("AccessDenied"),
            primary: Some(Box::new(RemoveError::Cancelled {
                stack_name: "web".to_string(),
            })),
        };
        assert_eq!(
            err.to_string(),
            "failed to remove service role nuke-service-role-CFS-web after removal failed: removal of stack web cancelled"
        );
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_teardown_message_without_primary() {
        let err = RemoveError::RoleTeardown {
            role_name: "r".to_string(),
            source: anyhow::anyhow!("AccessDenied"),
            primary: None,
        };
        assert_eq!(err.to_string(), "failed to remove service role r");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_wait_cancellation_is_cancelled() {
        let err = RemoveError::Wait {
            stack_name: "web".to_string(),
            source: WaitError::Cancelled {
                resource: "web".to_string(),
            },
        };
        assert!(err.is_cancelled());
    }
}

//! Removal event reporting
//!
//! The orchestrator never logs directly. Every step of a removal is reported
//! as a [`RemovalEvent`] to an [`EventSink`], so the same state machine can
//! feed `tracing` in production and a recording sink in tests.

use cfn_nuke_common::StackStatus;
use tracing::{info, warn};

/// A single observable step of a stack removal
#[derive(Debug, Clone, PartialEq)]
pub enum RemovalEvent {
    /// Status probe finished; `status` is `None` when the stack does not exist
    Probed {
        stack_name: String,
        attempt: u32,
        status: Option<StackStatus>,
    },
    /// Stack was already gone
    AlreadyGone { stack_name: String },
    /// Waiting for a delete that is already running
    WaitingForDeletion { stack_name: String },
    /// Waiting for a transitional status to settle before deleting
    Stabilizing {
        stack_name: String,
        status: StackStatus,
        target: StackStatus,
    },
    /// Child resources excluded from the next delete call
    RetainResolved {
        stack_name: String,
        retain: Vec<String>,
    },
    DeleteIssued {
        stack_name: String,
        attempt: u32,
        retain: Vec<String>,
        role_arn: Option<String>,
    },
    AttemptFailed {
        stack_name: String,
        attempt: u32,
        max_attempts: u32,
        error: String,
    },
    /// Termination protection was turned off so the next attempt can delete
    ProtectionDisabled { stack_name: String, attempt: u32 },
    /// Termination protection blocks deletion and mitigation is off
    ProtectionBlocked { stack_name: String },
    RoleProvisioned {
        stack_name: String,
        role_name: String,
        role_arn: String,
        reused: bool,
    },
    RoleTornDown {
        stack_name: String,
        role_name: String,
    },
    /// Stack reached `DELETE_COMPLETE` or disappeared
    Deleted { stack_name: String, attempts: u32 },
}

/// Destination for removal events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RemovalEvent);
}

/// Event sink that writes every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: RemovalEvent) {
        match event {
            RemovalEvent::Probed {
                stack_name,
                attempt,
                status,
            } => match status {
                Some(status) => {
                    info!(stack_name = %stack_name, attempt, status = %status, "Probed stack status")
                }
                None => info!(stack_name = %stack_name, attempt, "Stack not found"),
            },
            RemovalEvent::AlreadyGone { stack_name } => {
                info!(stack_name = %stack_name, "Stack already deleted")
            }
            RemovalEvent::WaitingForDeletion { stack_name } => {
                info!(stack_name = %stack_name, "Delete already in progress, waiting for it to finish")
            }
            RemovalEvent::Stabilizing {
                stack_name,
                status,
                target,
            } => {
                info!(stack_name = %stack_name, status = %status, target = %target, "Waiting for stack to stabilize")
            }
            RemovalEvent::RetainResolved { stack_name, retain } => {
                info!(stack_name = %stack_name, retain = ?retain, "Retaining resources that failed to delete")
            }
            RemovalEvent::DeleteIssued {
                stack_name,
                attempt,
                retain,
                role_arn,
            } => info!(
                stack_name = %stack_name,
                attempt,
                retain_count = retain.len(),
                role_arn = role_arn.as_deref().unwrap_or("-"),
                "Deleting stack"
            ),
            RemovalEvent::AttemptFailed {
                stack_name,
                attempt,
                max_attempts,
                error,
            } => warn!(
                stack_name = %stack_name,
                attempt = attempt + 1,
                max_attempts,
                error = %error,
                "Delete attempt failed"
            ),
            RemovalEvent::ProtectionDisabled { stack_name, attempt } => info!(
                stack_name = %stack_name,
                attempt,
                "Disabled termination protection"
            ),
            RemovalEvent::ProtectionBlocked { stack_name } => warn!(
                stack_name = %stack_name,
                "Termination protection is enabled; set disable_deletion_protection to remove this stack"
            ),
            RemovalEvent::RoleProvisioned {
                stack_name,
                role_name,
                role_arn,
                reused,
            } => info!(
                stack_name = %stack_name,
                role_name = %role_name,
                role_arn = %role_arn,
                reused,
                "Service role ready"
            ),
            RemovalEvent::RoleTornDown {
                stack_name,
                role_name,
            } => info!(stack_name = %stack_name, role_name = %role_name, "Service role removed"),
            RemovalEvent::Deleted {
                stack_name,
                attempts,
            } => info!(stack_name = %stack_name, attempts, "Stack deleted"),
        }
    }
}

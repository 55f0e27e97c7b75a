//! Status waits built on [`wait_for_resource`]
//!
//! Two waits drive the deletion state machine: one lets an in-flight create,
//! update, or rollback settle before a delete is issued, the other follows a
//! delete through to `DELETE_COMPLETE`.

use super::operations::StackOperations;
use crate::wait::{WaitConfig, WaitError, wait_for_resource};
use anyhow::Result;
use cfn_nuke_common::StackStatus;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Wait until a stack in `status` is no longer mid-operation.
///
/// Statuses without a stabilization target return immediately. Otherwise the
/// wait ends once the stack reaches the target, settles in any other
/// non-transitional status, or disappears.
pub async fn wait_for_stabilization<S: StackOperations>(
    stacks: &S,
    stack_name: &str,
    status: StackStatus,
    config: &WaitConfig,
    cancel: &CancellationToken,
) -> Result<(), WaitError> {
    let Some(target) = status.stabilization_target() else {
        return Ok(());
    };

    wait_for_resource(
        config,
        cancel,
        || is_settled(stacks, stack_name, target),
        &format!("stack {stack_name} to reach {target}"),
    )
    .await
}

/// Wait until a stack is `DELETE_COMPLETE` or no longer exists.
///
/// Entering a delete failure status ends the wait with [`WaitError::Check`].
pub async fn wait_for_deletion<S: StackOperations>(
    stacks: &S,
    stack_name: &str,
    config: &WaitConfig,
    cancel: &CancellationToken,
) -> Result<(), WaitError> {
    wait_for_resource(
        config,
        cancel,
        || is_deleted(stacks, stack_name),
        &format!("stack {stack_name} to be deleted"),
    )
    .await
}

async fn is_settled<S: StackOperations>(
    stacks: &S,
    stack_name: &str,
    target: StackStatus,
) -> Result<bool> {
    let Some(stack) = stacks.describe_stack(stack_name).await? else {
        debug!(stack_name = %stack_name, "Stack disappeared while stabilizing");
        return Ok(true);
    };
    if stack.status == target {
        return Ok(true);
    }
    if !stack.status.is_transitional() {
        debug!(
            stack_name = %stack_name,
            status = %stack.status,
            target = %target,
            "Stack settled in a status other than the target"
        );
        return Ok(true);
    }
    Ok(false)
}

async fn is_deleted<S: StackOperations>(stacks: &S, stack_name: &str) -> Result<bool> {
    let Some(stack) = stacks.describe_stack(stack_name).await? else {
        return Ok(true);
    };
    if stack.status == StackStatus::DeleteComplete {
        return Ok(true);
    }
    if stack.status.is_delete_failure() {
        let reason = stack
            .status_reason
            .map(|reason| format!(": {reason}"))
            .unwrap_or_default();
        anyhow::bail!("stack {stack_name} entered {}{reason}", stack.status);
    }
    Ok(false)
}

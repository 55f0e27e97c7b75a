//! Remote status probe

use super::operations::StackOperations;
use anyhow::Result;
use cfn_nuke_common::StackStatus;

/// Current status of `stack_name`, or `None` if the stack does not exist.
///
/// A missing stack is not an error: removal is idempotent. Any other
/// describe failure is returned unchanged.
pub async fn probe<S: StackOperations>(stacks: &S, stack_name: &str) -> Result<Option<StackStatus>> {
    Ok(stacks
        .describe_stack(stack_name)
        .await?
        .map(|stack| stack.status))
}

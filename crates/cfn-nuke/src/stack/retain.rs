//! Retain-set resolution for stacks stuck in `DELETE_FAILED`

use super::handle::StackResource;
use super::operations::StackOperations;
use anyhow::Result;

/// Logical ids of every child that is not yet `DELETE_COMPLETE`, in listing order
pub fn retain_set(resources: &[StackResource]) -> Vec<String> {
    resources
        .iter()
        .filter(|r| !r.is_deleted())
        .map(|r| r.logical_id.clone())
        .collect()
}

/// List the children of `stack_name` and compute the retain set from them
pub async fn resolve_retain_set<S: StackOperations>(
    stacks: &S,
    stack_name: &str,
) -> Result<Vec<String>> {
    let resources = stacks.list_stack_resources(stack_name).await?;
    Ok(retain_set(&resources))
}

//! Termination-protection negotiation

use super::operations::StackOperations;
use crate::aws::classify_anyhow_error;
use anyhow::Result;

/// What to do about a failed delete attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionDecision {
    /// The failure is unrelated to termination protection
    NotProtected,
    /// Protection was turned off; the next attempt can delete
    Disabled,
    /// Protection blocks the delete and may not be turned off
    Blocked,
}

/// Inspect `error` for the termination-protection rejection of `stack_name`.
///
/// When it matches and `allow_disable` is set, protection is switched off
/// before returning [`ProtectionDecision::Disabled`]. A failed toggle is
/// returned as an error.
pub async fn negotiate_protection<S: StackOperations>(
    stacks: &S,
    stack_name: &str,
    error: &anyhow::Error,
    allow_disable: bool,
) -> Result<ProtectionDecision> {
    if !classify_anyhow_error(error).is_termination_protected(stack_name) {
        return Ok(ProtectionDecision::NotProtected);
    }
    if !allow_disable {
        return Ok(ProtectionDecision::Blocked);
    }
    stacks.set_termination_protection(stack_name, false).await?;
    Ok(ProtectionDecision::Disabled)
}

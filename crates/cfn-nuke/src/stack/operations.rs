//! Provider operation traits for testing
//!
//! These traits abstract the CloudFormation and IAM calls the deletion
//! state machine makes, so the orchestration logic can be exercised without
//! hitting real AWS. Implementations must be safe to share across the
//! concurrent removals of independent stacks.

use super::handle::{StackHandle, StackResource};
use anyhow::Result;
use std::future::Future;

/// CloudFormation operations used by the deletion state machine
pub trait StackOperations: Send + Sync {
    /// Describe a stack by name; `Ok(None)` when it does not exist
    fn describe_stack(
        &self,
        stack_name: &str,
    ) -> impl Future<Output = Result<Option<StackHandle>>> + Send;

    /// List every child resource of a stack
    fn list_stack_resources(
        &self,
        stack_name: &str,
    ) -> impl Future<Output = Result<Vec<StackResource>>> + Send;

    /// Issue a delete, skipping `retain` children and optionally running as `role_arn`
    fn delete_stack(
        &self,
        stack_name: &str,
        retain: Vec<String>,
        role_arn: Option<String>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Enable or disable termination protection
    fn set_termination_protection(
        &self,
        stack_name: &str,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// IAM operations for the transient deletion service role
pub trait RoleOperations: Send + Sync {
    /// Look up a role by name; `Ok(Some(arn))` if it exists
    fn get_role(&self, role_name: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Create a role CloudFormation can assume, returning its arn
    fn create_role(
        &self,
        role_name: &str,
        stack_name: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Attach a managed policy to a role
    fn attach_role_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Detach a managed policy from a role
    fn detach_role_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete a role (policies must already be detached)
    fn delete_role(&self, role_name: &str) -> impl Future<Output = Result<()>> + Send;
}

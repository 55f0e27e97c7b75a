//! Transient CloudFormation service role
//!
//! Stacks whose original execution role has been deleted can only be removed
//! by handing CloudFormation a role it can assume. The provisioner creates
//! one per removal, and [`ServiceRoleProvisioner::teardown`] removes it again.

use super::error::RemoveError;
use super::operations::RoleOperations;
use crate::aws::classify_anyhow_error;
use crate::wait::sleep_cancellable;
use anyhow::Result;
use cfn_nuke_common::defaults::{MAX_ROLE_NAME_LEN, SERVICE_ROLE_PREFIX};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Service role name for a stack, cut to the IAM length limit
pub fn service_role_name(stack_name: &str) -> String {
    let mut name = format!("{SERVICE_ROLE_PREFIX}-{stack_name}");
    if name.len() > MAX_ROLE_NAME_LEN {
        let mut end = MAX_ROLE_NAME_LEN;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}

/// A role provisioned for one removal.
///
/// Must be handed back to [`ServiceRoleProvisioner::teardown`]; dropping it
/// otherwise leaves the role behind and logs an error.
#[derive(Debug)]
pub struct ServiceRole {
    name: String,
    arn: String,
    stack_name: String,
    created: bool,
    released: bool,
}

impl ServiceRole {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }

    /// Whether this removal created the role (false when an existing role was reused)
    pub fn was_created(&self) -> bool {
        self.created
    }
}

impl Drop for ServiceRole {
    fn drop(&mut self) {
        if !self.released {
            error!(
                role_name = %self.name,
                stack_name = %self.stack_name,
                "Service role dropped without teardown; delete it manually"
            );
        }
    }
}

/// Creates and removes deletion service roles
pub struct ServiceRoleProvisioner<'a, R> {
    roles: &'a R,
    policy_arn: &'a str,
    propagation_delay: Duration,
}

impl<'a, R: RoleOperations> ServiceRoleProvisioner<'a, R> {
    pub fn new(roles: &'a R, policy_arn: &'a str, propagation_delay: Duration) -> Self {
        Self {
            roles,
            policy_arn,
            propagation_delay,
        }
    }

    /// Make sure the service role for `stack_name` exists.
    ///
    /// An existing role of the same name is reused as-is. A new role gets the
    /// admin policy attached, then the provisioner waits for IAM to propagate
    /// it. If the attach fails the new role is deleted again.
    pub async fn provision(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ServiceRole, RemoveError> {
        let role_name = service_role_name(stack_name);

        let existing = match self.roles.get_role(&role_name).await {
            Ok(arn) => arn,
            Err(e) => {
                warn!(role_name = %role_name, error = ?e, "Role lookup failed, creating it");
                None
            }
        };
        if let Some(arn) = existing {
            debug!(role_name = %role_name, role_arn = %arn, "Reusing existing service role");
            return Ok(ServiceRole {
                name: role_name,
                arn,
                stack_name: stack_name.to_string(),
                created: false,
                released: false,
            });
        }

        let arn = match self.roles.create_role(&role_name, stack_name).await {
            Ok(arn) => arn,
            Err(source) => return Err(RemoveError::RoleProvisioning { role_name, source }),
        };

        if let Err(source) = self.roles.attach_role_policy(&role_name, self.policy_arn).await {
            if let Err(e) = self.roles.delete_role(&role_name).await {
                error!(role_name = %role_name, error = ?e, "Failed to clean up service role after attach failure");
            }
            return Err(RemoveError::RoleProvisioning { role_name, source });
        }

        if !sleep_cancellable(self.propagation_delay, cancel).await {
            debug!(role_name = %role_name, "Cancelled while waiting for role propagation");
        }

        Ok(ServiceRole {
            name: role_name,
            arn,
            stack_name: stack_name.to_string(),
            created: true,
            released: false,
        })
    }

    /// Detach the admin policy and delete the role.
    ///
    /// A policy that is no longer attached and a role that is already gone
    /// both count as success.
    pub async fn teardown(&self, mut role: ServiceRole) -> Result<()> {
        role.released = true;

        if let Err(e) = self
            .roles
            .detach_role_policy(&role.name, self.policy_arn)
            .await
        {
            if !classify_anyhow_error(&e).is_not_found() {
                return Err(e);
            }
            debug!(role_name = %role.name, "Policy was not attached");
        }

        if let Err(e) = self.roles.delete_role(&role.name).await {
            if !classify_anyhow_error(&e).is_not_found() {
                return Err(e);
            }
            debug!(role_name = %role.name, "Role was already deleted");
        }
        Ok(())
    }
}

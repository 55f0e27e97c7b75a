//! IAM management for the transient CloudFormation service role

use super::context::{AwsContext, FromAwsContext};
use super::error::classify_aws_error;
use super::sdk_field;
use crate::stack::RoleOperations;
use anyhow::{Context, Result};
use aws_sdk_iam::Client;
use aws_sdk_iam::error::ProvideErrorMetadata;
use cfn_nuke_common::tags;
use chrono::Utc;
use tracing::{debug, info};

/// IAM client for managing deletion service roles
#[derive(Clone)]
pub struct IamRoleClient {
    client: Client,
}

/// Trust policy allowing CloudFormation to assume the role
fn cloudformation_assume_role_policy() -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": {
                    "Service": "cloudformation.amazonaws.com"
                },
                "Action": "sts:AssumeRole"
            }
        ]
    })
    .to_string()
}

impl IamRoleClient {
    /// Look up a role, returning its arn if it exists
    pub async fn get_role(&self, role_name: &str) -> Result<Option<String>> {
        match self.client.get_role().role_name(role_name).send().await {
            Ok(response) => Ok(sdk_field(response.role())
                .and_then(|role| sdk_field(role.arn()))
                .map(str::to_string)),
            Err(e) => {
                if classify_aws_error(e.code(), e.message()).is_not_found() {
                    Ok(None)
                } else {
                    Err(e).with_context(|| format!("Failed to get IAM role {role_name}"))
                }
            }
        }
    }

    /// Create a role CloudFormation can assume on behalf of `stack_name`
    pub async fn create_role(&self, role_name: &str, stack_name: &str) -> Result<String> {
        info!(role_name = %role_name, stack_name = %stack_name, "Creating CloudFormation service role");

        let mut request = self
            .client
            .create_role()
            .role_name(role_name)
            .assume_role_policy_document(cloudformation_assume_role_policy())
            .description(format!(
                "Service role used by cfn-nuke to delete stack {stack_name} whose original role no longer exists"
            ));
        for (key, value) in tags::service_role_tags(stack_name, Utc::now()) {
            request = request.tags(
                aws_sdk_iam::types::Tag::builder()
                    .key(key)
                    .value(value)
                    .build()
                    .map_err(|e| anyhow::anyhow!("Failed to build IAM tag: {}", e))?,
            );
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to create IAM role {role_name}"))?;

        let arn = sdk_field(response.role())
            .and_then(|role| sdk_field(role.arn()))
            .map(str::to_string)
            .context("CreateRole response did not include a role arn")?;

        debug!(role_name = %role_name, role_arn = %arn, "IAM role created");
        Ok(arn)
    }

    /// Attach a managed policy to a role
    pub async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .with_context(|| format!("Failed to attach {policy_arn} to IAM role {role_name}"))?;
        debug!(role_name = %role_name, policy_arn = %policy_arn, "Managed policy attached");
        Ok(())
    }

    /// Detach a managed policy from a role
    pub async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        self.client
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .with_context(|| format!("Failed to detach {policy_arn} from IAM role {role_name}"))?;
        debug!(role_name = %role_name, policy_arn = %policy_arn, "Managed policy detached");
        Ok(())
    }

    /// Delete a role
    pub async fn delete_role(&self, role_name: &str) -> Result<()> {
        self.client
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .with_context(|| format!("Failed to delete IAM role {role_name}"))?;
        info!(role_name = %role_name, "IAM role deleted");
        Ok(())
    }
}

impl FromAwsContext for IamRoleClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.iam_client(),
        }
    }
}

impl RoleOperations for IamRoleClient {
    async fn get_role(&self, role_name: &str) -> Result<Option<String>> {
        IamRoleClient::get_role(self, role_name).await
    }

    async fn create_role(&self, role_name: &str, stack_name: &str) -> Result<String> {
        IamRoleClient::create_role(self, role_name, stack_name).await
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        IamRoleClient::attach_role_policy(self, role_name, policy_arn).await
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        IamRoleClient::detach_role_policy(self, role_name, policy_arn).await
    }

    async fn delete_role(&self, role_name: &str) -> Result<()> {
        IamRoleClient::delete_role(self, role_name).await
    }
}

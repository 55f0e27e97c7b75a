//! CloudFormation client for describing, deleting, and unprotecting stacks

use super::context::{AwsContext, FromAwsContext};
use super::error::classify_aws_error;
use super::sdk_field;
use crate::stack::{StackHandle, StackOperations, StackResource};
use anyhow::{Context, Result};
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::primitives::DateTime as SdkDateTime;
use aws_sdk_cloudformation::types::Stack;
use cfn_nuke_common::StackStatus;
use chrono::{DateTime, Utc};
use tracing::debug;

/// CloudFormation client used by the deletion orchestrator
#[derive(Clone)]
pub struct CloudFormationClient {
    client: Client,
}

impl CloudFormationClient {
    /// Describe a single stack by name.
    ///
    /// A missing stack is reported by CloudFormation as a `ValidationError`;
    /// that case maps to `Ok(None)`.
    pub async fn describe_stack(&self, stack_name: &str) -> Result<Option<StackHandle>> {
        let response = match self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                if classify_aws_error(e.code(), e.message()).is_not_found() {
                    debug!(stack_name = %stack_name, "Stack does not exist");
                    return Ok(None);
                }
                return Err(e).with_context(|| format!("Failed to describe stack {stack_name}"));
            }
        };

        Ok(response.stacks().first().map(stack_to_handle))
    }

    /// List all child resources of a stack, following pagination.
    pub async fn list_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>> {
        let mut resources = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_stack_resources()
                .stack_name(stack_name)
                .set_next_token(next_token.take())
                .send()
                .await
                .with_context(|| format!("Failed to list resources of stack {stack_name}"))?;

            for summary in response.stack_resource_summaries() {
                resources.push(StackResource {
                    logical_id: sdk_field(summary.logical_resource_id())
                        .unwrap_or_default()
                        .to_string(),
                    physical_id: summary.physical_resource_id().map(str::to_string),
                    resource_type: sdk_field(summary.resource_type()).map(str::to_string),
                    status: sdk_field(summary.resource_status())
                        .map(|s| s.as_str().to_string())
                        .unwrap_or_default(),
                });
            }

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(stack_name = %stack_name, count = resources.len(), "Listed stack resources");
        Ok(resources)
    }

    /// Issue a DeleteStack call
    pub async fn delete_stack(
        &self,
        stack_name: &str,
        retain: Vec<String>,
        role_arn: Option<String>,
    ) -> Result<()> {
        let retain = if retain.is_empty() { None } else { Some(retain) };
        self.client
            .delete_stack()
            .stack_name(stack_name)
            .set_retain_resources(retain)
            .set_role_arn(role_arn)
            .send()
            .await
            .with_context(|| format!("Failed to delete stack {stack_name}"))?;
        Ok(())
    }

    /// Toggle termination protection on a stack
    pub async fn set_termination_protection(&self, stack_name: &str, enabled: bool) -> Result<()> {
        self.client
            .update_termination_protection()
            .stack_name(stack_name)
            .enable_termination_protection(enabled)
            .send()
            .await
            .with_context(|| {
                format!("Failed to update termination protection on stack {stack_name}")
            })?;
        Ok(())
    }
}

impl FromAwsContext for CloudFormationClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.cloudformation_client(),
        }
    }
}

impl StackOperations for CloudFormationClient {
    async fn describe_stack(&self, stack_name: &str) -> Result<Option<StackHandle>> {
        CloudFormationClient::describe_stack(self, stack_name).await
    }

    async fn list_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>> {
        CloudFormationClient::list_stack_resources(self, stack_name).await
    }

    async fn delete_stack(
        &self,
        stack_name: &str,
        retain: Vec<String>,
        role_arn: Option<String>,
    ) -> Result<()> {
        CloudFormationClient::delete_stack(self, stack_name, retain, role_arn).await
    }

    async fn set_termination_protection(&self, stack_name: &str, enabled: bool) -> Result<()> {
        CloudFormationClient::set_termination_protection(self, stack_name, enabled).await
    }
}

fn to_chrono(time: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

fn stack_to_handle(stack: &Stack) -> StackHandle {
    let status = sdk_field(stack.stack_status())
        .map(|s| StackStatus::parse_lossy(s.as_str()))
        .unwrap_or(StackStatus::Unknown);
    let creation_time = sdk_field(stack.creation_time())
        .and_then(to_chrono)
        .unwrap_or_default();

    let mut handle = StackHandle::new(
        sdk_field(stack.stack_name()).unwrap_or_default(),
        status,
        creation_time,
    );
    handle.arn = stack.stack_id().map(str::to_string);
    handle.status_reason = stack.stack_status_reason().map(str::to_string);
    handle.last_updated_time = stack.last_updated_time().and_then(to_chrono);
    handle.parent_id = stack.parent_id().map(str::to_string);
    handle.termination_protection = stack.enable_termination_protection().unwrap_or(false);
    handle.tags = stack
        .tags()
        .iter()
        .map(|t| {
            (
                sdk_field(t.key()).unwrap_or_default().to_string(),
                sdk_field(t.value()).unwrap_or_default().to_string(),
            )
        })
        .collect();
    handle
}

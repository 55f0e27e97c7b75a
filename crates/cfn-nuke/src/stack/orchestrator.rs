//! Bounded-retry stack deletion state machine
//!
//! Each attempt probes the stack and branches on its status category:
//!
//! - gone: done
//! - `DELETE_IN_PROGRESS`: wait for the running delete
//! - `DELETE_FAILED`: delete again, retaining the children that failed
//! - anything else: wait for it to settle, then delete
//!
//! Failed attempts are checked for the termination-protection rejection
//! before the next one starts. An optional service role wraps the whole loop.

use super::error::{RemovalOutcome, RemoveError};
use super::events::{EventSink, RemovalEvent, TracingSink};
use super::handle::StackHandle;
use super::operations::{RoleOperations, StackOperations};
use super::probe::probe;
use super::protection::{ProtectionDecision, negotiate_protection};
use super::retain::resolve_retain_set;
use super::service_role::ServiceRoleProvisioner;
use super::stabilize::{wait_for_deletion, wait_for_stabilization};
use crate::config::RemovalConfig;
use crate::wait::{WaitConfig, WaitError};
use cfn_nuke_common::StatusCategory;
use tokio_util::sync::CancellationToken;

static TRACING_SINK: TracingSink = TracingSink;

/// How a single attempt failed
enum AttemptError {
    /// Counts against the attempt bound
    Retryable(anyhow::Error),
    /// Ends the removal immediately
    Fatal(RemoveError),
}

/// Removes stacks one at a time per call; calls for different stacks may run
/// concurrently against the same orchestrator.
pub struct DeletionOrchestrator<'a, S, R> {
    stacks: &'a S,
    roles: &'a R,
    config: &'a RemovalConfig,
    wait: WaitConfig,
    sink: &'a dyn EventSink,
}

impl<'a, S: StackOperations, R: RoleOperations> DeletionOrchestrator<'a, S, R> {
    pub fn new(stacks: &'a S, roles: &'a R, config: &'a RemovalConfig) -> Self {
        Self {
            stacks,
            roles,
            config,
            wait: config.wait_config(),
            sink: &TRACING_SINK,
        }
    }

    /// Report events to `sink` instead of `tracing`
    pub fn with_sink(mut self, sink: &'a dyn EventSink) -> Self {
        self.sink = sink;
        self
    }

    /// Delete `stack`, provisioning a service role first when enabled.
    ///
    /// A provisioned role is torn down on every exit path, and the handle's
    /// deletion role arn is only set while that role exists.
    pub async fn remove(
        &self,
        stack: &mut StackHandle,
        cancel: &CancellationToken,
    ) -> Result<RemovalOutcome, RemoveError> {
        if !self.config.enable_automatic_role_management {
            return self.run_attempts(stack, cancel).await;
        }

        let provisioner = ServiceRoleProvisioner::new(
            self.roles,
            &self.config.admin_policy_arn,
            self.config.role_propagation_delay(),
        );
        let role = provisioner.provision(&stack.name, cancel).await?;
        self.sink.emit(RemovalEvent::RoleProvisioned {
            stack_name: stack.name.clone(),
            role_name: role.name().to_string(),
            role_arn: role.arn().to_string(),
            reused: !role.was_created(),
        });

        stack.set_delete_role_arn(Some(role.arn().to_string()));
        let outcome = self.run_attempts(stack, cancel).await;
        stack.set_delete_role_arn(None);

        let role_name = role.name().to_string();
        match provisioner.teardown(role).await {
            Ok(()) => {
                self.sink.emit(RemovalEvent::RoleTornDown {
                    stack_name: stack.name.clone(),
                    role_name,
                });
                outcome
            }
            Err(source) => Err(RemoveError::RoleTeardown {
                role_name,
                source,
                primary: outcome.err().map(Box::new),
            }),
        }
    }

    async fn run_attempts(
        &self,
        stack: &StackHandle,
        cancel: &CancellationToken,
    ) -> Result<RemovalOutcome, RemoveError> {
        let stack_name = &stack.name;
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if cancel.is_cancelled() {
                return Err(RemoveError::Cancelled {
                    stack_name: stack_name.clone(),
                });
            }

            let error = match self.attempt(stack, attempt, cancel).await {
                Ok(outcome) => return Ok(outcome),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(e)) => e,
            };

            self.sink.emit(RemovalEvent::AttemptFailed {
                stack_name: stack_name.clone(),
                attempt,
                max_attempts,
                error: format!("{error:#}"),
            });

            match negotiate_protection(
                self.stacks,
                stack_name,
                &error,
                self.config.disable_deletion_protection,
            )
            .await
            {
                Ok(ProtectionDecision::NotProtected) => {}
                Ok(ProtectionDecision::Disabled) => {
                    self.sink.emit(RemovalEvent::ProtectionDisabled {
                        stack_name: stack_name.clone(),
                        attempt,
                    });
                }
                Ok(ProtectionDecision::Blocked) => {
                    self.sink.emit(RemovalEvent::ProtectionBlocked {
                        stack_name: stack_name.clone(),
                    });
                    return Err(RemoveError::ProtectionBlocked {
                        stack_name: stack_name.clone(),
                        source: error,
                    });
                }
                Err(source) => {
                    return Err(RemoveError::Provider {
                        stack_name: stack_name.clone(),
                        source,
                    });
                }
            }

            last_error = Some(error);
        }

        Err(RemoveError::AttemptsExhausted {
            stack_name: stack_name.clone(),
            attempts: max_attempts,
            source: last_error.unwrap_or_else(|| anyhow::anyhow!("no attempt was made")),
        })
    }

    async fn attempt(
        &self,
        stack: &StackHandle,
        attempt: u32,
        cancel: &CancellationToken,
    ) -> Result<RemovalOutcome, AttemptError> {
        let stack_name = &stack.name;

        let status = probe(self.stacks, stack_name)
            .await
            .map_err(AttemptError::Retryable)?;
        self.sink.emit(RemovalEvent::Probed {
            stack_name: stack_name.clone(),
            attempt,
            status,
        });

        let Some(status) = status else {
            return Ok(self.already_gone(stack_name, attempt));
        };

        match status.category() {
            StatusCategory::Deleted => Ok(self.already_gone(stack_name, attempt)),
            StatusCategory::DeleteInProgress => {
                self.sink.emit(RemovalEvent::WaitingForDeletion {
                    stack_name: stack_name.clone(),
                });
                wait_for_deletion(self.stacks, stack_name, &self.wait, cancel)
                    .await
                    .map_err(|e| fatal_wait(stack_name, e))?;
                Ok(RemovalOutcome::DeletionCompleted)
            }
            StatusCategory::DeleteFailed => {
                let retain = resolve_retain_set(self.stacks, stack_name)
                    .await
                    .map_err(AttemptError::Retryable)?;
                self.sink.emit(RemovalEvent::RetainResolved {
                    stack_name: stack_name.clone(),
                    retain: retain.clone(),
                });
                self.delete(stack, attempt, retain).await?;
                wait_for_deletion(self.stacks, stack_name, &self.wait, cancel)
                    .await
                    .map_err(|e| fatal_wait(stack_name, e))?;
                self.deleted(stack_name, attempt)
            }
            StatusCategory::Transitional(_) | StatusCategory::Stable => {
                if let Some(target) = status.stabilization_target() {
                    self.sink.emit(RemovalEvent::Stabilizing {
                        stack_name: stack_name.clone(),
                        status,
                        target,
                    });
                }
                wait_for_stabilization(self.stacks, stack_name, status, &self.wait, cancel)
                    .await
                    .map_err(|e| fatal_wait(stack_name, e))?;
                self.delete(stack, attempt, Vec::new()).await?;
                wait_for_deletion(self.stacks, stack_name, &self.wait, cancel)
                    .await
                    .map_err(|e| {
                        if e.is_cancelled() {
                            fatal_wait(stack_name, e)
                        } else {
                            AttemptError::Retryable(e.into())
                        }
                    })?;
                self.deleted(stack_name, attempt)
            }
        }
    }

    async fn delete(
        &self,
        stack: &StackHandle,
        attempt: u32,
        retain: Vec<String>,
    ) -> Result<(), AttemptError> {
        let role_arn = stack.delete_role_arn().map(str::to_string);
        self.sink.emit(RemovalEvent::DeleteIssued {
            stack_name: stack.name.clone(),
            attempt,
            retain: retain.clone(),
            role_arn: role_arn.clone(),
        });
        self.stacks
            .delete_stack(&stack.name, retain, role_arn)
            .await
            .map_err(AttemptError::Retryable)
    }

    fn already_gone(&self, stack_name: &str, attempt: u32) -> RemovalOutcome {
        self.sink.emit(RemovalEvent::AlreadyGone {
            stack_name: stack_name.to_string(),
        });
        // A delete from an earlier attempt may have finished after reporting failure
        if attempt == 0 {
            RemovalOutcome::AlreadyDeleted
        } else {
            RemovalOutcome::Deleted { attempts: attempt }
        }
    }

    fn deleted(&self, stack_name: &str, attempt: u32) -> Result<RemovalOutcome, AttemptError> {
        let attempts = attempt + 1;
        self.sink.emit(RemovalEvent::Deleted {
            stack_name: stack_name.to_string(),
            attempts,
        });
        Ok(RemovalOutcome::Deleted { attempts })
    }
}

fn fatal_wait(stack_name: &str, source: WaitError) -> AttemptError {
    AttemptError::Fatal(RemoveError::Wait {
        stack_name: stack_name.to_string(),
        source,
    })
}

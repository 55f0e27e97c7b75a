//! In-memory CloudFormation and IAM for orchestration tests

#![allow(dead_code)]

use anyhow::Result;
use cfn_nuke::aws::{AwsError, classify_aws_error};
use cfn_nuke::config::RemovalConfig;
use cfn_nuke::stack::{
    EventSink, RemovalEvent, RoleOperations, StackHandle, StackOperations, StackResource,
};
use cfn_nuke_common::StackStatus;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

pub const STACK: &str = "web";

/// A provider call observed by the fake
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Describe,
    ListResources,
    Delete {
        retain: Vec<String>,
        role_arn: Option<String>,
        /// Status the stack was last reported in when the delete arrived
        seen_status: Option<StackStatus>,
    },
    SetProtection(bool),
    GetRole(String),
    CreateRole(String),
    AttachPolicy(String),
    DetachPolicy(String),
    DeleteRole(String),
}

#[derive(Default)]
struct State {
    /// Upcoming describe results; the last entry repeats forever
    statuses: VecDeque<Option<StackStatus>>,
    last_seen: Option<StackStatus>,
    /// Status scripts installed by successive successful deletes
    after_delete: VecDeque<Vec<Option<StackStatus>>>,
    resources: Vec<StackResource>,
    protected: bool,
    /// One-shot delete failures, consumed in order
    delete_failures: VecDeque<String>,
    always_fail_delete: Option<String>,
    fail_describe: u32,
    roles: HashMap<String, String>,
    attached: HashSet<String>,
    fail_create_role: bool,
    fail_attach: bool,
    fail_delete_role: bool,
    calls: Vec<Call>,
}

/// Single-stack fake of both providers.
///
/// Describe results follow a script; a successful delete replaces the
/// script with `DELETE_IN_PROGRESS` followed by not-found unless another
/// post-delete script was queued.
#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<State>,
}

impl FakeCloud {
    pub fn with_statuses(statuses: impl IntoIterator<Item = Option<StackStatus>>) -> Self {
        let cloud = Self::default();
        cloud.state.lock().unwrap().statuses = statuses.into_iter().collect();
        cloud
    }

    pub fn with_status(status: StackStatus) -> Self {
        Self::with_statuses([Some(status)])
    }

    pub fn protected(self) -> Self {
        self.state.lock().unwrap().protected = true;
        self
    }

    pub fn with_resources(self, resources: Vec<StackResource>) -> Self {
        self.state.lock().unwrap().resources = resources;
        self
    }

    pub fn then_after_delete(self, statuses: Vec<Option<StackStatus>>) -> Self {
        self.state.lock().unwrap().after_delete.push_back(statuses);
        self
    }

    pub fn fail_next_delete(self, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .delete_failures
            .push_back(message.to_string());
        self
    }

    pub fn always_fail_delete(self, message: &str) -> Self {
        self.state.lock().unwrap().always_fail_delete = Some(message.to_string());
        self
    }

    pub fn fail_describe(self, times: u32) -> Self {
        self.state.lock().unwrap().fail_describe = times;
        self
    }

    pub fn with_existing_role(self, name: &str, arn: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .roles
            .insert(name.to_string(), arn.to_string());
        self
    }

    pub fn fail_create_role(self) -> Self {
        self.state.lock().unwrap().fail_create_role = true;
        self
    }

    pub fn fail_attach(self) -> Self {
        self.state.lock().unwrap().fail_attach = true;
        self
    }

    pub fn fail_delete_role(self) -> Self {
        self.state.lock().unwrap().fail_delete_role = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn deletes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Delete { .. }))
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Index of the first call matching `pred`
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls().iter().position(pred)
    }

    /// Index of the last call matching `pred`
    pub fn last_position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls().iter().rposition(pred)
    }

    pub fn roles(&self) -> Vec<String> {
        self.state.lock().unwrap().roles.keys().cloned().collect()
    }

    pub fn is_protected(&self) -> bool {
        self.state.lock().unwrap().protected
    }
}

fn provider_error(code: &str, message: &str) -> anyhow::Error {
    anyhow::Error::new(classify_aws_error(Some(code), Some(message)))
}

impl StackOperations for FakeCloud {
    async fn describe_stack(&self, stack_name: &str) -> Result<Option<StackHandle>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Describe);
        if state.fail_describe > 0 {
            state.fail_describe -= 1;
            anyhow::bail!("Failed to describe stack {stack_name}: connection reset");
        }
        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front().flatten()
        } else {
            state.statuses.front().copied().flatten()
        };
        state.last_seen = status;
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Ok(status.map(|status| {
            let mut stack = StackHandle::new(stack_name, status, created);
            stack.termination_protection = state.protected;
            stack
        }))
    }

    async fn list_stack_resources(&self, _stack_name: &str) -> Result<Vec<StackResource>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListResources);
        Ok(state.resources.clone())
    }

    async fn delete_stack(
        &self,
        stack_name: &str,
        retain: Vec<String>,
        role_arn: Option<String>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let seen_status = state.last_seen;
        state.calls.push(Call::Delete {
            retain,
            role_arn,
            seen_status,
        });

        if state.protected {
            return Err(provider_error(
                "ValidationError",
                &format!("Stack [{stack_name}] cannot be deleted while TerminationProtection is enabled"),
            )
            .context(format!("Failed to delete stack {stack_name}")));
        }
        if let Some(message) = state.delete_failures.pop_front() {
            anyhow::bail!("{message}");
        }
        if let Some(message) = &state.always_fail_delete {
            anyhow::bail!("{message}");
        }

        let next = state
            .after_delete
            .pop_front()
            .unwrap_or_else(|| vec![Some(StackStatus::DeleteInProgress), None]);
        state.statuses = next.into_iter().collect();
        Ok(())
    }

    async fn set_termination_protection(&self, _stack_name: &str, enabled: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::SetProtection(enabled));
        state.protected = enabled;
        Ok(())
    }
}

impl RoleOperations for FakeCloud {
    async fn get_role(&self, role_name: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetRole(role_name.to_string()));
        Ok(state.roles.get(role_name).cloned())
    }

    async fn create_role(&self, role_name: &str, _stack_name: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateRole(role_name.to_string()));
        if state.fail_create_role {
            return Err(provider_error("AccessDenied", "not authorized to create roles"));
        }
        let arn = format!("arn:aws:iam::123456789012:role/{role_name}");
        state.roles.insert(role_name.to_string(), arn.clone());
        Ok(arn)
    }

    async fn attach_role_policy(&self, role_name: &str, _policy_arn: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AttachPolicy(role_name.to_string()));
        if state.fail_attach {
            return Err(provider_error("AccessDenied", "not authorized to attach policies"));
        }
        state.attached.insert(role_name.to_string());
        Ok(())
    }

    async fn detach_role_policy(&self, role_name: &str, _policy_arn: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DetachPolicy(role_name.to_string()));
        if !state.attached.remove(role_name) {
            return Err(anyhow::Error::new(AwsError::NotFound {
                resource_type: "policy attachment",
                resource_id: role_name.to_string(),
            }));
        }
        Ok(())
    }

    async fn delete_role(&self, role_name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteRole(role_name.to_string()));
        if state.fail_delete_role {
            return Err(provider_error("DeleteConflict", "role is still in use"));
        }
        state.roles.remove(role_name);
        Ok(())
    }
}

/// Sink that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RemovalEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<RemovalEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: RemovalEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Defaults with short polling so paused-clock tests stay quick
pub fn fast_config() -> RemovalConfig {
    RemovalConfig {
        poll_initial_delay_ms: 100,
        poll_max_delay_secs: 1,
        wait_timeout_secs: 60,
        ..Default::default()
    }
}

pub fn stack() -> StackHandle {
    StackHandle::new(
        STACK,
        StackStatus::CreateComplete,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    )
}

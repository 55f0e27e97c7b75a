//! Stack handle and child resource types

use cfn_nuke_common::Properties;
use cfn_nuke_common::StackStatus;
use cfn_nuke_common::status::RESOURCE_DELETE_COMPLETE;
use chrono::{DateTime, Utc};
use std::fmt;

/// A root stack as seen by the deletion orchestrator.
///
/// Built from a `DescribeStacks` result. The orchestrator treats it as
/// read-only apart from the deletion role arn, which is only set while a
/// provisioned service role exists.
#[derive(Debug, Clone, PartialEq)]
pub struct StackHandle {
    pub name: String,
    /// Stack id (arn)
    pub arn: Option<String>,
    pub status: StackStatus,
    pub status_reason: Option<String>,
    pub creation_time: DateTime<Utc>,
    pub last_updated_time: Option<DateTime<Utc>>,
    pub tags: Vec<(String, String)>,
    /// Id of the parent stack for nested stacks
    pub parent_id: Option<String>,
    /// Termination protection as last described
    pub termination_protection: bool,
    delete_role_arn: Option<String>,
}

impl StackHandle {
    pub fn new(name: impl Into<String>, status: StackStatus, creation_time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            arn: None,
            status,
            status_reason: None,
            creation_time,
            last_updated_time: None,
            tags: Vec::new(),
            parent_id: None,
            termination_protection: false,
            delete_role_arn: None,
        }
    }

    pub fn with_last_updated(mut self, time: DateTime<Utc>) -> Self {
        self.last_updated_time = Some(time);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Nested stacks are deleted through their root, never directly
    pub fn is_nested(&self) -> bool {
        self.parent_id.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Arn of the execution role used for delete calls, if one was provisioned
    pub fn delete_role_arn(&self) -> Option<&str> {
        self.delete_role_arn.as_deref()
    }

    pub(crate) fn set_delete_role_arn(&mut self, arn: Option<String>) {
        self.delete_role_arn = arn;
    }

    /// Properties for reporting: name, timestamps, and `tag:` entries.
    ///
    /// `LastUpdatedTime` falls back to the creation time for stacks that
    /// were never updated.
    pub fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props
            .set("Name", self.name.as_str())
            .set_time("CreationTime", self.creation_time)
            .set_time(
                "LastUpdatedTime",
                self.last_updated_time.unwrap_or(self.creation_time),
            );
        for (key, value) in &self.tags {
            props.set_tag(key, value.as_str());
        }
        props
    }
}

impl fmt::Display for StackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A child resource of a stack, from `ListStackResources`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackResource {
    pub logical_id: String,
    pub physical_id: Option<String>,
    pub resource_type: Option<String>,
    /// Raw resource status string (`CREATE_COMPLETE`, `DELETE_FAILED`, ...)
    pub status: String,
}

impl StackResource {
    pub fn new(logical_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            physical_id: None,
            resource_type: None,
            status: status.into(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == RESOURCE_DELETE_COMPLETE
    }
}

//! AWS client modules
//!
//! This module provides wrappers around AWS SDK clients for:
//! - CloudFormation: Describing, deleting, and unprotecting stacks
//! - IAM: The transient service role used to delete orphaned stacks
//! - error: Classification of SDK errors (not-found, protection, throttling)

pub mod cloudformation;
pub mod context;
pub mod error;
pub mod iam;

// Core clients
pub use cloudformation::CloudFormationClient;
pub use context::{AwsContext, FromAwsContext};
pub use iam::IamRoleClient;

// Error handling
pub use error::{AwsError, classify_anyhow_error, classify_aws_error};

/// Normalize an SDK accessor result to `Option<&T>`.
///
/// Generated accessors return `&T` for members the service model marks as
/// required and `Option<&T>` otherwise; this lets conversion code treat both
/// the same way.
pub(crate) fn sdk_field<'a, T: ?Sized>(value: impl SdkField<'a, T>) -> Option<&'a T> {
    value.into_field()
}

pub(crate) trait SdkField<'a, T: ?Sized> {
    fn into_field(self) -> Option<&'a T>;
}

impl<'a, T: ?Sized> SdkField<'a, T> for &'a T {
    fn into_field(self) -> Option<&'a T> {
        Some(self)
    }
}

impl<'a, T: ?Sized> SdkField<'a, T> for Option<&'a T> {
    fn into_field(self) -> Option<&'a T> {
        self
    }
}

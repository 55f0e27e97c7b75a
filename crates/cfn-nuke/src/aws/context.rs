//! Loaded AWS configuration shared by the CloudFormation and IAM clients

use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::fmt;
use std::sync::Arc;

/// Region, credentials, and SDK settings resolved once per process.
///
/// ```ignore
/// let aws = AwsContext::with_profile("us-east-1", Some("sandbox")).await;
/// let stacks = CloudFormationClient::from_context(&aws);
/// let roles = IamRoleClient::from_context(&aws);
/// ```
#[derive(Clone)]
pub struct AwsContext {
    sdk: Arc<SdkConfig>,
    region: String,
}

impl AwsContext {
    /// Resolve configuration for `region` from the default provider chain,
    /// reading credentials from a named profile when one is given
    pub async fn with_profile(region: &str, profile: Option<&str>) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }

        Self {
            sdk: Arc::new(loader.load().await),
            region: region.to_string(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn cloudformation_client(&self) -> aws_sdk_cloudformation::Client {
        aws_sdk_cloudformation::Client::new(&self.sdk)
    }

    pub fn iam_client(&self) -> aws_sdk_iam::Client {
        aws_sdk_iam::Client::new(&self.sdk)
    }
}

impl fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Construct a provider client from a loaded [`AwsContext`]
pub trait FromAwsContext: Sized {
    fn from_context(ctx: &AwsContext) -> Self;
}

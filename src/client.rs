use assume_role_mfa_schema::credentials::TemporaryCredentials;
use async_trait::async_trait;

use crate::error::ProviderError;

pub mod aws_sdk;
pub mod memory;

/// The STS and IAM calls needed to obtain temporary credentials.
#[async_trait]
pub trait AwsClient {
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> Result<TemporaryCredentials, ProviderError>;

    async fn assume_role_with_mfa(
        &self,
        role_arn: &str,
        session_name: &str,
        mfa_serial: &str,
        token_code: &str,
    ) -> Result<TemporaryCredentials, ProviderError>;

    /// Serial numbers of the MFA devices registered to the current user.
    async fn list_mfa_devices(&self) -> Result<Vec<String>, ProviderError>;

    async fn current_username(&self) -> Result<String, ProviderError>;

    /// ARN of the principal whose credentials are making the calls.
    async fn current_principal_arn(&self) -> Result<String, ProviderError>;
}

use assume_role_mfa_schema::credentials::TemporaryCredentials;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sts::error::{ProvideErrorMetadata, SdkError};
use aws_smithy_types::error::display::DisplayErrorContext;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::client::AwsClient;
use crate::config::defaults;
use crate::error::ProviderError;

mod error_codes {
    pub const ACCESS_DENIED: &str = "AccessDenied";
}

/// Talks to the real STS and IAM endpoints using the default credential chain.
pub struct AwsSdkClient {
    sts: aws_sdk_sts::Client,
    iam: aws_sdk_iam::Client,
}

impl AwsSdkClient {
    pub async fn load() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        AwsSdkClient {
            sts: aws_sdk_sts::Client::new(&config),
            iam: aws_sdk_iam::Client::new(&config),
        }
    }

    async fn sts_assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
        mfa: Option<(&str, &str)>,
    ) -> Result<TemporaryCredentials, ProviderError> {
        let mut builder = self
            .sts
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .duration_seconds(defaults::DURATION_SECONDS);

        if let Some((mfa_serial, token_code)) = mfa {
            builder = builder.serial_number(mfa_serial).token_code(token_code);
        }

        debug!("sts:AssumeRole role_arn:{} mfa:{}", role_arn, mfa.is_some());
        let output = builder.send().await.map_err(provider_error)?;
        let creds = output
            .credentials()
            .ok_or_else(|| ProviderError::Other("assume-role didn't return a credential".into()))?;

        Ok(TemporaryCredentials {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: creds.secret_access_key().to_string(),
            session_token: creds.session_token().to_string(),
            expires_at: to_chrono(creds.expiration()),
        })
    }
}

#[async_trait]
impl AwsClient for AwsSdkClient {
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> Result<TemporaryCredentials, ProviderError> {
        self.sts_assume_role(role_arn, session_name, None).await
    }

    async fn assume_role_with_mfa(
        &self,
        role_arn: &str,
        session_name: &str,
        mfa_serial: &str,
        token_code: &str,
    ) -> Result<TemporaryCredentials, ProviderError> {
        self.sts_assume_role(role_arn, session_name, Some((mfa_serial, token_code)))
            .await
    }

    async fn list_mfa_devices(&self) -> Result<Vec<String>, ProviderError> {
        let username = self.current_username().await?;
        let output = self
            .iam
            .list_mfa_devices()
            .user_name(username)
            .send()
            .await
            .map_err(provider_error)?;

        Ok(output
            .mfa_devices()
            .iter()
            .map(|d| d.serial_number().to_string())
            .collect())
    }

    async fn current_username(&self) -> Result<String, ProviderError> {
        let output = self.iam.get_user().send().await.map_err(provider_error)?;
        output
            .user()
            .map(|u| u.user_name().to_string())
            .ok_or_else(|| ProviderError::Other("get-user didn't return a user".into()))
    }

    async fn current_principal_arn(&self) -> Result<String, ProviderError> {
        let output = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(provider_error)?;
        output
            .arn()
            .map(|arn| arn.to_string())
            .ok_or_else(|| ProviderError::Other("get-caller-identity didn't return an ARN".into()))
    }
}

fn provider_error<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    if err.code() == Some(error_codes::ACCESS_DENIED) {
        ProviderError::AccessDenied(message)
    } else {
        ProviderError::Other(message)
    }
}

fn to_chrono(dt: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

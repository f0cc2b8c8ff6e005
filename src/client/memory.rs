use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use assume_role_mfa_schema::credentials::TemporaryCredentials;
use async_trait::async_trait;

use crate::client::AwsClient;
use crate::error::ProviderError;

/// A call received by [`InMemoryAwsClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AssumeRole {
        role_arn: String,
        session_name: String,
    },
    AssumeRoleWithMfa {
        role_arn: String,
        session_name: String,
        mfa_serial: String,
        token_code: String,
    },
    ListMfaDevices,
    CurrentUsername,
    CurrentPrincipalArn,
}

impl Call {
    pub fn is_assume_role(&self) -> bool {
        matches!(self, Call::AssumeRole { .. } | Call::AssumeRoleWithMfa { .. })
    }
}

type Response<T> = Result<T, ProviderError>;

struct State {
    assume_role: VecDeque<Response<TemporaryCredentials>>,
    assume_role_with_mfa: VecDeque<Response<TemporaryCredentials>>,
    mfa_devices: Response<Vec<String>>,
    username: Response<String>,
    principal_arn: Response<String>,
    calls: Vec<Call>,
}

/// A scripted [`AwsClient`] that records every call it receives.
///
/// Assume-role responses are queued and consumed in order; an unscripted
/// assume-role call fails with [`ProviderError::Other`].
pub struct InMemoryAwsClient {
    state: Mutex<State>,
}

impl Default for InMemoryAwsClient {
    fn default() -> Self {
        InMemoryAwsClient {
            state: Mutex::new(State {
                assume_role: VecDeque::new(),
                assume_role_with_mfa: VecDeque::new(),
                mfa_devices: Ok(Vec::new()),
                username: Ok("bob".to_string()),
                principal_arn: Ok("arn:aws:iam::000000000000:user/bob".to_string()),
                calls: Vec::new(),
            }),
        }
    }
}

impl InMemoryAwsClient {
    pub fn with_assume_role(self, response: Response<TemporaryCredentials>) -> Self {
        self.state().assume_role.push_back(response);
        self
    }

    pub fn with_assume_role_with_mfa(self, response: Response<TemporaryCredentials>) -> Self {
        self.state().assume_role_with_mfa.push_back(response);
        self
    }

    pub fn with_mfa_devices<I, S>(self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().mfa_devices = Ok(devices.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_mfa_devices_error(self, err: ProviderError) -> Self {
        self.state().mfa_devices = Err(err);
        self
    }

    pub fn with_username(self, response: Response<String>) -> Self {
        self.state().username = response;
        self
    }

    pub fn with_principal_arn<S: Into<String>>(self, arn: S) -> Self {
        self.state().principal_arn = Ok(arn.into());
        self
    }

    pub fn with_principal_arn_error(self, err: ProviderError) -> Self {
        self.state().principal_arn = Err(err);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // a panicked test thread must not hide the calls recorded so far
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: Call) -> MutexGuard<'_, State> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }
}

fn unscripted(call: &str) -> ProviderError {
    ProviderError::Other(format!("unexpected {} call", call))
}

#[async_trait]
impl AwsClient for InMemoryAwsClient {
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> Result<TemporaryCredentials, ProviderError> {
        let mut state = self.record(Call::AssumeRole {
            role_arn: role_arn.to_string(),
            session_name: session_name.to_string(),
        });
        state
            .assume_role
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("AssumeRole")))
    }

    async fn assume_role_with_mfa(
        &self,
        role_arn: &str,
        session_name: &str,
        mfa_serial: &str,
        token_code: &str,
    ) -> Result<TemporaryCredentials, ProviderError> {
        let mut state = self.record(Call::AssumeRoleWithMfa {
            role_arn: role_arn.to_string(),
            session_name: session_name.to_string(),
            mfa_serial: mfa_serial.to_string(),
            token_code: token_code.to_string(),
        });
        state
            .assume_role_with_mfa
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("AssumeRoleWithMFA")))
    }

    async fn list_mfa_devices(&self) -> Result<Vec<String>, ProviderError> {
        self.record(Call::ListMfaDevices).mfa_devices.clone()
    }

    async fn current_username(&self) -> Result<String, ProviderError> {
        self.record(Call::CurrentUsername).username.clone()
    }

    async fn current_principal_arn(&self) -> Result<String, ProviderError> {
        self.record(Call::CurrentPrincipalArn).principal_arn.clone()
    }
}

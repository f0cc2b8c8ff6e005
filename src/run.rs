use std::io::{BufRead, Write};

use assume_role_mfa_schema::credentials::TemporaryCredentials;
use assume_role_mfa_schema::profile::ProfileConfiguration;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::client::AwsClient;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{
    AttemptCause, AttemptErrors, AttemptPhase, Error, ProviderError, StoreError, ValidationError,
};
use crate::mfa::MfaPrompt;
use crate::role::{self, RoleArn};
use crate::store::CredentialStore;

#[derive(Debug, Clone, Default)]
pub struct AssumeRoleParameters {
    /// Role name (combined with the configured prefix) or full role ARN.
    pub role: String,

    /// Overrides the session name stored on the profile.
    pub role_session_name: Option<String>,

    /// Ignores cached credentials even if they are still fresh.
    pub force_refresh: bool,
}

impl AssumeRoleParameters {
    pub fn new<S: Into<String>>(role: S) -> Self {
        AssumeRoleParameters {
            role: role.into(),
            ..Default::default()
        }
    }
}

/// Whether credentials expiring at `expires_at` must be refreshed at `now`.
///
/// Refresh is due from `expires_at - refresh_before_expiry` on, inclusive.
/// A threshold before the representable range is always due.
pub fn needs_refresh(
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &Config,
) -> bool {
    expires_at
        .and_then(|expires_at| expires_at.checked_sub_signed(config.refresh_before_expiry))
        .map_or(true, |threshold| now >= threshold)
}

/// Obtains credentials for a role: from the cache while they are fresh,
/// otherwise with `sts:AssumeRole`, retrying with MFA when access is denied.
pub struct AssumeRolers<C, S, K, R, W> {
    client: C,
    store: S,
    clock: K,
    prompt: MfaPrompt<R, W>,
    config: Config,
}

impl<C, S, K, R, W> AssumeRolers<C, S, K, R, W>
where
    C: AwsClient,
    S: CredentialStore,
    K: Clock,
    R: BufRead,
    W: Write,
{
    pub fn new(client: C, store: S, clock: K, prompt: MfaPrompt<R, W>, config: Config) -> Self {
        Self {
            client,
            store,
            clock,
            prompt,
            config,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn prompt(&self) -> &MfaPrompt<R, W> {
        &self.prompt
    }

    pub async fn assume_role(
        &mut self,
        params: AssumeRoleParameters,
    ) -> Result<TemporaryCredentials, Error> {
        let role_arn = role::resolve_role_arn(&params.role, &self.config.role_prefix)?;
        let profile_name = role_arn.profile_name(self.config.profile_name_prefix());
        debug!("target role:{} profile:{}", role_arn, profile_name);

        let mut profile = self.store.get_profile(&profile_name)?;
        if !params.force_refresh
            && !needs_refresh(profile.expires_at, self.clock.now(), &self.config)
        {
            debug!("cached credentials are fresh. profile:{}", profile_name);
            return Ok(self.store.get_credentials(&profile_name)?);
        }

        let mut principal = Principal::Unknown;
        let session_name = match params
            .role_session_name
            .filter(|name| !name.is_empty())
            .or_else(|| profile.role_session_name.clone().filter(|name| !name.is_empty()))
        {
            Some(session_name) => session_name,
            None => {
                if principal
                    .is_assumed_role(&self.client)
                    .await
                    .map_err(Error::PrincipalIdentity)?
                {
                    return Err(ValidationError::AssumedRoleNeedsSessionName.into());
                }
                self.client
                    .current_username()
                    .await
                    .map_err(Error::Username)?
            }
        };
        profile.role_arn = Some(role_arn.to_string());
        profile.role_session_name = Some(session_name.clone());

        let denied = match self.client.assume_role(role_arn.as_str(), &session_name).await {
            Ok(credentials) => {
                info!("assumed role without MFA. profile:{}", profile_name);
                self.save(&profile_name, profile, &credentials)?;
                return Ok(credentials);
            }
            Err(e) if e.is_access_denied() => e,
            Err(e) => return Err(Error::Provider(e)),
        };

        debug!("access denied without MFA, trying with MFA. reason:{}", denied);
        let errors = AttemptErrors::default()
            .with(AttemptPhase::WithoutMfa, AttemptCause::Provider(denied));

        // assumed roles have neither a username nor an MFA device
        match principal.is_assumed_role(&self.client).await {
            Ok(false) => {}
            Ok(true) => return Err(errors.into()),
            Err(e) => {
                let cause = AttemptCause::PrincipalIdentity(e);
                return Err(errors.with(AttemptPhase::WithMfa, cause).into());
            }
        }

        let credentials = self
            .assume_role_with_mfa(&role_arn, &session_name, &mut profile)
            .await
            .map_err(|cause| errors.with(AttemptPhase::WithMfa, cause))?;

        info!("assumed role with MFA. profile:{}", profile_name);
        self.save(&profile_name, profile, &credentials)?;
        Ok(credentials)
    }

    async fn assume_role_with_mfa(
        &mut self,
        role_arn: &RoleArn,
        session_name: &str,
        profile: &mut ProfileConfiguration,
    ) -> Result<TemporaryCredentials, AttemptCause> {
        let mut devices = self
            .client
            .list_mfa_devices()
            .await
            .map_err(AttemptCause::Provider)?;

        let mfa_serial = match devices.len() {
            0 => return Err(AttemptCause::NoMfaDevices),
            1 => devices.swap_remove(0),
            _ => self
                .prompt
                .select_device(&devices)
                .map_err(|source| AttemptCause::Input {
                    what: "MFA device option",
                    source,
                })?,
        };
        profile.mfa_serial = Some(mfa_serial.clone());

        let token = self
            .prompt
            .read_token()
            .map_err(|source| AttemptCause::Input {
                what: "MFA token",
                source,
            })?;

        self.client
            .assume_role_with_mfa(role_arn.as_str(), session_name, &mfa_serial, &token)
            .await
            .map_err(AttemptCause::Provider)
    }

    /// Writes the profile first, then the credentials. A failed credentials
    /// write leaves the new profile behind; there is no rollback.
    fn save(
        &mut self,
        profile_name: &str,
        mut profile: ProfileConfiguration,
        credentials: &TemporaryCredentials,
    ) -> Result<(), StoreError> {
        profile.expires_at = credentials.expires_at;
        self.store.set_profile(profile_name, &profile)?;
        self.store.set_credentials(profile_name, credentials)
    }
}

/// The caller's identity, looked up at most once and only when needed.
enum Principal {
    Unknown,
    Known { assumed_role: bool },
}

impl Principal {
    async fn is_assumed_role<C: AwsClient>(&mut self, client: &C) -> Result<bool, ProviderError> {
        if let Principal::Known { assumed_role } = self {
            return Ok(*assumed_role);
        }

        let arn = client.current_principal_arn().await?;
        let assumed_role = role::is_assumed_role_principal(&arn);
        debug!("current principal:{} assumed_role:{}", arn, assumed_role);
        *self = Principal::Known { assumed_role };
        Ok(assumed_role)
    }
}

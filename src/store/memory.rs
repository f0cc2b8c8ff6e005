use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use assume_role_mfa_schema::credentials::TemporaryCredentials;
use assume_role_mfa_schema::profile::ProfileConfiguration;

use crate::error::StoreError;
use crate::store::CredentialStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Written {
    Profile(String),
    Credentials(String),
}

/// A [`CredentialStore`] kept in memory. Writes are logged in order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCredentialStore {
    profiles: BTreeMap<String, ProfileConfiguration>,
    credentials: BTreeMap<String, TemporaryCredentials>,
    writes: Vec<Written>,
    fail_credentials_write: bool,
}

impl InMemoryCredentialStore {
    /// Seeds a profile and its credentials without logging a write.
    pub fn with_cached<S: Into<String>>(
        mut self,
        name: S,
        profile: ProfileConfiguration,
        credentials: TemporaryCredentials,
    ) -> Self {
        let name = name.into();
        self.profiles.insert(name.clone(), profile);
        self.credentials.insert(name, credentials);
        self
    }

    /// Makes every `set_credentials` fail with a write error.
    pub fn fail_credentials_write(mut self) -> Self {
        self.fail_credentials_write = true;
        self
    }

    pub fn writes(&self) -> &[Written] {
        &self.writes
    }

    pub fn profile(&self, name: &str) -> Option<&ProfileConfiguration> {
        self.profiles.get(name)
    }

    pub fn credentials(&self, name: &str) -> Option<&TemporaryCredentials> {
        self.credentials.get(name)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get_profile(&self, name: &str) -> Result<ProfileConfiguration, StoreError> {
        Ok(self.profiles.get(name).cloned().unwrap_or_default())
    }

    fn set_profile(
        &mut self,
        name: &str,
        profile: &ProfileConfiguration,
    ) -> Result<(), StoreError> {
        self.profiles.insert(name.to_string(), profile.clone());
        self.writes.push(Written::Profile(name.to_string()));
        Ok(())
    }

    fn get_credentials(&self, name: &str) -> Result<TemporaryCredentials, StoreError> {
        let mut credentials = self.credentials.get(name).cloned().unwrap_or_default();
        credentials.expires_at = self.get_profile(name)?.expires_at;
        Ok(credentials)
    }

    fn set_credentials(
        &mut self,
        name: &str,
        credentials: &TemporaryCredentials,
    ) -> Result<(), StoreError> {
        if self.fail_credentials_write {
            return Err(StoreError::Write {
                path: PathBuf::from(name),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only store"),
            });
        }

        let mut stored = credentials.clone();
        stored.expires_at = None;
        self.credentials.insert(name.to_string(), stored);
        self.writes.push(Written::Credentials(name.to_string()));
        Ok(())
    }
}

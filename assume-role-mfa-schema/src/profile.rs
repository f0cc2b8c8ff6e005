use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata about one role assumption, kept in the shared AWS config file.
///
/// The default value stands for a profile that has never been assumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfiguration {
    pub expires_at: Option<DateTime<Utc>>,
    pub mfa_serial: Option<String>,
    pub source_profile: Option<String>,
    pub role_arn: Option<String>,
    pub role_session_name: Option<String>,
}

impl ProfileConfiguration {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn mfa_serial(&self) -> Option<&str> {
        self.mfa_serial.as_deref()
    }

    pub fn source_profile(&self) -> Option<&str> {
        self.source_profile.as_deref()
    }

    pub fn role_arn(&self) -> Option<&str> {
        self.role_arn.as_deref()
    }

    pub fn role_session_name(&self) -> Option<&str> {
        self.role_session_name.as_deref()
    }
}

use assume_role_mfa_schema::credentials::TemporaryCredentials;
use assume_role_mfa_schema::profile::ProfileConfiguration;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::StoreError;

pub mod ini;
pub mod memory;

pub mod keys {
    pub const ROLE_ARN: &str = "role_arn";
    pub const MFA_SERIAL: &str = "mfa_serial";
    pub const SOURCE_PROFILE: &str = "source_profile";
    pub const ROLE_SESSION_NAME: &str = "role_session_name";
    pub const EXPIRATION: &str = "expiration";

    pub const AWS_ACCESS_KEY_ID: &str = "aws_access_key_id";
    pub const AWS_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
    pub const AWS_SESSION_TOKEN: &str = "aws_session_token";
}

/// Local cache of profile metadata and the temporary credentials paired with it.
///
/// Both halves are keyed by the same profile name. The credentials' expiry is
/// only kept on the profile, so `get_credentials` reads both.
pub trait CredentialStore {
    /// Returns the default profile if `name` has never been stored.
    fn get_profile(&self, name: &str) -> Result<ProfileConfiguration, StoreError>;

    fn set_profile(&mut self, name: &str, profile: &ProfileConfiguration)
        -> Result<(), StoreError>;

    fn get_credentials(&self, name: &str) -> Result<TemporaryCredentials, StoreError>;

    fn set_credentials(
        &mut self,
        name: &str,
        credentials: &TemporaryCredentials,
    ) -> Result<(), StoreError>;
}

/// Formats an expiry the way it is persisted, e.g. `2018-04-23T13:45:43.000000000Z`.
///
/// The width is fixed so the text sorts like the instant it names.
pub fn format_expiration(expires_at: DateTime<Utc>) -> String {
    expires_at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_expiration(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn expiration_text_is_sortable_utc() {
        let dt = Utc.with_ymd_and_hms(2018, 4, 23, 13, 45, 43).unwrap();
        assert_eq!(format_expiration(dt), "2018-04-23T13:45:43.000000000Z");
        assert_eq!(parse_expiration("2018-04-23T13:45:43Z"), Some(dt));
        assert_eq!(parse_expiration("2018-04-23T15:45:43+02:00"), Some(dt));
        assert_eq!(parse_expiration("yesterday"), None);
    }

    #[test]
    fn expiration_keeps_subsecond_precision() {
        let dt = DateTime::from_timestamp(1_600_000_000, 500_000_000).unwrap();
        assert_eq!(parse_expiration(&format_expiration(dt)), Some(dt));

        let later = dt + chrono::Duration::nanoseconds(1);
        assert!(format_expiration(dt) < format_expiration(later));
    }
}

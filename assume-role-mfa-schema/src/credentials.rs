use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A set of temporary security credentials returned by `sts:AssumeRole`.
///
/// `expires_at` mirrors the `expiration` of the paired profile; the
/// credentials file itself does not carry it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TemporaryCredentials {
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

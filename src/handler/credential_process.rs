use std::io::{self, Stdout, Write};

use assume_role_mfa_schema::credentials::TemporaryCredentials;
use serde::Serialize;

use crate::handler::HandleCredentials;
use crate::store::format_expiration;

/// The document the AWS SDKs expect from a `credential_process` command.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialProcessOutput<'a> {
    version: u8,
    access_key_id: &'a str,
    secret_access_key: &'a str,
    session_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
}

impl<'a> From<&'a TemporaryCredentials> for CredentialProcessOutput<'a> {
    fn from(credentials: &'a TemporaryCredentials) -> Self {
        CredentialProcessOutput {
            version: 1,
            access_key_id: credentials.access_key_id(),
            secret_access_key: credentials.secret_access_key(),
            session_token: credentials.session_token(),
            expiration: credentials
                .expires_at()
                .map(format_expiration),
        }
    }
}

/// Prints the credentials as `credential_process` JSON.
pub struct CredentialProcessHandler<W> {
    out: W,
}

impl CredentialProcessHandler<Stdout> {
    pub fn stdout() -> Self {
        CredentialProcessHandler { out: io::stdout() }
    }
}

impl<W: Write> CredentialProcessHandler<W> {
    pub fn new(out: W) -> Self {
        CredentialProcessHandler { out }
    }
}

impl<W: Write> HandleCredentials for CredentialProcessHandler<W> {
    fn handle_credentials(&mut self, credentials: &TemporaryCredentials) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, &CredentialProcessOutput::from(credentials))?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn writes_credential_process_document() {
        let mut out = Vec::new();
        let credentials = TemporaryCredentials {
            access_key_id: "ABC123".to_string(),
            secret_access_key: "supersecret".to_string(),
            session_token: "123tok".to_string(),
            expires_at: Some(Utc.with_ymd_and_hms(2018, 4, 23, 13, 45, 43).unwrap()),
        };

        CredentialProcessHandler::new(&mut out)
            .handle_credentials(&credentials)
            .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Version": 1,
                "AccessKeyId": "ABC123",
                "SecretAccessKey": "supersecret",
                "SessionToken": "123tok",
                "Expiration": "2018-04-23T13:45:43.000000000Z",
            })
        );
    }
}

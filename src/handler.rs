use assume_role_mfa_schema::credentials::TemporaryCredentials;

pub mod credential_process;
pub mod exec;
pub mod print;

pub trait HandleCredentials {
    fn handle_credentials(&mut self, credentials: &TemporaryCredentials) -> anyhow::Result<()>;
}

pub struct Variable<'a> {
    pub name: &'static str,
    pub value: &'a str,
}

/// The environment variables the AWS CLI and SDKs read credentials from.
pub fn into_variables(credentials: &TemporaryCredentials) -> [Variable<'_>; 3] {
    fn v<'a>(name: &'static str, value: &'a str) -> Variable<'a> {
        Variable { name, value }
    }

    [
        v("AWS_ACCESS_KEY_ID", credentials.access_key_id()),
        v("AWS_SECRET_ACCESS_KEY", credentials.secret_access_key()),
        v("AWS_SESSION_TOKEN", credentials.session_token()),
    ]
}

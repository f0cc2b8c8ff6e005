//! [`CredentialStore`] backed by the shared AWS config and credentials files.
//!
//! Profile metadata goes to the config file (`~/.aws/config`) under
//! `[profile <name>]`, credentials go to the credentials file
//! (`~/.aws/credentials`) under `[<name>]`, so that the AWS CLI and SDKs can
//! use the cached credentials directly. Every write re-reads and rewrites the
//! whole file; nothing is locked, so concurrent writers race and the last one
//! wins.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ::ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use assume_role_mfa_schema::credentials::TemporaryCredentials;
use assume_role_mfa_schema::profile::ProfileConfiguration;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::{format_expiration, keys, parse_expiration, CredentialStore};

mod env_vars {
    pub const CONFIG_FILE: &str = "AWS_CONFIG_FILE";
    pub const SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";
}

const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone)]
pub struct IniCredentialStore {
    config_path: PathBuf,
    credentials_path: PathBuf,
}

impl IniCredentialStore {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(config_path: P, credentials_path: Q) -> Self {
        IniCredentialStore {
            config_path: config_path.into(),
            credentials_path: credentials_path.into(),
        }
    }

    /// Uses `AWS_CONFIG_FILE` / `AWS_SHARED_CREDENTIALS_FILE`, falling back to `~/.aws`.
    pub fn from_env() -> Result<Self, StoreError> {
        let aws_dir = || {
            dirs::home_dir()
                .map(|home| home.join(".aws"))
                .ok_or(StoreError::HomeDirectory)
        };

        let config_path = match env::var_os(env_vars::CONFIG_FILE) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => aws_dir()?.join("config"),
        };
        let credentials_path = match env::var_os(env_vars::SHARED_CREDENTIALS_FILE) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => aws_dir()?.join("credentials"),
        };

        Ok(IniCredentialStore::new(config_path, credentials_path))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }
}

fn profile_section(name: &str) -> String {
    if name == DEFAULT_PROFILE {
        name.to_string()
    } else {
        format!("profile {}", name)
    }
}

// Values are kept byte for byte; other tools own most of these files.
fn parse_option() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

fn write_option() -> WriteOption {
    WriteOption {
        escape_policy: EscapePolicy::Nothing,
        ..WriteOption::default()
    }
}

fn load(path: &Path) -> Result<Ini, StoreError> {
    match Ini::load_from_file_opt(path, parse_option()) {
        Ok(ini) => Ok(ini),
        Err(::ini::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(Ini::new()),
        Err(source) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn save(ini: &Ini, path: &Path, private: bool) -> Result<(), StoreError> {
    let write_error = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    ini.write_to_file_opt(path, write_option())
        .map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if private {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(write_error)?;
        }
    }
    #[cfg(not(unix))]
    let _ = private;

    Ok(())
}

fn set_or_remove(ini: &mut Ini, section: &str, key: &str, value: Option<&str>) {
    match value {
        Some(value) => {
            ini.with_section(Some(section)).set(key, value);
        }
        None => {
            ini.delete_from(Some(section), key);
        }
    }
}

impl CredentialStore for IniCredentialStore {
    fn get_profile(&self, name: &str) -> Result<ProfileConfiguration, StoreError> {
        let ini = load(&self.config_path)?;
        let section = match ini.section(Some(profile_section(name))) {
            Some(section) => section,
            None => return Ok(ProfileConfiguration::default()),
        };

        let get = |key: &str| section.get(key).map(|s| s.to_string());
        let expires_at = section.get(keys::EXPIRATION).and_then(|s| {
            let parsed = parse_expiration(s);
            if parsed.is_none() {
                warn!("ignoring unreadable expiration. profile:{} value:{}", name, s);
            }
            parsed
        });

        Ok(ProfileConfiguration {
            expires_at,
            mfa_serial: get(keys::MFA_SERIAL),
            source_profile: get(keys::SOURCE_PROFILE),
            role_arn: get(keys::ROLE_ARN),
            role_session_name: get(keys::ROLE_SESSION_NAME),
        })
    }

    fn set_profile(
        &mut self,
        name: &str,
        profile: &ProfileConfiguration,
    ) -> Result<(), StoreError> {
        let mut ini = load(&self.config_path)?;
        let section = profile_section(name);
        let expiration = profile.expires_at().map(format_expiration);

        set_or_remove(&mut ini, &section, keys::EXPIRATION, expiration.as_deref());
        set_or_remove(&mut ini, &section, keys::MFA_SERIAL, profile.mfa_serial());
        set_or_remove(&mut ini, &section, keys::SOURCE_PROFILE, profile.source_profile());
        set_or_remove(&mut ini, &section, keys::ROLE_ARN, profile.role_arn());
        set_or_remove(
            &mut ini,
            &section,
            keys::ROLE_SESSION_NAME,
            profile.role_session_name(),
        );

        save(&ini, &self.config_path, false)?;
        debug!("profile saved. section:{} path:{}", section, self.config_path.display());
        Ok(())
    }

    fn get_credentials(&self, name: &str) -> Result<TemporaryCredentials, StoreError> {
        let ini = load(&self.credentials_path)?;
        let get = |key: &str| {
            ini.get_from(Some(name), key)
                .map(|s| s.to_string())
                .unwrap_or_default()
        };

        let mut credentials = TemporaryCredentials {
            access_key_id: get(keys::AWS_ACCESS_KEY_ID),
            secret_access_key: get(keys::AWS_SECRET_ACCESS_KEY),
            session_token: get(keys::AWS_SESSION_TOKEN),
            expires_at: None,
        };

        credentials.expires_at = self.get_profile(name)?.expires_at;
        Ok(credentials)
    }

    fn set_credentials(
        &mut self,
        name: &str,
        credentials: &TemporaryCredentials,
    ) -> Result<(), StoreError> {
        let mut ini = load(&self.credentials_path)?;
        ini.with_section(Some(name))
            .set(keys::AWS_ACCESS_KEY_ID, credentials.access_key_id())
            .set(keys::AWS_SECRET_ACCESS_KEY, credentials.secret_access_key())
            .set(keys::AWS_SESSION_TOKEN, credentials.session_token());

        save(&ini, &self.credentials_path, true)?;
        debug!(
            "credentials saved. section:{} path:{}",
            name,
            self.credentials_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> IniCredentialStore {
        IniCredentialStore::new(
            dir.path().join("aws").join("config"),
            dir.path().join("aws").join("credentials"),
        )
    }

    fn profile() -> ProfileConfiguration {
        ProfileConfiguration {
            expires_at: Some(Utc.with_ymd_and_hms(2018, 4, 23, 13, 45, 43).unwrap()),
            mfa_serial: Some("arn:aws:iam::123:mfa/bob".to_string()),
            source_profile: Some("default".to_string()),
            role_arn: Some("arn:aws:iam::123:role/admin".to_string()),
            role_session_name: None,
        }
    }

    #[test]
    fn missing_files_read_as_never_assumed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert_eq!(
            store.get_profile("123-admin").unwrap(),
            ProfileConfiguration::default()
        );
        assert_eq!(
            store.get_credentials("123-admin").unwrap(),
            TemporaryCredentials::default()
        );
    }

    #[test]
    fn profile_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        store.set_profile("test", &profile()).unwrap();
        assert_eq!(store.get_profile("test").unwrap(), profile());

        let precise = ProfileConfiguration {
            expires_at: chrono::DateTime::from_timestamp(1_600_000_000, 500_000_000),
            ..profile()
        };
        store.set_profile("test", &precise).unwrap();
        assert_eq!(store.get_profile("test").unwrap(), precise);
    }

    #[test]
    fn reads_existing_aws_cli_files() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config"),
            "[default]\nregion = us-east-1\n\n\
             [profile foo-test]\n\
             expiration = 2018-04-23T13:45:43Z\n\
             mfa_serial = arn:aws:iam::123:mfa/bob\n\
             source_profile = default\n\
             role_arn = arn:aws:iam::123:role/admin\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("credentials"),
            "[default]\naws_access_key_id = ABC\naws_secret_access_key = xxx\n\n\
             [foo-test]\n\
             aws_access_key_id = DEF\n\
             aws_secret_access_key = yyy\n\
             aws_session_token = sss\n",
        )
        .unwrap();
        let store = IniCredentialStore::new(
            dir.path().join("config"),
            dir.path().join("credentials"),
        );

        assert_eq!(store.get_profile("foo-test").unwrap(), profile());
        assert_eq!(
            store.get_credentials("foo-test").unwrap(),
            TemporaryCredentials {
                access_key_id: "DEF".to_string(),
                secret_access_key: "yyy".to_string(),
                session_token: "sss".to_string(),
                expires_at: Some(Utc.with_ymd_and_hms(2018, 4, 23, 13, 45, 43).unwrap()),
            }
        );
    }

    #[test]
    fn writes_aws_cli_section_names_and_keeps_other_sections() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        fs::create_dir_all(dir.path().join("aws")).unwrap();
        fs::write(
            store.credentials_path(),
            "[default]\naws_access_key_id = ABC\naws_secret_access_key = xxx\n",
        )
        .unwrap();

        store.set_profile("123-admin", &profile()).unwrap();
        store
            .set_credentials(
                "123-admin",
                &TemporaryCredentials {
                    access_key_id: "DEF".to_string(),
                    secret_access_key: "yyy".to_string(),
                    session_token: "sss".to_string(),
                    expires_at: profile().expires_at,
                },
            )
            .unwrap();

        let config = Ini::load_from_file(store.config_path()).unwrap();
        let section = config.section(Some("profile 123-admin")).unwrap();
        assert_eq!(section.get("expiration"), Some("2018-04-23T13:45:43.000000000Z"));
        assert_eq!(section.get("role_session_name"), None);

        let credentials = Ini::load_from_file(store.credentials_path()).unwrap();
        assert_eq!(credentials.get_from(Some("default"), "aws_access_key_id"), Some("ABC"));
        assert_eq!(credentials.get_from(Some("123-admin"), "aws_session_token"), Some("sss"));
        assert_eq!(credentials.get_from(Some("123-admin"), "expiration"), None);
    }

    #[test]
    fn unset_fields_are_removed_on_rewrite() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        store.set_profile("test", &profile()).unwrap();
        let cleared = ProfileConfiguration {
            mfa_serial: None,
            ..profile()
        };
        store.set_profile("test", &cleared).unwrap();

        assert_eq!(store.get_profile("test").unwrap(), cleared);
    }

    #[test]
    fn unreadable_expiration_means_no_expiry() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config"),
            "[profile test]\nexpiration = someday\nrole_arn = arn:aws:iam::123:role/admin\n",
        )
        .unwrap();
        let store = IniCredentialStore::new(
            dir.path().join("config"),
            dir.path().join("credentials"),
        );

        let profile = store.get_profile("test").unwrap();
        assert_eq!(profile.expires_at, None);
        assert_eq!(profile.role_arn(), Some("arn:aws:iam::123:role/admin"));
    }

    #[test]
    fn foreign_values_survive_a_rewrite() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config");
        fs::write(
            &config_path,
            "[profile windows]\n\
             credential_process = C:\\tools\\creds.exe\n\n\
             [profile quoted]\n\
             credential_process = \"/opt/my tool/bin\" --x\n",
        )
        .unwrap();
        let mut store = IniCredentialStore::new(&config_path, dir.path().join("credentials"));

        store.set_profile("1-x", &profile()).unwrap();

        let config = Ini::load_from_file_opt(&config_path, parse_option()).unwrap();
        assert_eq!(
            config.get_from(Some("profile windows"), "credential_process"),
            Some("C:\\tools\\creds.exe")
        );
        assert_eq!(
            config.get_from(Some("profile quoted"), "credential_process"),
            Some("\"/opt/my tool/bin\" --x")
        );
        let text = fs::read_to_string(&config_path).unwrap();
        assert!(text.contains("C:\\tools\\creds.exe"), "{}", text);
        assert!(text.contains("\"/opt/my tool/bin\" --x"), "{}", text);
    }

    #[cfg(unix)]
    #[test]
    fn credentials_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store
            .set_credentials("test", &TemporaryCredentials::default())
            .unwrap();

        let mode = fs::metadata(store.credentials_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

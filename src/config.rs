use chrono::Duration;

pub mod defaults {
    pub const REFRESH_BEFORE_EXPIRY_SECONDS: i64 = 15 * 60;
    pub const MAX_REFRESH_BEFORE_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;
    pub const DURATION_SECONDS: i32 = 3600;
}

/// Settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Cached credentials are refreshed once they are this close to expiring.
    pub refresh_before_expiry: Duration,

    /// Prepended to role names that are not already a full ARN,
    /// e.g. `arn:aws:iam::123:role/`.
    pub role_prefix: String,

    /// Replaces the account id as the first part of the profile name.
    pub profile_name_prefix: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            refresh_before_expiry: Duration::seconds(defaults::REFRESH_BEFORE_EXPIRY_SECONDS),
            role_prefix: String::new(),
            profile_name_prefix: None,
        }
    }
}

impl Config {
    pub fn profile_name_prefix(&self) -> Option<&str> {
        self.profile_name_prefix
            .as_deref()
            .filter(|prefix| !prefix.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_fifteen_minutes() {
        let config = Config::default();
        assert_eq!(config.refresh_before_expiry, Duration::minutes(15));
        assert_eq!(config.role_prefix, "");
        assert_eq!(config.profile_name_prefix(), None);
    }

    #[test]
    fn empty_profile_name_prefix_is_ignored() {
        let config = Config {
            profile_name_prefix: Some(String::new()),
            ..Config::default()
        };
        assert_eq!(config.profile_name_prefix(), None);
    }
}

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// A parsed `arn:partition:service:region:account-id:resource` identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleArn {
    arn: String,
    service: String,
    account_id: String,
    resource: String,
}

impl RoleArn {
    pub fn as_str(&self) -> &str {
        &self.arn
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Last path segment of the resource, e.g. `admin` for `role/team/admin`.
    pub fn basename(&self) -> &str {
        let trimmed = self.resource.trim_end_matches('/');
        match trimmed.rsplit('/').next() {
            Some(name) if !name.is_empty() => name,
            _ if trimmed.is_empty() && !self.resource.is_empty() => "/",
            _ => ".",
        }
    }

    /// The key under which this role's profile and credentials are cached.
    pub fn profile_name(&self, prefix: Option<&str>) -> String {
        let prefix = prefix
            .filter(|p| !p.is_empty())
            .unwrap_or(self.account_id.as_str());
        format!("{}-{}", prefix, self.basename())
    }

    pub fn is_assumed_role(&self) -> bool {
        self.service == "sts" && self.resource.starts_with("assumed-role/")
    }
}

impl FromStr for RoleArn {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sections = s.splitn(6, ':').collect::<Vec<_>>();
        match sections.as_slice() {
            ["arn", _partition, service, _region, account_id, resource] => Ok(RoleArn {
                arn: s.to_string(),
                service: service.to_string(),
                account_id: account_id.to_string(),
                resource: resource.to_string(),
            }),
            _ => Err(ValidationError::InvalidRoleArn(s.to_string())),
        }
    }
}

impl fmt::Display for RoleArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.arn)
    }
}

/// Turns a role name or ARN into a full role ARN.
///
/// A value that already parses as an ARN is used as is; otherwise `prefix` is
/// prepended and the result must parse.
pub fn resolve_role_arn(role: &str, prefix: &str) -> Result<RoleArn, ValidationError> {
    if let Ok(arn) = role.parse::<RoleArn>() {
        return Ok(arn);
    }

    format!("{}{}", prefix, role).parse::<RoleArn>()
}

/// Whether a caller identity ARN belongs to an assumed-role session.
pub fn is_assumed_role_principal(principal_arn: &str) -> bool {
    principal_arn
        .parse::<RoleArn>()
        .map(|arn| arn.is_assumed_role())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_arn_is_kept() {
        let arn = resolve_role_arn(
            "arn:aws:iam::000000000000:role/testRole",
            "arn:aws:iam::111111111111:role/",
        )
        .unwrap();
        assert_eq!(arn.as_str(), "arn:aws:iam::000000000000:role/testRole");
        assert_eq!(arn.account_id(), "000000000000");
        assert_eq!(arn.basename(), "testRole");
    }

    #[test]
    fn short_name_gets_prefix() {
        let arn = resolve_role_arn("testRole", "arn:aws:iam::000000000000:role/").unwrap();
        assert_eq!(arn.as_str(), "arn:aws:iam::000000000000:role/testRole");
    }

    #[test]
    fn invalid_combination_names_combined_value() {
        let err = resolve_role_arn("testRole", "not-an-arn/").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidRoleArn("not-an-arn/testRole".to_string())
        );
        assert_eq!(err.to_string(), "invalid role ARN: not-an-arn/testRole");
    }

    #[test]
    fn profile_name_uses_account_or_prefix() {
        let arn: RoleArn = "arn:aws:iam::123:role/team/admin".parse().unwrap();
        assert_eq!(arn.profile_name(None), "123-admin");
        assert_eq!(arn.profile_name(Some("")), "123-admin");
        assert_eq!(arn.profile_name(Some("foobar")), "foobar-admin");
    }

    #[test]
    fn detects_assumed_role_principals() {
        assert!(is_assumed_role_principal(
            "arn:aws:sts::123:assumed-role/admin/bob"
        ));
        assert!(is_assumed_role_principal(
            "arn:aws-cn:sts::123:assumed-role/admin/bob"
        ));
        assert!(!is_assumed_role_principal("arn:aws:iam::123:user/bob"));
        assert!(!is_assumed_role_principal("bob"));
    }
}

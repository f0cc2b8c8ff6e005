use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(ProviderError),

    #[error("unable to check IAM principal type")]
    PrincipalIdentity(#[source] ProviderError),

    #[error("unable to get username from AWS")]
    Username(#[source] ProviderError),

    #[error(transparent)]
    AssumeRole(#[from] AttemptErrors),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid role ARN: {0}")]
    InvalidRoleArn(String),

    #[error("missing role session name when current IAM principal is an assumed role")]
    AssumedRoleNeedsSessionName,
}

/// A failed call to STS or IAM.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, ProviderError::AccessDenied(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("unable to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to determine home directory")]
    HomeDirectory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    WithoutMfa,
    WithMfa,
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptPhase::WithoutMfa => f.write_str("without MFA"),
            AttemptPhase::WithMfa => f.write_str("with MFA"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AttemptCause {
    #[error(transparent)]
    Provider(ProviderError),

    #[error("unable to check IAM principal type: {0}")]
    PrincipalIdentity(#[source] ProviderError),

    #[error("no MFA devices found")]
    NoMfaDevices,

    #[error("unable to read {what} from input: {source}")]
    Input {
        what: &'static str,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
#[error("error trying to AssumeRole {phase}: {cause}")]
pub struct AttemptFailure {
    pub phase: AttemptPhase,
    pub cause: AttemptCause,
}

/// The failed attempts of one `AssumeRole` run, oldest first.
#[derive(Debug, Default)]
pub struct AttemptErrors {
    failures: Vec<AttemptFailure>,
}

impl AttemptErrors {
    pub fn push(&mut self, phase: AttemptPhase, cause: AttemptCause) {
        self.failures.push(AttemptFailure { phase, cause });
    }

    /// Appends a failure and hands back the whole list, ready to be returned.
    pub fn with(mut self, phase: AttemptPhase, cause: AttemptCause) -> Self {
        self.push(phase, cause);
        self
    }

    pub fn failures(&self) -> &[AttemptFailure] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }
}

impl fmt::Display for AttemptErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.len() == 1 {
            write!(f, "1 error occurred:")?;
        } else {
            write!(f, "{} errors occurred:", self.failures.len())?;
        }
        for failure in &self.failures {
            write!(f, "\n\t* {}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for AttemptErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_errors_keep_order() {
        let errors = AttemptErrors::default()
            .with(
                AttemptPhase::WithoutMfa,
                AttemptCause::Provider(ProviderError::AccessDenied("denied".to_string())),
            )
            .with(AttemptPhase::WithMfa, AttemptCause::NoMfaDevices);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.failures()[0].phase, AttemptPhase::WithoutMfa);
        assert_eq!(errors.failures()[1].phase, AttemptPhase::WithMfa);
        assert_eq!(
            errors.to_string(),
            "2 errors occurred:\n\
             \t* error trying to AssumeRole without MFA: denied\n\
             \t* error trying to AssumeRole with MFA: no MFA devices found"
        );
    }

    #[test]
    fn only_access_denied_is_access_denied() {
        assert!(ProviderError::AccessDenied("x".to_string()).is_access_denied());
        assert!(!ProviderError::Other("x".to_string()).is_access_denied());
    }
}

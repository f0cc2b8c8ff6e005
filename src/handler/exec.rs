use std::env;
use std::ffi::{CString, NulError};

use assume_role_mfa_schema::credentials::TemporaryCredentials;
use thiserror::Error;
use tracing::debug;

use crate::handler::{into_variables, HandleCredentials, Variable};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no command given")]
    NoCommand,

    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] NulError),

    #[error("could not execute {program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: nix::Error,
    },
}

/// Replaces the current process with `command`, credentials in its environment.
pub struct ExecCommandHandler {
    command: Vec<String>,
}

impl ExecCommandHandler {
    pub fn new(command: Vec<String>) -> Self {
        ExecCommandHandler { command }
    }
}

impl HandleCredentials for ExecCommandHandler {
    fn handle_credentials(&mut self, credentials: &TemporaryCredentials) -> anyhow::Result<()> {
        set_credentials(credentials);
        Err(exec(&self.command).into())
    }
}

fn set_credentials(credentials: &TemporaryCredentials) {
    for Variable { name, value } in into_variables(credentials) {
        env::set_var(name, value);
    }
}

/// Only returns if the command could not be started.
fn exec(command: &[String]) -> ExecError {
    let program = match command.first() {
        Some(program) => program,
        None => return ExecError::NoCommand,
    };
    debug!("exec: {:?}", command);

    let args = match command
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(args) => args,
        Err(e) => return e.into(),
    };

    match nix::unistd::execvp(&args[0], &args) {
        Ok(never) => match never {},
        Err(source) => ExecError::Exec {
            program: program.to_string(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(exec(&[]), ExecError::NoCommand));
    }

    #[test]
    fn missing_program_is_reported() {
        let err = exec(&["assume-role-mfa-no-such-program".to_string()]);
        assert!(matches!(err, ExecError::Exec { .. }));
    }
}

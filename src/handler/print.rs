use std::io::{self, Stdout, Write};

use assume_role_mfa_schema::credentials::TemporaryCredentials;

use crate::handler::{into_variables, HandleCredentials, Variable};

/// Prints `NAME=value` lines, one per variable.
pub struct PrintVariablesHandler<W> {
    out: W,
}

impl PrintVariablesHandler<Stdout> {
    pub fn stdout() -> Self {
        PrintVariablesHandler { out: io::stdout() }
    }
}

impl<W: Write> PrintVariablesHandler<W> {
    pub fn new(out: W) -> Self {
        PrintVariablesHandler { out }
    }
}

impl<W: Write> HandleCredentials for PrintVariablesHandler<W> {
    fn handle_credentials(&mut self, credentials: &TemporaryCredentials) -> anyhow::Result<()> {
        for Variable { name, value } in into_variables(credentials) {
            writeln!(self.out, "{}={}", name, value)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

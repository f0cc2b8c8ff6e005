use std::io::{self, BufRead, IsTerminal, StdinLock, Stderr, Write};

use tracing::debug;

pub mod prompts {
    pub const SELECT_DEVICE: &str = "Select MFA device: ";
    pub const ENTER_TOKEN: &str = "Enter MFA token: ";
    pub const NOT_A_NUMBER: &str = "Invalid input (not a number)";
    pub const NOT_IN_RANGE: &str = "Invalid input (not in range)";
}

/// How the MFA token is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEcho {
    /// Read as a plain line from the input stream.
    Visible,
    /// Read from the controlling terminal without echoing.
    Hidden,
}

/// Interactive MFA device selection and token entry.
pub struct MfaPrompt<R, W> {
    input: R,
    output: W,
    echo: TokenEcho,
}

impl MfaPrompt<StdinLock<'static>, Stderr> {
    /// Prompts on stderr; the token is hidden when stdin is a terminal.
    pub fn stdio() -> Self {
        let stdin = io::stdin();
        let echo = if stdin.is_terminal() {
            TokenEcho::Hidden
        } else {
            TokenEcho::Visible
        };

        MfaPrompt {
            input: stdin.lock(),
            output: io::stderr(),
            echo,
        }
    }
}

impl<R: BufRead, W: Write> MfaPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        MfaPrompt {
            input,
            output,
            echo: TokenEcho::Visible,
        }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Shows a numbered list of `devices` until the user picks one of them.
    pub fn select_device(&mut self, devices: &[String]) -> io::Result<String> {
        loop {
            for (i, device) in devices.iter().enumerate() {
                writeln!(self.output, "[{}]: {}", i + 1, device)?;
            }
            write!(self.output, "{}", prompts::SELECT_DEVICE)?;
            self.output.flush()?;

            let input = self.read_line()?;
            match input.parse::<i64>() {
                Err(_) => writeln!(self.output, "{}", prompts::NOT_A_NUMBER)?,
                Ok(n) if n < 1 || n as usize > devices.len() => {
                    writeln!(self.output, "{}", prompts::NOT_IN_RANGE)?
                }
                Ok(n) => {
                    let device = &devices[n as usize - 1];
                    debug!("selected MFA device:{}", device);
                    return Ok(device.clone());
                }
            }
        }
    }

    pub fn read_token(&mut self) -> io::Result<String> {
        let token = match self.echo {
            TokenEcho::Visible => {
                write!(self.output, "{}", prompts::ENTER_TOKEN)?;
                self.output.flush()?;
                self.read_line()?
            }
            // dialoguer draws on the terminal itself and ends the line
            TokenEcho::Hidden => dialoguer::Password::new()
                .with_prompt(prompts::ENTER_TOKEN.trim_end_matches([':', ' ']))
                .allow_empty_password(true)
                .report(true)
                .interact()
                .map_err(io::Error::other)?,
        };

        Ok(token.trim().to_string())
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before a value was entered",
            ));
        }
        Ok(line.trim().to_string())
    }
}

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use assume_role_mfa::client::aws_sdk::AwsSdkClient;
use assume_role_mfa::clock::SystemClock;
use assume_role_mfa::config::{defaults, Config};
use assume_role_mfa::handler::credential_process::CredentialProcessHandler;
use assume_role_mfa::handler::exec::{ExecCommandHandler, ExecError};
use assume_role_mfa::handler::print::PrintVariablesHandler;
use assume_role_mfa::handler::HandleCredentials;
use assume_role_mfa::mfa::MfaPrompt;
use assume_role_mfa::run::{AssumeRoleParameters, AssumeRolers};
use assume_role_mfa::store::ini::IniCredentialStore;

const EXIT_COMMAND_NOT_EXECUTED: u8 = 127;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// AWS_* variable assignments
    Env,
    /// credential_process JSON
    Json,
}

/// Assume an AWS role and cache its temporary credentials, asking for an MFA
/// token when the role requires one.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Role name (appended to --role-prefix) or full role ARN
    #[arg(short, long, env = "ASSUME_ROLE_ROLE")]
    role: String,

    #[arg(long)]
    role_session_name: Option<String>,

    /// Assume the role even if cached credentials are still valid
    #[arg(short, long)]
    force_refresh: bool,

    /// e.g. arn:aws:iam::123456789012:role/
    #[arg(long, env = "ASSUME_ROLE_ROLE_PREFIX", default_value = "")]
    role_prefix: String,

    /// Used instead of the account id when naming the cached profile
    #[arg(long, env = "ASSUME_ROLE_PROFILE_NAME_PREFIX")]
    profile_name_prefix: Option<String>,

    /// Seconds before expiry at which cached credentials are refreshed
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = defaults::REFRESH_BEFORE_EXPIRY_SECONDS,
        value_parser = clap::value_parser!(i64).range(0..=defaults::MAX_REFRESH_BEFORE_EXPIRY_SECONDS),
    )]
    refresh_before_expiry: i64,

    #[arg(long, env = "AWS_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    #[arg(long, env = "AWS_SHARED_CREDENTIALS_FILE")]
    credentials_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Env)]
    format: Format,

    /// Command to run with the credentials in its environment
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            if e.is::<ExecError>() {
                ExitCode::from(EXIT_COMMAND_NOT_EXECUTED)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn store_from(args: &Args) -> anyhow::Result<IniCredentialStore> {
    if let (Some(config), Some(credentials)) = (&args.config_file, &args.credentials_file) {
        return Ok(IniCredentialStore::new(config, credentials));
    }

    let defaults = IniCredentialStore::from_env()?;
    Ok(IniCredentialStore::new(
        args.config_file
            .clone()
            .unwrap_or_else(|| defaults.config_path().to_path_buf()),
        args.credentials_file
            .clone()
            .unwrap_or_else(|| defaults.credentials_path().to_path_buf()),
    ))
}

fn handler_from(args: &Args) -> Box<dyn HandleCredentials> {
    if !args.command.is_empty() {
        return Box::new(ExecCommandHandler::new(args.command.clone()));
    }
    match args.format {
        Format::Env => Box::new(PrintVariablesHandler::stdout()),
        Format::Json => Box::new(CredentialProcessHandler::stdout()),
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let store = store_from(&args)?;
    let config = Config {
        refresh_before_expiry: chrono::Duration::try_seconds(args.refresh_before_expiry)
            .context("--refresh-before-expiry is out of range")?,
        role_prefix: args.role_prefix.clone(),
        profile_name_prefix: args.profile_name_prefix.clone(),
    };
    let mut handler = handler_from(&args);

    let mut assume_rolers = AssumeRolers::new(
        AwsSdkClient::load().await,
        store,
        SystemClock,
        MfaPrompt::stdio(),
        config,
    );
    let credentials = assume_rolers
        .assume_role(AssumeRoleParameters {
            role: args.role,
            role_session_name: args.role_session_name,
            force_refresh: args.force_refresh,
        })
        .await
        .context("could not get credentials")?;

    handler.handle_credentials(&credentials)
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use signin_reconciler::LoginFlow;
use signin_reconciler::config::ReconcilerConfig;
use signin_reconciler::logging::{LogFormat, init_logging};

mod cmd;

#[derive(Parser)]
#[command(name = "signin-reconciler")]
#[command(version, about = "Reconcile identity-provider sign-in with application authorization")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to reconciler.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format: pretty or json. Overrides the config file.
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in against the configured identity provider and authorization store
    Login {
        /// Login flow: admin or dealer
        #[arg(short, long)]
        flow: LoginFlow,

        /// Account identifier (usually an email address)
        #[arg(short, long)]
        identifier: String,

        /// Read the password from this environment variable instead of prompting
        #[arg(long)]
        secret_env: Option<String>,

        /// Print the outcome as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Run a login against scripted provider responses
    Simulate {
        /// Login flow: admin or dealer
        #[arg(short, long)]
        flow: LoginFlow,

        /// Identifier shown in progress output
        #[arg(short, long, default_value = "user@example.com")]
        identifier: String,

        /// Sign-in responses (comma-separated): complete, incomplete, conflict, reject:<code>, error
        #[arg(long, default_value = "complete")]
        sign_in: String,

        /// Sign-out responses (comma-separated): ok, fail
        #[arg(long, default_value = "ok")]
        sign_out: String,

        /// Authorization responses (comma-separated): authorized:<role>:<target>, denied:<reason>, indeterminate, error
        #[arg(long)]
        check: Option<String>,

        /// Print the outcome as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default reconciler.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = ReconcilerConfig::with_cli_args(cli.config.as_deref(), cli.verbose, cli.log_format)
        .context("Failed to load configuration")?;
    init_logging(config.log_format(), Some(config.log_filter().as_str()));

    let authorized = match &cli.command {
        Commands::Login {
            flow,
            identifier,
            secret_env,
            json,
        } => cmd::cmd_login(&config, *flow, identifier, secret_env.as_deref(), *json).await?,
        Commands::Simulate {
            flow,
            identifier,
            sign_in,
            sign_out,
            check,
            json,
        } => {
            let scripts = cmd::simulate::SimulationScripts {
                sign_in,
                sign_out,
                check: check.as_deref(),
            };
            cmd::cmd_simulate(&config, *flow, identifier, scripts, *json).await?
        }
        Commands::Config { command } => {
            cmd::cmd_config(&config, command.clone())?;
            true
        }
    };

    Ok(if authorized {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

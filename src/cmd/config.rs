//! Configuration view and validation commands: `signin-reconciler config`.

use anyhow::{Context, Result};

use signin_reconciler::LoginFlow;
use signin_reconciler::config::{ReconcilerConfig, ReconcilerToml};

use super::super::ConfigCommands;

fn print_flows(config: &ReconcilerConfig) {
    for flow in LoginFlow::ALL {
        let profile = config.profile(flow);
        println!("[flows.{}]", flow);
        println!("  max_attempts = {}", profile.max_attempts);
        println!("  base_delay_ms = {}", profile.base_delay_ms);
        match &profile.required_role {
            Some(role) => println!("  required_role = \"{}\"", role),
            None => println!("  required_role = (any)"),
        }
        println!("  redirect_target = \"{}\"", profile.redirect_target);
        println!();
    }
}

pub fn cmd_config(config: &ReconcilerConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = &config.path;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Sign-in Reconciler Configuration");
            println!("================================");
            println!();

            if config.from_file {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No config file at {}; using defaults.", config_path.display());
            }
            println!();
            println!("Effective values (with env/CLI overrides):");
            println!();

            let toml = &config.toml;
            println!("[gateway]");
            println!("  base_url = \"{}\"", toml.gateway.base_url);
            println!("  timeout_secs = {}", toml.gateway.timeout_secs);
            println!();
            println!("[oracle]");
            println!("  base_url = \"{}\"", toml.oracle.base_url);
            println!("  path = \"{}\"", toml.oracle.path);
            println!("  timeout_secs = {}", toml.oracle.timeout_secs);
            println!();
            print_flows(config);
            println!("[logging]");
            println!("  format = \"{}\"", config.log_format());
            println!("  filter = \"{}\"", config.log_filter());
            println!();

            if !config.from_file {
                println!("Run 'signin-reconciler config init' to create a config file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                if config.from_file {
                    println!("Configuration is valid.");
                } else {
                    println!("No config file found. Using defaults (valid).");
                }
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("Config already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            ReconcilerToml::default()
                .save(config_path)
                .with_context(|| format!("Failed to create {}", config_path.display()))?;

            println!("Created {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [gateway] and [oracle] base_url, timeout_secs");
            println!("  - [flows.admin] / [flows.dealer] max_attempts, base_delay_ms, redirect_target");
            println!("  - [logging] format, filter");
            println!();
        }
    }

    Ok(())
}

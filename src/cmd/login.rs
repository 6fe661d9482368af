//! Sign in against the real identity provider: `signin-reconciler login`.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use signin_reconciler::config::ReconcilerConfig;
use signin_reconciler::gateway::HttpIdentityGateway;
use signin_reconciler::oracle::HttpAuthorizationOracle;
use signin_reconciler::transport::session_client;
use signin_reconciler::{CredentialSubmission, LoginFlow, LoginOrchestrator};

use super::attempt::{Presenter, run_attempt};

fn read_secret(secret_env: Option<&str>) -> Result<String> {
    use dialoguer::Password;

    match secret_env {
        Some(var) => std::env::var(var)
            .with_context(|| format!("Environment variable {} is not set", var)),
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password"),
    }
}

pub async fn cmd_login(
    config: &ReconcilerConfig,
    flow: LoginFlow,
    identifier: &str,
    secret_env: Option<&str>,
    json: bool,
) -> Result<bool> {
    for warning in config.validate() {
        tracing::warn!(%warning, "configuration warning");
    }

    let secret = read_secret(secret_env)?;
    let credentials = CredentialSubmission::new(identifier, secret);
    let profile = config.profile(flow);

    // One client for both collaborators so the session cookie reaches the oracle.
    let timeout_secs = config
        .toml
        .gateway
        .timeout_secs
        .max(config.toml.oracle.timeout_secs);
    let client = session_client(Duration::from_secs(timeout_secs))
        .context("Failed to build HTTP client")?;
    let gateway = HttpIdentityGateway::new(client.clone(), config.toml.gateway.base_url.clone());
    let oracle = HttpAuthorizationOracle::new(
        client,
        &config.toml.oracle.base_url,
        &config.toml.oracle.path,
        &profile,
    );

    let presenter = Presenter::new(json, config.verbose);
    let orchestrator = LoginOrchestrator::new(
        flow,
        profile,
        Arc::new(gateway),
        Arc::new(oracle),
        presenter.sink(),
    );

    run_attempt(&orchestrator, &presenter, credentials).await
}

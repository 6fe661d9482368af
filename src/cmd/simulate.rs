//! Replay scripted provider responses: `signin-reconciler simulate`.

use anyhow::{Context, Result};
use std::sync::Arc;

use signin_reconciler::config::ReconcilerConfig;
use signin_reconciler::scripted::{
    CheckStep, ScriptedGateway, ScriptedOracle, SignInStep, SignOutStep, parse_script,
};
use signin_reconciler::{CredentialSubmission, LoginFlow, LoginOrchestrator};

use super::attempt::{Presenter, run_attempt};

/// Scripts for each collaborator, as given on the command line.
pub struct SimulationScripts<'a> {
    pub sign_in: &'a str,
    pub sign_out: &'a str,
    pub check: Option<&'a str>,
}

pub async fn cmd_simulate(
    config: &ReconcilerConfig,
    flow: LoginFlow,
    identifier: &str,
    scripts: SimulationScripts<'_>,
    json: bool,
) -> Result<bool> {
    let profile = config.profile(flow);

    let sign_ins: Vec<SignInStep> =
        parse_script(scripts.sign_in).context("Invalid --sign-in script")?;
    let sign_outs: Vec<SignOutStep> =
        parse_script(scripts.sign_out).context("Invalid --sign-out script")?;
    // Without a check script the store approves the flow's own role right away.
    let default_check = format!(
        "authorized:{}:{}",
        profile.required_role.as_deref().unwrap_or(flow.as_str()),
        profile.redirect_target
    );
    let checks: Vec<CheckStep> = parse_script(scripts.check.unwrap_or(&default_check))
        .context("Invalid --check script")?;

    tracing::debug!(
        sign_ins = sign_ins.len(),
        sign_outs = sign_outs.len(),
        checks = checks.len(),
        "running scripted login"
    );

    let presenter = Presenter::new(json, config.verbose);
    let orchestrator = LoginOrchestrator::new(
        flow,
        profile,
        Arc::new(ScriptedGateway::new(sign_ins, sign_outs)),
        Arc::new(ScriptedOracle::new(checks)),
        presenter.sink(),
    );

    run_attempt(
        &orchestrator,
        &presenter,
        CredentialSubmission::new(identifier, "simulated-secret"),
    )
    .await
}

//! Runs one attempt for the `login` and `simulate` commands and reports it.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use signin_reconciler::errors::SubmitError;
use signin_reconciler::events::ProgressSink;
use signin_reconciler::orchestrator::{AttemptSummary, LoginOrchestrator};
use signin_reconciler::outcome::Outcome;
use signin_reconciler::ui::{LoginUI, PlainSink};
use signin_reconciler::CredentialSubmission;

/// Machine-readable result printed by `--json`.
#[derive(Serialize)]
struct AttemptReport<'a> {
    outcome: &'a Outcome,
    message: String,
    authorized: bool,
    summary: Option<AttemptSummary>,
}

/// Where progress goes: a spinner on the terminal, or plain stderr lines with JSON on stdout.
pub struct Presenter {
    ui: Option<Arc<LoginUI>>,
}

impl Presenter {
    pub fn new(json: bool, verbose: bool) -> Self {
        let ui = (!json).then(|| Arc::new(LoginUI::new(verbose)));
        Self { ui }
    }

    pub fn sink(&self) -> Arc<dyn ProgressSink> {
        match &self.ui {
            Some(ui) => ui.clone() as Arc<dyn ProgressSink>,
            None => Arc::new(PlainSink),
        }
    }

    fn is_json(&self) -> bool {
        self.ui.is_none()
    }
}

/// Submit `credentials`, cancelling on Ctrl-C. Returns whether the user was authorized.
pub async fn run_attempt(
    orchestrator: &LoginOrchestrator,
    presenter: &Presenter,
    credentials: CredentialSubmission,
) -> Result<bool> {
    if let Some(ui) = &presenter.ui {
        ui.print_header(
            orchestrator.flow(),
            &credentials.masked_identifier(),
            orchestrator.profile(),
        );
    }

    let token = CancellationToken::new();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };
    let result = orchestrator.submit_cancellable(credentials, &token).await;
    watcher.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(SubmitError::Cancelled) => {
            if let Some(ui) = &presenter.ui {
                ui.cancelled();
            } else {
                eprintln!("Login cancelled");
            }
            return Ok(false);
        }
        Err(e) => return Err(e).context("Login attempt could not start"),
    };

    let summary = orchestrator.last_summary();
    if presenter.is_json() {
        let report = AttemptReport {
            outcome: &outcome,
            message: outcome.user_message(),
            authorized: outcome.is_authorized(),
            summary,
        };
        let json = serde_json::to_string(&report).context("Failed to serialize attempt report")?;
        println!("{}", json);
    } else if let Some(ui) = &presenter.ui {
        ui.finish(&outcome);
        if let Some(summary) = &summary {
            ui.show_summary(summary);
        }
    }

    Ok(outcome.is_authorized())
}

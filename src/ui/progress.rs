use crate::events::{ProgressEvent, ProgressPhase, ProgressSink};
use crate::flow::{FlowProfile, LoginFlow};
use crate::orchestrator::AttemptSummary;
use crate::outcome::Outcome;
use crate::ui::icons::{ARROW, CHECK, CLOCK, CROSS, LOCK, SWAP, WARN};
use console::{Emoji, style};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Terminal UI for one login attempt, rendered as a single `indicatif` spinner.
///
/// The spinner message follows the orchestrator's progress events. Conflict
/// handling is always echoed as its own line; other phases only in verbose mode.
pub struct LoginUI {
    multi: MultiProgress,
    spinner: ProgressBar,
    verbose: bool,
}

impl LoginUI {
    pub fn new(verbose: bool) -> Self {
        Self::with_target(ProgressDrawTarget::stderr(), verbose)
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden(), false)
    }

    fn with_target(target: ProgressDrawTarget, verbose: bool) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let spinner_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let spinner = multi.add(ProgressBar::new_spinner());
        spinner.set_style(spinner_style);
        spinner.set_prefix("Login");

        Self {
            multi,
            spinner,
            verbose,
        }
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!` if the rich UI fails.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn print_header(&self, flow: LoginFlow, identifier: &str, profile: &FlowProfile) {
        self.print_line(format!(
            "{} Signing in to {} as {}",
            LOCK,
            style(flow).yellow().bold(),
            style(identifier).cyan()
        ));
        if self.verbose {
            self.print_line(format!(
                "    {} up to {} checks, {}ms base delay",
                style("Budget:").dim(),
                profile.max_attempts,
                profile.base_delay_ms
            ));
        }
        self.spinner.enable_steady_tick(Duration::from_millis(100));
    }

    /// Stop the spinner with the attempt's outcome.
    pub fn finish(&self, outcome: &Outcome) {
        let icon = match outcome {
            Outcome::Authorized { .. } => CHECK,
            Outcome::VerificationExhausted => WARN,
            Outcome::Denied { .. } | Outcome::ProviderError { .. } => CROSS,
        };
        let message = match outcome {
            Outcome::Authorized { .. } => style(outcome.user_message()).green().bold(),
            Outcome::VerificationExhausted => style(outcome.user_message()).yellow(),
            _ => style(outcome.user_message()).red(),
        };
        self.spinner
            .finish_with_message(format!("{} {} {}", icon, message, style(format!("[{}]", outcome)).dim()));
    }

    pub fn cancelled(&self) {
        self.spinner
            .abandon_with_message(format!("{} {}", WARN, style("Login cancelled").yellow()));
    }

    pub fn show_summary(&self, summary: &AttemptSummary) {
        if !self.verbose {
            return;
        }
        self.print_line(format!(
            "    {} {} sign-in call(s), {} authorization check(s){} in {}ms",
            CLOCK,
            summary.sign_in_calls,
            summary.authorization_checks,
            if summary.conflict_retried {
                ", stale session replaced"
            } else {
                ""
            },
            summary.duration_ms()
        ));
    }
}

fn icon_for(phase: ProgressPhase) -> Emoji<'static, 'static> {
    match phase {
        ProgressPhase::Submitting => LOCK,
        ProgressPhase::ResolvingConflict => SWAP,
        ProgressPhase::Verifying => CLOCK,
        ProgressPhase::Redirecting => ARROW,
    }
}

impl ProgressSink for LoginUI {
    fn emit(&self, event: ProgressEvent) {
        self.spinner.set_message(format!(
            "{}{}",
            icon_for(event.phase),
            style(&event.message).cyan()
        ));
        if self.verbose || event.phase == ProgressPhase::ResolvingConflict {
            self.print_line(format!(
                "    {} {}",
                icon_for(event.phase),
                style(&event.message).dim()
            ));
        }
    }
}

/// Writes each event as a plain `[phase] message` line on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainSink;

impl ProgressSink for PlainSink {
    fn emit(&self, event: ProgressEvent) {
        eprintln!("[{}] {}", event.phase, event.message);
    }
}

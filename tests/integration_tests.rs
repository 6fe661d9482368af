//! Integration tests for the signin-reconciler binary.
//!
//! Every test runs in its own temp directory with an explicit `--config` path
//! so the user's real configuration and `.env` are never read.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const RECONCILER_ENV: [&str; 5] = [
    "RECONCILER_GATEWAY_URL",
    "RECONCILER_ORACLE_URL",
    "RECONCILER_MAX_ATTEMPTS",
    "RECONCILER_BASE_DELAY_MS",
    "RECONCILER_LOG_FORMAT",
];

/// Helper to create a reconciler Command isolated in `dir`
fn reconciler(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("signin-reconciler");
    cmd.current_dir(dir.path());
    cmd.env_remove("RUST_LOG");
    for key in RECONCILER_ENV {
        cmd.env_remove(key);
    }
    cmd.arg("--config").arg(dir.path().join("reconciler.toml"));
    cmd
}

/// Helper for `simulate` with a short backoff so exhaustion tests stay fast
fn simulate(dir: &TempDir, flow: &str) -> Command {
    let mut cmd = reconciler(dir);
    cmd.env("RECONCILER_BASE_DELAY_MS", "1");
    cmd.args(["simulate", "--flow", flow, "--json"]);
    cmd
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = TempDir::new().unwrap();
        reconciler(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("simulate"))
            .stdout(predicate::str::contains("login"));
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        reconciler(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_flow_is_rejected() {
        let dir = TempDir::new().unwrap();
        reconciler(&dir)
            .args(["simulate", "--flow", "guest"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("guest"));
    }
}

// =============================================================================
// Simulated logins
// =============================================================================

mod simulate_scenarios {
    use super::*;

    #[test]
    fn test_complete_and_authorized() {
        let dir = TempDir::new().unwrap();
        simulate(&dir, "dealer")
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""outcome":"authorized""#))
            .stdout(predicate::str::contains("/dealer/catalog"))
            .stdout(predicate::str::contains(r#""sign_in_calls":1"#));
    }

    #[test]
    fn test_conflict_then_lagging_authorization() {
        let dir = TempDir::new().unwrap();
        simulate(&dir, "admin")
            .args([
                "--sign-in",
                "conflict,complete",
                "--check",
                "indeterminate,indeterminate,authorized:admin:/admin/dashboard",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""outcome":"authorized""#))
            .stdout(predicate::str::contains(r#""sign_in_calls":2"#))
            .stdout(predicate::str::contains(r#""authorization_checks":3"#))
            .stdout(predicate::str::contains(r#""conflict_retried":true"#))
            .stderr(predicate::str::contains("[resolving_conflict]"));
    }

    #[test]
    fn test_wrong_password_is_provider_error() {
        let dir = TempDir::new().unwrap();
        simulate(&dir, "dealer")
            .args(["--sign-in", "reject:form_password_incorrect"])
            .assert()
            .failure()
            .stdout(predicate::str::contains(r#""outcome":"provider_error""#))
            .stdout(predicate::str::contains("secret-incorrect"))
            .stdout(predicate::str::contains(r#""authorization_checks":0"#));
    }

    #[test]
    fn test_verification_exhausted_uses_every_attempt() {
        let dir = TempDir::new().unwrap();
        simulate(&dir, "admin")
            .args(["--check", "indeterminate"])
            .assert()
            .failure()
            .stdout(predicate::str::contains(r#""outcome":"verification_exhausted""#))
            .stdout(predicate::str::contains(r#""authorization_checks":5"#));
    }

    #[test]
    fn test_repeated_conflict_is_not_retried_twice() {
        let dir = TempDir::new().unwrap();
        simulate(&dir, "dealer")
            .args(["--sign-in", "conflict"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("conflict-unresolved"))
            .stdout(predicate::str::contains(r#""sign_in_calls":2"#));
    }

    #[test]
    fn test_denied_stops_polling() {
        let dir = TempDir::new().unwrap();
        simulate(&dir, "dealer")
            .args(["--check", "denied:pending-approval,authorized:dealer:/x"])
            .assert()
            .failure()
            .stdout(predicate::str::contains(r#""reason_code":"pending-approval""#))
            .stdout(predicate::str::contains(r#""authorization_checks":1"#));
    }

    #[test]
    fn test_secret_never_printed() {
        let dir = TempDir::new().unwrap();
        simulate(&dir, "dealer")
            .assert()
            .success()
            .stdout(predicate::str::contains("simulated-secret").not())
            .stderr(predicate::str::contains("simulated-secret").not());
    }

    #[test]
    fn test_bad_script_is_reported() {
        let dir = TempDir::new().unwrap();
        simulate(&dir, "dealer")
            .args(["--check", "maybe"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid --check script"));
    }

    #[test]
    fn test_config_file_sets_attempt_budget() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("reconciler.toml"),
            "[flows.dealer]\nmax_attempts = 2\n",
        )
        .unwrap();
        simulate(&dir, "dealer")
            .args(["--check", "indeterminate"])
            .assert()
            .failure()
            .stdout(predicate::str::contains(r#""authorization_checks":2"#));
    }
}

// =============================================================================
// Config command
// =============================================================================

mod config_command {
    use super::*;

    #[test]
    fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        reconciler(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created"));

        let content = fs::read_to_string(dir.path().join("reconciler.toml")).unwrap();
        assert!(content.contains("[gateway]"));
        assert!(content.contains("[oracle]"));
    }

    #[test]
    fn test_config_init_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("reconciler.toml"), "# mine\n").unwrap();
        reconciler(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
        let content = fs::read_to_string(dir.path().join("reconciler.toml")).unwrap();
        assert_eq!(content, "# mine\n");
    }

    #[test]
    fn test_config_validate_defaults() {
        let dir = TempDir::new().unwrap();
        reconciler(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using defaults (valid)"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("reconciler.toml"),
            "[flows.admin]\nmax_attempts = 0\n",
        )
        .unwrap();
        reconciler(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("flows.admin.max_attempts"));
    }

    #[test]
    fn test_config_show_includes_env_override() {
        let dir = TempDir::new().unwrap();
        reconciler(&dir)
            .env("RECONCILER_GATEWAY_URL", "https://idp.example.test")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("https://idp.example.test"))
            .stdout(predicate::str::contains("[flows.dealer]"));
    }

    #[test]
    fn test_malformed_config_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("reconciler.toml"), "[gateway\n").unwrap();
        reconciler(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load configuration"));
    }
}

// =============================================================================
// Login against mock HTTP services
// =============================================================================

mod http_login {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use serde_json::{Value, json};

    async fn sign_in(Json(body): Json<Value>) -> impl IntoResponse {
        if body["secret"] == "right" {
            (
                StatusCode::OK,
                [(header::SET_COOKIE, "__session=live; Path=/")],
                Json(json!({"status": "complete"})),
            )
                .into_response()
        } else {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"errors": [{"code": "form_password_incorrect"}]})),
            )
                .into_response()
        }
    }

    async fn status(headers: HeaderMap) -> impl IntoResponse {
        let has_session = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|c| c.contains("__session=live"));
        if has_session {
            (
                StatusCode::OK,
                Json(json!({"role": "dealer", "status": "approved"})),
            )
                .into_response()
        } else {
            StatusCode::UNAUTHORIZED.into_response()
        }
    }

    async fn spawn_services() -> String {
        let app = Router::new()
            .route("/auth/sign-in", post(sign_in))
            .route("/auth/sign-out", post(|| async { StatusCode::NO_CONTENT }))
            .route("/api/me/authorization", get(status));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn login(dir: &TempDir, base: &str, secret: &str) -> assert_cmd::assert::Assert {
        reconciler(dir)
            .env("RECONCILER_GATEWAY_URL", format!("{}/auth", base))
            .env("RECONCILER_ORACLE_URL", base)
            .env("RECONCILER_BASE_DELAY_MS", "1")
            .env("TEST_LOGIN_SECRET", secret)
            .args([
                "login",
                "--flow",
                "dealer",
                "--identifier",
                "dealer@example.com",
                "--secret-env",
                "TEST_LOGIN_SECRET",
                "--json",
            ])
            .assert()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_login_authorized_over_http() {
        let base = spawn_services().await;
        let dir = TempDir::new().unwrap();
        let assert = tokio::task::spawn_blocking(move || login(&dir, &base, "right"))
            .await
            .unwrap();
        assert
            .success()
            .stdout(predicate::str::contains(r#""outcome":"authorized""#))
            .stdout(predicate::str::contains("/dealer/catalog"))
            .stdout(predicate::str::contains("d*****@example.com"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_login_wrong_password_over_http() {
        let base = spawn_services().await;
        let dir = TempDir::new().unwrap();
        let assert = tokio::task::spawn_blocking(move || login(&dir, &base, "wrong"))
            .await
            .unwrap();
        assert
            .failure()
            .stdout(predicate::str::contains("secret-incorrect"));
    }

    #[test]
    fn test_login_missing_secret_env_fails() {
        let dir = TempDir::new().unwrap();
        reconciler(&dir)
            .env_remove("TEST_LOGIN_SECRET_ABSENT")
            .args([
                "login",
                "--flow",
                "admin",
                "--identifier",
                "admin",
                "--secret-env",
                "TEST_LOGIN_SECRET_ABSENT",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("TEST_LOGIN_SECRET_ABSENT"));
    }
}

//! Configuration for the reconciler, read from `reconciler.toml`.
//!
//! Settings are layered: file, then environment, then CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [gateway]
//! base_url = "http://localhost:3000/api/auth"
//! timeout_secs = 10
//!
//! [oracle]
//! base_url = "http://localhost:3000"
//! path = "/api/me/authorization"
//! timeout_secs = 10
//!
//! [flows.admin]
//! max_attempts = 5
//! base_delay_ms = 300
//!
//! [flows.dealer]
//! max_attempts = 3
//! base_delay_ms = 500
//! redirect_target = "/dealer/catalog"
//!
//! [logging]
//! format = "pretty"
//! filter = "signin_reconciler=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::flow::{FlowProfile, LoginFlow};
use crate::logging::LogFormat;

pub const CONFIG_FILE_NAME: &str = "reconciler.toml";

pub const ENV_GATEWAY_URL: &str = "RECONCILER_GATEWAY_URL";
pub const ENV_ORACLE_URL: &str = "RECONCILER_ORACLE_URL";
pub const ENV_MAX_ATTEMPTS: &str = "RECONCILER_MAX_ATTEMPTS";
pub const ENV_BASE_DELAY_MS: &str = "RECONCILER_BASE_DELAY_MS";
pub const ENV_LOG_FORMAT: &str = "RECONCILER_LOG_FORMAT";

/// Identity provider endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySection {
    #[serde(default = "default_gateway_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Authorization store endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSection {
    #[serde(default = "default_oracle_url")]
    pub base_url: String,
    #[serde(default = "default_oracle_path")]
    pub path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gateway_url() -> String {
    "http://localhost:3000/api/auth".to_string()
}

fn default_oracle_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_oracle_path() -> String {
    "/api/me/authorization".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            base_url: default_oracle_url(),
            path: default_oracle_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Per-flow overrides. Unset fields fall back to the flow's built-in profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_target: Option<String>,
}

impl FlowOverride {
    fn apply(&self, mut profile: FlowProfile) -> FlowProfile {
        if let Some(max_attempts) = self.max_attempts {
            profile.max_attempts = max_attempts;
        }
        if let Some(base_delay_ms) = self.base_delay_ms {
            profile.base_delay_ms = base_delay_ms;
        }
        if let Some(role) = &self.required_role {
            // An empty role in the file means "accept any role".
            profile.required_role = (!role.is_empty()).then(|| role.clone());
        }
        if let Some(target) = &self.redirect_target {
            profile.redirect_target = target.clone();
        }
        profile
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowsSection {
    #[serde(default)]
    pub admin: FlowOverride,
    #[serde(default)]
    pub dealer: FlowOverride,
}

impl FlowsSection {
    pub fn get(&self, flow: LoginFlow) -> &FlowOverride {
        match flow {
            LoginFlow::Admin => &self.admin,
            LoginFlow::Dealer => &self.dealer,
        }
    }

    pub fn get_mut(&mut self, flow: LoginFlow) -> &mut FlowOverride {
        match flow {
            LoginFlow::Admin => &mut self.admin,
            LoginFlow::Dealer => &mut self.dealer,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Contents of `reconciler.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerToml {
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub oracle: OracleSection,
    #[serde(default)]
    pub flows: FlowsSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl ReconcilerToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if it exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Effective profile for `flow`: built-in defaults with file overrides applied.
    pub fn profile(&self, flow: LoginFlow) -> FlowProfile {
        self.flows.get(flow).apply(FlowProfile::default_for(flow))
    }

    /// Apply `RECONCILER_*` overrides read through `lookup`.
    ///
    /// Attempt and delay overrides apply to every flow.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_GATEWAY_URL) {
            self.gateway.base_url = url;
        }
        if let Some(url) = lookup(ENV_ORACLE_URL) {
            self.oracle.base_url = url;
        }
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            let value: u32 = parse_env(ENV_MAX_ATTEMPTS, &raw)?;
            for flow in LoginFlow::ALL {
                self.flows.get_mut(flow).max_attempts = Some(value);
            }
        }
        if let Some(raw) = lookup(ENV_BASE_DELAY_MS) {
            let value: u64 = parse_env(ENV_BASE_DELAY_MS, &raw)?;
            for flow in LoginFlow::ALL {
                self.flows.get_mut(flow).base_delay_ms = Some(value);
            }
        }
        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            self.logging.format = raw.parse()?;
        }
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (key, url) in [
            ("gateway.base_url", &self.gateway.base_url),
            ("oracle.base_url", &self.oracle.base_url),
        ] {
            if url.trim().is_empty() {
                warnings.push(format!("{} is not set", key));
            } else if !url.starts_with("http://") && !url.starts_with("https://") {
                warnings.push(format!("{} '{}' is not an http(s) URL", key, url));
            }
        }
        if !self.oracle.path.starts_with('/') {
            warnings.push(format!(
                "oracle.path '{}' should start with '/'",
                self.oracle.path
            ));
        }
        if self.gateway.timeout_secs == 0 {
            warnings.push("gateway.timeout_secs is 0: requests will fail immediately".to_string());
        }
        if self.oracle.timeout_secs == 0 {
            warnings.push("oracle.timeout_secs is 0: requests will fail immediately".to_string());
        }
        for flow in LoginFlow::ALL {
            warnings.extend(self.profile(flow).validate(flow.as_str()));
        }

        warnings
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("'{}' is not a non-negative integer", raw),
    })
}

/// `<config dir>/signin-reconciler/reconciler.toml`, or `./reconciler.toml`
/// when the platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("signin-reconciler").join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Runtime configuration combining file, environment and CLI settings.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Where the file was (or would be) read from
    pub path: PathBuf,
    /// Whether `path` existed when loaded
    pub from_file: bool,
    /// File settings with environment overrides applied
    pub toml: ReconcilerToml,
    /// CLI override: verbose mode
    pub verbose: bool,
    /// CLI override for the log format
    pub cli_log_format: Option<LogFormat>,
}

impl ReconcilerConfig {
    /// Load from `path` (or the default location) and apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let from_file = path.exists();
        let mut toml = ReconcilerToml::load_or_default(&path)?;
        toml.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(Self {
            path,
            from_file,
            toml,
            verbose: false,
            cli_log_format: None,
        })
    }

    /// Load and apply CLI overrides.
    pub fn with_cli_args(
        path: Option<&Path>,
        verbose: bool,
        log_format: Option<LogFormat>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.verbose = verbose;
        config.cli_log_format = log_format;
        Ok(config)
    }

    /// Log format (CLI → env → file → default).
    pub fn log_format(&self) -> LogFormat {
        self.cli_log_format.unwrap_or(self.toml.logging.format)
    }

    /// Log filter used when `RUST_LOG` is unset (verbose → file → `warn`).
    pub fn log_filter(&self) -> String {
        if self.verbose {
            "signin_reconciler=debug,info".to_string()
        } else {
            self.toml
                .logging
                .filter
                .clone()
                .unwrap_or_else(|| "warn".to_string())
        }
    }

    pub fn profile(&self, flow: LoginFlow) -> FlowProfile {
        self.toml.profile(flow)
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

//! Configuration for the query service client.
//!
//! [`ClientConfig`] and [`PollConfig`] configure the library. [`Config`] is the
//! TOML file used by the `kbq` binary, with environment variables taking
//! precedence over file values.

use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default service endpoint.
pub const DEFAULT_BASE_URL: &str = "https://query.keboola.com";

/// Default timeout for a single HTTP request.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default number of retries for connection-level failures.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default time to wait for a job to reach a terminal state.
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 300;

const DEFAULT_INITIAL_INTERVAL_MS: u64 = 100;
const DEFAULT_MAX_INTERVAL_MS: u64 = 2_000;
const DEFAULT_MULTIPLIER: f64 = 1.5;

/// Shortest allowed delay between status fetches.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Connection settings for the query service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service base URL, without the `/api/v1` prefix.
    pub base_url: Url,
    /// Storage API token.
    pub token: String,
    /// Timeout for a single HTTP request.
    pub request_timeout: Duration,
    /// Retries for requests that never reached the service.
    pub max_retries: u32,
    /// User-Agent header value.
    pub user_agent: String,
    /// Polling behaviour for `wait_for_job` and `execute_query`.
    pub poll: PollConfig,
}

impl ClientConfig {
    /// Creates a config for the given base URL and token.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| QueryError::config(format!("Invalid base URL '{base_url}': {e}")))?;

        if base_url.scheme() != "https" && base_url.scheme() != "http" {
            return Err(QueryError::config(format!(
                "Invalid scheme '{}'. Expected 'https' or 'http'",
                base_url.scheme()
            )));
        }

        let token = token.into();
        if token.trim().is_empty() {
            return Err(QueryError::config("Token must not be empty"));
        }

        Ok(Self {
            base_url,
            token,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent: format!("keboola-query-rust/{}", env!("CARGO_PKG_VERSION")),
            poll: PollConfig::default(),
        })
    }

    /// Creates a config from environment variables.
    ///
    /// Reads `KBC_TOKEN` for the token and optionally `KBC_QUERY_URL` for the
    /// base URL (defaults to [`DEFAULT_BASE_URL`]).
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("KBC_TOKEN")
            .map_err(|_| QueryError::config("KBC_TOKEN environment variable not set"))?;
        let base_url =
            std::env::var("KBC_QUERY_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(&base_url, token)
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the retry budget for connection failures.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the polling configuration.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Returns the API root (`{base_url}/api/v1`) without a trailing slash.
    pub fn api_root(&self) -> String {
        format!("{}/api/v1", self.base_url.as_str().trim_end_matches('/'))
    }
}

/// Bounded backoff and timeout for job polling.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay before the second status fetch.
    pub initial_interval: Duration,
    /// Ceiling for the delay between fetches.
    pub max_interval: Duration,
    /// Growth factor applied after each non-terminal fetch.
    pub multiplier: f64,
    /// How long to wait for a terminal state before giving up.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(DEFAULT_INITIAL_INTERVAL_MS),
            max_interval: Duration::from_millis(DEFAULT_MAX_INTERVAL_MS),
            multiplier: DEFAULT_MULTIPLIER,
            timeout: Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
        }
    }
}

impl PollConfig {
    /// Sets the job timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the initial and maximum poll intervals.
    ///
    /// The initial interval is raised to [`MIN_POLL_INTERVAL`] so backoff can
    /// grow from it.
    pub fn with_intervals(mut self, initial: Duration, max: Duration) -> Self {
        let initial = initial.max(MIN_POLL_INTERVAL);
        self.initial_interval = initial;
        self.max_interval = max.max(initial);
        self
    }
}

/// Configuration file for the `kbq` binary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub defaults: DefaultsSection,

    #[serde(default)]
    pub polling: PollingSection,
}

/// `[service]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Storage API token (prefer `KBC_TOKEN` over storing it here).
    pub token: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// `[defaults]` table: branch and workspace used when not given on the command line.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsSection {
    pub branch_id: Option<String>,
    pub workspace_id: Option<String>,
}

/// `[polling]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSection {
    #[serde(default = "default_job_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
}

fn default_job_timeout_secs() -> u64 {
    DEFAULT_JOB_TIMEOUT_SECS
}

fn default_initial_interval_ms() -> u64 {
    DEFAULT_INITIAL_INTERVAL_MS
}

fn default_max_interval_ms() -> u64 {
    DEFAULT_MAX_INTERVAL_MS
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_job_timeout_secs(),
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keboola-query")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| QueryError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            QueryError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies `KBC_TOKEN`, `KBC_QUERY_URL`, `BRANCH_ID` and `WORKSPACE_ID`,
    /// which take precedence over values from the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("KBC_TOKEN") {
            self.service.token = Some(token);
        }
        if let Ok(url) = std::env::var("KBC_QUERY_URL") {
            self.service.base_url = url;
        }
        if let Ok(branch) = std::env::var("BRANCH_ID") {
            self.defaults.branch_id = Some(branch);
        }
        if let Ok(workspace) = std::env::var("WORKSPACE_ID") {
            self.defaults.workspace_id = Some(workspace);
        }
    }

    /// Builds the polling configuration from the `[polling]` table.
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::default()
            .with_timeout(Duration::from_secs(self.polling.timeout_secs))
            .with_intervals(
                Duration::from_millis(self.polling.initial_interval_ms),
                Duration::from_millis(self.polling.max_interval_ms),
            )
    }

    /// Builds a client configuration. Fails if no token is configured.
    pub fn to_client_config(&self) -> Result<ClientConfig> {
        let token = self.service.token.clone().ok_or_else(|| {
            QueryError::config("No token configured. Set KBC_TOKEN or [service].token.")
        })?;

        Ok(ClientConfig::new(&self.service.base_url, token)?
            .with_request_timeout(Duration::from_secs(self.service.request_timeout_secs))
            .with_max_retries(self.service.max_retries)
            .with_poll(self.poll_config()))
    }
}

//! Command-line argument parsing for `kbq`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use keboola_query::config::Config;

/// Output format for results and job status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
}

/// Run SQL against a Keboola workspace through the Query Service.
#[derive(Parser, Debug)]
#[command(name = "kbq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Query Service base URL (overrides config)
    #[arg(long, value_name = "URL", env = "KBC_QUERY_URL", global = true)]
    pub url: Option<String>,

    /// Storage API token (overrides config)
    #[arg(long, value_name = "TOKEN", env = "KBC_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Branch and workspace selection shared by workspace-scoped commands.
#[derive(clap::Args, Debug, Clone)]
pub struct Target {
    /// Branch ID (defaults to BRANCH_ID or [defaults].branch_id)
    #[arg(short, long, value_name = "ID")]
    pub branch: Option<String>,

    /// Workspace ID (defaults to WORKSPACE_ID or [defaults].workspace_id)
    #[arg(short, long, value_name = "ID")]
    pub workspace: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute statements and print their results
    Query {
        /// SQL statements, executed in order
        #[arg(required = true, value_name = "SQL")]
        statements: Vec<String>,

        #[command(flatten)]
        target: Target,

        /// Seconds to wait for the job before giving up
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Run all statements in one transaction
        #[arg(long, conflicts_with = "concurrent")]
        transactional: bool,

        /// Submit each statement as its own job and run them concurrently
        #[arg(long)]
        concurrent: bool,
    },

    /// Show the status of a job
    Status {
        job_id: String,
    },

    /// Wait for a job to finish and show its final status
    Wait {
        job_id: String,

        /// Seconds to wait before giving up
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Print all results of one statement
    Results {
        job_id: String,
        statement_id: String,
    },

    /// Request cancellation of a job
    Cancel {
        job_id: String,

        /// Reason recorded with the cancellation
        #[arg(long)]
        reason: Option<String>,
    },

    /// List previously executed jobs
    History {
        #[command(flatten)]
        target: Target,

        /// Only list jobs after this job ID
        #[arg(long, value_name = "JOB_ID")]
        after_id: Option<String>,

        /// Maximum number of jobs to list
        #[arg(long, value_name = "N")]
        limit: Option<u32>,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides on top of file and environment config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.service.base_url = url.clone();
        }
        if let Some(token) = &self.token {
            config.service.token = Some(token.clone());
        }
    }
}

impl Target {
    /// Resolves branch and workspace, falling back to config defaults.
    pub fn resolve(&self, config: &Config) -> Result<(String, String), String> {
        let branch = self
            .branch
            .clone()
            .or_else(|| config.defaults.branch_id.clone())
            .ok_or("No branch ID. Use --branch or set BRANCH_ID.")?;
        let workspace = self
            .workspace
            .clone()
            .or_else(|| config.defaults.workspace_id.clone())
            .ok_or("No workspace ID. Use --workspace or set WORKSPACE_ID.")?;
        Ok((branch, workspace))
    }
}

//! kbq - run SQL through the Keboola Query Service.

mod cli;
mod output;

use std::time::Duration;

use anyhow::{anyhow, Context};
use cli::{Cli, Command, OutputFormat};
use futures::future::try_join_all;
use keboola_query::config::Config;
use keboola_query::{Client, HistoryOptions, QueryError, QueryResult, SubmitOptions};
use tracing::{debug, error};

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    keboola_query::logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<QueryError>() {
            Some(query_error) => error!("{}: {}", query_error.category(), query_error),
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Precedence: command line, then environment, then config file.
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);

    let client = Client::new(config.to_client_config()?).context("Failed to create client")?;
    let format = cli.format;

    match cli.command {
        Command::Query {
            statements,
            target,
            timeout,
            transactional,
            concurrent,
        } => {
            let (branch, workspace) = target.resolve(&config).map_err(|e| anyhow!(e))?;
            let timeout = timeout.map(Duration::from_secs);

            let results: Vec<QueryResult> = if concurrent {
                let jobs = statements.iter().map(|sql| {
                    client.execute_query_with(
                        &branch,
                        &workspace,
                        std::slice::from_ref(sql),
                        SubmitOptions::default(),
                        timeout,
                    )
                });
                try_join_all(jobs).await?.into_iter().flatten().collect()
            } else {
                client
                    .execute_query_with(
                        &branch,
                        &workspace,
                        &statements,
                        SubmitOptions { transactional },
                        timeout,
                    )
                    .await?
            };
            print_results(&results, format);
        }
        Command::Status { job_id } => {
            let job = client.get_job_status(&job_id).await?;
            print_job(&job, format);
        }
        Command::Wait { job_id, timeout } => {
            let job = client
                .wait_for_job(&job_id, timeout.map(Duration::from_secs))
                .await?;
            print_job(&job, format);
        }
        Command::Results {
            job_id,
            statement_id,
        } => {
            let result = client.get_job_results(&job_id, &statement_id).await?;
            print_results(std::slice::from_ref(&result), format);
        }
        Command::Cancel { job_id, reason } => {
            let canceled = client.cancel_job(&job_id, reason.as_deref()).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", output::to_json(&serde_json::json!({ "queryJobId": canceled })))
                }
                OutputFormat::Table => println!("Cancellation requested for job {canceled}"),
            }
        }
        Command::History {
            target,
            after_id,
            limit,
        } => {
            let (branch, workspace) = target.resolve(&config).map_err(|e| anyhow!(e))?;
            let history = client
                .get_query_history(
                    &branch,
                    &workspace,
                    HistoryOptions {
                        after_id,
                        page_size: limit,
                    },
                )
                .await?;
            match format {
                OutputFormat::Json => println!("{}", output::to_json(&history)),
                OutputFormat::Table => {
                    for job in &history {
                        print!("{}", output::render_job(job));
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_results(results: &[QueryResult], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", output::to_json(results)),
        OutputFormat::Table => {
            for (i, result) in results.iter().enumerate() {
                if results.len() > 1 {
                    println!("--- Statement {} ({}) ---", i + 1, result.statement_id);
                }
                print!("{}", output::render_table(result));
            }
        }
    }
}

fn print_job(job: &keboola_query::JobStatus, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", output::to_json(job)),
        OutputFormat::Table => print!("{}", output::render_job(job)),
    }
}

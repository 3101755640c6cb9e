//! `dynamocli`: import CSV files into DynamoDB tables and erase tables,
//! directly or through the CloudFormation stack that owns them.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{debug, error};

mod cloudformation;
mod config;
mod dynamodb;
mod erase;
mod error;
mod import;
mod logging;
mod polling;
mod prompt;


use crate::cloudformation::CloudFormation;
use crate::config::AwsSettings;
use crate::dynamodb::{DynamoDb, TableApi};
use crate::erase::Eraser;
use crate::error::{AppError, Result, FAILURE_EXIT_CODE};
use crate::import::Importer;
use crate::prompt::ConsolePrompt;

/// Utilities to interact with DynamoDB tables
#[derive(Debug, Parser)]
#[command(name = "dynamocli", version)]
struct Cli {
    #[command(flatten)]
    global: Global,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
struct Global {
    /// AWS region
    #[arg(long, env = "AWS_REGION", global = true)]
    region: Option<String>,

    /// Custom endpoint, e.g. http://localhost:8000 for DynamoDB Local
    #[arg(long, env = "AWS_ENDPOINT_URL", global = true)]
    endpoint_url: Option<String>,

    /// Named profile from the shared AWS configuration
    #[arg(long, env = "AWS_PROFILE", global = true)]
    profile: Option<String>,

    /// Give up waiting for a table or stack after this many seconds
    #[arg(
        long,
        value_name = "SECS",
        env = "DYNAMOCLI_POLL_TIMEOUT",
        default_value_t = 1800,
        global = true
    )]
    poll_timeout: u64,

    /// Longest pause between two status checks, in seconds
    #[arg(
        long,
        value_name = "SECS",
        env = "DYNAMOCLI_MAX_POLL_INTERVAL",
        default_value_t = 30,
        global = true
    )]
    max_poll_interval: u64,

    /// Enable debug output
    #[arg(long, global = true)]
    verbose: bool,
}

impl Global {
    fn aws_settings(&self) -> AwsSettings {
        AwsSettings {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            profile: self.profile.clone(),
        }
    }
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Import a CSV file into a table
    Import {
        /// File to import
        file: PathBuf,

        /// Target table
        #[arg(long = "to", short = 't', visible_alias = "table")]
        to: String,

        /// Headers carry the " (TYPE)" suffix of a DynamoDB console export
        #[arg(long)]
        exported_from_aws: bool,
    },

    /// Erase all the items of a table by dropping and re-creating it
    Erase {
        /// Table to erase
        table: String,

        /// Erase the table directly even if a stack owns it
        #[arg(long)]
        with_drift: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let failed = err.use_stderr();
            let _ = err.print();
            return if failed {
                ExitCode::from(FAILURE_EXIT_CODE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(err) = logging::init_logging(cli.global.verbose) {
        eprintln!("Failed to initialize logging: {err:#}");
        return ExitCode::from(FAILURE_EXIT_CODE);
    }

    let task = tokio::spawn(run(cli));

    tokio::select! {
        joined = task => match joined {
            Ok(Ok(())) => ExitCode::SUCCESS,
            Ok(Err(err)) => {
                error!("{err}");
                ExitCode::from(err.exit_code())
            }
            Err(err) => {
                error!("{err}");
                ExitCode::from(FAILURE_EXIT_CODE)
            }
        },
        _ = signal::ctrl_c() => {
            // The prompt may be blocked on stdin, so the task is not awaited.
            error!("{}", AppError::Interrupted);
            std::process::exit(i32::from(AppError::Interrupted.exit_code()));
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let aws = cli.global.aws_settings();
    debug!("Targeting {}", aws.target_display());

    let sdk_config = aws.load().await;
    let poll = config::poll_settings(cli.global.poll_timeout, cli.global.max_poll_interval);
    let tables: Arc<dyn TableApi> = Arc::new(DynamoDb::new(&sdk_config));

    match cli.command {
        Commands::Import {
            file,
            to,
            exported_from_aws,
        } => {
            Importer::new(tables, poll)
                .import(&file, &to, exported_from_aws)
                .await?;
        }
        Commands::Erase { table, with_drift } => {
            let stacks = Arc::new(CloudFormation::new(&sdk_config));
            let mut prompt = ConsolePrompt::stdio();
            Eraser::new(tables, stacks, poll)
                .run(&table, with_drift, &mut prompt)
                .await?;
        }
    }

    Ok(())
}

//! cfn-nuke: remove CloudFormation stacks that the console gives up on
//!
//! Deletes the named stacks concurrently, waiting out in-flight operations,
//! retaining stuck children, and optionally lifting termination protection
//! or supplying a temporary service role.

use anyhow::{Context, Result};
use cfn_nuke::aws::{AwsContext, CloudFormationClient, FromAwsContext, IamRoleClient};
use cfn_nuke::config::RemovalConfig;
use cfn_nuke::stack::{DeletionOrchestrator, RemovalOutcome, RemoveError};
use cfn_nuke_common::defaults::DEFAULT_CONCURRENCY;
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cfn-nuke")]
#[command(about = "Remove CloudFormation stacks, including stuck and protected ones")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct AwsArgs {
    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    aws_profile: Option<String>,
}

/// Arguments for the remove command
#[derive(clap::Args, Debug)]
struct RemoveArgs {
    /// Names of the stacks to remove
    #[arg(required = true)]
    stacks: Vec<String>,

    #[command(flatten)]
    aws: AwsArgs,

    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Turn termination protection off when it blocks a delete
    #[arg(long)]
    disable_deletion_protection: bool,

    /// Delete through a temporary admin service role (for stacks whose role is gone)
    #[arg(long)]
    enable_automatic_role_management: bool,

    /// Maximum delete attempts per stack
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Ceiling for each stack wait, in seconds
    #[arg(long)]
    wait_timeout_secs: Option<u64>,

    /// Number of stacks removed at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

impl RemoveArgs {
    /// Config file (or defaults) with command-line overrides applied
    fn removal_config(&self) -> Result<RemovalConfig> {
        let mut config = match &self.config {
            Some(path) => RemovalConfig::load(path)?,
            None => RemovalConfig::default(),
        };
        config.disable_deletion_protection |= self.disable_deletion_protection;
        config.enable_automatic_role_management |= self.enable_automatic_role_management;
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(timeout) = self.wait_timeout_secs {
            config.wait_timeout_secs = timeout;
        }
        Ok(config.validated()?)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete stacks
    Remove(Box<RemoveArgs>),

    /// Print stack properties
    Describe {
        /// Names of the stacks to describe
        #[arg(required = true)]
        stacks: Vec<String>,

        #[command(flatten)]
        aws: AwsArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Per-stack result of the remove command
enum StackReport {
    Skipped(&'static str),
    Removed(RemovalOutcome),
    Failed(RemoveError),
}

impl StackReport {
    fn label(&self) -> String {
        match self {
            StackReport::Skipped(reason) => format!("skipped ({reason})"),
            StackReport::Removed(RemovalOutcome::AlreadyDeleted) => "already deleted".to_string(),
            StackReport::Removed(RemovalOutcome::DeletionCompleted) => {
                "deleted (in-progress delete finished)".to_string()
            }
            StackReport::Removed(RemovalOutcome::Deleted { attempts }) => {
                format!("deleted ({attempts} attempt(s))")
            }
            StackReport::Failed(e) if e.is_cancelled() => "cancelled".to_string(),
            StackReport::Failed(_) => "FAILED".to_string(),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "info,aws_config=warn,aws_sdk_cloudformation=warn,aws_sdk_iam=warn,aws_smithy_runtime=warn",
            )
        }))
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Remove(remove_args) => handle_remove(*remove_args).await,
        Command::Describe {
            stacks,
            aws,
            format,
        } => handle_describe(stacks, aws, format).await,
    }
}

/// Handle the remove command
async fn handle_remove(args: RemoveArgs) -> Result<()> {
    let config = args.removal_config()?;
    if let Some(profile) = &args.aws.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }
    info!(
        stacks = ?args.stacks,
        region = %args.aws.region,
        disable_deletion_protection = config.disable_deletion_protection,
        enable_automatic_role_management = config.enable_automatic_role_management,
        max_attempts = config.max_attempts,
        "Removing stacks"
    );

    let aws = AwsContext::with_profile(&args.aws.region, args.aws.aws_profile.as_deref()).await;
    let cfn = CloudFormationClient::from_context(&aws);
    let iam = IamRoleClient::from_context(&aws);
    let orchestrator = DeletionOrchestrator::new(&cfn, &iam, &config);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling removals");
                cancel.cancel();
            }
        });
    }

    let cfn = &cfn;
    let orchestrator = &orchestrator;
    let cancel = &cancel;
    let mut reports: Vec<(String, StackReport)> = futures::stream::iter(args.stacks.clone())
        .map(|stack_name| async move {
            let report = remove_one(cfn, orchestrator, &stack_name, cancel).await;
            (stack_name, report)
        })
        .buffer_unordered(args.concurrency.max(1))
        .collect()
        .await;
    reports.sort_by_key(|(name, _)| {
        args.stacks
            .iter()
            .position(|s| s == name)
            .unwrap_or(usize::MAX)
    });

    println!("{:<40} {}", "STACK", "RESULT");
    println!("{}", "-".repeat(70));
    for (name, report) in &reports {
        println!("{:<40} {}", name, report.label());
    }

    let mut failed = 0;
    for (_, report) in reports {
        if let StackReport::Failed(e) = report {
            failed += 1;
            print_error(&anyhow::Error::new(e));
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} stacks could not be removed", args.stacks.len());
    }
    Ok(())
}

async fn remove_one(
    cfn: &CloudFormationClient,
    orchestrator: &DeletionOrchestrator<'_, CloudFormationClient, IamRoleClient>,
    stack_name: &str,
    cancel: &CancellationToken,
) -> StackReport {
    let mut stack = match cfn.describe_stack(stack_name).await {
        Ok(Some(stack)) => stack,
        Ok(None) => {
            info!(stack_name = %stack_name, "Stack not found, nothing to remove");
            return StackReport::Skipped("not found");
        }
        Err(e) => {
            return StackReport::Failed(RemoveError::Provider {
                stack_name: stack_name.to_string(),
                source: e,
            });
        }
    };

    if stack.is_nested() {
        warn!(
            stack_name = %stack_name,
            parent = stack.parent_id.as_deref().unwrap_or_default(),
            "Nested stacks are removed with their root stack; skipping"
        );
        return StackReport::Skipped("nested stack");
    }

    match orchestrator.remove(&mut stack, cancel).await {
        Ok(outcome) => StackReport::Removed(outcome),
        Err(e) => StackReport::Failed(e),
    }
}

/// Handle the describe command
async fn handle_describe(stacks: Vec<String>, aws: AwsArgs, format: OutputFormat) -> Result<()> {
    let ctx = AwsContext::with_profile(&aws.region, aws.aws_profile.as_deref()).await;
    let cfn = CloudFormationClient::from_context(&ctx);

    let mut found = Vec::new();
    for name in &stacks {
        match cfn.describe_stack(name).await? {
            Some(stack) => found.push(stack),
            None => warn!(stack_name = %name, "Stack not found"),
        }
    }

    match format {
        OutputFormat::Json => {
            let properties: Vec<_> = found.iter().map(|s| s.properties()).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&properties).context("Failed to encode properties")?
            );
        }
        OutputFormat::Table => {
            for stack in &found {
                let protection = if stack.termination_protection {
                    "protected"
                } else {
                    "-"
                };
                println!(
                    "{:<40} {:<30} {:<10} {}",
                    stack.name,
                    stack.status,
                    protection,
                    stack.properties()
                );
            }
            println!("\nTotal: {} stacks", found.len());
        }
    }
    Ok(())
}

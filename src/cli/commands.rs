//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "stv",
    version,
    about = "Deploy containerized services to Kubernetes and diagnose why they fail",
    long_about = None,
)]
pub struct Cli {
    /// Kubernetes context to use
    #[arg(long, global = true, env = "STV_CONTEXT")]
    pub context: Option<String>,

    /// Namespace to use
    #[arg(short = 'n', long, global = true, env = "STV_NAMESPACE")]
    pub namespace: Option<String>,

    /// Output format
    #[arg(short = 'o', long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

#[derive(Subcommand)]
pub enum Command {
    /// Diagnose why a deployed service is failing or unhealthy
    #[command(alias = "ts")]
    Troubleshoot(TroubleshootArgs),
}

#[derive(Args)]
pub struct TroubleshootArgs {
    /// Application the service belongs to
    #[arg(short, long)]
    pub app: String,

    /// Service to diagnose
    pub service: String,

    /// Trace every node visited during diagnosis
    #[arg(long)]
    pub trace: bool,

    /// Overall deadline for the diagnosis, in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
}

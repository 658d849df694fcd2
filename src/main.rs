//! stevedore (stv) - deploy containerized services to Kubernetes and diagnose why they fail

use anyhow::Result;
use clap::Parser;
use stevedore::cli::{Cli, Command};
use stevedore::commands;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    if cli.no_color {
        owo_colors::set_override(false);
    }

    match cli.command {
        Command::Troubleshoot(ref args) => {
            commands::run_troubleshoot(
                cli.context.as_deref(),
                cli.namespace.as_deref(),
                args,
                cli.output,
            )
            .await?;
        }
    }

    Ok(())
}

fn setup_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "stevedore=warn",
        1 => "stevedore=info",
        2 => "stevedore=debug",
        _ => "stevedore=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

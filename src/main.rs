mod backend;
mod cli;
mod config;
mod error;
mod flow;
mod model;
mod reconcile;
mod render;
mod widget;

use clap::Parser;
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Environment is read once, before anything talks to the backend
    let settings = config::Settings::from_env()?;

    match cli.command {
        Command::Verify {
            first_name,
            last_name,
            email,
            phone,
            citizen,
            format,
            output,
        } => {
            let prefill = cli::verify::Prefill {
                first_name,
                last_name,
                email,
                phone,
                citizen,
            };
            cli::verify::verify(&settings, prefill, &format, output.as_deref()).await?;
        }
        Command::Status {
            run_id,
            first_name,
            last_name,
            format,
            output,
        } => {
            let names = first_name.zip(last_name);
            cli::status::status(&settings, &run_id, names, &format, output.as_deref()).await?;
        }
        Command::Inspect {
            webhook,
            run,
            format,
        } => {
            cli::inspect::inspect(&settings, &webhook, run.as_deref(), &format)?;
        }
        Command::Demo { outcome } => {
            cli::demo::demo(&settings, &outcome).await?;
        }
    }

    Ok(())
}

pub mod demo;
pub mod inspect;
pub mod status;
pub mod verify;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "idv-flow",
    version,
    about = "Run an identity verification: applicant, document capture, webhook outcome"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Verify an applicant end to end against the configured backend
    Verify {
        /// First name (prompted if omitted)
        #[arg(long)]
        first_name: Option<String>,
        /// Last name (prompted if omitted)
        #[arg(long)]
        last_name: Option<String>,
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// Phone number in international format, e.g. +40 721 234 567
        #[arg(long)]
        phone: Option<String>,
        /// The applicant is a citizen
        #[arg(long)]
        citizen: bool,
        /// Result format
        #[arg(long, default_value = "terminal", value_parser = ["terminal", "json", "html"])]
        format: String,
        /// Write the result to a file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
    /// Wait for the outcome of an existing workflow run and show the result
    Status {
        /// Workflow run ID
        run_id: String,
        /// First name to fall back on if the provider returns none
        #[arg(long, requires = "last_name")]
        first_name: Option<String>,
        /// Last name to fall back on if the provider returns none
        #[arg(long, requires = "first_name")]
        last_name: Option<String>,
        /// Result format
        #[arg(long, default_value = "terminal", value_parser = ["terminal", "json", "html"])]
        format: String,
        /// Write the result to a file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
    /// Reconcile saved webhook / run payloads without contacting the backend
    Inspect {
        /// Webhook payload (JSON file)
        #[arg(long)]
        webhook: String,
        /// Workflow run record (JSON file)
        #[arg(long)]
        run: Option<String>,
        /// Result format
        #[arg(long, default_value = "terminal", value_parser = ["terminal", "json", "html"])]
        format: String,
    },
    /// Walk through the whole flow against a simulated backend
    Demo {
        /// Outcome to simulate
        #[arg(
            long,
            default_value = "approved",
            value_parser = ["approved", "review", "declined", "widget-error", "remote-error", "timeout"]
        )]
        outcome: String,
    },
}

/// Print `rendered`, or write it to `output` when given.
pub fn emit(rendered: &str, output: Option<&str>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("Result written to {path}");
        }
        None => {
            println!("{rendered}");
        }
    }
    Ok(())
}

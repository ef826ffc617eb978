use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ratekeeper::cli::{setup, ui};
use ratekeeper::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Rate date to download (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup::setup(),
        None => download(cli.config_path, cli.date, !cli.verbose).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "Application failed");
    }
    result
}

async fn download(
    config_path: Option<String>,
    date: Option<NaiveDate>,
    show_progress: bool,
) -> Result<()> {
    let options = ratekeeper::RunOptions {
        config_path,
        date,
        show_progress,
    };
    let outcome = ratekeeper::run(&options).await?;
    println!(
        "{}",
        ui::display_summary(&outcome.summary, outcome.notification_error.as_deref())
    );
    Ok(())
}

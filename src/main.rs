//! ao3-history main entry point
//!
//! This is the command-line interface for the AO3 reading history scraper.

use anyhow::Context;
use ao3_history::config::load_or_default;
use ao3_history::output::{print_summary, write_cards};
use ao3_history::scrape::Credentials;
use ao3_history::service::{error_reply, ApiReply, ScrapeRequest, Service, StreamEvent};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// ao3-history: reading statistics for Archive of Our Own accounts
///
/// Logs into the archive, walks the account's reading history and reports
/// the works read along with ranked tags, relationships and fandoms.
#[derive(Parser, Debug)]
#[command(name = "ao3-history")]
#[command(version = "1.0.0")]
#[command(about = "Reading history statistics for Archive of Our Own", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the reading history and print works with statistics
    Scrape {
        /// Account login (username or email)
        #[arg(short, long, alias = "username")]
        login: String,

        /// Account password
        #[arg(short, long, env = "AO3_PASSWORD", hide_env_values = true)]
        password: String,

        /// Only keep works last visited in this year
        #[arg(short, long)]
        year: Option<i32>,

        /// Print progress as an event stream while scraping
        #[arg(long, conflicts_with_all = ["summary", "cards"])]
        stream: bool,

        /// Print a statistics table instead of JSON
        #[arg(long)]
        summary: bool,

        /// Also write shareable SVG statistics cards into this directory
        #[arg(long, value_name = "DIR")]
        cards: Option<PathBuf>,
    },

    /// Print a liveness report
    Health,

    /// Check that the archive can be reached
    TestConnection,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_or_default(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to build default configuration".to_string(),
    })?;
    if let Some(path) = &cli.config {
        tracing::info!("Configuration loaded from: {}", path.display());
    }

    let service = Service::new(config);

    match cli.command {
        Command::Scrape {
            login,
            password,
            year,
            stream,
            summary,
            cards,
        } => {
            let request = ScrapeRequest::new(Credentials::new(login, password), year);
            if stream {
                handle_stream(&service, request).await
            } else {
                handle_scrape(&service, request, summary, cards.as_deref()).await
            }
        }
        Command::Health => print_reply(&service.health()),
        Command::TestConnection => print_reply(&service.test_connection().await),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only the JSON or event stream.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ao3_history=info,warn"),
            1 => EnvFilter::new("ao3_history=debug,info"),
            2 => EnvFilter::new("ao3_history=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles `scrape`: prints the JSON reply or a statistics table, and
/// optionally writes statistics cards
async fn handle_scrape(
    service: &Service,
    request: ScrapeRequest,
    summary: bool,
    cards: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let response = match service.scrape_response(&request).await {
        Ok(response) => response,
        Err(e) => return print_reply(&error_reply(&e)),
    };

    if let Some(dir) = cards {
        let written = write_cards(&response.statistics, dir)
            .with_context(|| format!("Failed to write cards to {}", dir.display()))?;
        tracing::info!("Wrote {} cards to {}", written.len(), dir.display());
    }

    if summary {
        print_summary(&response.statistics);
        return Ok(ExitCode::SUCCESS);
    }

    print_reply(&ApiReply::json(200, &response))
}

/// Handles `scrape --stream`: prints events as they arrive
async fn handle_stream(service: &Service, request: ScrapeRequest) -> anyhow::Result<ExitCode> {
    let mut events = service.scrape_stream(request);
    let mut failed = false;

    while let Some(event) = events.recv().await {
        failed |= matches!(event, StreamEvent::Error(_));
        print!("{}", event.to_sse()?);
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_reply(reply: &ApiReply) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(&reply.body)?);

    if reply.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!("Request failed with status {}", reply.status);
        Ok(ExitCode::FAILURE)
    }
}

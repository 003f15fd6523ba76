//! comicbot CLI - fetch and explain webcomics
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use clap::{Parser, Subcommand};
use colored::Colorize;
use comicbot::config::ImageModel;
use comicbot::http::ReqwestTransport;
use comicbot::schedule::Scheduler;
use comicbot::search::SearchEngine;
use comicbot::{ComicRecord, ComicSource, Config, Description, Scraper, SearchOutcome};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "comicbot")]
#[command(author, version, about = "Fetch and explain webcomics", long_about = None)]
struct Cli {
    /// Search engine override: google or duckduckgo
    #[arg(long, global = true)]
    engine: Option<SearchEngine>,
    /// Image LLM override: llama-4-scout or llama-4-maverick
    #[arg(long, global = true)]
    model: Option<ImageModel>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a random comic
    Random {
        #[arg(value_enum)]
        source: ComicSource,
    },
    /// Fetch the latest comic
    Latest {
        #[arg(value_enum)]
        source: ComicSource,
    },
    /// Search for a comic
    Search {
        #[arg(value_enum)]
        source: ComicSource,
        /// Search term, e.g. "sql injection"
        query: String,
    },
    /// Show the current settings
    Settings,
    /// Post a random comic per site to the configured webhooks every day
    Schedule {
        /// Post once now and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(engine) = cli.engine {
        config.set_search_engine(engine);
    }
    if let Some(model) = cli.model {
        config.set_image_model(model);
    }

    let http = Arc::new(ReqwestTransport::new()?);

    match cli.command {
        Commands::Settings => {
            let settings = config.settings();
            println!("comicbot settings:\n");
            println!("🔍 Search engine: {}", settings.search_engine);
            println!("🤖 Image LLM:     {}", settings.image_model);
            println!("\nUse --engine and --model to change these settings");
        }
        Commands::Schedule { once } => {
            let scheduler = Scheduler::new(config, http);
            if once {
                for (source, status) in scheduler.post_all().await? {
                    println!("{source}: {status:?}");
                }
            } else {
                tokio::select! {
                    result = scheduler.run() => result?,
                    _ = tokio::signal::ctrl_c() => println!("Stopping scheduler."),
                }
            }
        }
        Commands::Random { source } => turn(source, Request::Random, &config, http).await,
        Commands::Latest { source } => turn(source, Request::Latest, &config, http).await,
        Commands::Search { source, query } => {
            turn(source, Request::Search(query), &config, http).await
        }
    }

    Ok(())
}

enum Request {
    Random,
    Latest,
    Search(String),
}

/// Run one turn, exiting non-zero when no comic could be shown
async fn turn(source: ComicSource, request: Request, config: &Config, http: Arc<ReqwestTransport>) {
    // Dropping the turn on ctrl-c cancels any in-flight fetch or model call
    tokio::select! {
        shown = run_turn(source, request, config, http) => {
            if !shown {
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Cancelled.");
            std::process::exit(130);
        }
    }
}

/// One fetch-then-describe turn. Returns whether a comic was shown.
async fn run_turn(
    source: ComicSource,
    request: Request,
    config: &Config,
    http: Arc<ReqwestTransport>,
) -> bool {
    let scraper = Scraper::from_config(source, config, http);

    let record = match request {
        Request::Random => scraper.random_comic().await,
        Request::Latest => scraper.latest_comic().await,
        Request::Search(query) => match scraper.search_comic(&query).await {
            SearchOutcome::Found(record) => Some(record),
            SearchOutcome::NoResults => {
                println!("No results found for: {}", query);
                return false;
            }
            SearchOutcome::Failed => None,
        },
    };

    let Some(record) = record else {
        eprintln!("Couldn't fetch a comic from {}.", source);
        return false;
    };

    let description = scraper.describe_comic(&record).await;
    print_comic(&record, &description);
    true
}

fn print_comic(record: &ComicRecord, description: &Description) {
    println!("=== {} ===\n", record.title.bold());
    println!("🔗 {}", record.source_url);
    println!("🖼️  {}\n", record.image_url.underline());

    for (label, text) in description.iter() {
        println!("{}", format!("{}:", label).cyan());
        println!("  {}\n", text);
    }

    println!("{}", format!("Source: {}", record.source_name()).dimmed());
}

mod crawler;
mod db;
mod error;
mod history;
mod novelty;
mod parser;
mod pipeline;
mod record;
mod settings;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use db::{Dataset, KeyValueStore};
use history::HistoryWriter;
use parser::extract::Extractor;
use record::CandidateRecord;
use settings::Settings;

#[derive(Parser)]
#[command(name = "covid_ru_stats", about = "COVID-19 statistics tracker for the Russian health ministry page")]
struct Cli {
    /// SQLite database path (overrides COVID_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the page once, extract statistics and update LATEST/history
    Run {
        /// Page to fetch (default: COVID_SOURCE_URL)
        #[arg(long)]
        url: Option<String>,
    },
    /// Extract statistics from a saved HTML file without storing anything
    Extract {
        file: PathBuf,
        /// Source URL recorded in the output
        #[arg(long)]
        url: Option<String>,
    },
    /// Show the LATEST record
    Latest,
    /// Show the history log, oldest first
    History {
        /// Max rows to display (most recent)
        #[arg(
            short = 'n',
            long,
            default_value = "50",
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    let extractor = Extractor::new(settings.source_offset()?, settings.readme_url.clone());

    let result = match cli.command {
        Commands::Run { url } => {
            let url = url.unwrap_or_else(|| settings.source_url.clone());
            info!(
                %url,
                source_utc_offset_minutes = settings.source_utc_offset_minutes,
                "Processing page"
            );

            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;

            let client = crawler::build_client(Duration::from_secs(settings.page_timeout_secs))
                .context("Failed to build HTTP client")?;
            let html = match crawler::fetch_page(&client, &url, settings.max_request_retries).await {
                Ok(html) => html,
                Err(e) => {
                    crawler::handle_failed_request(&url, &e);
                    return Ok(());
                }
            };

            let report = pipeline::handle_page(
                &extractor,
                &html,
                &url,
                Utc::now(),
                &conn,
                &settings.store_names(),
            )?;
            println!("{}", serde_json::to_string_pretty(&report.record)?);
            println!(
                "\n{} ({} history entries)",
                if report.novelty.is_novel() {
                    "New bulletin recorded"
                } else {
                    "Bulletin unchanged"
                },
                report.history_len
            );
            Ok(())
        }
        Commands::Extract { file, url } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let url = url.unwrap_or_else(|| settings.source_url.clone());
            let record = parser::process_page(&extractor, &html, &url, Utc::now());
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Latest => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let latest = KeyValueStore::open(&conn, &settings.store_name);
            let history = Dataset::open(&conn, &settings.history_dataset);
            match HistoryWriter::new(&latest, &history).latest()? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("No LATEST record yet. Run 'run' first."),
            }
            Ok(())
        }
        Commands::History { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let history = Dataset::open(&conn, &settings.history_dataset);
            let total = history.len()?;
            let rows = history
                .items(Some(limit))?
                .into_iter()
                .map(CandidateRecord::from_json)
                .collect::<Result<Vec<_>, _>>()
                .context("History contains a malformed record")?;
            if total == 0 {
                println!("History is empty.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<20} | {:>10} | {:>10} | {:>10} | {:>8}",
                "#", "Source updated (UTC)", "Tested", "Infected", "Recovered", "Deaths"
            );
            println!("{}", "-".repeat(76));

            let first_index = total - rows.len();
            for (i, r) in rows.iter().enumerate() {
                let updated = r
                    .source_timestamp
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>3} | {:<20} | {:>10} | {:>10} | {:>10} | {:>8}",
                    first_index + i + 1,
                    updated,
                    dash(&r.tested_cases_total),
                    dash(&r.infected_total),
                    dash(&r.recovered_total),
                    r.deaths_total
                );
            }

            println!("\n{} of {} entries", rows.len(), total);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

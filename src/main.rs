use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod activity;
mod config;
mod db;
mod error;
mod matrix;
mod models;
mod parser;
mod reconcile;
mod refresh;
mod report;
mod store;

use config::HeatmapConfig;
use store::SnapshotStore;

#[derive(Parser)]
#[command(name = "activity-heatmap")]
#[command(about = "Per-person chat activity heatmap built from exported transcripts", long_about = None)]
struct Cli {
    /// JSON file with roster, aliases, auth_secret and preselect_last
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = StoreKind::Csv, global = true)]
    store: StoreKind,
    /// Directory holding the CSV snapshot files
    #[arg(long, default_value = ".", global = true)]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Csv,
    Postgres,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema (postgres store only)
    InitDb,
    /// List the dates found in a transcript and the default selection
    Dates {
        #[arg(long)]
        transcript: PathBuf,
    },
    /// Show how every sender in a transcript maps onto the roster
    Names {
        #[arg(long)]
        transcript: PathBuf,
    },
    /// Rebuild the heatmap from a transcript and replace the saved snapshot
    Refresh {
        #[arg(long)]
        transcript: PathBuf,
        /// Date to include, as written in the transcript (repeatable)
        #[arg(long = "date")]
        dates: Vec<String>,
        /// Excused participants, e.g. "1/2/24=Moyin,Joy" (repeatable)
        #[arg(long)]
        unavailable: Vec<String>,
        #[arg(long)]
        password: String,
        #[arg(long)]
        plain: bool,
    },
    /// Render the latest saved heatmap
    Show {
        #[arg(long)]
        plain: bool,
    },
    /// Write a markdown report of the latest saved heatmap
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn read_transcript(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read transcript {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = HeatmapConfig::load(cli.config.as_deref())?;

    match cli.store {
        StoreKind::Csv => {
            if matches!(cli.command, Commands::InitDb) {
                println!("The CSV store needs no schema.");
                return Ok(());
            }
            let store = store::CsvSnapshotStore::new(&cli.data_dir);
            run(cli.command, &config, &store).await
        }
        StoreKind::Postgres => {
            let database_url = std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set to use the postgres store")?;
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await
                .context("failed to connect to Postgres")?;

            if matches!(cli.command, Commands::InitDb) {
                db::init_db(&pool).await?;
                println!("Schema ready.");
                return Ok(());
            }
            let store = db::PgSnapshotStore::new(pool);
            run(cli.command, &config, &store).await
        }
    }
}

async fn run<S: SnapshotStore>(
    command: Commands,
    config: &HeatmapConfig,
    store: &S,
) -> anyhow::Result<()> {
    match command {
        Commands::InitDb => {}
        Commands::Dates { transcript } => {
            let text = read_transcript(&transcript)?;
            let discovery = parser::discover_dates(text.lines());
            if discovery.dates.is_empty() {
                println!("No dated messages found.");
            } else {
                let preselected = discovery.default_selection(config.preselect_last);
                println!("Dates (oldest first, * = selected by default):");
                for date in &discovery.dates {
                    let marker = if preselected.contains(&date.label) { "*" } else { " " };
                    println!("{marker} {} ({})", date.label, date.date);
                }
            }
            for token in &discovery.rejected {
                println!("Skipped unparseable date {token}.");
            }
        }
        Commands::Names { transcript } => {
            let text = read_transcript(&transcript)?;
            let resolution = refresh::resolve_senders(config, &text);
            let mut shown = 0usize;
            for (raw, resolved) in resolution.entries() {
                println!(
                    "- {raw} -> {} ({})",
                    resolution.target(raw),
                    resolved.kind()
                );
                shown += 1;
            }
            if shown == 0 {
                println!("No senders found.");
            } else {
                let unresolved = resolution.unresolved().count();
                if unresolved > 0 {
                    println!("{unresolved} of {shown} senders are not on the roster and will not appear in the heatmap.");
                }
            }
        }
        Commands::Refresh {
            transcript,
            dates,
            unavailable,
            password,
            plain,
        } => {
            let text = read_transcript(&transcript)?;
            let request = refresh::RefreshRequest {
                password,
                dates,
                unavailable,
            };
            let matrix = refresh::refresh(config, store, &text, &request).await?;
            print!("{}", report::render_grid(&matrix, "Activity Heatmap", !plain));
            println!("Heatmap updated! All users will see the latest version.");
        }
        Commands::Show { plain } => match store.load().await? {
            Some(matrix) => {
                print!(
                    "{}",
                    report::render_grid(&matrix, "Latest Activity Heatmap", !plain)
                );
                println!("{}", report::caption(&matrix));
            }
            None => println!("No heatmap saved yet."),
        },
        Commands::Report { out } => {
            let Some(matrix) = store.load().await? else {
                println!("No heatmap saved yet.");
                return Ok(());
            };
            std::fs::write(&out, report::build_report(&matrix))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

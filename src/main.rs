mod database;
mod error;
mod ingest;
mod media;
mod utils;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use anyhow::{Result, Context, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

use crate::database::pool::{init_pool, open_pool};
use crate::database::query::MatchMode;
use crate::database::repo::{ItemRepository, Items};
use crate::error::StoreError;
use crate::ingest::import::{load_manifest, progress_bar, run_import};
use crate::ingest::upload::Submission;
use crate::utils::config::{self, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about = "Marketplace item store", long_about = None)]
struct Args {
    /// SQLite database file
    #[arg(short, long, global = true)]
    db_path: Option<PathBuf>,

    /// Directory holding stored item images
    #[arg(short, long, global = true)]
    image_dir: Option<PathBuf>,

    /// How search keywords are matched
    #[arg(short, long, global = true)]
    match_mode: Option<MatchMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the schema and image directory, and save settings to .env
    Init,
    /// Add one item
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        /// Path to a .jpg photo of the item
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// List all items
    List,
    /// Show a single item
    Get { id: i64 },
    /// Find items whose name or category matches the keyword
    Search { keyword: String },
    /// Add every item from a JSON manifest
    Import {
        manifest: PathBuf,
        #[arg(short, long, default_value_t = 4)]
        workers: usize,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            println!("{}", json!({ "message": format!("error: {:#}", e) }));
            exit_code(&e)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<StoreError>() {
        Some(StoreError::Validation(_)) => ExitCode::from(2),
        Some(StoreError::NotFound(_)) => ExitCode::from(3),
        _ => ExitCode::FAILURE,
    }
}

fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = config::load_settings(Path::new(config::ENV_FILE))?;
    if let Some(db_path) = &args.db_path {
        settings.db_path = db_path.clone();
    }
    if let Some(image_dir) = &args.image_dir {
        settings.image_dir = image_dir.clone();
    }
    if let Some(match_mode) = args.match_mode {
        settings.match_mode = match_mode;
    }
    Ok(settings)
}

fn open_repository(settings: &Settings) -> Result<ItemRepository> {
    if !settings.db_path.exists() {
        bail!(
            "Database {:?} does not exist, run `market init` first",
            settings.db_path
        );
    }
    let pool = open_pool(&settings.db_path, settings.pool_size)?;
    let repo = ItemRepository::new(pool).with_match_mode(settings.match_mode);
    info!("DB: {:?} (search: {})", settings.db_path, repo.match_mode());
    Ok(repo)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let settings = resolve_settings(&args)?;

    match args.command {
        Command::Init => {
            init_pool(&settings.db_path, settings.pool_size)?;
            std::fs::create_dir_all(&settings.image_dir)
                .with_context(|| format!("Failed to create {:?}", settings.image_dir))?;
            config::save_to_env(Path::new(config::ENV_FILE), &settings)?;
            info!("Initialized {:?}", settings.db_path);
            print_json(&json!({ "message": "database initialized" }))
        }
        Command::Add { name, category, image } => {
            let repo = open_repository(&settings)?;
            let submission = Submission { name, category, image };
            let id = submission.submit(&repo, &settings.image_dir)?;
            print_json(&json!({ "message": format!("item received: {}", submission.name), "id": id }))
        }
        Command::List => {
            let repo = open_repository(&settings)?;
            print_json(&Items { items: repo.list_all()? })
        }
        Command::Get { id } => {
            let repo = open_repository(&settings)?;
            print_json(&repo.get_by_id(id)?)
        }
        Command::Search { keyword } => {
            let repo = open_repository(&settings)?;
            let items = repo.search(&keyword)?;
            if items.is_empty() {
                return print_json(&json!({ "message": "No Records Found" }));
            }
            print_json(&Items { items })
        }
        Command::Import { manifest, workers } => {
            let repo = open_repository(&settings)?;
            let submissions = load_manifest(&manifest)?;
            info!("Importing {} items from {:?}", submissions.len(), manifest);

            let bar = progress_bar(submissions.len() as u64);
            let summary = run_import(&repo, &settings.image_dir, submissions, workers, &bar);
            info!(
                "Store now holds {} items in {} categories",
                repo.count()?,
                repo.category_count()?
            );
            print_json(&json!({
                "added": summary.added,
                "failed": summary
                    .failed
                    .iter()
                    .map(|(index, reason)| json!({ "index": index, "reason": reason }))
                    .collect::<Vec<_>>(),
            }))?;
            if !summary.failed.is_empty() {
                bail!("{} manifest entries failed", summary.failed.len());
            }
            Ok(())
        }
    }
}

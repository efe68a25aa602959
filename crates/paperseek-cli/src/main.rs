use anyhow::{Context, Result};
use clap::Parser;
use paperseek_etl::Config;
use paperseek_search::{Embedder, MockEmbedder};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "paperseek", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/paperseek/paperseek.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Use the deterministic offline embedder instead of a pretrained model
    #[arg(long, global = true)]
    mock_embedder: bool,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Sample, embed, and index papers from the dataset
    ///
    /// Runs the three pipeline stages in order:
    ///
    /// - load: draws a seeded sample of rows from the dataset, keeps the
    ///   title and abstract columns, and stages them as papers
    /// - embed: embeds "abstract title" for every staged paper without a vector
    /// - index: rebuilds the Paper collection from the staged papers
    ///
    /// Re-running is cheap: already staged papers are kept (unless --fresh)
    /// and only papers without a vector are embedded.
    Ingest {
        /// Discard previously staged papers and sample again
        #[arg(long)]
        fresh: bool,

        /// Read rows from a JSON Lines file instead of the Hugging Face hub
        #[arg(long)]
        dataset_file: Option<PathBuf>,
    },
    /// Find the papers closest to a piece of text
    Query {
        /// Text to search for
        text: String,

        /// Maximum number of papers to return
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Drop hits further away than this distance
        #[arg(long)]
        max_distance: Option<f32>,

        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show staged papers and collection statistics
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Print a value by dotted key, or the whole config file
    Get {
        /// Dotted key, e.g. sampling.seed
        key: Option<String>,
    },
    /// Set a value by dotted key in the config file
    Set {
        /// Dotted key, e.g. embedding.model
        key: String,
        value: String,
    },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.db.clone() {
        Some(path) => Config::load_with_db_path(path)?,
        None => Config::load()?,
    };

    if let Err(e) = twyg::setup(config.logging.clone()) {
        eprintln!("Failed to set up logging: {e:?}");
    }

    match cli.command {
        Commands::Ingest {
            fresh,
            dataset_file,
        } => {
            ensure_db_dir(&config.database_path)?;
            let embedder = build_embedder(&config, cli.mock_embedder)?;
            commands::run_ingest(&config, embedder, dataset_file, fresh).await?;
        }
        Commands::Query {
            text,
            limit,
            max_distance,
            json,
        } => {
            let embedder = build_embedder(&config, cli.mock_embedder)?;
            let options = commands::QueryOptions {
                limit: limit.unwrap_or(config.search.limit),
                max_distance: max_distance.or(config.search.max_distance),
                json,
            };
            commands::run_query(&config, embedder, &text, &options)?;
        }
        Commands::Status => {
            commands::show_status(&config)?;
        }
        Commands::Config { command } => match command {
            ConfigCommand::Show => commands::config::show_config(&config)?,
            ConfigCommand::Get { key } => commands::config::get_config(&config, key)?,
            ConfigCommand::Set { key, value } => commands::config::set_config(&key, &value)?,
            ConfigCommand::Path => commands::config::show_path(),
            ConfigCommand::Example => commands::config::show_example(),
            ConfigCommand::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}

fn ensure_db_dir(db_path: &std::path::Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
    }
    Ok(())
}

fn build_embedder(config: &Config, mock: bool) -> Result<Box<dyn Embedder>> {
    if mock {
        log::info!("Using the mock embedder");
        return Ok(Box::new(MockEmbedder::new()));
    }
    pretrained_embedder(config)
}

#[cfg(feature = "fastembed")]
fn pretrained_embedder(config: &Config) -> Result<Box<dyn Embedder>> {
    let embedder = paperseek_search::FastEmbedder::new(
        &config.embedding.model,
        config.embedding.cache_dir.clone(),
    )
    .with_context(|| format!("Failed to load embedding model {}", config.embedding.model))?
    .with_batch_size(config.embedding.batch_size);
    Ok(Box::new(embedder))
}

#[cfg(not(feature = "fastembed"))]
fn pretrained_embedder(config: &Config) -> Result<Box<dyn Embedder>> {
    anyhow::bail!(
        "Built without the fastembed feature; cannot load {}. Pass --mock-embedder instead.",
        config.embedding.model
    )
}

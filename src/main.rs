use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod graph;
mod graph_store;
use graph_store::{GraphStore, SqliteGraphStore};

mod ingestion;
use ingestion::{read_records_jsonl, IngestManager, ResolverConfig};

mod sqlite_persistence;

mod track_parse;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite graph database file.
    #[clap(value_parser = parse_path)]
    pub graph_db: PathBuf,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a JSONL file of raw playlist records.
    Ingest {
        /// Input file, one JSON record per line.
        #[clap(value_parser = parse_path)]
        input: PathBuf,

        /// Sources ordered from most to least trusted; display spellings are
        /// overwritten only by a strictly more trusted source.
        #[clap(long, value_delimiter = ',')]
        source_priority: Vec<String>,

        /// Keep accented characters distinct in normalized keys.
        #[clap(long)]
        keep_diacritics: bool,
    },

    /// Recompute the whole adjacency edge set from stored playlists.
    RebuildEdges,

    /// Print row counts across all tiers as JSON.
    Stats,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    info!("Opening SQLite graph database at {:?}...", cli_args.graph_db);
    let store = Arc::new(SqliteGraphStore::open(&cli_args.graph_db)?);

    match cli_args.command {
        Command::Ingest {
            input,
            source_priority,
            keep_diacritics,
        } => {
            let records = read_records_jsonl(&input)?;
            info!("Read {} records from {:?}", records.len(), input);

            let manager = IngestManager::new(
                store,
                ResolverConfig {
                    strip_diacritics: !keep_diacritics,
                    source_priority,
                },
            );
            let report = manager.ingest_batch(&records)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::RebuildEdges => {
            let edges = store.rebuild_edges()?;
            info!("Rebuilt {} adjacency edges", edges);
        }
        Command::Stats => {
            let stats = store.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facematch_core::backend::JsonFileBackend;
use facematch_core::{
    BackendKind, DuplicatePolicy, EncodingStore, EuclideanMatcher, FaceEncoding, MatchResult,
    StoreBackend, StoreConfig, DEFAULT_DISTANCE_SCALE, DEFAULT_ENCODING_DIM, DEFAULT_THRESHOLD,
};

#[derive(Parser)]
#[command(name = "facematch", about = "facematch face store administration")]
struct Cli {
    /// Storage backend: sqlite or json
    #[arg(long, env = "FACEMATCH_BACKEND", default_value = "sqlite")]
    backend: BackendKind,

    /// Store path (defaults under $XDG_DATA_HOME/facematch)
    #[arg(long, env = "FACEMATCH_DB_PATH")]
    db: Option<PathBuf>,

    /// Required encoding dimensionality
    #[arg(long, env = "FACEMATCH_ENCODING_DIM", default_value_t = DEFAULT_ENCODING_DIM)]
    dim: usize,

    /// What to do when registering an existing name: overwrite or reject
    #[arg(long, env = "FACEMATCH_DUPLICATE_POLICY", default_value = "overwrite")]
    duplicate_policy: DuplicatePolicy,

    /// Seconds to wait on each storage operation
    #[arg(long, env = "FACEMATCH_STORAGE_TIMEOUT_SECS", default_value_t = 5)]
    storage_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered faces
    List {
        /// Also show registration time and dimensionality
        #[arg(short, long)]
        verbose: bool,
    },
    /// Register a face from a precomputed encoding
    Register {
        /// Name to register under
        name: String,
        /// JSON file containing an array of numbers
        #[arg(short, long)]
        encoding: PathBuf,
    },
    /// Match a precomputed encoding against the store
    Recognize {
        /// JSON file containing an array of numbers
        #[arg(short, long)]
        encoding: PathBuf,
        /// Maximum distance (exclusive) for a match
        #[arg(long, env = "FACEMATCH_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
        threshold: f32,
        /// Distance at which confidence reaches zero
        #[arg(long, env = "FACEMATCH_DISTANCE_SCALE", default_value_t = DEFAULT_DISTANCE_SCALE)]
        distance_scale: f32,
    },
    /// Delete a registered face
    Delete {
        /// Name to delete
        name: String,
    },
    /// Write every record to a JSON document
    Export {
        path: PathBuf,
    },
    /// Merge records from an export or a legacy faces_data.json
    Import {
        path: PathBuf,
    },
    /// Show store information
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = open_store(&cli).await?;

    match cli.command {
        Commands::List { verbose } => {
            let records = store.all_records();
            if records.is_empty() {
                println!("No faces registered");
            }
            for record in records.iter() {
                if verbose {
                    println!(
                        "{}\t{}\t{} dims",
                        record.name,
                        record.registered_at.to_rfc3339(),
                        record.encoding.len()
                    );
                } else {
                    println!("{}", record.name);
                }
            }
        }
        Commands::Register { name, encoding } => {
            let encoding = read_encoding_file(&encoding)?;
            let outcome = store.register(&name, encoding).await?;
            println!("Registered {} ({outcome:?})", name.trim());
        }
        Commands::Recognize {
            encoding,
            threshold,
            distance_scale,
        } => {
            let probe = read_encoding_file(&encoding)?;
            let matcher = EuclideanMatcher::new(distance_scale)?;
            match store.recognize(&matcher, &probe, threshold)? {
                MatchResult::Match {
                    name,
                    distance,
                    confidence,
                } => println!(
                    "Recognized {name} (confidence {:.1}%, distance {distance:.4})",
                    confidence * 100.0
                ),
                MatchResult::NoMatch => println!("Not recognized"),
            }
        }
        Commands::Delete { name } => {
            store.delete(&name).await?;
            println!("Deleted {}", name.trim());
        }
        Commands::Export { path } => {
            let records = store.all_records();
            JsonFileBackend::new(&path)
                .persist(&records)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Exported {} faces to {}", records.len(), path.display());
        }
        Commands::Import { path } => {
            let records = JsonFileBackend::new(&path)
                .load()
                .with_context(|| format!("reading {}", path.display()))?;
            let count = store.import(records).await?;
            println!("Imported {count} faces from {}", path.display());
        }
        Commands::Status => {
            println!("backend:   {}", store.backend_description());
            println!("faces:     {}", store.len());
            println!("dimension: {}", store.dimension());
        }
    }

    Ok(())
}

async fn open_store(cli: &Cli) -> Result<EncodingStore> {
    let path = cli
        .db
        .clone()
        .unwrap_or_else(|| facematch_core::default_store_path(cli.backend));
    let backend = facematch_core::open_backend(cli.backend, &path)
        .with_context(|| format!("opening store at {}", path.display()))?;
    let config = StoreConfig {
        dimension: cli.dim,
        duplicate_policy: cli.duplicate_policy,
        io_timeout: Duration::from_secs(cli.storage_timeout.max(1)),
    };
    Ok(EncodingStore::open(backend, config).await?)
}

/// Read a JSON array of numbers.
fn read_encoding_file(path: &Path) -> Result<FaceEncoding> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let values: Vec<f32> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of numbers", path.display()))?;
    Ok(FaceEncoding::new(values))
}

//! ShelfDB demo
//!
//! Loads a storage root and runs one command against it.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use shelfdb::config::load_schemas;
use shelfdb::{Config, Result, ShelfError, Storage};
use tracing_subscriber::{fmt, EnvFilter};

/// ShelfDB demo
#[derive(Parser, Debug)]
#[command(name = "shelfdb-demo")]
#[command(about = "Inspect and edit a ShelfDB storage directory")]
#[command(version)]
struct Args {
    /// Parent data directory
    #[arg(short, long, default_value = "./.dbs")]
    data_dir: PathBuf,

    /// Database name (subdirectory of the data directory)
    #[arg(short, long, default_value = "test")]
    name: String,

    /// JSON file mapping store names to schema descriptors
    #[arg(short, long)]
    schemas: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List store names
    Stores,

    /// Print every record of a store
    List {
        /// The store to read
        store: String,
    },

    /// Print one record by id
    Get {
        /// The store to read
        store: String,

        /// The record id
        id: String,
    },

    /// Create a record from a JSON object and print its id
    Create {
        /// The store to write
        store: String,

        /// Record data, e.g. '{"name":{"first":"Piet"}}'
        data: String,
    },

    /// Replace a record by id
    Set {
        /// The store to write
        store: String,

        /// The record id
        id: String,

        /// Replacement data
        data: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shelfdb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("ShelfDB v{}", shelfdb::VERSION);

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut builder = Config::builder().data_dir(&args.data_dir).name(&args.name);
    if let Some(path) = &args.schemas {
        builder = builder.schemas(load_schemas(path)?);
    }

    let storage = Storage::new(builder.build());
    let report = storage.load()?;
    for (store, error) in &report.failed {
        tracing::warn!("Store {} unavailable: {}", store, error);
    }

    match args.command {
        Commands::Stores => {
            for name in storage.store_names() {
                println!("{}", name);
            }
        }
        Commands::List { store } => {
            for record in storage.store(&store).get_all() {
                print_json(&record.into_value())?;
            }
        }
        Commands::Get { store, id } => match storage.store(&store).get(&id) {
            Some(record) => print_json(&record.into_value())?,
            None => {
                return Err(ShelfError::not_found(store, id));
            }
        },
        Commands::Create { store, data } => {
            let id = storage.store(&store).create(parse_json(&data)?)?;
            println!("{}", id);
        }
        Commands::Set { store, id, data } => {
            storage.store(&store).set(&id, parse_json(&data)?)?;
            println!("{}", id);
        }
    }

    Ok(())
}

fn parse_json(data: &str) -> Result<Value> {
    serde_json::from_str(data).map_err(|e| ShelfError::InvalidRecord(e.to_string()))
}

fn print_json(value: &Value) -> Result<()> {
    let line = serde_json::to_string(value).map_err(|e| ShelfError::Serialization(e.to_string()))?;
    println!("{}", line);
    Ok(())
}

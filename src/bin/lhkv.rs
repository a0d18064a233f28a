//! lhkv CLI
//!
//! Command-line access to a single table folder.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lhkv::{CompressorId, Config, LhkvError, Table};
use tracing_subscriber::{fmt, EnvFilter};

/// lhkv CLI
#[derive(Parser, Debug)]
#[command(name = "lhkv")]
#[command(about = "Linear-hashing key-value table")]
#[command(version)]
struct Args {
    /// Table folder
    #[arg(short, long, default_value = "./lhkv_data")]
    dir: String,

    /// Bucket capacity for a new table
    #[arg(short, long, default_value = "256")]
    capacity: u32,

    /// Compressor for a new table (none, snappy)
    #[arg(long, default_value = "none")]
    compressor: CompressorId,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a value under a new key
    Put {
        /// The key to store
        key: String,

        /// The value to store
        value: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Check whether a key exists
    Exists {
        /// The key to check
        key: String,
    },

    /// Print table statistics
    Stats,

    /// Check every bucket against the table invariants
    Verify,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lhkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(LhkvError::NotFound) => {
            eprintln!("(not found)");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> lhkv::Result<()> {
    let config = Config::builder()
        .data_dir(&args.dir)
        .bucket_capacity(args.capacity)
        .compressor(args.compressor)
        .build();

    let mut table = Table::open(config)?;

    match args.command {
        Commands::Put { key, value } => {
            table.put(&key, &value)?;
            println!("OK");
        }
        Commands::Get { key } => {
            let value: String = table.get(&key)?;
            println!("{}", value);
        }
        Commands::Del { key } => {
            let removed = table.delete(&key)?;
            println!("{}", if removed { "1" } else { "0" });
        }
        Commands::Exists { key } => {
            println!("{}", table.exists(&key)?);
        }
        Commands::Stats => {
            print_stats(&table.stats()?, &table);
        }
        Commands::Verify => {
            let stats = table.verify()?;
            print_stats(&stats, &table);
            println!("OK");
        }
    }

    table.close()
}

fn print_stats(stats: &lhkv::TableStats, table: &Table) {
    println!("folder:           {}", table.folder().display());
    println!("bucket_capacity:  {}", table.capacity());
    println!("compressor:       {}", table.compressor());
    println!("count:            {}", stats.count);
    println!("buckets:          {}", stats.buckets);
    println!("occupied_buckets: {}", stats.occupied_buckets);
    println!("records:          {}", stats.records);
    println!("tombstones:       {}", stats.tombstones);
    println!("archive_bytes:    {}", stats.archive_bytes);
}

//! hashchain CLI
//!
//! Append to, read from and verify a hash chain log file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hashchain::chain::PaddedStrCodec;
use hashchain::{ChainConfig, ChainError, HashChain, Position, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// hashchain CLI
#[derive(Parser, Debug)]
#[command(name = "hashchain")]
#[command(about = "Append-only log with hash chain integrity validation")]
#[command(version)]
struct Args {
    /// Fixed message size in bytes (must match the size the log was created with)
    #[arg(short, long, default_value = "64")]
    message_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append a message, stamped with the current time
    Append {
        /// Log file
        path: PathBuf,

        /// The message to append
        message: String,
    },

    /// Read a single record (the last one if no id is given)
    Read {
        /// Log file
        path: PathBuf,

        /// Record id
        id: Option<u64>,
    },

    /// List records, newest first
    List {
        /// Log file
        path: PathBuf,

        /// Start from this id instead of the last record
        #[arg(short, long)]
        from: Option<u64>,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Validate every record in the log
    Verify {
        /// Log file
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hashchain=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> hashchain::Result<()> {
    let config = ChainConfig::builder()
        .message_size(args.message_size)
        .sync_strategy(SyncStrategy::EveryWrite)
        .build()?;
    let codec = PaddedStrCodec::new(config.message_size);

    match args.command {
        Commands::Append { path, message } => {
            let chain = HashChain::open(&path, codec, &config)?;
            let (id, hash) = chain.write_now(&message)?;
            println!("{} {}", id, hex::encode(&hash));
        }

        Commands::Read { path, id } => {
            let chain = HashChain::open(&path, codec, &config)?;
            let position = id.map_or(Position::Last, Position::Id);
            let record = chain.read(position)?;
            println!(
                "{} {} {} {}",
                record.id,
                record.timestamp,
                hex::encode(&record.hash),
                record.message
            );
        }

        Commands::List { path, from, limit } => {
            let chain = HashChain::open(&path, codec, &config)?;
            let start = from.map_or(Position::Last, Position::Id);
            let limit = limit.unwrap_or(usize::MAX);
            if limit == 0 {
                return Ok(());
            }
            let mut shown = 0usize;
            chain.iterate(start, |record| {
                println!(
                    "{} {} {} {}",
                    record.id,
                    record.timestamp,
                    hex::encode(record.hash),
                    record.message
                );
                shown += 1;
                Ok::<_, ChainError>(shown < limit)
            })?;
        }

        Commands::Verify { path } => {
            let chain = HashChain::open(&path, codec, &config)?;
            let checked = chain.verify()?;
            tracing::info!("verified {} records in {}", checked, path.display());
            println!("ok {}", checked);
        }
    }

    Ok(())
}

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use relay_ledger::application::ledger::AggregationLedger;
use relay_ledger::config::LedgerConfig;
use relay_ledger::domain::key::AccountId;
use relay_ledger::domain::ports::LedgerStoreBox;
use relay_ledger::infrastructure::in_memory::{InMemoryAssetLedger, InMemoryLedgerStore, RecordingBridge};
use relay_ledger::interfaces::csv::balance_writer::BalanceWriter;
use relay_ledger::interfaces::csv::operation_reader::OperationReader;
use relay_ledger::interfaces::replay::JournalReplayer;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Operations journal CSV file
    input: PathBuf,

    /// Ledger configuration JSON file (optional). Defaults apply otherwise.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Identity receiving every role on a fresh ledger (hex ed25519 key).
    #[arg(long)]
    deployer: Option<AccountId>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = relay_ledger::infrastructure::rocksdb::RocksDBStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Box::new(InMemoryLedgerStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => LedgerConfig::from_json_file(path).into_diagnostic()?,
        None => LedgerConfig::default(),
    };
    let decimals = config.ledger_decimals;
    let deployer = cli.deployer.unwrap_or(AccountId([0xad; 32]));

    let assets = InMemoryAssetLedger::new();
    let ledger = AggregationLedger::new(
        config,
        open_store(cli.db_path)?,
        Box::new(assets.clone()),
        Box::new(RecordingBridge::new()),
        deployer,
    )
    .await
    .into_diagnostic()?;

    // Replay operations
    let file = File::open(cli.input).into_diagnostic()?;
    let replayer = JournalReplayer::new(&ledger, assets);
    for (line, op) in OperationReader::new(file).operations().enumerate() {
        match op {
            Ok(op) => {
                if let Err(e) = replayer.apply(op).await {
                    eprintln!("Operation {} rejected: {}", line + 1, e);
                }
            }
            Err(e) => {
                eprintln!("Error reading operation {}: {}", line + 1, e);
            }
        }
    }

    let balances = ledger.balances().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock(), decimals);
    writer.write_balances(&balances).into_diagnostic()?;

    Ok(())
}

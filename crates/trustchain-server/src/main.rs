//! trustchain - signer and chain services.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use trustchain::{Ledger, LedgerConfig, SignerConfig};
use trustchain_server::{chain, serve, signer};

#[derive(Parser, Debug)]
#[command(name = "trustchain")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log filter (e.g. `info`, `trustchain=debug`)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the signer service
    Signer(SignerArgs),
    /// Run the chain service
    Chain(ChainArgs),
    /// Run both services in one process
    Serve {
        #[command(flatten)]
        signer: SignerArgs,
        #[command(flatten)]
        chain: ChainArgs,
    },
}

#[derive(Args, Debug)]
struct SignerArgs {
    /// Key-state file
    #[arg(long, env = "TRUSTCHAIN_KEY_FILE", default_value = "keys/keystate.json")]
    key_file: PathBuf,

    /// Signer listen address
    #[arg(long, env = "TRUSTCHAIN_SIGNER_ADDR", default_value = "127.0.0.1:7001")]
    signer_addr: SocketAddr,
}

#[derive(Args, Debug)]
struct ChainArgs {
    /// Ledger data directory
    #[arg(long, env = "TRUSTCHAIN_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Chain listen address
    #[arg(long, env = "TRUSTCHAIN_CHAIN_ADDR", default_value = "127.0.0.1:7002")]
    chain_addr: SocketAddr,

    /// Skip fsync after writes (faster, not crash-safe)
    #[arg(long)]
    no_fsync: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Command::Signer(args) => run_signer(args).await,
        Command::Chain(args) => run_chain(args).await,
        Command::Serve { signer, chain } => {
            tokio::try_join!(run_signer(signer), run_chain(chain))?;
            Ok(())
        }
    }
}

async fn run_signer(args: SignerArgs) -> Result<()> {
    let config = SignerConfig {
        key_file: args.key_file,
    };
    let custodian = config
        .open()
        .with_context(|| format!("failed to open key state {}", config.key_file.display()))?;
    info!(active = %custodian.active_key_id(), "signer ready");

    let listener = TcpListener::bind(args.signer_addr)
        .await
        .with_context(|| format!("failed to bind {}", args.signer_addr))?;
    serve(listener, signer::router(Arc::new(custodian))).await?;
    Ok(())
}

async fn run_chain(args: ChainArgs) -> Result<()> {
    let config = LedgerConfig {
        data_dir: args.data_dir,
        fsync: !args.no_fsync,
        ..LedgerConfig::default()
    };
    let ledger = Ledger::open(&config)
        .await
        .with_context(|| format!("failed to open ledger at {}", config.data_dir.display()))?;

    let report = ledger.verify();
    info!(length = report.length, ok = report.ok, "chain ready");

    let listener = TcpListener::bind(args.chain_addr)
        .await
        .with_context(|| format!("failed to bind {}", args.chain_addr))?;
    serve(listener, chain::router(ledger)).await?;
    Ok(())
}

//! Encrypted rarity demo
//!
//! Mints one NFT whose rarity is encrypted by the development FHE service,
//! reveals it through the coordinator while a second account observes, then
//! shows that a repeated reveal converges on the stored value.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug rarity-demo --name Dragon --rarity 87
//!
//! # A single co-signer is below the threshold: the registry rejects the mint
//! rarity-demo --signers 1
//! ```

use anyhow::Context;
use clap::Parser;
use rarity_reveal_coordinator::{
    descriptor,
    dev::{dev_account, DevFheService, DevLedger, DEV_SIGNERS, DEV_THRESHOLD},
    CoordinatorConfig, RevealCoordinator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rarity-demo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mint and reveal an NFT with an encrypted rarity", long_about = None)]
struct Cli {
    /// Coordinator configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Asset identifier
    #[arg(long, default_value = "a1")]
    id: String,

    /// Descriptor stored next to the ciphertext
    #[arg(long, default_value = "Dragon")]
    name: String,

    /// Rarity to encrypt (non-zero)
    #[arg(long, default_value_t = 87)]
    rarity: u64,

    /// Development signers co-signing each attestation
    #[arg(long, default_value_t = DEV_SIGNERS)]
    signers: u8,

    /// Owning account name
    #[arg(long, default_value = "alice")]
    owner: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CoordinatorConfig::from_json_file(path)?,
        None => CoordinatorConfig::default(),
    };
    if u32::from(cli.signers) < DEV_THRESHOLD {
        warn!(signers = cli.signers, threshold = DEV_THRESHOLD, "attestations will fall short");
    }

    let ledger = Arc::new(DevLedger::<String>::new());
    let fhe = Arc::new(DevFheService::with_signers(cli.signers.min(DEV_SIGNERS)));
    let owner = RevealCoordinator::new(
        ledger.clone(),
        fhe.clone(),
        dev_account(&cli.owner),
        config.clone(),
    )?;
    let observer =
        RevealCoordinator::new(ledger.clone(), fhe.clone(), dev_account("observer"), config)?;

    let handle = owner
        .mint(&*fhe, cli.id.clone(), descriptor(&cli.name)?, cli.rarity)
        .await
        .context("mint")?;
    let record = ledger.get(&cli.id)?;
    println!("minted   {} \"{}\" owner={}", cli.id, cli.name, record.owner);
    println!("         ciphertext=0x{} state={:?}", hex::encode(handle), record.state);

    let (observed, outcome) =
        tokio::join!(observer.observe_reveal(&cli.id), owner.request_reveal(&cli.id));
    let outcome = outcome.context("reveal")?;
    println!("revealed {} -> {:?}", cli.id, outcome);
    println!("observer saw {}", observed.context("observe")?);

    let again = owner.request_reveal(&cli.id).await.context("repeat reveal")?;
    println!("repeat   {} -> {:?}", cli.id, again);

    let record = ledger.get(&cli.id)?;
    println!(
        "record   state={:?} value={:?} revealed_at={:?}",
        record.state, record.revealed_value, record.reveal_timestamp
    );
    println!("registry {:?}", ledger.list_ids());
    Ok(())
}

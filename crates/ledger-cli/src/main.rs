use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::{constants::TARGET_BITS, Block, Blockchain, ChainConfig};
use ledger_storage::SledStore;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "powchain")]
#[command(about = "Single-node proof-of-work ledger")]
struct Cli {
    /// Directory holding the sled database
    #[arg(long, env = "POWCHAIN_DATA_DIR", default_value = "./blockchain_db", global = true)]
    data_dir: PathBuf,

    /// Proof-of-work difficulty for newly mined blocks
    #[arg(long, default_value_t = TARGET_BITS, global = true)]
    difficulty: u32,

    /// Mine on all cores
    #[arg(long, global = true)]
    parallel: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a blockchain and send the genesis reward to ADDRESS
    #[command(name = "createblockchain")]
    CreateBlockchain {
        #[arg(long)]
        address: String,
    },
    /// Mine an empty block on top of the chain
    #[command(name = "addblock")]
    AddBlock {
        /// Miner address, recorded in the log only
        #[arg(long)]
        address: Option<String>,
    },
    /// Transfer AMOUNT from one address to another
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
    },
    /// Print every block from tip to genesis
    #[command(name = "printchain")]
    PrintChain {
        /// Emit one JSON object per block
        #[arg(long)]
        json: bool,
    },
    /// Print the balance of ADDRESS
    #[command(name = "getbalance")]
    GetBalance {
        #[arg(long)]
        address: String,
    },
    /// Re-check proof of work and links of every stored block
    #[command(name = "verifychain")]
    VerifyChain,
}

#[derive(Serialize)]
struct BlockRow {
    height: u64,
    timestamp: u64,
    nonce: u64,
    target_bits: u32,
    hash: String,
    prev_hash: String,
    transactions_digest: String,
    tx_count: usize,
    pow_valid: bool,
}

impl BlockRow {
    fn new(block: &Block, pow_valid: bool) -> Self {
        Self {
            height: block.height,
            timestamp: block.timestamp,
            nonce: block.nonce,
            target_bits: block.target_bits,
            hash: hex::encode(block.hash),
            prev_hash: block.prev_block_hash.map(hex::encode).unwrap_or_default(),
            transactions_digest: hex::encode(block.transactions_digest()),
            tx_count: block.transactions.len(),
            pow_valid,
        }
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ChainConfig {
        target_bits: cli.difficulty,
        parallel_mining: cli.parallel,
    };
    let store = Arc::new(
        SledStore::open(&cli.data_dir)
            .with_context(|| format!("opening store at {}", cli.data_dir.display()))?,
    );

    match cli.cmd {
        Command::CreateBlockchain { address } => {
            let chain = Blockchain::open(store, &address, config)
                .context("creating blockchain")?;
            println!("Done! tip {}", hex::encode(chain.tip()));
            chain.close()?;
        }
        Command::AddBlock { address } => {
            let mut chain = Blockchain::load(store, config)?;
            if let Some(miner) = &address {
                info!(%miner, "mining block on behalf of miner");
            }
            let block = chain.append(vec![]).context("appending block")?;
            println!("Success! block {} {}", block.height, hex::encode(block.hash));
            chain.close()?;
        }
        Command::Send { from, to, amount } => {
            let mut chain = Blockchain::load(store, config)?;
            let block = chain
                .send(&from, &to, amount)
                .with_context(|| format!("sending {amount} from '{from}' to '{to}'"))?;
            println!("Success! sent {amount} in block {}", block.height);
            chain.close()?;
        }
        Command::PrintChain { json } => {
            let chain = Blockchain::load(store, config)?;
            for block in chain.iterator()? {
                let block = block.context("reading block")?;
                let row = BlockRow::new(&block, block.verify_pow()?);
                if json {
                    println!("{}", serde_json::to_string(&row)?);
                } else {
                    println!("Height: {}", row.height);
                    println!("Prev. hash: {}", row.prev_hash);
                    println!("Data: {}", row.transactions_digest);
                    println!("Hash: {}", row.hash);
                    println!("Nonce: {}", row.nonce);
                    println!("PoW: {}", row.pow_valid);
                    println!();
                }
            }
        }
        Command::GetBalance { address } => {
            let chain = Blockchain::load(store, config)?;
            let balance = chain.balance(&address).context("scanning for unspent outputs")?;
            println!("Balance of '{address}': {balance}");
        }
        Command::VerifyChain => {
            let chain = Blockchain::load(store, config)?;
            let checked = chain.verify()?;
            println!("Chain valid: {checked} blocks checked");
        }
    }
    Ok(())
}

mod logging;

use std::env;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::{eyre, WrapErr};
use log::info;
use toolkit_core::ops::{self, token::DEFAULT_DECIMALS, MintParams, DEFAULT_AIRDROP_AMOUNT};
use toolkit_core::{
    BalanceRefresher, LocalWallet, OperationSlot, OperationState, RpcGateway, Session,
    ToolkitConfig, ToolkitError,
};

#[derive(Parser)]
#[command(
    name = "devnet-toolkit",
    version,
    about = "Solana devnet toolkit: airdrops, transfers, token creation and message signing"
)]
struct Cli {
    /// Solana CLI keypair file [default: ~/.config/solana/id.json]
    #[arg(long, short = 'k', global = true, env = "KEYPAIR_PATH")]
    keypair: Option<PathBuf>,

    /// JSON-RPC endpoint, overrides SOLANA_RPC_URL
    #[arg(long, short = 'u', global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the wallet address
    Address,

    /// Show the wallet balance
    Balance {
        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Request devnet SOL from the faucet
    Airdrop {
        /// Amount in SOL (presets: 0.1, 0.5, 1, 5)
        #[arg(default_value = DEFAULT_AIRDROP_AMOUNT)]
        amount: String,
    },

    /// Send SOL to another address
    Send { to: String, amount: String },

    /// Sign a message with the wallet key
    Sign { message: String },

    /// Create a Token-2022 mint with metadata and mint the initial supply
    CreateToken {
        #[arg(long)]
        name: String,

        #[arg(long)]
        symbol: String,

        #[arg(long, default_value_t = DEFAULT_DECIMALS)]
        decimals: u8,

        /// Initial supply in whole tokens
        #[arg(long)]
        supply: u64,

        /// Metadata URI (defaults to DEFAULT_TOKEN_URI)
        #[arg(long)]
        uri: Option<String>,
    },
}

fn default_keypair_path() -> eyre::Result<PathBuf> {
    let home = env::var("HOME").wrap_err("HOME is not set; pass --keypair")?;
    Ok(PathBuf::from(home).join(".config/solana/id.json"))
}

/// Drive one workflow through an [`OperationSlot`] and turn a failure into a
/// report carrying its reason code.
async fn drive<T, F>(label: &str, operation: F) -> eyre::Result<T>
where
    T: Clone + Send + Sync + 'static,
    F: Future<Output = Result<T, ToolkitError>>,
{
    let slot = OperationSlot::new();
    info!("{label}...");
    let outcome = slot.run(operation).await;

    match slot.state() {
        OperationState::Failed { code, message } => Err(eyre!("{message} [{}]", code.as_str())),
        _ => outcome.map_err(|e| eyre!("{e}")),
    }
}

async fn run(command: Command, session: &Session, wallet: &LocalWallet) -> eyre::Result<()> {
    match command {
        Command::Address => {
            println!("{}", wallet.address());
        }
        Command::Balance { watch: false } => {
            let balance = drive("Fetching balance", ops::fetch_balance(session)).await?;
            println!("{balance}");
        }
        Command::Balance { watch: true } => {
            let refresher = BalanceRefresher::spawn(session);
            let mut updates = refresher.subscribe();
            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if let Some(lamports) = *updates.borrow_and_update() {
                            println!("{} SOL", sol_tx::format_sol(lamports, 4));
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            refresher.stop();
        }
        Command::Airdrop { amount } => {
            let receipt = drive("Requesting airdrop", ops::request_airdrop(session, &amount)).await?;
            println!("{receipt}");
            println!("Signature: {}", receipt.signature);
        }
        Command::Send { to, amount } => {
            let receipt = drive("Sending SOL", ops::send_sol(session, &to, &amount)).await?;
            println!("{receipt}");
            println!("Signature: {}", receipt.signature);
        }
        Command::Sign { message } => {
            let signed = drive("Signing message", ops::sign_message(session, &message)).await?;
            println!("Message signed successfully!");
            println!("Signer:    {}", signed.signer);
            println!("Signature: {}", signed.signature);
        }
        Command::CreateToken {
            name,
            symbol,
            decimals,
            supply,
            uri,
        } => {
            let params = MintParams {
                name,
                symbol,
                decimals,
                supply,
                uri,
            };
            let receipt = drive("Creating token", ops::create_token(session, params)).await?;
            println!("{receipt}");
            println!("Token account: {}", receipt.associated_account);
            println!("Mint tx:       {}", receipt.mint_signature);
            println!("Mint-to tx:    {}", receipt.distribution_signature);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    logging::setup_logging()?;

    let cli = Cli::parse();

    let mut config = ToolkitConfig::from_env()?;
    if let Some(url) = cli.url {
        config.rpc_url = url;
    }

    let keypair_path = match cli.keypair {
        Some(path) => path,
        None => default_keypair_path()?,
    };
    let wallet = Arc::new(
        LocalWallet::from_keypair_file(&keypair_path)
            .wrap_err_with(|| format!("Failed to load keypair {}", keypair_path.display()))?,
    );
    let gateway = Arc::new(RpcGateway::new(&config)?);
    info!("Using {} as {}", gateway.url(), wallet.address());

    let session = Session::new(gateway, wallet.clone(), config);
    run(cli.command, &session, &wallet).await
}

use std::fmt;

use log::{info, warn};
use sol_tx::{lamports_to_sol_string, Address, Signature};

use super::parse_sol_amount;
use crate::error::ToolkitError;
use crate::session::Session;

/// Quick-pick amounts offered by front-ends, in SOL.
pub const AIRDROP_PRESETS: [&str; 4] = ["0.1", "0.5", "1", "5"];
pub const DEFAULT_AIRDROP_AMOUNT: &str = "0.1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirdropReceipt {
    pub recipient: Address,
    pub lamports: u64,
    pub signature: Signature,
}

impl fmt::Display for AirdropReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} SOL successfully airdropped to your wallet!",
            lamports_to_sol_string(self.lamports)
        )
    }
}

/// Ask the faucet to credit the connected wallet with `amount` SOL.
pub async fn request_airdrop(session: &Session, amount: &str) -> Result<AirdropReceipt, ToolkitError> {
    let recipient = session.owner()?;
    let lamports = parse_sol_amount(amount)?;

    let signature = session
        .gateway()
        .request_airdrop(&recipient, lamports)
        .await
        .map_err(|e| {
            warn!("Airdrop of {lamports} lamports to {recipient} failed: {e}");
            if e.is_rate_limited() {
                ToolkitError::RateLimited {
                    fallback: session.config().faucet_fallback_url.clone(),
                }
            } else {
                ToolkitError::Transport(format!("Airdrop failed: {e}"))
            }
        })?;

    info!("Airdropped {lamports} lamports to {recipient}: {signature}");
    Ok(AirdropReceipt {
        recipient,
        lamports,
        signature,
    })
}

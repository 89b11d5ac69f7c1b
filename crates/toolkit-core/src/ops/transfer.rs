use std::fmt;

use log::{debug, info};
use sol_tx::{lamports_to_sol_string, system, Address, Signature, Transaction};

use super::{abbreviate, parse_sol_amount};
use crate::error::{ToolkitError, ValidationError};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub destination: Address,
    pub lamports: u64,
    pub signature: Signature,
}

impl fmt::Display for TransferReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successfully sent {} SOL to {}",
            lamports_to_sol_string(self.lamports),
            abbreviate(&self.destination.to_string())
        )
    }
}

fn parse_destination(input: &str) -> Result<Address, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::EmptyAddress);
    }
    input
        .parse()
        .map_err(|_| ValidationError::InvalidAddress(input.to_string()))
}

/// Move `amount` SOL from the connected wallet to `destination`.
///
/// Checks, in order: wallet connected, destination is a valid address,
/// amount is positive, balance covers the amount. Nothing is submitted when
/// any of them fails. Returns once the transfer is accepted by the gateway.
pub async fn send_sol(
    session: &Session,
    destination: &str,
    amount: &str,
) -> Result<TransferReceipt, ToolkitError> {
    let owner = session.owner()?;
    let destination = parse_destination(destination)?;
    let lamports = parse_sol_amount(amount)?;

    let gateway = session.gateway();
    let available = gateway.get_balance(&owner).await?;
    if available < lamports {
        return Err(ToolkitError::InsufficientFunds {
            available,
            required: lamports,
        });
    }

    let mut transaction = Transaction::new(vec![system::transfer(&owner, &destination, lamports)]);
    let blockhash = gateway.get_latest_blockhash().await?;
    transaction.bind(owner, blockhash);
    debug!("Transfer {lamports} lamports {owner} -> {destination} @ {blockhash}");

    let signature = session.wallet().sign_and_submit(transaction, gateway).await?;
    info!("Sent {lamports} lamports to {destination}: {signature}");

    Ok(TransferReceipt {
        destination,
        lamports,
        signature,
    })
}

//! The toolkit's workflows. Each one takes a [`Session`](crate::Session),
//! rejects bad input before any network call, and returns a receipt the
//! front-end can report.

pub mod airdrop;
pub mod balance;
pub mod sign;
pub mod token;
pub mod transfer;

pub use airdrop::{request_airdrop, AirdropReceipt, AIRDROP_PRESETS, DEFAULT_AIRDROP_AMOUNT};
pub use balance::{fetch_balance, Balance};
pub use sign::{sign_message, SignedMessage};
pub use token::{create_token, create_token_from_form, MintParams, TokenForm, TokenReceipt};
pub use transfer::{send_sol, TransferReceipt};

use sol_tx::{sol_to_lamports, TxError};

use crate::error::ValidationError;

/// Parse a user-entered SOL amount into lamports. Zero and negative amounts
/// are rejected.
pub(crate) fn parse_sol_amount(input: &str) -> Result<u64, ValidationError> {
    sol_to_lamports(input).map_err(|e| match e {
        TxError::InvalidAmount(reason) => ValidationError::InvalidAmount(reason),
        other => ValidationError::InvalidAmount(other.to_string()),
    })
}

/// `ABCDEFGH...stuvwxyz` form used in user-facing messages.
pub(crate) fn abbreviate(address: &str) -> String {
    if address.len() <= 16 {
        return address.to_string();
    }
    format!("{}...{}", &address[..8], &address[address.len() - 8..])
}

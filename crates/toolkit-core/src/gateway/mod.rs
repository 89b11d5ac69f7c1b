//! Ledger gateway: the network-facing side of every workflow.
//!
//! Workflows only talk to the ledger through [`Gateway`], so tests can swap in
//! a mock or an in-memory ledger while production uses [`RpcGateway`].

mod rpc;

pub use rpc::RpcGateway;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use sol_tx::{Address, Blockhash, Signature, Transaction, TxError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Connection-level failure (DNS, refused, timeout).
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request error (HTTP {status_code}): {error}")]
    Request { error: String, status_code: u16 },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The ledger accepted the transaction but reported an execution error.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl GatewayError {
    /// Classifies a JSON-RPC error object. Faucet throttling surfaces either as
    /// HTTP 429 or as an RPC error whose message mentions it.
    pub fn from_rpc_error(code: i64, message: String) -> Self {
        let lowered = message.to_lowercase();
        if message.contains("429")
            || lowered.contains("rate limit")
            || lowered.contains("too many requests")
        {
            GatewayError::RateLimited(message)
        } else {
            GatewayError::Rpc { code, message }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        match self {
            GatewayError::RateLimited(_) => true,
            GatewayError::Request { status_code, .. } => *status_code == 429,
            _ => false,
        }
    }
}

impl From<TxError> for GatewayError {
    fn from(e: TxError) -> Self {
        GatewayError::Encoding(e.to_string())
    }
}

/// Operations the toolkit needs from a ledger node.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Balance of `address` in lamports.
    async fn get_balance(&self, address: &Address) -> Result<u64, GatewayError>;

    async fn get_latest_blockhash(&self) -> Result<Blockhash, GatewayError>;

    /// Lamports an account of `data_size` bytes must hold to be rent exempt.
    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_size: usize,
    ) -> Result<u64, GatewayError>;

    async fn request_airdrop(
        &self,
        address: &Address,
        lamports: u64,
    ) -> Result<Signature, GatewayError>;

    /// Submits a fully signed transaction and returns its fee payer signature.
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, GatewayError>;

    /// Waits for `signature` to reach the configured commitment.
    /// `Ok(false)` means it did not within the confirmation timeout.
    async fn confirm_transaction(&self, signature: &Signature) -> Result<bool, GatewayError>;
}

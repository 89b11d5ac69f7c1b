//! Wallet capability: the holder of the user's signing authority.
//!
//! Workflows never see secret material. They ask the wallet for its public
//! identity, for a raw message signature, or to sign-and-submit a transaction
//! that has already been bound to a fee payer and blockhash.

mod local;

pub use local::LocalWallet;

use async_trait::async_trait;
use sol_tx::{Address, Signature, Transaction, TxError};
use thiserror::Error;
use tokio::sync::watch;

use crate::gateway::{Gateway, GatewayError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Wallet not connected")]
    NotConnected,

    /// The user (or wallet policy) refused the request.
    #[error("Request declined: {0}")]
    Declined(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Keypair error: {0}")]
    Keypair(String),

    #[error(transparent)]
    Submission(#[from] GatewayError),
}

impl From<TxError> for WalletError {
    fn from(e: TxError) -> Self {
        WalletError::Signing(e.to_string())
    }
}

#[async_trait]
pub trait WalletCapability: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Connection state, updated as the wallet connects and disconnects.
    fn subscribe_connection(&self) -> watch::Receiver<bool>;

    /// Public identity, `None` while disconnected.
    fn public_identity(&self) -> Option<Address>;

    /// Sign arbitrary bytes with the wallet's key.
    async fn sign_raw(&self, message: &[u8]) -> Result<Signature, WalletError>;

    /// Sign `transaction` as its fee payer and submit it through `gateway`.
    /// Signatures already attached by co-signers are preserved.
    async fn sign_and_submit(
        &self,
        transaction: Transaction,
        gateway: &dyn Gateway,
    ) -> Result<Signature, WalletError>;
}

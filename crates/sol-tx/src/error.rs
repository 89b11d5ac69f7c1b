use thiserror::Error;

/// Errors raised while building, signing or serializing transactions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("missing signature for {0}")]
    MissingSignature(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}

use sol_tx::TxError;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::wallet::WalletError;

/// Input rejected before any network call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a recipient address")]
    EmptyAddress,

    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("Please enter a valid amount: {0}")]
    InvalidAmount(String),

    #[error("Token decimals must be between 1 and 9.")]
    DecimalsOutOfRange(u8),

    #[error("Token supply must be greater than 0.")]
    NonPositiveSupply,

    #[error("Token supply is too large: {0}")]
    SupplyOverflow(String),

    #[error("Please enter a message to sign")]
    EmptyMessage,
}

/// Coarse failure category reported alongside the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    Validation,
    Capability,
    InsufficientFunds,
    RateLimited,
    Transport,
    Verification,
    Busy,
    Internal,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::Validation => "validation",
            ReasonCode::Capability => "capability",
            ReasonCode::InsufficientFunds => "insufficient_funds",
            ReasonCode::RateLimited => "rate_limited",
            ReasonCode::Transport => "transport",
            ReasonCode::Verification => "verification",
            ReasonCode::Busy => "busy",
            ReasonCode::Internal => "internal",
        }
    }
}

/// Terminal failure of a toolkit workflow. None of these are retried
/// automatically; the user re-triggers the operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolkitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Wallet not connected. Please connect your wallet first.")]
    NotConnected,

    #[error("Request declined by wallet: {0}")]
    Declined(String),

    #[error("Wallet error: {0}")]
    Capability(String),

    #[error("Insufficient balance: {available} lamports available, {required} required")]
    InsufficientFunds { available: u64, required: u64 },

    #[error(
        "Airdrop limit reached! You've either hit your daily limit or the faucet is out of \
         funds. Please try again later or visit {fallback} for alternate sources."
    )]
    RateLimited { fallback: String },

    /// Gateway failure, message passed through unchanged.
    #[error("{0}")]
    Transport(String),

    #[error("Message signature invalid!")]
    SignatureInvalid,

    #[error("Operation already in progress")]
    Busy,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolkitError {
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            ToolkitError::Validation(_) => ReasonCode::Validation,
            ToolkitError::NotConnected
            | ToolkitError::Declined(_)
            | ToolkitError::Capability(_) => ReasonCode::Capability,
            ToolkitError::InsufficientFunds { .. } => ReasonCode::InsufficientFunds,
            ToolkitError::RateLimited { .. } => ReasonCode::RateLimited,
            ToolkitError::Transport(_) => ReasonCode::Transport,
            ToolkitError::SignatureInvalid => ReasonCode::Verification,
            ToolkitError::Busy => ReasonCode::Busy,
            ToolkitError::Internal(_) => ReasonCode::Internal,
        }
    }
}

impl From<GatewayError> for ToolkitError {
    fn from(e: GatewayError) -> Self {
        ToolkitError::Transport(e.to_string())
    }
}

impl From<WalletError> for ToolkitError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::NotConnected => ToolkitError::NotConnected,
            WalletError::Declined(reason) => ToolkitError::Declined(reason),
            WalletError::Signing(msg) | WalletError::Keypair(msg) => ToolkitError::Capability(msg),
            WalletError::Submission(gateway) => gateway.into(),
        }
    }
}

impl From<TxError> for ToolkitError {
    fn from(e: TxError) -> Self {
        ToolkitError::Internal(e.to_string())
    }
}

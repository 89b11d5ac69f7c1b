//! Devnet toolkit core: the workflows behind "request airdrop", "send SOL",
//! "sign message" and "create token".
//!
//! Each workflow takes an explicit [`Session`] (gateway + wallet + config),
//! validates its input before touching the network, assembles transactions
//! with `sol-tx`, and hands them to the wallet capability for signing and
//! submission. Front-ends drive workflows through an [`OperationSlot`] to get
//! pending / succeeded / failed state and single-flight protection.

pub mod config;
pub mod error;
pub mod gateway;
pub mod operation;
pub mod ops;
pub mod refresh;
pub mod session;
pub mod wallet;

pub use config::{Commitment, ConfigError, ToolkitConfig};
pub use error::{ReasonCode, ToolkitError, ValidationError};
pub use gateway::{Gateway, GatewayError, RpcGateway};
pub use operation::{OperationSlot, OperationState};
pub use refresh::BalanceRefresher;
pub use session::Session;
pub use wallet::{LocalWallet, WalletCapability, WalletError};

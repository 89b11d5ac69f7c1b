//! Solana transaction assembly for the devnet toolkit.
//!
//! This crate owns everything that can be computed without touching the
//! network: address parsing, SOL/lamport conversion, keypairs, instruction
//! builders for the System, Token-2022, Associated Token Account and Token
//! Metadata programs, and the transaction envelope itself (compilation,
//! co-signing and the legacy wire format).
//!
//! The wire format is implemented by hand on top of `ed25519-dalek` and `bs58`
//! instead of depending on `solana-sdk`.

pub mod address;
pub mod amount;
pub mod error;
pub mod instruction;
pub mod keypair;
pub mod system;
pub mod token;
pub mod transaction;

pub use address::{address_to_bytes, bytes_to_address, Address};
pub use amount::{format_sol, lamports_to_sol_string, sol_to_lamports, LAMPORTS_PER_SOL};
pub use error::TxError;
pub use instruction::{AccountMeta, Instruction};
pub use keypair::{verify_signature, Keypair, Signature};
pub use token::{
    derive_associated_token_address, TokenMetadata, ASSOCIATED_TOKEN_PROGRAM_ID,
    TOKEN_2022_PROGRAM_ID,
};
pub use transaction::{Blockhash, Message, Transaction};

//! Token-2022, Associated Token Account and Token Metadata instruction
//! builders, plus the account-size arithmetic needed to fund a new mint.
//!
//! Nothing here depends on `spl-token` or `solana-sdk`; instruction layouts
//! are written out byte by byte.

use sha2::{Digest, Sha256};

use crate::address::{is_on_curve, Address};
use crate::error::TxError;
use crate::instruction::{AccountMeta, Instruction};
use crate::system::SYSTEM_PROGRAM_ID;

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// Token-2022 Program: `TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb`
pub const TOKEN_2022_PROGRAM_ID: Address = Address::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xee, 0x75, 0x8f, 0xde, 0x18, 0x42, 0x5d, 0xbc, 0xe4, 0x6c, 0xcd, 0xda,
    0xb6, 0x1a, 0xfc, 0x4d, 0x83, 0xb9, 0x0d, 0x27, 0xfe, 0xbd, 0xf9, 0x28, 0xd8, 0xa1, 0x8b, 0xfc,
]);

/// Associated Token Account Program: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Address = Address::new([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d, 0x83,
    0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9, 0xf8, 0x59,
]);

/// Rent sysvar: `SysvarRent111111111111111111111111111111111`
pub const SYSVAR_RENT_ID: Address = Address::new([
    0x06, 0xa7, 0xd5, 0x17, 0x19, 0x2c, 0x5c, 0x51, 0x21, 0x8c, 0xc9, 0x4c, 0x3d, 0x4a, 0xf1, 0x7f,
    0x58, 0xda, 0xee, 0x08, 0x9b, 0xa1, 0xfd, 0x44, 0xe3, 0xdb, 0xd9, 0x8a, 0x00, 0x00, 0x00, 0x00,
]);

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

// ---------------------------------------------------------------------------
// Account sizes
// ---------------------------------------------------------------------------

/// Packed size of a base mint (no extensions).
pub const MINT_BASE_LEN: usize = 82;

/// Mints carrying extensions are padded to the token-account length so the
/// account-type byte lands at a fixed offset.
const BASE_ACCOUNT_LEN: usize = 165;
const ACCOUNT_TYPE_LEN: usize = 1;

/// TLV entry header: u16 extension type + u16 length.
pub const TLV_TYPE_LEN: usize = 2;
pub const TLV_LENGTH_LEN: usize = 2;

/// Metadata pointer body: authority + metadata address.
const METADATA_POINTER_LEN: usize = 64;

/// Space for a mint with only the metadata-pointer extension: 234 bytes.
///
/// The metadata TLV itself is appended by the token program when the
/// metadata is initialized, which is why the account is created at this
/// size but funded for `mint_len_with_metadata_pointer() + metadata.tlv_len()`.
pub const fn mint_len_with_metadata_pointer() -> usize {
    BASE_ACCOUNT_LEN + ACCOUNT_TYPE_LEN + TLV_TYPE_LEN + TLV_LENGTH_LEN + METADATA_POINTER_LEN
}

// ---------------------------------------------------------------------------
// Instruction tags
// ---------------------------------------------------------------------------

const INITIALIZE_MINT_IX: u8 = 0;
const MINT_TO_IX: u8 = 7;
const METADATA_POINTER_EXTENSION_IX: u8 = 39;
const METADATA_POINTER_INITIALIZE_IX: u8 = 0;

const ATA_CREATE_IX: u8 = 0;
const ATA_CREATE_IDEMPOTENT_IX: u8 = 1;

/// `sha256("spl_token_metadata_interface:initialize_account")[..8]`
const METADATA_INITIALIZE_DISCRIMINATOR: [u8; 8] = [0xd2, 0xe1, 0x1e, 0xa2, 0x58, 0xb8, 0x4d, 0x8d];

// ---------------------------------------------------------------------------
// Token metadata
// ---------------------------------------------------------------------------

/// On-chain token metadata as stored in the mint's metadata TLV entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    /// All-zero means no update authority.
    pub update_authority: Address,
    pub mint: Address,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub additional_metadata: Vec<(String, String)>,
}

impl TokenMetadata {
    /// Borsh-compatible packing: two keys, three length-prefixed strings and
    /// a length-prefixed list of key/value string pairs.
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.packed_len());
        buf.extend_from_slice(self.update_authority.as_bytes());
        buf.extend_from_slice(self.mint.as_bytes());
        write_borsh_string(&mut buf, &self.name);
        write_borsh_string(&mut buf, &self.symbol);
        write_borsh_string(&mut buf, &self.uri);
        buf.extend_from_slice(&(self.additional_metadata.len() as u32).to_le_bytes());
        for (key, value) in &self.additional_metadata {
            write_borsh_string(&mut buf, key);
            write_borsh_string(&mut buf, value);
        }
        buf
    }

    pub fn packed_len(&self) -> usize {
        let strings = |s: &str| 4 + s.len();
        32 + 32
            + strings(&self.name)
            + strings(&self.symbol)
            + strings(&self.uri)
            + 4
            + self
                .additional_metadata
                .iter()
                .map(|(k, v)| strings(k) + strings(v))
                .sum::<usize>()
    }

    /// Bytes the metadata occupies inside the mint account, TLV header included.
    pub fn tlv_len(&self) -> usize {
        TLV_TYPE_LEN + TLV_LENGTH_LEN + self.packed_len()
    }
}

fn write_borsh_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
}

// ---------------------------------------------------------------------------
// Instruction builders
// ---------------------------------------------------------------------------

/// Initialize the metadata-pointer extension on an uninitialized mint.
///
/// Must precede `initialize_mint`. A `None` key is encoded as 32 zero bytes.
pub fn initialize_metadata_pointer(
    mint: &Address,
    authority: Option<&Address>,
    metadata_address: Option<&Address>,
) -> Instruction {
    let mut data = Vec::with_capacity(66);
    data.push(METADATA_POINTER_EXTENSION_IX);
    data.push(METADATA_POINTER_INITIALIZE_IX);
    data.extend_from_slice(authority.copied().unwrap_or_default().as_bytes());
    data.extend_from_slice(metadata_address.copied().unwrap_or_default().as_bytes());

    Instruction::new(TOKEN_2022_PROGRAM_ID, vec![AccountMeta::writable(*mint)], data)
}

/// Initialize `mint` with the given decimals and authorities.
///
/// Data: tag, decimals, mint authority, then a one-byte option tag and the
/// freeze authority (zeroed when absent). 67 bytes in total.
pub fn initialize_mint(
    token_program: &Address,
    mint: &Address,
    decimals: u8,
    mint_authority: &Address,
    freeze_authority: Option<&Address>,
) -> Instruction {
    let mut data = Vec::with_capacity(67);
    data.push(INITIALIZE_MINT_IX);
    data.push(decimals);
    data.extend_from_slice(mint_authority.as_bytes());
    match freeze_authority {
        Some(freeze) => {
            data.push(1);
            data.extend_from_slice(freeze.as_bytes());
        }
        None => {
            data.push(0);
            data.extend_from_slice(&[0u8; 32]);
        }
    }

    Instruction::new(
        *token_program,
        vec![AccountMeta::writable(*mint), AccountMeta::readonly(SYSVAR_RENT_ID)],
        data,
    )
}

/// Write name/symbol/uri metadata into the account `metadata` points at.
///
/// ### Accounts:
///   0. `[WRITE]` Metadata account
///   1. `[]` Update authority
///   2. `[]` Mint
///   3. `[SIGNER]` Mint authority
pub fn initialize_metadata(
    program_id: &Address,
    metadata: &TokenMetadata,
    mint_authority: &Address,
) -> Instruction {
    let mut data = Vec::with_capacity(
        8 + 12 + metadata.name.len() + metadata.symbol.len() + metadata.uri.len(),
    );
    data.extend_from_slice(&METADATA_INITIALIZE_DISCRIMINATOR);
    write_borsh_string(&mut data, &metadata.name);
    write_borsh_string(&mut data, &metadata.symbol);
    write_borsh_string(&mut data, &metadata.uri);

    Instruction::new(
        *program_id,
        vec![
            AccountMeta::writable(metadata.mint),
            AccountMeta::readonly(metadata.update_authority),
            AccountMeta::readonly(metadata.mint),
            AccountMeta::readonly_signer(*mint_authority),
        ],
        data,
    )
}

/// Create the associated token account `ata` for `wallet` and `mint`.
///
/// The plain variant fails on-chain if the account already exists; the
/// idempotent variant succeeds without changes.
pub fn create_associated_token_account(
    payer: &Address,
    ata: &Address,
    wallet: &Address,
    mint: &Address,
    token_program: &Address,
    idempotent: bool,
) -> Instruction {
    let tag = if idempotent {
        ATA_CREATE_IDEMPOTENT_IX
    } else {
        ATA_CREATE_IX
    };

    Instruction::new(
        ASSOCIATED_TOKEN_PROGRAM_ID,
        vec![
            AccountMeta::writable_signer(*payer),
            AccountMeta::writable(*ata),
            AccountMeta::readonly(*wallet),
            AccountMeta::readonly(*mint),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID),
            AccountMeta::readonly(*token_program),
        ],
        vec![tag],
    )
}

/// Mint `amount` base units of `mint` into `destination`.
///
/// Data: tag (7) followed by u64 LE amount.
pub fn mint_to(
    token_program: &Address,
    mint: &Address,
    destination: &Address,
    authority: &Address,
    amount: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(MINT_TO_IX);
    data.extend_from_slice(&amount.to_le_bytes());

    Instruction::new(
        *token_program,
        vec![
            AccountMeta::writable(*mint),
            AccountMeta::writable(*destination),
            AccountMeta::readonly_signer(*authority),
        ],
        data,
    )
}

/// `supply * 10^decimals`, or an error if it does not fit in a u64.
pub fn token_base_units(supply: u64, decimals: u8) -> Result<u64, TxError> {
    10u64
        .checked_pow(u32::from(decimals))
        .and_then(|scale| supply.checked_mul(scale))
        .ok_or_else(|| {
            TxError::InvalidAmount(format!(
                "supply {supply} with {decimals} decimals overflows u64"
            ))
        })
}

// ---------------------------------------------------------------------------
// Associated Token Account (PDA) derivation
// ---------------------------------------------------------------------------

/// Derive the associated token account address for a wallet + mint pair.
///
/// Seeds: `[wallet, token_program, mint]` under the ATA program.
pub fn derive_associated_token_address(
    wallet: &Address,
    mint: &Address,
    token_program: &Address,
) -> Result<Address, TxError> {
    find_program_address(
        &[wallet.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Find a Program Derived Address for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0, hashing
/// `seed_0 || ... || bump || program_id || "ProgramDerivedAddress"`
/// and returning the first digest that is NOT a valid Ed25519 point.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), TxError> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, bump, program_id) {
            return Ok((address, bump));
        }
    }

    Err(TxError::InvalidAddress(
        "could not find valid PDA bump seed".into(),
    ))
}

fn try_create_program_address(seeds: &[&[u8]], bump: u8, program_id: &Address) -> Option<Address> {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();
    if is_on_curve(&hash) {
        return None;
    }

    Some(Address::new(hash))
}

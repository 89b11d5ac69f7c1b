//! System Program instruction builders.

use crate::address::Address;
use crate::instruction::{AccountMeta, Instruction};

/// The System Program: 32 zero bytes, `11111111111111111111111111111111`.
pub const SYSTEM_PROGRAM_ID: Address = Address::new([0u8; 32]);

const CREATE_ACCOUNT_IX_INDEX: u32 = 0;
const TRANSFER_IX_INDEX: u32 = 2;

/// Move `lamports` from `from` (signer) to `to`.
///
/// Data: u32 LE instruction index (2) followed by u64 LE lamports.
pub fn transfer(from: &Address, to: &Address, lamports: u64) -> Instruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    Instruction::new(
        SYSTEM_PROGRAM_ID,
        vec![AccountMeta::writable_signer(*from), AccountMeta::writable(*to)],
        data,
    )
}

/// Create `new_account` with `space` bytes owned by `owner`, funded by `payer`.
///
/// Both accounts sign: the payer for the lamports, the new account to prove
/// the caller holds its key.
///
/// Data layout:
/// - `[0..4]`   instruction index (0)
/// - `[4..12]`  lamports
/// - `[12..20]` space
/// - `[20..52]` owner program
pub fn create_account(
    payer: &Address,
    new_account: &Address,
    lamports: u64,
    space: u64,
    owner: &Address,
) -> Instruction {
    let mut data = Vec::with_capacity(52);
    data.extend_from_slice(&CREATE_ACCOUNT_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&space.to_le_bytes());
    data.extend_from_slice(owner.as_bytes());

    Instruction::new(
        SYSTEM_PROGRAM_ID,
        vec![
            AccountMeta::writable_signer(*payer),
            AccountMeta::writable_signer(*new_account),
        ],
        data,
    )
}

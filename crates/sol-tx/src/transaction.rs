//! Transaction envelopes and the legacy Solana wire format.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```
//!
//! A [`Transaction`] collects instructions first. The fee payer and recent
//! blockhash are bound afterwards with [`Transaction::bind`], right before
//! signing, and every required signer must sign the same compiled message.

use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::error::TxError;
use crate::instruction::Instruction;
use crate::keypair::{verify_signature, Keypair, Signature};

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value, returning `(value, bytes_consumed)`.
#[cfg(test)]
fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), TxError> {
    let mut value: u32 = 0;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            TxError::SerializationError("unexpected end of data while decoding compact-u16".into())
        })?;
        value |= ((byte & 0x7f) as u32) << (7 * consumed);
        consumed += 1;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    u16::try_from(value)
        .map(|v| (v, consumed))
        .map_err(|_| TxError::SerializationError("compact-u16 value overflow".into()))
}

fn compact_len(len: usize, what: &str) -> Result<Vec<u8>, TxError> {
    u16::try_from(len)
        .map(encode_compact_u16)
        .map_err(|_| TxError::SerializationError(format!("too many {what}: {len}")))
}

// ---------------------------------------------------------------------------
// Blockhash
// ---------------------------------------------------------------------------

/// A recent blockhash: the recency token binding a transaction to a recent
/// ledger state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Blockhash([u8; 32]);

impl Blockhash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for Blockhash {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TxError::SerializationError(format!("invalid blockhash: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            TxError::SerializationError(format!("blockhash must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({self})")
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A compiled instruction where account references are replaced by u8 indices
/// into the message's `account_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// The signed portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Number of required signatures; the first N account keys are signers.
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,

    /// All account keys referenced by the message, in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Address>,

    pub recent_blockhash: Blockhash,

    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compile instructions into a message paid for by `fee_payer`.
    pub fn compile(
        instructions: &[Instruction],
        fee_payer: &Address,
        recent_blockhash: &Blockhash,
    ) -> Result<Self, TxError> {
        struct AccountEntry {
            pubkey: Address,
            is_signer: bool,
            is_writable: bool,
        }

        // Instruction account lists are tiny, a Vec beats a map here.
        let mut entries: Vec<AccountEntry> = Vec::new();
        let mut upsert = |pubkey: Address, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(AccountEntry {
                    pubkey,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        // Fee payer is always signer + writable, and inserted first so the
        // stable sort below keeps it at index 0.
        upsert(*fee_payer, true, true);
        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        if entries.len() > usize::from(u8::MAX) {
            return Err(TxError::TransactionBuildError(format!(
                "too many accounts: {}",
                entries.len()
            )));
        }

        let count = |f: fn(&AccountEntry) -> bool| entries.iter().filter(|&e| f(e)).count() as u8;
        let num_required_signatures = count(|e| e.is_signer);
        let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
        let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

        let account_keys: Vec<Address> = entries.iter().map(|e| e.pubkey).collect();
        let index_of = |key: &Address| -> Result<u8, TxError> {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or_else(|| {
                    TxError::TransactionBuildError(format!("{key} not in account keys"))
                })
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            compiled.push(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                account_indices: ix
                    .accounts
                    .iter()
                    .map(|meta| index_of(&meta.pubkey))
                    .collect::<Result<_, _>>()?,
                data: ix.data.clone(),
            });
        }

        Ok(Self {
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            account_keys,
            recent_blockhash: *recent_blockhash,
            instructions: compiled,
        })
    }

    /// The accounts whose signatures this message requires, fee payer first.
    pub fn signer_keys(&self) -> &[Address] {
        &self.account_keys[..usize::from(self.num_required_signatures)]
    }

    /// Serialize the message (the bytes that get signed).
    pub fn serialize(&self) -> Result<Vec<u8>, TxError> {
        let mut buf = Vec::with_capacity(256);

        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        buf.extend_from_slice(&compact_len(self.account_keys.len(), "account keys")?);
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(self.recent_blockhash.as_bytes());

        buf.extend_from_slice(&compact_len(self.instructions.len(), "instructions")?);
        for ix in &self.instructions {
            buf.push(ix.program_id_index);
            buf.extend_from_slice(&compact_len(ix.account_indices.len(), "instruction accounts")?);
            buf.extend_from_slice(&ix.account_indices);
            buf.extend_from_slice(&compact_len(ix.data.len(), "instruction data bytes")?);
            buf.extend_from_slice(&ix.data);
        }

        Ok(buf)
    }
}

// ---------------------------------------------------------------------------
// Transaction envelope
// ---------------------------------------------------------------------------

/// An ordered batch of instructions applied atomically.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    instructions: Vec<Instruction>,
    fee_payer: Option<Address>,
    recent_blockhash: Option<Blockhash>,
    signatures: Vec<(Address, Signature)>,
}

impl Transaction {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            ..Self::default()
        }
    }

    /// Append an instruction. Existing signatures no longer cover the
    /// message and are dropped.
    pub fn add(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self.signatures.clear();
        self
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn fee_payer(&self) -> Option<&Address> {
        self.fee_payer.as_ref()
    }

    pub fn recent_blockhash(&self) -> Option<&Blockhash> {
        self.recent_blockhash.as_ref()
    }

    /// Attach the fee payer and recency token. Clears any signatures.
    pub fn bind(&mut self, fee_payer: Address, recent_blockhash: Blockhash) -> &mut Self {
        self.fee_payer = Some(fee_payer);
        self.recent_blockhash = Some(recent_blockhash);
        self.signatures.clear();
        self
    }

    /// Compile the bound transaction into its message.
    pub fn compile(&self) -> Result<Message, TxError> {
        let fee_payer = self
            .fee_payer
            .ok_or_else(|| TxError::TransactionBuildError("fee payer not set".into()))?;
        let blockhash = self
            .recent_blockhash
            .ok_or_else(|| TxError::TransactionBuildError("recent blockhash not set".into()))?;
        if self.instructions.is_empty() {
            return Err(TxError::TransactionBuildError(
                "transaction has no instructions".into(),
            ));
        }
        Message::compile(&self.instructions, &fee_payer, &blockhash)
    }

    /// The serialized message every signer signs.
    pub fn message_bytes(&self) -> Result<Vec<u8>, TxError> {
        self.compile()?.serialize()
    }

    /// Every account that must sign, fee payer first.
    pub fn required_signers(&self) -> Result<Vec<Address>, TxError> {
        Ok(self.compile()?.signer_keys().to_vec())
    }

    /// Required signers other than the fee payer.
    pub fn co_signers(&self) -> Result<Vec<Address>, TxError> {
        let fee_payer = self.fee_payer;
        Ok(self
            .required_signers()?
            .into_iter()
            .filter(|key| Some(*key) != fee_payer)
            .collect())
    }

    /// Sign with `keypair`, which must be one of the required signers.
    /// Signatures from other signers are kept.
    pub fn partial_sign(&mut self, keypair: &Keypair) -> Result<(), TxError> {
        let message = self.compile()?;
        let signer = keypair.address();
        if !message.signer_keys().contains(&signer) {
            return Err(TxError::SigningError(format!(
                "{signer} is not a required signer"
            )));
        }
        let signature = keypair.sign(&message.serialize()?);
        self.upsert_signature(signer, signature);
        Ok(())
    }

    /// Attach a signature produced elsewhere (e.g. by a wallet). The
    /// signature is verified against the current message first.
    pub fn add_signature(&mut self, signer: Address, signature: Signature) -> Result<(), TxError> {
        let message = self.compile()?;
        if !message.signer_keys().contains(&signer) {
            return Err(TxError::SigningError(format!(
                "{signer} is not a required signer"
            )));
        }
        if !verify_signature(&signer, &message.serialize()?, &signature) {
            return Err(TxError::InvalidSignature(format!(
                "signature does not verify for {signer}"
            )));
        }
        self.upsert_signature(signer, signature);
        Ok(())
    }

    fn upsert_signature(&mut self, signer: Address, signature: Signature) {
        match self.signatures.iter_mut().find(|(key, _)| *key == signer) {
            Some(slot) => slot.1 = signature,
            None => self.signatures.push((signer, signature)),
        }
    }

    pub fn signature_of(&self, signer: &Address) -> Option<&Signature> {
        self.signatures
            .iter()
            .find(|(key, _)| key == signer)
            .map(|(_, sig)| sig)
    }

    /// The fee payer's signature, which doubles as the transaction id.
    pub fn signature(&self) -> Option<&Signature> {
        self.fee_payer.as_ref().and_then(|fp| self.signature_of(fp))
    }

    pub fn is_fully_signed(&self) -> bool {
        match self.required_signers() {
            Ok(signers) => signers.iter().all(|s| self.signature_of(s).is_some()),
            Err(_) => false,
        }
    }

    /// Serialize into wire format. Every required signer must have signed.
    pub fn serialize(&self) -> Result<Vec<u8>, TxError> {
        let message = self.compile()?;
        let message_bytes = message.serialize()?;
        let signers = message.signer_keys();

        let mut wire = Vec::with_capacity(3 + 64 * signers.len() + message_bytes.len());
        wire.extend_from_slice(&compact_len(signers.len(), "signatures")?);
        for signer in signers {
            let sig = self
                .signature_of(signer)
                .ok_or_else(|| TxError::MissingSignature(signer.to_string()))?;
            wire.extend_from_slice(sig.as_bytes());
        }
        wire.extend_from_slice(&message_bytes);

        Ok(wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::AccountMeta;
    use crate::system::{self, SYSTEM_PROGRAM_ID};

    fn transfer_tx(from: &Keypair, to: Address, blockhash: Blockhash) -> Transaction {
        let mut tx = Transaction::new(vec![system::transfer(&from.address(), &to, 1_000)]);
        tx.bind(from.address(), blockhash);
        tx
    }

    // -- compact-u16 --------------------------------------------------------

    #[test]
    fn compact_u16_boundaries() {
        assert_eq!(encode_compact_u16(0), vec![0x00]);
        assert_eq!(encode_compact_u16(0x7f), vec![0x7f]);
        assert_eq!(encode_compact_u16(128), vec![0x80, 0x01]);
        assert_eq!(encode_compact_u16(16383), vec![0xff, 0x7f]);
        assert_eq!(encode_compact_u16(16384), vec![0x80, 0x80, 0x01]);
        assert_eq!(encode_compact_u16(u16::MAX), vec![0xff, 0xff, 0x03]);
    }

    #[test]
    fn decode_compact_u16_values() {
        assert_eq!(decode_compact_u16(&[0x00]).unwrap(), (0, 1));
        assert_eq!(decode_compact_u16(&[0x80, 0x01]).unwrap(), (128, 2));
        assert_eq!(decode_compact_u16(&[0x80, 0x80, 0x01]).unwrap(), (16384, 3));
        assert_eq!(decode_compact_u16(&[0xff, 0xff, 0x03]).unwrap(), (u16::MAX, 3));
    }

    #[test]
    fn decode_compact_u16_errors() {
        assert!(decode_compact_u16(&[]).is_err());
        assert!(decode_compact_u16(&[0x80]).is_err());
        assert!(decode_compact_u16(&[0xff, 0xff, 0x7f]).is_err());
    }

    // -- Blockhash ----------------------------------------------------------

    #[test]
    fn blockhash_base58_roundtrip() {
        let text = "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N";
        let hash: Blockhash = text.parse().unwrap();
        assert_eq!(hash.to_string(), text);
    }

    #[test]
    fn blockhash_rejects_wrong_length() {
        assert!("1".parse::<Blockhash>().is_err());
    }

    // -- Compilation --------------------------------------------------------

    #[test]
    fn compiled_transfer_account_order() {
        let from = Address::new([1; 32]);
        let to = Address::new([2; 32]);
        let message = Message::compile(
            &[system::transfer(&from, &to, 1000)],
            &from,
            &Blockhash::new([0xAA; 32]),
        )
        .unwrap();

        assert_eq!(message.account_keys, vec![from, to, SYSTEM_PROGRAM_ID]);
        assert_eq!(message.num_required_signatures, 1);
        assert_eq!(message.num_readonly_signed, 0);
        assert_eq!(message.num_readonly_unsigned, 1);
        assert_eq!(message.instructions[0].program_id_index, 2);
        assert_eq!(message.instructions[0].account_indices, vec![0, 1]);
    }

    #[test]
    fn fee_payer_stays_first_even_when_listed_later() {
        let payer = Address::new([9; 32]);
        let other_signer = Address::new([1; 32]);
        let ix = Instruction::new(
            Address::new([5; 32]),
            vec![AccountMeta::writable_signer(other_signer), AccountMeta::writable_signer(payer)],
            vec![],
        );
        let message = Message::compile(&[ix], &payer, &Blockhash::default()).unwrap();
        assert_eq!(message.account_keys[0], payer);
        assert_eq!(message.signer_keys(), &[payer, other_signer]);
    }

    #[test]
    fn readonly_signers_sorted_after_writable_signers() {
        let payer = Address::new([1; 32]);
        let authority = Address::new([2; 32]);
        let target = Address::new([3; 32]);
        let ix = Instruction::new(
            Address::new([4; 32]),
            vec![AccountMeta::readonly_signer(authority), AccountMeta::writable(target)],
            vec![],
        );
        let message = Message::compile(&[ix], &payer, &Blockhash::default()).unwrap();
        assert_eq!(message.account_keys, vec![payer, authority, target, Address::new([4; 32])]);
        assert_eq!(message.num_required_signatures, 2);
        assert_eq!(message.num_readonly_signed, 1);
    }

    #[test]
    fn self_transfer_deduplicates_accounts() {
        let key = Address::new([0xAA; 32]);
        let message = Message::compile(
            &[system::transfer(&key, &key, 100)],
            &key,
            &Blockhash::default(),
        )
        .unwrap();
        assert_eq!(message.account_keys.len(), 2);
    }

    #[test]
    fn unbound_transaction_does_not_compile() {
        let tx = Transaction::new(vec![system::transfer(
            &Address::new([1; 32]),
            &Address::new([2; 32]),
            1,
        )]);
        let err = tx.compile().unwrap_err();
        assert!(err.to_string().contains("fee payer not set"));
    }

    #[test]
    fn empty_transaction_does_not_compile() {
        let mut tx = Transaction::default();
        tx.bind(Address::new([1; 32]), Blockhash::default());
        assert!(tx.compile().is_err());
    }

    #[test]
    fn message_contains_blockhash() {
        let from = Keypair::from_seed(&[1; 32]);
        let tx = transfer_tx(&from, Address::new([2; 32]), Blockhash::new([0xCC; 32]));
        let message = tx.compile().unwrap();
        let bytes = message.serialize().unwrap();

        assert_eq!(bytes[0], message.num_required_signatures);
        let offset = 3 + 1 + 32 * message.account_keys.len();
        assert_eq!(&bytes[offset..offset + 32], &[0xCC; 32]);
    }

    // -- Signing ------------------------------------------------------------

    #[test]
    fn single_signer_wire_format_verifies() {
        let from = Keypair::from_seed(&[0x42; 32]);
        let mut tx = transfer_tx(&from, Address::new([0xBB; 32]), Blockhash::new([0xCC; 32]));
        tx.partial_sign(&from).unwrap();

        let wire = tx.serialize().unwrap();
        assert_eq!(wire[0], 0x01);
        let sig = Signature::new(wire[1..65].try_into().unwrap());
        assert!(verify_signature(&from.address(), &wire[65..], &sig));
        assert_eq!(tx.signature(), Some(&sig));
    }

    #[test]
    fn serialize_without_signature_names_missing_signer() {
        let from = Keypair::from_seed(&[0x42; 32]);
        let tx = transfer_tx(&from, Address::new([0xBB; 32]), Blockhash::default());
        assert_eq!(
            tx.serialize().unwrap_err(),
            TxError::MissingSignature(from.address().to_string())
        );
    }

    #[test]
    fn partial_sign_rejects_unrelated_key() {
        let from = Keypair::from_seed(&[1; 32]);
        let stranger = Keypair::from_seed(&[2; 32]);
        let mut tx = transfer_tx(&from, Address::new([3; 32]), Blockhash::default());
        let err = tx.partial_sign(&stranger).unwrap_err();
        assert!(err.to_string().contains("not a required signer"));
    }

    #[test]
    fn co_signer_and_fee_payer_both_required() {
        let payer = Keypair::from_seed(&[1; 32]);
        let new_account = Keypair::from_seed(&[2; 32]);
        let mut tx = Transaction::new(vec![system::create_account(
            &payer.address(),
            &new_account.address(),
            1_000,
            82,
            &Address::new([7; 32]),
        )]);
        tx.bind(payer.address(), Blockhash::new([5; 32]));

        assert_eq!(tx.co_signers().unwrap(), vec![new_account.address()]);

        tx.partial_sign(&new_account).unwrap();
        assert!(!tx.is_fully_signed());
        assert!(matches!(tx.serialize(), Err(TxError::MissingSignature(_))));

        tx.partial_sign(&payer).unwrap();
        assert!(tx.is_fully_signed());

        let wire = tx.serialize().unwrap();
        assert_eq!(wire[0], 0x02);
        let message = &wire[1 + 128..];
        let payer_sig = Signature::new(wire[1..65].try_into().unwrap());
        let account_sig = Signature::new(wire[65..129].try_into().unwrap());
        assert!(verify_signature(&payer.address(), message, &payer_sig));
        assert!(verify_signature(&new_account.address(), message, &account_sig));
    }

    #[test]
    fn rebinding_clears_signatures() {
        let from = Keypair::from_seed(&[1; 32]);
        let mut tx = transfer_tx(&from, Address::new([2; 32]), Blockhash::new([1; 32]));
        tx.partial_sign(&from).unwrap();
        tx.bind(from.address(), Blockhash::new([2; 32]));
        assert!(tx.signature().is_none());
    }

    #[test]
    fn adding_instruction_clears_signatures() {
        let from = Keypair::from_seed(&[1; 32]);
        let mut tx = transfer_tx(&from, Address::new([2; 32]), Blockhash::new([1; 32]));
        tx.partial_sign(&from).unwrap();
        tx.add(system::transfer(&from.address(), &Address::new([3; 32]), 5));
        assert!(!tx.is_fully_signed());
    }

    #[test]
    fn add_signature_verifies_before_accepting() {
        let from = Keypair::from_seed(&[1; 32]);
        let mut tx = transfer_tx(&from, Address::new([2; 32]), Blockhash::new([1; 32]));
        let message = tx.message_bytes().unwrap();

        let bogus = from.sign(b"something else");
        assert!(matches!(
            tx.add_signature(from.address(), bogus),
            Err(TxError::InvalidSignature(_))
        ));

        tx.add_signature(from.address(), from.sign(&message)).unwrap();
        assert!(tx.is_fully_signed());
    }

    #[test]
    fn signing_is_deterministic() {
        let from = Keypair::from_seed(&[0x55; 32]);
        let mut a = transfer_tx(&from, Address::new([0x77; 32]), Blockhash::new([0x99; 32]));
        let mut b = a.clone();
        a.partial_sign(&from).unwrap();
        b.partial_sign(&from).unwrap();
        assert_eq!(a.serialize().unwrap(), b.serialize().unwrap());
    }
}

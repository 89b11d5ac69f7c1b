//! Ed25519 keypairs and signatures.
//!
//! A freshly generated `Keypair` is what authorizes the creation of a new
//! mint account; the wallet's own key never leaves its capability object.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand_core::OsRng;
use zeroize::Zeroize;

use crate::address::Address;
use crate::error::TxError;

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 64] {
        self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl From<[u8; 64]> for Signature {
    fn from(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Signature {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TxError::InvalidSignature(format!("base58 decode failed: {e}")))?;
        let arr: [u8; 64] = bytes.try_into().map_err(|v: Vec<u8>| {
            TxError::InvalidSignature(format!("expected 64 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

/// An Ed25519 keypair. The secret half is zeroized on drop by `ed25519-dalek`.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a keypair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut seed = *seed;
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { signing_key }
    }

    /// Parse the 64-byte `secret || public` layout used by Solana keypair
    /// files. The public half must match the one derived from the secret.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        if bytes.len() != 64 {
            return Err(TxError::InvalidKeypair(format!(
                "expected 64 bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_seed(&seed);
        seed.zeroize();

        if keypair.address().as_bytes()[..] != bytes[32..] {
            return Err(TxError::InvalidKeypair(
                "public key does not match secret key".into(),
            ));
        }

        Ok(keypair)
    }

    /// The keypair's public key as an address.
    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign arbitrary bytes.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Verify `signature` over `message` against the public key `signer`.
///
/// Uses strict verification. Returns `false` for keys that are not valid
/// curve points instead of erroring.
pub fn verify_signature(signer: &Address, message: &[u8], signature: &Signature) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    key.verify_strict(message, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let sig = keypair.sign(b"hello devnet");
        assert!(verify_signature(&keypair.address(), b"hello devnet", &sig));
    }

    #[test]
    fn tampered_message_fails() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let sig = keypair.sign(b"hello devnet");
        assert!(!verify_signature(&keypair.address(), b"hello devnex", &sig));
    }

    #[test]
    fn tampered_signature_fails() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let mut bytes = keypair.sign(b"hello").to_bytes();
        bytes[0] ^= 0x01;
        assert!(!verify_signature(
            &keypair.address(),
            b"hello",
            &Signature::new(bytes)
        ));
    }

    #[test]
    fn wrong_signer_fails() {
        let a = Keypair::from_seed(&[1; 32]);
        let b = Keypair::from_seed(&[2; 32]);
        let sig = a.sign(b"msg");
        assert!(!verify_signature(&b.address(), b"msg", &sig));
    }

    #[test]
    fn signing_is_deterministic() {
        let keypair = Keypair::from_seed(&[0x55; 32]);
        assert_eq!(keypair.sign(b"abc"), keypair.sign(b"abc"));
    }

    #[test]
    fn generated_keypairs_differ() {
        assert_ne!(Keypair::generate().address(), Keypair::generate().address());
    }

    #[test]
    fn from_bytes_accepts_cli_layout() {
        let original = Keypair::from_seed(&[7; 32]);
        let mut bytes = vec![7u8; 32];
        bytes.extend_from_slice(original.address().as_bytes());

        let parsed = Keypair::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.address(), original.address());
    }

    #[test]
    fn from_bytes_rejects_mismatched_public_half() {
        let mut bytes = vec![7u8; 32];
        bytes.extend_from_slice(&[9u8; 32]);
        let err = Keypair::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(Keypair::from_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn signature_base58_roundtrip() {
        let sig = Keypair::from_seed(&[3; 32]).sign(b"x");
        let parsed: Signature = sig.to_string().parse().unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn known_seed_matches_reference_public_key() {
        // RFC 8032 test vector 1.
        let seed: [u8; 32] =
            hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60")
                .unwrap()
                .try_into()
                .unwrap();
        let keypair = Keypair::from_seed(&seed);
        assert_eq!(
            hex::encode(keypair.address().as_bytes()),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
    }
}

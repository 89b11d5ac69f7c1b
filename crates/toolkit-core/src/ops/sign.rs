use log::{debug, warn};
use sol_tx::{verify_signature, Address, Signature};

use crate::error::{ToolkitError, ValidationError};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub signer: Address,
    pub message: String,
    pub signature: Signature,
}

/// Have the wallet sign the UTF-8 bytes of `message`, then check the
/// signature against the wallet's public identity before reporting success.
pub async fn sign_message(session: &Session, message: &str) -> Result<SignedMessage, ToolkitError> {
    let signer = session.owner()?;
    if message.trim().is_empty() {
        return Err(ValidationError::EmptyMessage.into());
    }

    let bytes = message.as_bytes();
    let signature = session.wallet().sign_raw(bytes).await?;
    if !verify_signature(&signer, bytes, &signature) {
        warn!("Wallet {signer} returned a signature that does not verify");
        return Err(ToolkitError::SignatureInvalid);
    }
    debug!("Signed {} bytes with {signer}", bytes.len());

    Ok(SignedMessage {
        signer,
        message: message.to_string(),
        signature,
    })
}

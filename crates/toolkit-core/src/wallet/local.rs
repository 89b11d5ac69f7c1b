use std::fs;
use std::path::Path;

use async_trait::async_trait;
use log::{debug, info};
use sol_tx::{Address, Keypair, Signature, Transaction};
use tokio::sync::watch;
use zeroize::Zeroize;

use super::{WalletCapability, WalletError};
use crate::gateway::Gateway;

/// Wallet backed by a keypair held in process memory.
///
/// Starts connected. `disconnect` withdraws the capability without dropping
/// the key, mirroring a browser wallet that can be reconnected.
pub struct LocalWallet {
    keypair: Keypair,
    connected: watch::Sender<bool>,
}

impl LocalWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair,
            connected: watch::Sender::new(true),
        }
    }

    /// Load a Solana CLI keypair file: a JSON array of 64 bytes
    /// (secret key followed by public key).
    pub fn from_keypair_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path = path.as_ref();
        let mut contents = fs::read_to_string(path)
            .map_err(|e| WalletError::Keypair(format!("{}: {e}", path.display())))?;
        let parsed: Result<Vec<u8>, _> = serde_json::from_str(&contents);
        contents.zeroize();

        let mut bytes =
            parsed.map_err(|e| WalletError::Keypair(format!("{}: {e}", path.display())))?;
        let keypair = Keypair::from_bytes(&bytes);
        bytes.zeroize();

        let keypair = keypair.map_err(|e| WalletError::Keypair(e.to_string()))?;
        debug!("Loaded keypair {} from {}", keypair.address(), path.display());
        Ok(Self::new(keypair))
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    pub fn connect(&self) {
        self.connected.send_if_modified(|connected| !std::mem::replace(connected, true));
    }

    pub fn disconnect(&self) {
        self.connected.send_if_modified(|connected| std::mem::replace(connected, false));
    }

    fn ensure_connected(&self) -> Result<(), WalletError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(WalletError::NotConnected)
        }
    }
}

#[async_trait]
impl WalletCapability for LocalWallet {
    fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    fn subscribe_connection(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    fn public_identity(&self) -> Option<Address> {
        self.is_connected().then(|| self.keypair.address())
    }

    async fn sign_raw(&self, message: &[u8]) -> Result<Signature, WalletError> {
        self.ensure_connected()?;
        Ok(self.keypair.sign(message))
    }

    async fn sign_and_submit(
        &self,
        mut transaction: Transaction,
        gateway: &dyn Gateway,
    ) -> Result<Signature, WalletError> {
        self.ensure_connected()?;

        let owner = self.keypair.address();
        if transaction.fee_payer() != Some(&owner) {
            return Err(WalletError::Signing(
                "transaction fee payer is not this wallet".into(),
            ));
        }
        transaction.partial_sign(&self.keypair)?;
        if !transaction.is_fully_signed() {
            return Err(WalletError::Signing(
                "transaction is missing co-signer signatures".into(),
            ));
        }

        let signature = gateway.send_transaction(&transaction).await?;
        info!("Wallet {owner} submitted {signature}");
        Ok(signature)
    }
}

use std::sync::Arc;

use sol_tx::Address;

use crate::config::ToolkitConfig;
use crate::error::ToolkitError;
use crate::gateway::Gateway;
use crate::wallet::WalletCapability;

/// Explicit context handed to every workflow: where the ledger is, who signs,
/// and how the toolkit is configured. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    gateway: Arc<dyn Gateway>,
    wallet: Arc<dyn WalletCapability>,
    config: Arc<ToolkitConfig>,
}

impl Session {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        wallet: Arc<dyn WalletCapability>,
        config: ToolkitConfig,
    ) -> Self {
        Self {
            gateway,
            wallet,
            config: Arc::new(config),
        }
    }

    pub fn gateway(&self) -> &dyn Gateway {
        self.gateway.as_ref()
    }

    pub fn wallet(&self) -> &dyn WalletCapability {
        self.wallet.as_ref()
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    /// The connected wallet's identity.
    pub fn owner(&self) -> Result<Address, ToolkitError> {
        if !self.wallet.is_connected() {
            return Err(ToolkitError::NotConnected);
        }
        self.wallet.public_identity().ok_or(ToolkitError::NotConnected)
    }

    pub(crate) fn gateway_handle(&self) -> Arc<dyn Gateway> {
        Arc::clone(&self.gateway)
    }

    pub(crate) fn wallet_handle(&self) -> Arc<dyn WalletCapability> {
        Arc::clone(&self.wallet)
    }
}

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
pub const FAUCET_FALLBACK_URL: &str = "https://faucet.solana.com";
/// Placeholder image used as token metadata URI when none is supplied.
pub const DEFAULT_METADATA_URI: &str = "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcSg600Xa4ws6jp54kMDNGYF232lIhY51QJqEA&s";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Ledger commitment level used for reads and confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// Whether a status reported by the ledger meets this level.
    pub fn is_satisfied_by(&self, status: &str) -> bool {
        match self {
            Commitment::Processed => {
                matches!(status, "processed" | "confirmed" | "finalized")
            }
            Commitment::Confirmed => matches!(status, "confirmed" | "finalized"),
            Commitment::Finalized => status == "finalized",
        }
    }
}

impl FromStr for Commitment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime settings shared by the gateway, the workflows and the refresher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitConfig {
    /// JSON-RPC endpoint (devnet by default).
    pub rpc_url: String,
    pub commitment: Commitment,
    /// Metadata URI used when a token is created without one.
    pub default_metadata_uri: String,
    /// Faucet suggested to the user when the airdrop is rate limited.
    pub faucet_fallback_url: String,
    pub balance_refresh_interval: Duration,
    /// Upper bound on waiting for a submitted transaction to confirm.
    pub confirm_timeout: Duration,
    pub confirm_poll_interval: Duration,
    /// Use the idempotent form of associated token account creation.
    pub idempotent_associated_account: bool,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEVNET_RPC_URL.to_string(),
            commitment: Commitment::Confirmed,
            default_metadata_uri: DEFAULT_METADATA_URI.to_string(),
            faucet_fallback_url: FAUCET_FALLBACK_URL.to_string(),
            balance_refresh_interval: Duration::from_secs(15),
            confirm_timeout: Duration::from_secs(30),
            confirm_poll_interval: Duration::from_millis(500),
            idempotent_associated_account: false,
        }
    }
}

impl ToolkitConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("SOLANA_RPC_URL") {
            config.rpc_url = url.trim().to_string();
        }
        if let Some(value) = get("SOLANA_COMMITMENT") {
            config.commitment = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "SOLANA_COMMITMENT",
                value,
            })?;
        }
        if let Some(uri) = get("DEFAULT_TOKEN_URI") {
            config.default_metadata_uri = uri.trim().to_string();
        }
        if let Some(url) = get("FAUCET_FALLBACK_URL") {
            config.faucet_fallback_url = url.trim().to_string();
        }
        if let Some(value) = get("BALANCE_REFRESH_SECS") {
            config.balance_refresh_interval = parse_secs("BALANCE_REFRESH_SECS", value)?;
        }
        if let Some(value) = get("CONFIRM_TIMEOUT_SECS") {
            config.confirm_timeout = parse_secs("CONFIRM_TIMEOUT_SECS", value)?;
        }
        if let Some(value) = get("IDEMPOTENT_ATA") {
            config.idempotent_associated_account = parse_bool("IDEMPOTENT_ATA", value)?;
        }

        Ok(config)
    }
}

fn parse_secs(name: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue { name, value }),
    }
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { name, value }),
    }
}

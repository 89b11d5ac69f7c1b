use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sol_tx::{Address, Blockhash, Signature, Transaction};

use super::{Gateway, GatewayError};
use crate::config::{Commitment, ToolkitConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    #[serde(default)]
    err: Option<Value>,
    confirmation_status: Option<String>,
}

/// [`Gateway`] backed by a Solana JSON-RPC endpoint.
pub struct RpcGateway {
    client: reqwest::Client,
    url: String,
    commitment: Commitment,
    confirm_timeout: Duration,
    poll_interval: Duration,
    next_id: AtomicU64,
}

impl RpcGateway {
    pub fn new(config: &ToolkitConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            client,
            url: config.rpc_url.clone(),
            commitment: config.commitment,
            confirm_timeout: config.confirm_timeout,
            poll_interval: config.confirm_poll_interval,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("rpc #{id} {method} -> {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let text = error_body(response).await;
            return Err(GatewayError::RateLimited(format!("HTTP 429: {text}")));
        }
        if !status.is_success() {
            let text = error_body(response).await;
            return Err(GatewayError::Request {
                error: text,
                status_code: status.as_u16(),
            });
        }

        let envelope: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(GatewayError::from_rpc_error(err.code, err.message));
        }
        envelope
            .result
            .ok_or_else(|| GatewayError::InvalidResponse(format!("{method}: missing result")))
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, GatewayError> {
        let statuses: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": false }]),
            )
            .await?;
        Ok(statuses.value.into_iter().next().flatten())
    }
}

fn parse_signature(raw: &str) -> Result<Signature, GatewayError> {
    raw.parse()
        .map_err(|e| GatewayError::InvalidResponse(format!("bad signature {raw:?}: {e}")))
}

#[async_trait]
impl Gateway for RpcGateway {
    async fn get_balance(&self, address: &Address) -> Result<u64, GatewayError> {
        let balance: WithContext<u64> = self
            .call(
                "getBalance",
                json!([address.to_string(), { "commitment": self.commitment.as_str() }]),
            )
            .await?;
        Ok(balance.value)
    }

    async fn get_latest_blockhash(&self) -> Result<Blockhash, GatewayError> {
        let latest: WithContext<LatestBlockhash> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment.as_str() }]),
            )
            .await?;
        latest.value.blockhash.parse().map_err(|e| {
            GatewayError::InvalidResponse(format!("bad blockhash {:?}: {e}", latest.value.blockhash))
        })
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_size: usize,
    ) -> Result<u64, GatewayError> {
        self.call("getMinimumBalanceForRentExemption", json!([data_size]))
            .await
    }

    async fn request_airdrop(
        &self,
        address: &Address,
        lamports: u64,
    ) -> Result<Signature, GatewayError> {
        let raw: String = self
            .call(
                "requestAirdrop",
                json!([address.to_string(), lamports, { "commitment": self.commitment.as_str() }]),
            )
            .await?;
        parse_signature(&raw)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, GatewayError> {
        let wire = transaction.serialize()?;
        let encoded = STANDARD.encode(&wire);
        debug!("sendTransaction: {} bytes on the wire", wire.len());

        let raw: String = self
            .call(
                "sendTransaction",
                json!([encoded, {
                    "encoding": "base64",
                    "preflightCommitment": self.commitment.as_str(),
                }]),
            )
            .await?;
        let signature = parse_signature(&raw)?;
        info!("Submitted transaction {signature}");
        Ok(signature)
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<bool, GatewayError> {
        let deadline = tokio::time::Instant::now() + self.confirm_timeout;

        loop {
            if let Some(status) = self.signature_status(signature).await? {
                if let Some(err) = status.err.filter(|e| !e.is_null()) {
                    return Err(GatewayError::TransactionFailed(format!("{signature}: {err}")));
                }
                if let Some(level) = status.confirmation_status.as_deref() {
                    if self.commitment.is_satisfied_by(level) {
                        debug!("{signature} reached {level}");
                        return Ok(true);
                    }
                }
            }

            if tokio::time::Instant::now() + self.poll_interval > deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Body of a failed HTTP response, kept even when it cannot be read.
async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"))
}

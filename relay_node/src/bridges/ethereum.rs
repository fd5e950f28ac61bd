//! EVM contract submission using ethers-rs
//!
//! Every reading becomes one legacy (EIP-155) transaction calling
//! `storeReading(string,int16,uint16,uint256,string)` on the configured
//! contract. The relay account signs locally and broadcasts the raw
//! transaction, so the RPC node never holds the key.

use crate::telemetry::{EncodedReading, SubmissionReceipt};
use anyhow::{anyhow, Result as AnyResult};
use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::providers::{
    Http, Middleware, Provider, ProviderError, RpcError as ProviderRpcError,
};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, BlockId, BlockNumber, Bytes, TransactionReceipt, TransactionRequest, H256, I256, U256,
    U64,
};
use ethers::utils::keccak256;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Solidity signature of the contract write method.
pub const STORE_READING_SIGNATURE: &str = "storeReading(string,int16,uint16,uint256,string)";

/// Stands in for the RPC endpoint URL in error text; hosted URLs embed API keys.
pub const REDACTED_ENDPOINT: &str = "<rpc endpoint>";

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("chain RPC unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("gas price lookup failed: {0}")]
    GasEstimationFailed(String),

    #[error("transaction signing failed: {0}")]
    SigningFailed(String),

    #[error("transaction rejected: {0}")]
    SubmissionRejected(String),

    /// The raw transaction left the relay but the node never acknowledged it.
    #[error("broadcast of {tx_hash} not acknowledged: {reason}")]
    BroadcastUnacknowledged { tx_hash: String, reason: String },

    #[error("transaction {tx_hash} not confirmed within {waited_secs}s")]
    ConfirmationTimeout { tx_hash: String, waited_secs: u64 },
}

impl ChainError {
    /// Stable identifier used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ChainError::NetworkUnavailable(_) => "network_unavailable",
            ChainError::GasEstimationFailed(_) => "gas_estimation_failed",
            ChainError::SigningFailed(_) => "signing_failed",
            ChainError::SubmissionRejected(_) => "submission_rejected",
            ChainError::BroadcastUnacknowledged { .. } => "broadcast_unacknowledged",
            ChainError::ConfirmationTimeout { .. } => "confirmation_timeout",
        }
    }

    /// Whether resubmitting the same reading later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChainError::NetworkUnavailable(_)
                | ChainError::GasEstimationFailed(_)
                | ChainError::BroadcastUnacknowledged { .. }
                | ChainError::ConfirmationTimeout { .. }
        )
    }

    /// Hash of a transaction that may be pending but was not confirmed.
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            ChainError::ConfirmationTimeout { tx_hash, .. }
            | ChainError::BroadcastUnacknowledged { tx_hash, .. } => Some(tx_hash),
            _ => None,
        }
    }
}

/// Commits encoded readings on-chain.
#[async_trait]
pub trait ChainSubmitter: Send + Sync {
    /// Submit one contract call and wait for it to be mined.
    async fn submit(&self, encoded: &EncodedReading) -> Result<SubmissionReceipt, ChainError>;
}

#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The node answered with a JSON-RPC error object.
    #[error("node returned error {code}: {message}")]
    Rejected { code: i64, message: String },

    #[error("{method} timed out after {after:?}")]
    Timeout { method: &'static str, after: Duration },

    #[error("transport failure: {0}")]
    Transport(String),
}

impl RpcError {
    /// True when the node saw the request and refused it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, RpcError::Rejected { .. })
    }
}

/// JSON-RPC calls the submitter depends on.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn chain_id(&self) -> Result<u64, RpcError>;
    async fn code_at(&self, address: Address) -> Result<Bytes, RpcError>;
    /// Transaction count including pending transactions.
    async fn transaction_count(&self, account: Address) -> Result<U256, RpcError>;
    async fn gas_price(&self) -> Result<U256, RpcError>;
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, RpcError>;
    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>, RpcError>;
}

/// HTTP JSON-RPC provider with a per-call timeout.
///
/// Error text never carries the endpoint URL.
pub struct EthersRpc {
    provider: Provider<Http>,
    timeout: Duration,
    /// Spellings of the endpoint URL that transport errors may echo
    endpoint_forms: Vec<String>,
}

impl EthersRpc {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| RpcError::Transport(format!("Failed to create HTTP provider: {}", e)))?;
        Ok(Self {
            provider,
            timeout,
            endpoint_forms: endpoint_forms(rpc_url),
        })
    }

    async fn timed<T, F>(&self, method: &'static str, call: F) -> Result<T, RpcError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| self.classify(e)),
            Err(_) => Err(RpcError::Timeout {
                method,
                after: self.timeout,
            }),
        }
    }

    fn classify(&self, err: ProviderError) -> RpcError {
        if let ProviderError::JsonRpcClientError(inner) = &err {
            if let Some(response) = inner.as_error_response() {
                return RpcError::Rejected {
                    code: response.code,
                    message: scrub_endpoint(&response.message, &self.endpoint_forms),
                };
            }
        }
        RpcError::Transport(scrub_endpoint(&err.to_string(), &self.endpoint_forms))
    }
}

/// The URL as configured plus its normalized form, longest first.
fn endpoint_forms(rpc_url: &str) -> Vec<String> {
    let raw = rpc_url.trim();
    let mut forms = vec![raw.to_string(), raw.trim_end_matches('/').to_string()];
    if let Ok(parsed) = reqwest::Url::parse(raw) {
        forms.push(parsed.as_str().to_string());
    }
    forms.retain(|form| !form.is_empty());
    forms.sort_by(|a, b| b.len().cmp(&a.len()));
    forms.dedup();
    forms
}

fn scrub_endpoint(message: &str, forms: &[String]) -> String {
    forms.iter().fold(message.to_string(), |text, form| {
        text.replace(form.as_str(), REDACTED_ENDPOINT)
    })
}

/// Scheme, host and port of an endpoint URL, safe to log.
pub fn endpoint_origin(rpc_url: &str) -> String {
    match reqwest::Url::parse(rpc_url.trim()) {
        Ok(url) => url.origin().ascii_serialization(),
        Err(_) => REDACTED_ENDPOINT.to_string(),
    }
}

#[async_trait]
impl ChainRpc for EthersRpc {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        let id = self.timed("eth_chainId", self.provider.get_chainid()).await?;
        Ok(id.as_u64())
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, RpcError> {
        self.timed("eth_getCode", self.provider.get_code(address, None))
            .await
    }

    async fn transaction_count(&self, account: Address) -> Result<U256, RpcError> {
        let pending = Some(BlockId::Number(BlockNumber::Pending));
        self.timed(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(account, pending),
        )
        .await
    }

    async fn gas_price(&self) -> Result<U256, RpcError> {
        self.timed("eth_gasPrice", self.provider.get_gas_price()).await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, RpcError> {
        self.timed("eth_sendRawTransaction", async {
            self.provider
                .send_raw_transaction(raw)
                .await
                .map(|pending| pending.tx_hash())
        })
        .await
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>, RpcError> {
        self.timed(
            "eth_getTransactionReceipt",
            self.provider.get_transaction_receipt(hash),
        )
        .await
    }
}

#[derive(Debug, Clone)]
pub struct EvmSubmitterConfig {
    pub contract: Address,
    pub chain_id: u64,
    /// Fixed gas ceiling for every call
    pub gas_limit: u64,
    /// Longest wait for a receipt after broadcast
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

/// Signs and submits `storeReading` calls from a single relay account.
pub struct EvmSubmitter {
    rpc: Arc<dyn ChainRpc>,
    wallet: LocalWallet,
    config: EvmSubmitterConfig,
    /// Held from nonce lookup through broadcast
    submission_lock: Mutex<()>,
}

impl EvmSubmitter {
    pub fn new(rpc: Arc<dyn ChainRpc>, wallet: LocalWallet, config: EvmSubmitterConfig) -> Self {
        let wallet = wallet.with_chain_id(config.chain_id);
        Self {
            rpc,
            wallet,
            config,
            submission_lock: Mutex::new(()),
        }
    }

    /// Relay account address.
    pub fn account(&self) -> Address {
        self.wallet.address()
    }

    /// Check that the RPC serves the configured chain and the contract exists.
    pub async fn verify_network(&self) -> AnyResult<()> {
        let chain_id = self
            .rpc
            .chain_id()
            .await
            .map_err(|e| anyhow!("Failed to get chain ID: {}", e))?;
        if chain_id != self.config.chain_id {
            return Err(anyhow!(
                "RPC endpoint serves chain {} but relay is configured for chain {}",
                chain_id,
                self.config.chain_id
            ));
        }

        let code = self
            .rpc
            .code_at(self.config.contract)
            .await
            .map_err(|e| anyhow!("Failed to get contract code: {}", e))?;
        if code.as_ref().is_empty() {
            return Err(anyhow!(
                "No contract code at address {:?}",
                self.config.contract
            ));
        }

        info!(
            "Connected to chain {} with contract {:?}",
            chain_id, self.config.contract
        );
        Ok(())
    }

    /// Nonce lookup, pricing, signing and broadcast for one call.
    async fn broadcast(&self, calldata: Vec<u8>) -> Result<H256, ChainError> {
        let _guard = self.submission_lock.lock().await;

        let nonce = self
            .rpc
            .transaction_count(self.account())
            .await
            .map_err(|e| ChainError::NetworkUnavailable(e.to_string()))?;

        let gas_price = self
            .rpc
            .gas_price()
            .await
            .map_err(|e| ChainError::GasEstimationFailed(e.to_string()))?;

        let tx: TypedTransaction = TransactionRequest::new()
            .from(self.account())
            .to(self.config.contract)
            .data(calldata)
            .nonce(nonce)
            .gas(self.config.gas_limit)
            .gas_price(gas_price)
            .chain_id(self.config.chain_id)
            .into();

        let signature = self
            .wallet
            .sign_transaction_sync(&tx)
            .map_err(|e| ChainError::SigningFailed(e.to_string()))?;
        let raw = tx.rlp_signed(&signature);
        let local_hash = H256::from(keccak256(raw.as_ref()));

        debug!(
            "Broadcasting transaction {} with nonce {} at gas price {}",
            format_hash(&local_hash),
            nonce,
            gas_price
        );

        match self.rpc.send_raw_transaction(raw).await {
            Ok(hash) => {
                if hash != local_hash {
                    warn!(
                        "Node reported hash {} for transaction {}",
                        format_hash(&hash),
                        format_hash(&local_hash)
                    );
                }
                Ok(hash)
            }
            Err(e) if e.is_rejection() => Err(ChainError::SubmissionRejected(e.to_string())),
            // The node may still have it in its mempool
            Err(e) => Err(ChainError::BroadcastUnacknowledged {
                tx_hash: format_hash(&local_hash),
                reason: e.to_string(),
            }),
        }
    }

    async fn await_receipt(&self, tx_hash: H256) -> Result<SubmissionReceipt, ChainError> {
        let hash_hex = format_hash(&tx_hash);

        let polling = async {
            loop {
                match self.rpc.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        if receipt.status == Some(U64::zero()) {
                            return Err(ChainError::SubmissionRejected(format!(
                                "transaction {} reverted",
                                hash_hex
                            )));
                        }
                        if let Some(block) = receipt.block_number {
                            return Ok(block.as_u64());
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Receipt lookup for {} failed: {}", hash_hex, e),
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.config.confirmation_timeout, polling).await {
            Ok(Ok(block)) => Ok(SubmissionReceipt {
                tx_hash: hash_hex,
                block,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ChainError::ConfirmationTimeout {
                tx_hash: hash_hex,
                waited_secs: self.config.confirmation_timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl ChainSubmitter for EvmSubmitter {
    async fn submit(&self, encoded: &EncodedReading) -> Result<SubmissionReceipt, ChainError> {
        let tx_hash = self.broadcast(encode_store_reading(encoded)).await?;
        info!("Transaction sent: {}", format_hash(&tx_hash));

        let receipt = self.await_receipt(tx_hash).await?;
        info!("Transaction {} mined in block {}", receipt.tx_hash, receipt.block);
        Ok(receipt)
    }
}

/// ABI-encoded calldata for `storeReading`.
pub fn encode_store_reading(encoded: &EncodedReading) -> Vec<u8> {
    let mut data = ethers::utils::id(STORE_READING_SIGNATURE).to_vec();
    data.extend(abi::encode(&[
        Token::String(encoded.device_id.clone()),
        Token::Int(I256::from(i64::from(encoded.temperature_tenths)).into_raw()),
        Token::Uint(U256::from(encoded.humidity_tenths)),
        Token::Uint(U256::from(encoded.timestamp_ms)),
        Token::String(encoded.cid.clone()),
    ]));
    data
}

fn format_hash(hash: &H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

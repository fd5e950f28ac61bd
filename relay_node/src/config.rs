//! Relay configuration from command-line flags and environment.
//!
//! Secrets (signing key, pinning token) have no default: a missing value
//! stops the relay at startup.

use crate::bridges::endpoint_origin;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use zeroize::Zeroizing;

pub const DEFAULT_PINNING_URL: &str = "https://api.pinata.cloud/pinning/pinJSONToIPFS";

#[derive(Parser)]
#[command(name = "telemetry-relay", version, about = "Relay sensor telemetry to IPFS and an EVM contract")]
pub struct Args {
    /// Address the HTTP API binds to
    #[arg(long, env = "RELAY_LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: SocketAddr,

    /// EVM JSON-RPC endpoint
    #[arg(long, env = "RELAY_RPC_URL", hide_env_values = true)]
    pub rpc_url: String,

    /// Address of the readings contract
    #[arg(long, env = "RELAY_CONTRACT_ADDRESS")]
    pub contract_address: String,

    /// Hex private key of the relay account
    #[arg(long, env = "RELAY_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Chain id used for EIP-155 signing
    #[arg(long, env = "RELAY_CHAIN_ID")]
    pub chain_id: u64,

    /// Pinning service endpoint
    #[arg(long, env = "RELAY_PINNING_URL", default_value = DEFAULT_PINNING_URL)]
    pub pinning_url: String,

    /// Bearer token for the pinning service
    #[arg(long, env = "RELAY_PINNING_JWT", hide_env_values = true)]
    pub pinning_jwt: String,

    /// Gas limit of every contract call
    #[arg(long, env = "RELAY_GAS_LIMIT", default_value_t = 300_000)]
    pub gas_limit: u64,

    #[arg(long, env = "RELAY_PIN_TIMEOUT_SECS", default_value_t = 30)]
    pub pin_timeout_secs: u64,

    /// Timeout of each JSON-RPC call
    #[arg(long, env = "RELAY_RPC_TIMEOUT_SECS", default_value_t = 15)]
    pub rpc_timeout_secs: u64,

    /// Longest wait for a transaction receipt
    #[arg(long, env = "RELAY_CONFIRMATION_TIMEOUT_SECS", default_value_t = 120)]
    pub confirmation_timeout_secs: u64,

    #[arg(long, env = "RELAY_RECEIPT_POLL_MS", default_value_t = 2_000)]
    pub receipt_poll_ms: u64,
}

/// Validated relay configuration
pub struct RelayConfig {
    pub listen_addr: SocketAddr,
    pub rpc_url: String,
    pub contract_address: Address,
    pub wallet: LocalWallet,
    pub chain_id: u64,
    pub pinning_url: String,
    pub pinning_jwt: Zeroizing<String>,
    pub gas_limit: u64,
    pub pin_timeout: Duration,
    pub rpc_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl RelayConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        let private_key = Zeroizing::new(args.private_key);
        let pinning_jwt = Zeroizing::new(args.pinning_jwt);

        if private_key.trim().is_empty() {
            return Err(anyhow!("RELAY_PRIVATE_KEY is empty"));
        }
        if pinning_jwt.trim().is_empty() {
            return Err(anyhow!("RELAY_PINNING_JWT is empty"));
        }
        if args.rpc_url.trim().is_empty() {
            return Err(anyhow!("RELAY_RPC_URL is empty"));
        }

        // The parse error is not forwarded since it may echo key material
        let wallet = private_key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|_| anyhow!("RELAY_PRIVATE_KEY is not a valid secp256k1 private key"))?
            .with_chain_id(args.chain_id);

        let contract_address = args
            .contract_address
            .trim()
            .parse::<Address>()
            .with_context(|| format!("invalid contract address {:?}", args.contract_address))?;

        if args.gas_limit == 0 {
            return Err(anyhow!("gas limit must be greater than zero"));
        }
        if args.receipt_poll_ms == 0 {
            return Err(anyhow!("receipt poll interval must be greater than zero"));
        }

        Ok(Self {
            listen_addr: args.listen_addr,
            rpc_url: args.rpc_url,
            contract_address,
            wallet,
            chain_id: args.chain_id,
            pinning_url: args.pinning_url,
            pinning_jwt,
            gas_limit: args.gas_limit,
            pin_timeout: Duration::from_secs(args.pin_timeout_secs),
            rpc_timeout: Duration::from_secs(args.rpc_timeout_secs),
            confirmation_timeout: Duration::from_secs(args.confirmation_timeout_secs),
            receipt_poll_interval: Duration::from_millis(args.receipt_poll_ms),
        })
    }

    pub fn account(&self) -> Address {
        self.wallet.address()
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("listen_addr", &self.listen_addr)
            .field("rpc_url", &endpoint_origin(&self.rpc_url))
            .field("contract_address", &self.contract_address)
            .field("account", &self.account())
            .field("chain_id", &self.chain_id)
            .field("pinning_url", &self.pinning_url)
            .field("pinning_jwt", &"<redacted>")
            .field("gas_limit", &self.gas_limit)
            .field("pin_timeout", &self.pin_timeout)
            .field("rpc_timeout", &self.rpc_timeout)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .field("receipt_poll_interval", &self.receipt_poll_interval)
            .finish()
    }
}

//! Outbound bridges: content pinning and EVM contract submission

pub mod ethereum;
pub mod ipfs;

pub use ethereum::{
    endpoint_origin, ChainError, ChainRpc, ChainSubmitter, EthersRpc, EvmSubmitter,
    EvmSubmitterConfig, RpcError,
};
pub use ipfs::{ContentPinner, PinError, PinataPinner};

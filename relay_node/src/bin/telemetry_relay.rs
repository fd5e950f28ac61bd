use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::sync::Arc;
use telemetry_relay::{
    api::{self, AppState},
    bridges::{endpoint_origin, EthersRpc, EvmSubmitter, EvmSubmitterConfig, PinataPinner},
    config::{Args, RelayConfig},
    RelayService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RelayConfig::from_args(Args::parse()).context("invalid relay configuration")?;

    info!("Starting telemetry relay...");
    info!("Relay account: {:?}", config.account());
    info!("Chain ID: {}", config.chain_id);
    info!("Contract: {:?}", config.contract_address);
    info!("RPC endpoint: {}", endpoint_origin(&config.rpc_url));

    let rpc = EthersRpc::new(&config.rpc_url, config.rpc_timeout)?;
    let submitter = EvmSubmitter::new(
        Arc::new(rpc),
        config.wallet.clone(),
        EvmSubmitterConfig {
            contract: config.contract_address,
            chain_id: config.chain_id,
            gas_limit: config.gas_limit,
            confirmation_timeout: config.confirmation_timeout,
            poll_interval: config.receipt_poll_interval,
        },
    );
    submitter
        .verify_network()
        .await
        .context("chain RPC check failed")?;

    let pinner = PinataPinner::new(
        config.pinning_url.clone(),
        config.pinning_jwt.clone(),
        config.pin_timeout,
    )?;
    info!("Pinning service: {}", config.pinning_url);

    let account = format!("{:?}", submitter.account());
    let relay = RelayService::new(Arc::new(pinner), Arc::new(submitter));
    let state = AppState::new(Arc::new(relay), account);

    api::serve(config.listen_addr, state).await
}

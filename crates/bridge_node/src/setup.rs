use alloy::primitives::{Address, U256};
use bridge_base_layer::errors::BaseLayerError;
use bridge_base_layer::BaseLayer;
use thiserror::Error;
use tracing::info;

use crate::config::BridgeNodeConfig;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("the {name} contract at {address} does not exist or is not intact")]
    ContractMissing { name: &'static str, address: Address },
    #[error(
        "serious bridge setup error: the validator proxy contract at the address the home \
         bridge points to ({address}) does not exist or is not intact"
    )]
    ValidatorProxyMissing { address: Address },
    #[error("serious bridge setup error: the bridge has no funds")]
    BridgeWithoutFunds,
    #[error(transparent)]
    BaseLayer(#[from] BaseLayerError),
}

/// Fails fast on misconfiguration before any task is spawned: all three
/// contracts must have code and the home bridge must hold funds to release.
pub async fn sanity_check_contracts(
    config: &BridgeNodeConfig,
    foreign_base_layer: &dyn BaseLayer,
    home_base_layer: &dyn BaseLayer,
) -> Result<(), SetupError> {
    ensure_contract_exists(
        foreign_base_layer,
        "foreign token",
        config.foreign_token_contract_address,
    )
    .await?;
    ensure_contract_exists(home_base_layer, "home bridge", config.home_bridge_contract_address)
        .await?;

    let proxy_address = home_base_layer
        .validator_proxy_address(config.home_bridge_contract_address)
        .await?;
    if home_base_layer.code_size(proxy_address).await? == 0 {
        return Err(SetupError::ValidatorProxyMissing { address: proxy_address });
    }

    let bridge_balance = home_base_layer.balance(config.home_bridge_contract_address).await?;
    if bridge_balance == U256::ZERO {
        return Err(SetupError::BridgeWithoutFunds);
    }

    info!("Bridge contracts validated.");
    Ok(())
}

async fn ensure_contract_exists(
    base_layer: &dyn BaseLayer,
    name: &'static str,
    address: Address,
) -> Result<(), SetupError> {
    if base_layer.code_size(address).await? == 0 {
        return Err(SetupError::ContractMissing { name, address });
    }
    Ok(())
}

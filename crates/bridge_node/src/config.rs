use std::path::Path;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::Context;
use bridge_base_layer::ethereum_base_layer::EthereumBaseLayerConfig;
use bridge_confirmation::{
    ConfirmationSenderConfig,
    ConfirmationTaskPlannerConfig,
    ConfirmationWatcherConfig,
};
use bridge_event_fetcher::EventFetcherConfig;
use bridge_monitoring_endpoint::MonitoringEndpointConfig;
use bridge_validator_watchers::{ValidatorBalanceWatcherConfig, ValidatorStatusWatcherConfig};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

/// Environment variable consulted when the key is not in the config file.
pub const VALIDATOR_PRIVATE_KEY_ENV: &str = "BRIDGE_VALIDATOR_PRIVATE_KEY";

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct LoggingConfig {
    /// A `tracing` filter directive string, e.g. `info,bridge_confirmation=debug`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_owned() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BridgeNodeConfig {
    #[validate(nested)]
    #[serde(default)]
    pub foreign_chain: EthereumBaseLayerConfig,
    #[validate(nested)]
    #[serde(default)]
    pub home_chain: EthereumBaseLayerConfig,

    pub foreign_token_contract_address: Address,
    pub foreign_bridge_contract_address: Address,
    pub home_bridge_contract_address: Address,

    #[validate(nested)]
    #[serde(default)]
    pub foreign_fetcher: EventFetcherConfig,
    #[validate(nested)]
    #[serde(default)]
    pub home_fetcher: EventFetcherConfig,

    #[validate(nested)]
    #[serde(default)]
    pub planner: ConfirmationTaskPlannerConfig,
    #[validate(nested)]
    #[serde(default)]
    pub sender: ConfirmationSenderConfig,
    #[validate(nested)]
    #[serde(default)]
    pub watcher: ConfirmationWatcherConfig,

    #[validate(nested)]
    #[serde(default)]
    pub status_watcher: ValidatorStatusWatcherConfig,
    #[validate(nested)]
    #[serde(default)]
    pub balance_watcher: ValidatorBalanceWatcherConfig,

    /// Absent section disables the debug endpoint.
    #[serde(default)]
    pub monitoring_endpoint: Option<MonitoringEndpointConfig>,

    #[validate(nested)]
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Hex-encoded validator key. Prefer the environment variable over
    /// putting key material into the config file.
    #[serde(default, skip_serializing)]
    pub validator_private_key: Option<String>,
}

impl BridgeNodeConfig {
    pub fn validator_signer(&self) -> anyhow::Result<PrivateKeySigner> {
        let key = self
            .validator_private_key
            .as_deref()
            .with_context(|| {
                format!(
                    "no validator key: set validator_private_key in the config file or the \
                     {VALIDATOR_PRIVATE_KEY_ENV} environment variable"
                )
            })?;
        key.parse::<PrivateKeySigner>().context("invalid validator private key")
    }

    /// The non-secret parameters served by the internal-state endpoint.
    pub fn public_config(&self) -> serde_json::Value {
        json!({
            "foreign_rpc_url": self.foreign_chain.node_url,
            "home_rpc_url": self.home_chain.node_url,
            "foreign_chain_max_reorg_depth": self.foreign_fetcher.max_reorg_depth,
            "home_chain_max_reorg_depth": self.home_fetcher.max_reorg_depth,
            "foreign_chain_token_contract_address": self.foreign_token_contract_address,
            "foreign_bridge_contract_address": self.foreign_bridge_contract_address,
            "home_bridge_contract_address": self.home_bridge_contract_address,
            "foreign_chain_event_fetch_start_block_number": self.foreign_fetcher.start_block_number,
            "home_chain_event_fetch_start_block_number": self.home_fetcher.start_block_number,
        })
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<BridgeNodeConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let mut config: BridgeNodeConfig =
        toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))?;
    if config.validator_private_key.is_none() {
        config.validator_private_key = std::env::var(VALIDATOR_PRIVATE_KEY_ENV).ok();
    }
    config.validate().context("config validation failed")?;
    Ok(config)
}

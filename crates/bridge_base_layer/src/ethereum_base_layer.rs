use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::{Filter, Log};
use alloy::transports::http::Http;
use async_trait::async_trait;
use bridge_time::converters::deserialize_float_seconds_to_duration;
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::contracts::{HomeBridge, LogQuery, ValidatorProxy};
use crate::errors::BaseLayerError;
use crate::{BaseLayer, BaseLayerResult, ReceiptSummary};

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct EthereumBaseLayerConfig {
    /// JSON-RPC endpoint of the chain node.
    pub node_url: Url,
    /// Timeout (seconds) for a single RPC request.
    #[serde(deserialize_with = "deserialize_float_seconds_to_duration")]
    pub rpc_timeout: Duration,
}

impl Default for EthereumBaseLayerConfig {
    fn default() -> Self {
        Self {
            node_url: "http://localhost:8545".parse().expect("default url is valid"),
            rpc_timeout: Duration::from_secs(10),
        }
    }
}

/// One JSON-RPC connection pool per chain endpoint, shared by every task of
/// that chain.
#[derive(Clone, Debug)]
pub struct EthereumBaseLayer {
    provider: DynProvider,
    pub config: EthereumBaseLayerConfig,
}

impl EthereumBaseLayer {
    pub fn new(config: EthereumBaseLayerConfig) -> Result<Self, BaseLayerError> {
        let client = reqwest::Client::builder().timeout(config.rpc_timeout).build()?;
        let transport = Http::with_client(client, config.node_url.clone());
        let rpc_client = RpcClient::new(transport, false);
        let provider = RootProvider::new(rpc_client).erased();
        Ok(Self { provider, config })
    }
}

#[async_trait]
impl BaseLayer for EthereumBaseLayer {
    async fn latest_block_number(&self) -> BaseLayerResult<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn get_logs(
        &self,
        query: &LogQuery,
        from_block: u64,
        to_block: u64,
    ) -> BaseLayerResult<Vec<Log>> {
        let mut filter = Filter::new()
            .address(query.contract_address)
            .event_signature(query.topic0)
            .from_block(from_block)
            .to_block(to_block);
        if let Some(topic1) = query.topic1 {
            filter = filter.topic1(topic1);
        }
        if let Some(topic2) = query.topic2 {
            filter = filter.topic2(topic2);
        }
        Ok(self.provider.get_logs(&filter).await?)
    }

    async fn next_nonce(&self, address: Address) -> BaseLayerResult<u64> {
        Ok(self.provider.get_transaction_count(address).pending().await?)
    }

    async fn balance(&self, address: Address) -> BaseLayerResult<U256> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn chain_id(&self) -> BaseLayerResult<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn code_size(&self, address: Address) -> BaseLayerResult<usize> {
        Ok(self.provider.get_code_at(address).await?.len())
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> BaseLayerResult<B256> {
        let pending = self.provider.send_raw_transaction(raw.as_ref()).await?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> BaseLayerResult<Option<ReceiptSummary>> {
        let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? else {
            return Ok(None);
        };
        // A receipt without a block number is still pending.
        let Some(block_number) = receipt.block_number else {
            return Ok(None);
        };
        Ok(Some(ReceiptSummary {
            tx_hash: receipt.transaction_hash,
            block_number,
            succeeded: receipt.status(),
        }))
    }

    async fn validator_proxy_address(&self, home_bridge: Address) -> BaseLayerResult<Address> {
        let contract = HomeBridge::new(home_bridge, self.provider.clone());
        Ok(contract.validatorProxy().call().await?)
    }

    async fn is_validator(&self, proxy: Address, validator: Address) -> BaseLayerResult<bool> {
        let contract = ValidatorProxy::new(proxy, self.provider.clone());
        Ok(contract.isValidator(validator).call().await?)
    }
}

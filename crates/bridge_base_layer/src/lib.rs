//! Access to the two chains over JSON-RPC.
//!
//! [`BaseLayer`] is the complete RPC surface the daemon needs; every task
//! takes it as a trait object so tests can substitute [`MockBaseLayer`].
//! [`EthereumBaseLayer`] is the production implementation, one per chain
//! endpoint, sharing a single connection pool among the tasks of that chain.

pub mod contracts;
pub mod errors;
pub mod ethereum_base_layer;
pub mod retry;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::Log;
use async_trait::async_trait;

use crate::contracts::LogQuery;
use crate::errors::BaseLayerError;

pub type BaseLayerResult<T> = Result<T, BaseLayerError>;

/// The subset of a transaction receipt the daemon inspects. The full alloy
/// receipt carries far more than burial tracking needs and is unwieldy to
/// construct in tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub tx_hash: B256,
    pub block_number: u64,
    pub succeeded: bool,
}

#[cfg_attr(any(feature = "testing", test), mockall::automock)]
#[async_trait]
pub trait BaseLayer: Send + Sync {
    /// The current head block number.
    async fn latest_block_number(&self) -> BaseLayerResult<u64>;

    /// All logs matching `query` in `[from_block, to_block]`, in on-chain
    /// order.
    async fn get_logs(
        &self,
        query: &LogQuery,
        from_block: u64,
        to_block: u64,
    ) -> BaseLayerResult<Vec<Log>>;

    /// The pending-inclusive transaction count, i.e. the next usable nonce.
    async fn next_nonce(&self, address: Address) -> BaseLayerResult<u64>;

    async fn balance(&self, address: Address) -> BaseLayerResult<U256>;

    async fn chain_id(&self) -> BaseLayerResult<u64>;

    /// Size of the code deployed at `address`; zero means no contract.
    async fn code_size(&self, address: Address) -> BaseLayerResult<usize>;

    async fn send_raw_transaction(&self, raw: &Bytes) -> BaseLayerResult<B256>;

    /// `None` while the transaction is unmined or unknown to the node.
    async fn transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> BaseLayerResult<Option<ReceiptSummary>>;

    /// Reads `validatorProxy()` from the home bridge contract.
    async fn validator_proxy_address(&self, home_bridge: Address) -> BaseLayerResult<Address>;

    /// Whether `validator` is currently a member of the validator set.
    async fn is_validator(&self, proxy: Address, validator: Address) -> BaseLayerResult<bool>;
}

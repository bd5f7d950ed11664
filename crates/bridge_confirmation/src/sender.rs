use std::sync::Arc;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{Ethereum, EthereumWallet, TransactionBuilder, TransactionBuilderError};
use alloy::primitives::Address;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use bridge_base_layer::contracts::HomeBridge;
use bridge_base_layer::errors::BaseLayerError;
use bridge_base_layer::retry::retry_transient;
use bridge_base_layer::BaseLayer;
use bridge_time::time::SharedClock;
use bridge_types::{PendingTransaction, TransferEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use validator::Validate;

#[cfg(test)]
#[path = "sender_test.rs"]
mod sender_test;

/// Hard-coded to avoid an `estimateGas` round-trip, which would fail before
/// signing: the contract asserts the sender is a validator and `from` is
/// unknown until the transaction is signed. The contract enforces its own
/// upper bound.
pub const CONFIRMATION_TRANSACTION_GAS_LIMIT: u64 = 500_000;

#[derive(Debug, Error)]
pub enum ConfirmationSenderError {
    /// Non-transient RPC failure. A rejected submission that is neither
    /// transient nor a nonce race means the daemon is misconfigured.
    #[error(transparent)]
    BaseLayer(#[from] BaseLayerError),
    #[error("failed to build confirmation transaction: {0}")]
    Build(#[from] TransactionBuilderError<Ethereum>),
    #[error("{queue} queue closed")]
    QueueClosed { queue: &'static str },
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct ConfirmationSenderConfig {
    /// Gas price (wei) for confirmation transactions on the home chain.
    pub gas_price: u128,
}

impl Default for ConfirmationSenderConfig {
    fn default() -> Self {
        Self { gas_price: 1_000_000_000 }
    }
}

/// Turns confirmation tasks into signed `confirmTransfer` submissions.
///
/// The planner hands each transfer hash to this task at most once per process
/// lifetime, so every received task becomes exactly one transaction (possibly
/// resubmitted verbatim after transient failures).
pub struct ConfirmationSender {
    config: ConfirmationSenderConfig,
    home_bridge_address: Address,
    foreign_bridge_address: Address,
    validator_address: Address,
    wallet: EthereumWallet,
    base_layer: Arc<dyn BaseLayer>,
    confirmation_task_queue: mpsc::Receiver<TransferEvent>,
    pending_transaction_queue: mpsc::Sender<PendingTransaction>,
    clock: SharedClock,
}

impl ConfirmationSender {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ConfirmationSenderConfig,
        home_bridge_address: Address,
        foreign_bridge_address: Address,
        signer: PrivateKeySigner,
        base_layer: Arc<dyn BaseLayer>,
        confirmation_task_queue: mpsc::Receiver<TransferEvent>,
        pending_transaction_queue: mpsc::Sender<PendingTransaction>,
        clock: SharedClock,
    ) -> Self {
        let validator_address = signer.address();
        Self {
            config,
            home_bridge_address,
            foreign_bridge_address,
            validator_address,
            wallet: EthereumWallet::new(signer),
            base_layer,
            confirmation_task_queue,
            pending_transaction_queue,
            clock,
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ConfirmationSenderError> {
        info!(validator = %self.validator_address, "Starting confirmation sender.");
        self.warn_if_not_validator().await?;
        let base_layer = self.base_layer.clone();
        let chain_id = retry_transient("eth_chainId", || base_layer.chain_id()).await?;

        loop {
            let transfer = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Confirmation sender stopping.");
                    return Ok(());
                }
                maybe_transfer = self.confirmation_task_queue.recv() => {
                    match maybe_transfer {
                        Some(transfer) => transfer,
                        None => {
                            return Err(ConfirmationSenderError::QueueClosed {
                                queue: "confirmation task",
                            });
                        }
                    }
                }
            };
            if !self.sanity_check_transfer(&transfer) {
                continue;
            }
            self.send_confirmation_transaction(&transfer, chain_id).await?;
        }
    }

    async fn warn_if_not_validator(&self) -> Result<(), ConfirmationSenderError> {
        let base_layer = self.base_layer.clone();
        let home_bridge = self.home_bridge_address;
        let proxy = retry_transient("validatorProxy", || {
            base_layer.validator_proxy_address(home_bridge)
        })
        .await?;
        let validator = self.validator_address;
        let is_validator =
            retry_transient("isValidator", || base_layer.is_validator(proxy, validator)).await?;
        if !is_validator {
            warn!(
                "The address {} is not a bridge validator to confirm transfers on the home \
                 bridge contract!",
                self.validator_address
            );
        }
        Ok(())
    }

    /// A transfer whose tokens did not go to the bridge escrow must never be
    /// confirmed, whatever the fetcher's filters said.
    fn sanity_check_transfer(&self, transfer: &TransferEvent) -> bool {
        if transfer.token_receiver == self.foreign_bridge_address {
            return true;
        }
        warn!(
            transfer_hash = %transfer.transfer_hash,
            token_receiver = %transfer.token_receiver,
            "Dropping transfer task whose token receiver is not the bridge escrow."
        );
        false
    }

    async fn send_confirmation_transaction(
        &mut self,
        transfer: &TransferEvent,
        chain_id: u64,
    ) -> Result<(), ConfirmationSenderError> {
        let base_layer = self.base_layer.clone();
        let validator = self.validator_address;
        let nonce = retry_transient("eth_getTransactionCount", || {
            base_layer.next_nonce(validator)
        })
        .await?;

        let mut pending = self.sign_confirmation(transfer, nonce, chain_id).await?;
        let submission = retry_transient("eth_sendRawTransaction", || {
            base_layer.send_raw_transaction(&pending.raw)
        })
        .await;

        if let Err(error) = submission {
            if !error.is_nonce_too_low() {
                return Err(error.into());
            }
            // Nonce race: the node momentarily reported a stale pending
            // count. Refetch, rebuild, resign and resubmit once.
            warn!(nonce, "Confirmation rejected for a stale nonce, refetching and resubmitting.");
            let nonce = retry_transient("eth_getTransactionCount", || {
                base_layer.next_nonce(validator)
            })
            .await?;
            pending = self.sign_confirmation(transfer, nonce, chain_id).await?;
            retry_transient("eth_sendRawTransaction", || {
                base_layer.send_raw_transaction(&pending.raw)
            })
            .await?;
        }

        info!(
            transfer_hash = %transfer.transfer_hash,
            tx_hash = %pending.tx_hash,
            nonce = pending.nonce,
            "Sent confirmation transaction."
        );
        self.pending_transaction_queue
            .send(pending)
            .await
            .map_err(|_| ConfirmationSenderError::QueueClosed { queue: "pending transaction" })
    }

    async fn sign_confirmation(
        &self,
        transfer: &TransferEvent,
        nonce: u64,
        chain_id: u64,
    ) -> Result<PendingTransaction, ConfirmationSenderError> {
        let call = HomeBridge::confirmTransferCall {
            transferHash: transfer.transfer_hash.0,
            transactionHash: transfer.transaction_hash,
            amount: transfer.amount,
            recipient: transfer.recipient,
        };
        let request = TransactionRequest::default()
            .with_to(self.home_bridge_address)
            .with_input(call.abi_encode())
            .with_nonce(nonce)
            .with_chain_id(chain_id)
            .with_gas_limit(CONFIRMATION_TRANSACTION_GAS_LIMIT)
            .with_gas_price(self.config.gas_price);
        let envelope = request.build(&self.wallet).await?;

        Ok(PendingTransaction {
            raw: envelope.encoded_2718().into(),
            tx_hash: *envelope.tx_hash(),
            nonce,
            transfer_hash: transfer.transfer_hash,
            submitted_at: self.clock.now(),
        })
    }
}

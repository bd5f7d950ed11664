//! Bindings for the three bridge contracts and decoding of their logs.

use alloy::primitives::{Address, B256};
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;
use bridge_types::{
    compute_transfer_hash,
    BridgeEvent,
    CompletionEvent,
    ConfirmationEvent,
    EventKind,
    TransferEvent,
    TransferHash,
};
use thiserror::Error;

#[cfg(test)]
#[path = "contracts_test.rs"]
mod contracts_test;

sol! {
    #[sol(rpc)]
    contract ForeignToken {
        event Transfer(address indexed from, address indexed to, uint256 value);
    }

    #[sol(rpc)]
    contract HomeBridge {
        function confirmTransfer(
            bytes32 transferHash,
            bytes32 transactionHash,
            uint256 amount,
            address recipient
        ) external;

        function validatorProxy() external view returns (address);

        event Confirmation(bytes32 transferHash, address indexed validator);
        event TransferCompleted(bytes32 transferHash);
    }

    #[sol(rpc)]
    contract ValidatorProxy {
        function isValidator(address validator) external view returns (bool);
    }
}

/// A single `eth_getLogs` filter: one contract, one event signature, and up
/// to two indexed-argument constraints. Event kinds with different indexed
/// filters cannot share a query, so the fetcher runs one query per kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogQuery {
    pub contract_address: Address,
    pub topic0: B256,
    pub topic1: Option<B256>,
    pub topic2: Option<B256>,
}

/// Foreign-chain `Transfer` logs into the bridge escrow.
pub fn transfer_log_query(token: Address, foreign_bridge: Address) -> LogQuery {
    LogQuery {
        contract_address: token,
        topic0: ForeignToken::Transfer::SIGNATURE_HASH,
        topic1: None,
        // The indexed `to` argument: only deposits into the escrow.
        topic2: Some(foreign_bridge.into_word()),
    }
}

/// Home-chain `Confirmation` logs emitted for this validator only.
pub fn confirmation_log_query(home_bridge: Address, validator: Address) -> LogQuery {
    LogQuery {
        contract_address: home_bridge,
        topic0: HomeBridge::Confirmation::SIGNATURE_HASH,
        topic1: Some(validator.into_word()),
        topic2: None,
    }
}

/// Home-chain `TransferCompleted` logs, unfiltered.
pub fn completion_log_query(home_bridge: Address) -> LogQuery {
    LogQuery {
        contract_address: home_bridge,
        topic0: HomeBridge::TransferCompleted::SIGNATURE_HASH,
        topic1: None,
        topic2: None,
    }
}

#[derive(Debug, Error)]
pub enum EventDecodeError {
    /// Logs below the reorg horizon always carry block metadata; a pending
    /// log here means the filter is broken.
    #[error("log is missing block number, transaction hash or log index")]
    MissingMetadata,
    #[error(transparent)]
    Abi(#[from] alloy::sol_types::Error),
}

/// Decodes a raw log fetched for `kind` into a [`BridgeEvent`].
pub fn decode_bridge_event(kind: EventKind, log: &Log) -> Result<BridgeEvent, EventDecodeError> {
    let block_number = log.block_number.ok_or(EventDecodeError::MissingMetadata)?;
    let transaction_hash = log.transaction_hash.ok_or(EventDecodeError::MissingMetadata)?;
    let log_index = log.log_index.ok_or(EventDecodeError::MissingMetadata)?;

    let event = match kind {
        EventKind::Transfer => {
            let transfer = ForeignToken::Transfer::decode_log(&log.inner)?.data;
            BridgeEvent::Transfer(TransferEvent {
                transfer_hash: compute_transfer_hash(transaction_hash, log_index),
                transaction_hash,
                log_index,
                block_number,
                amount: transfer.value,
                // Deposit convention: the ERC-20 `from` (the depositor) is
                // the recipient of the mirror funds on the home chain.
                recipient: transfer.from,
                token_receiver: transfer.to,
            })
        }
        EventKind::Confirmation => {
            let confirmation = HomeBridge::Confirmation::decode_log(&log.inner)?.data;
            BridgeEvent::Confirmation(ConfirmationEvent {
                transfer_hash: TransferHash(confirmation.transferHash),
                block_number,
            })
        }
        EventKind::Completion => {
            let completion = HomeBridge::TransferCompleted::decode_log(&log.inner)?.data;
            BridgeEvent::Completion(CompletionEvent {
                transfer_hash: TransferHash(completion.transferHash),
                block_number,
            })
        }
    };
    Ok(event)
}

use std::fmt;

use alloy::primitives::{keccak256, Address, B256, U256};
use serde::Serialize;

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

/// The 32-byte identifier binding a foreign-chain transfer to its home-chain
/// confirmations and completion. Computed as the keccak256 of the transaction
/// hash followed by the log index encoded as a big-endian 256-bit integer, so
/// two transfers never share a hash even within one transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TransferHash(pub B256);

impl fmt::Display for TransferHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TransferHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransferHash({})", self.0)
    }
}

pub fn compute_transfer_hash(transaction_hash: B256, log_index: u64) -> TransferHash {
    let mut preimage = [0_u8; 64];
    preimage[..32].copy_from_slice(transaction_hash.as_slice());
    preimage[32..].copy_from_slice(&U256::from(log_index).to_be_bytes::<32>());
    TransferHash(keccak256(preimage))
}

/// Which chain a task observes. Used for logging and task naming only; the
/// event semantics are fixed by [`EventKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ChainRole {
    Foreign,
    Home,
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainRole::Foreign => write!(f, "foreign"),
            ChainRole::Home => write!(f, "home"),
        }
    }
}

/// The three event kinds a transfer passes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    Transfer,
    Confirmation,
    Completion,
}

impl EventKind {
    /// The Solidity event name.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Transfer => "Transfer",
            EventKind::Confirmation => "Confirmation",
            EventKind::Completion => "TransferCompleted",
        }
    }
}

/// A decoded foreign-chain ERC-20 `Transfer` into the bridge escrow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferEvent {
    pub transfer_hash: TransferHash,
    pub transaction_hash: B256,
    pub log_index: u64,
    pub block_number: u64,
    pub amount: U256,
    /// The ERC-20 `from` address. The bridge's deposit convention is that the
    /// depositor receives the mirror funds on the home chain, so this is the
    /// `recipient` argument of `confirmTransfer`.
    pub recipient: Address,
    /// The ERC-20 `to` address. Must equal the foreign bridge escrow; checked
    /// by the sender's sanity check before a confirmation is built.
    pub token_receiver: Address,
}

/// A home-chain `Confirmation` log emitted for this validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationEvent {
    pub transfer_hash: TransferHash,
    pub block_number: u64,
}

/// A home-chain `TransferCompleted` log (quorum reached, funds released).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionEvent {
    pub transfer_hash: TransferHash,
    pub block_number: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeEvent {
    Transfer(TransferEvent),
    Confirmation(ConfirmationEvent),
    Completion(CompletionEvent),
}

impl BridgeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            BridgeEvent::Transfer(_) => EventKind::Transfer,
            BridgeEvent::Confirmation(_) => EventKind::Confirmation,
            BridgeEvent::Completion(_) => EventKind::Completion,
        }
    }

    pub fn transfer_hash(&self) -> TransferHash {
        match self {
            BridgeEvent::Transfer(event) => event.transfer_hash,
            BridgeEvent::Confirmation(event) => event.transfer_hash,
            BridgeEvent::Completion(event) => event.transfer_hash,
        }
    }

    pub fn block_number(&self) -> u64 {
        match self {
            BridgeEvent::Transfer(event) => event.block_number,
            BridgeEvent::Confirmation(event) => event.block_number,
            BridgeEvent::Completion(event) => event.block_number,
        }
    }
}

use std::time::Instant;

use alloy::primitives::{Bytes, B256};

use crate::events::{BridgeEvent, EventKind, TransferHash};

/// An item on a fetcher's output queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchedEvent {
    /// A decoded log, in `(block_number, log_index)` order per chain.
    Event(BridgeEvent),
    /// The fetcher caught up to the safe head for this event kind. Drives the
    /// recorder's sync watermarks; emitted every poll round, also when no
    /// logs arrived.
    SyncedUntil { kind: EventKind, timestamp: Instant },
}

/// Validator-state changes and shutdown requests on the control bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlMessage {
    ValidatorBecameActive,
    ValidatorBecameInactive,
    BalanceOk,
    BalanceLow,
    Shutdown,
}

/// A signed, submitted confirmation transaction awaiting burial below the
/// reorg horizon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    pub raw: Bytes,
    pub tx_hash: B256,
    pub nonce: u64,
    pub transfer_hash: TransferHash,
    pub submitted_at: Instant,
}

//! Shared types of the bridge validator: transfer identifiers, decoded chain
//! events, and the messages passed between the daemon's tasks.

pub mod events;
pub mod messages;

pub use events::{
    compute_transfer_hash,
    BridgeEvent,
    ChainRole,
    CompletionEvent,
    ConfirmationEvent,
    EventKind,
    TransferEvent,
    TransferHash,
};
pub use messages::{ControlMessage, FetchedEvent, PendingTransaction};

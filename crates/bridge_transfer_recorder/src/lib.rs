//! The in-memory projection of per-transfer state across both chains.

pub mod transfer_recorder;

pub use transfer_recorder::{RecorderError, RecorderSummary, TransferRecorder};

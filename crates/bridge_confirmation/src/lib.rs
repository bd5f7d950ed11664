//! The confirmation pipeline: the planner decides which transfers still need
//! confirming, the sender signs and submits `confirmTransfer` transactions,
//! and the watcher tracks them until they are buried below the reorg horizon.

pub mod planner;
pub mod sender;
pub mod watcher;

pub use planner::{ConfirmationTaskPlanner, ConfirmationTaskPlannerConfig, PlannerError};
pub use sender::{ConfirmationSender, ConfirmationSenderConfig, ConfirmationSenderError};
pub use watcher::{ConfirmationWatcher, ConfirmationWatcherConfig, ConfirmationWatcherError};

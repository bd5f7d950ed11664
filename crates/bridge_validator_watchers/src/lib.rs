//! Watchers gating the confirmation pipeline: validator-set membership and
//! validator account balance on the home chain.

pub mod balance_watcher;
pub mod status_watcher;

pub use balance_watcher::{
    ValidatorBalanceWatcher,
    ValidatorBalanceWatcherConfig,
    ValidatorBalanceWatcherError,
};
pub use status_watcher::{
    ValidatorStatusWatcher,
    ValidatorStatusWatcherConfig,
    ValidatorStatusWatcherError,
};

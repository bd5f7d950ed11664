use std::time::{Duration, Instant};

use bridge_types::{BridgeEvent, EventKind, TransferEvent, TransferHash};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use thiserror::Error;

#[cfg(test)]
#[path = "transfer_recorder_test.rs"]
mod transfer_recorder_test;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecorderError {
    #[error("sync time for {kind:?} events must never decrease")]
    NonMonotonicSyncTime { kind: EventKind },
}

/// A snapshot of the recorder for logs and the internal-state endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RecorderSummary {
    pub transfers: usize,
    pub confirmations: usize,
    pub completions: usize,
    pub scheduled: usize,
    pub is_in_sync: bool,
    pub confirmations_synced_age_seconds: Option<f64>,
    pub completions_synced_age_seconds: Option<f64>,
}

/// Accumulates the three event stages per transfer hash and decides which
/// transfers still need a confirmation from this validator.
///
/// All mutators are called from the planner task only; that serialization is
/// what makes `get_unconfirmed_transfers`'s mark-as-scheduled atomic.
#[derive(Debug)]
pub struct TransferRecorder {
    /// Maximum staleness tolerated after the last watermark update before
    /// task emission stops.
    sync_persistence_time: Duration,

    transfer_events: IndexMap<TransferHash, TransferEvent>,
    transfer_hashes: IndexSet<TransferHash>,
    confirmation_hashes: IndexSet<TransferHash>,
    completion_hashes: IndexSet<TransferHash>,
    scheduled_hashes: IndexSet<TransferHash>,

    confirmations_synced_until: Option<Instant>,
    completions_synced_until: Option<Instant>,
}

impl TransferRecorder {
    pub fn new(sync_persistence_time: Duration) -> Self {
        Self {
            sync_persistence_time,
            transfer_events: IndexMap::new(),
            transfer_hashes: IndexSet::new(),
            confirmation_hashes: IndexSet::new(),
            completion_hashes: IndexSet::new(),
            scheduled_hashes: IndexSet::new(),
            confirmations_synced_until: None,
            completions_synced_until: None,
        }
    }

    /// Idempotent insertion of one observed event.
    pub fn apply_event(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Transfer(transfer) => {
                self.transfer_hashes.insert(transfer.transfer_hash);
                self.transfer_events.insert(transfer.transfer_hash, transfer);
            }
            BridgeEvent::Confirmation(confirmation) => {
                self.confirmation_hashes.insert(confirmation.transfer_hash);
            }
            BridgeEvent::Completion(completion) => {
                self.completion_hashes.insert(completion.transfer_hash);
            }
        }
    }

    /// Advances the sync watermark of a home-chain event kind. Transfer
    /// watermarks are not tracked: foreign-side staleness only delays tasks,
    /// it cannot cause a duplicate submission.
    pub fn apply_sync_completed(
        &mut self,
        kind: EventKind,
        timestamp: Instant,
    ) -> Result<(), RecorderError> {
        let watermark = match kind {
            EventKind::Transfer => return Ok(()),
            EventKind::Confirmation => &mut self.confirmations_synced_until,
            EventKind::Completion => &mut self.completions_synced_until,
        };
        if watermark.is_some_and(|current| timestamp < current) {
            return Err(RecorderError::NonMonotonicSyncTime { kind });
        }
        *watermark = Some(timestamp);
        Ok(())
    }

    /// Both home-side watermarks exist and are no older than the persistence
    /// window. Until then the recorder may be missing confirmations it has in
    /// fact already made, so task emission must wait.
    pub fn is_in_sync(&self, now: Instant) -> bool {
        match (self.confirmations_synced_until, self.completions_synced_until) {
            (Some(confirmations), Some(completions)) => {
                now <= confirmations.min(completions) + self.sync_persistence_time
            }
            _ => false,
        }
    }

    /// Returns every transfer not yet confirmed, completed, or handed out,
    /// marking each as scheduled. Empty while out of sync. A second call in
    /// the same tick returns nothing.
    pub fn get_unconfirmed_transfers(&mut self, now: Instant) -> Vec<TransferEvent> {
        if !self.is_in_sync(now) {
            return Vec::new();
        }
        let unconfirmed: Vec<TransferHash> = self
            .transfer_hashes
            .iter()
            .filter(|hash| {
                !self.confirmation_hashes.contains(*hash)
                    && !self.completion_hashes.contains(*hash)
                    && !self.scheduled_hashes.contains(*hash)
            })
            .copied()
            .collect();
        self.scheduled_hashes.extend(unconfirmed.iter().copied());
        unconfirmed
            .iter()
            .map(|hash| self.transfer_events[hash].clone())
            .collect()
    }

    /// Garbage-collects every transfer whose three stages have all been
    /// observed.
    pub fn clear_transfers(&mut self) {
        let all_stages_seen: IndexSet<TransferHash> = self
            .transfer_hashes
            .iter()
            .filter(|hash| {
                self.confirmation_hashes.contains(*hash) && self.completion_hashes.contains(*hash)
            })
            .copied()
            .collect();

        for hash in &all_stages_seen {
            self.transfer_hashes.shift_remove(hash);
            self.confirmation_hashes.shift_remove(hash);
            self.completion_hashes.shift_remove(hash);
            self.scheduled_hashes.shift_remove(hash);
            self.transfer_events.shift_remove(hash);
        }
    }

    pub fn state_summary(&self, now: Instant) -> RecorderSummary {
        let age = |watermark: Option<Instant>| {
            watermark.map(|instant| now.saturating_duration_since(instant).as_secs_f64())
        };
        RecorderSummary {
            transfers: self.transfer_hashes.len(),
            confirmations: self.confirmation_hashes.len(),
            completions: self.completion_hashes.len(),
            scheduled: self.scheduled_hashes.len(),
            is_in_sync: self.is_in_sync(now),
            confirmations_synced_age_seconds: age(self.confirmations_synced_until),
            completions_synced_age_seconds: age(self.completions_synced_until),
        }
    }

    #[cfg(test)]
    pub(crate) fn scheduled_is_subset_of_transfers(&self) -> bool {
        self.scheduled_hashes.is_subset(&self.transfer_hashes)
    }

    #[cfg(test)]
    pub(crate) fn contains_event_for(&self, hash: TransferHash) -> bool {
        self.transfer_events.contains_key(&hash)
    }
}

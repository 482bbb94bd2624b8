//! Pending-operation table for the RPC bridge.
//!
//! Maps live correlation ids to the oneshot senders that settle their
//! callers. The table enforces the bridge's core invariant: an id is
//! registered at most once while live and removed exactly once when its
//! reply arrives.

use crate::error::{BridgeError, Error};
use crate::message::RequestId;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Outcome delivered to a waiting caller.
pub(crate) type Settlement = std::result::Result<Value, Error>;

/// Table of in-flight requests keyed by correlation id.
#[derive(Default)]
pub(crate) struct PendingTable {
    entries: Mutex<HashMap<RequestId, oneshot::Sender<Settlement>>>,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, oneshot::Sender<Settlement>>> {
        // The table holds no invariants that a panicked settle could break.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a fresh pending entry and returns the caller's receiver.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::IdAlreadyPending`] if `id` is still live,
    /// which would violate the one-outstanding-callback-per-id invariant.
    pub(crate) fn register(
        &self,
        id: &RequestId,
    ) -> std::result::Result<oneshot::Receiver<Settlement>, BridgeError> {
        let (sender, receiver) = oneshot::channel();
        let mut entries = self.lock();
        if entries.contains_key(id) {
            return Err(BridgeError::IdAlreadyPending {
                id: id.to_string(),
            });
        }
        entries.insert(id.clone(), sender);
        Ok(receiver)
    }

    /// Settles the entry for `id`, removing it.
    ///
    /// Returns whether an entry existed; a stale or duplicate reply finds
    /// nothing and reports `false` so the caller can drop it.
    pub(crate) fn settle(&self, id: &RequestId, outcome: Settlement) -> bool {
        let Some(sender) = self.lock().remove(id) else {
            return false;
        };
        // The caller may have gone away; settlement is still complete.
        let _ = sender.send(outcome);
        true
    }

    /// Removes an entry without settling it (transport send failed).
    pub(crate) fn discard(&self, id: &RequestId) {
        self.lock().remove(id);
    }

    /// Number of requests currently in flight.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

//! Per-ticket mutual exclusion.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use crate::ticket::TicketId;

/// Table of one mutex per ticket id.
///
/// Operations on different ids never contend beyond the shard lock held
/// while looking up the entry. Entries are created on first use and
/// dropped with [`forget`](Self::forget) once the ticket is gone.
#[derive(Debug, Default)]
pub(crate) struct TicketLocks {
    table: DashMap<TicketId, Arc<Mutex<()>>>,
}

impl TicketLocks {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            table: DashMap::with_capacity(capacity),
        }
    }

    /// Run `f` while holding the lock for `id`.
    ///
    /// The shard lock is released before blocking on the ticket mutex, so
    /// a long critical section never stalls unrelated ids. A poisoned
    /// mutex is recovered: ticket state lives in the registry, not behind
    /// the mutex, so a panicking holder leaves nothing torn.
    pub(crate) fn with_lock<R>(&self, id: &TicketId, f: impl FnOnce() -> R) -> R {
        let lock = self
            .table
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Drop the table entry for a ticket that no longer exists.
    ///
    /// A thread already waiting on the old mutex still gets it; it then
    /// re-reads the registry and finds the ticket gone.
    pub(crate) fn forget(&self, id: &TicketId) {
        self.table.remove(id);
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }
}

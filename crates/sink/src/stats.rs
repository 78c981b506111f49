use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// A point-in-time view of a sink's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Records decoded and handed to the backend.
    pub accepted: u64,
    /// Inserts that committed a row.
    pub committed: u64,
    /// Inserts the backend reported as failed.
    pub failed: u64,
    /// Chunks refused because they could not be decoded.
    pub rejected: u64,
    /// Inserts issued but not yet settled.
    pub pending: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    accepted: AtomicU64,
    committed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    pending: AtomicUsize,
}

impl Counters {
    /// Counts a decoded record as accepted and pending.
    pub(crate) fn issued(&self) {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    /// Undoes `issued` for a record the dispatcher never received.
    pub(crate) fn withdrawn(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.accepted.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the outcome of an insert and removes it from the pending set.
    pub(crate) fn settled(&self, committed: bool) {
        if committed {
            self.committed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> SinkStats {
        // Outcomes are read before `accepted`, which only ever grows ahead of them.
        let committed = self.committed.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        SinkStats {
            accepted: self.accepted.load(Ordering::SeqCst),
            committed,
            failed,
            rejected: self.rejected.load(Ordering::Relaxed),
            pending: self.pending(),
        }
    }
}

//! Per-(session, email) bookkeeping: draft request sequencing and the
//! single-in-flight-send guard.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Key = (String, String);

fn key(session: &str, email_id: &str) -> Key {
    (session.to_string(), email_id.to_string())
}

#[derive(Debug)]
struct Pending {
    latest: u64,
    in_flight: usize,
}

/// Orders draft requests so responses overtaken by a newer request for the
/// same (session, email) can be discarded.
///
/// Sequence numbers come from one counter that is never reset. An entry
/// exists only while at least one request for its key is in flight.
#[derive(Debug, Default)]
pub struct DraftSequencer {
    next: AtomicU64,
    pending: Mutex<HashMap<Key, Pending>>,
}

impl DraftSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request. The ticket releases its slot when dropped.
    pub fn begin(&self, session: &str, email_id: &str) -> DraftTicket<'_> {
        let seq = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        let k = key(session, email_id);

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = pending.entry(k.clone()).or_insert(Pending {
            latest: 0,
            in_flight: 0,
        });
        entry.latest = entry.latest.max(seq);
        entry.in_flight += 1;

        DraftTicket {
            sequencer: self,
            key: k,
            seq,
        }
    }

    fn latest(&self, k: &Key) -> Option<u64> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(k)
            .map(|p| p.latest)
    }

    fn release(&self, k: &Key) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = pending.get_mut(k) {
            entry.in_flight = entry.in_flight.saturating_sub(1);
            if entry.in_flight == 0 {
                pending.remove(k);
            }
        }
    }

    /// Number of (session, email) pairs with a request in flight.
    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// One in-flight draft request.
#[derive(Debug)]
pub struct DraftTicket<'a> {
    sequencer: &'a DraftSequencer,
    key: Key,
    seq: u64,
}

impl DraftTicket<'_> {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Newest sequence issued for this ticket's key.
    pub fn latest(&self) -> u64 {
        self.sequencer.latest(&self.key).unwrap_or(self.seq)
    }

    pub fn is_current(&self) -> bool {
        self.latest() == self.seq
    }
}

impl Drop for DraftTicket<'_> {
    fn drop(&mut self) {
        self.sequencer.release(&self.key);
    }
}

/// Set of (session, email) pairs with a send in flight.
#[derive(Debug, Clone, Default)]
pub struct InFlightSends {
    active: Arc<Mutex<HashSet<Key>>>,
}

impl InFlightSends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the send slot, or `None` if a send is already in flight.
    pub fn try_acquire(&self, session: &str, email_id: &str) -> Option<SendPermit> {
        let k = key(session, email_id);
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(k.clone()) {
            return None;
        }
        Some(SendPermit {
            key: k,
            active: Arc::clone(&self.active),
        })
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self, session: &str, email_id: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key(session, email_id))
    }
}

/// Held for the duration of a send; releases the slot on drop.
#[derive(Debug)]
pub struct SendPermit {
    key: Key,
    active: Arc<Mutex<HashSet<Key>>>,
}

impl Drop for SendPermit {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

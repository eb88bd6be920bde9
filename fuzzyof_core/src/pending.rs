//! Fixed-capacity pool of in-flight send timestamps.
//!
//! A timestamp is pushed when a frame is handed to the MAC and popped when
//! the MAC reports the outcome for the same destination. Matching is FIFO per
//! destination: the oldest entry queued for a neighbor is always consumed
//! first. The pool never grows. When it is full, a push first evicts entries
//! older than the configured max age; only if none are stale is it `Dropped`.

use std::time::{Duration, Instant};

use crate::types::LinkAddr;

/// Index of an occupied slot. Only valid until that entry is popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingHandle(usize);

impl PendingHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued(PendingHandle),
    /// Pool exhausted; the timestamp was not stored.
    Dropped,
    /// Unspecified destination; nothing to match against later.
    Ignored,
}

impl PushOutcome {
    #[inline]
    pub fn is_queued(&self) -> bool {
        matches!(self, PushOutcome::Queued(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    dest: LinkAddr,
    queued_at: Instant,
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct PendingPool {
    slots: Vec<Option<Slot>>,
    next_seq: u64,
    max_age: Option<Duration>,
}

impl PendingPool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            next_seq: 0,
            max_age: None,
        }
    }

    /// Entries older than `max_age` may be evicted to make room.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn push(&mut self, dest: LinkAddr, queued_at: Instant) -> PushOutcome {
        if dest.is_unspecified() {
            return PushOutcome::Ignored;
        }
        let idx = match self.slots.iter().position(Option::is_none) {
            Some(i) => i,
            None => {
                let Some(max_age) = self.max_age else {
                    return PushOutcome::Dropped;
                };
                if self.evict_older_than(queued_at, max_age) == 0 {
                    return PushOutcome::Dropped;
                }
                match self.slots.iter().position(Option::is_none) {
                    Some(i) => i,
                    None => return PushOutcome::Dropped,
                }
            }
        };
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.slots[idx] = Some(Slot {
            dest,
            queued_at,
            seq,
        });
        PushOutcome::Queued(PendingHandle(idx))
    }

    /// Timestamp held by `handle`, if the slot is still occupied.
    pub fn queued_at(&self, handle: PendingHandle) -> Option<Instant> {
        self.slots
            .get(handle.0)
            .and_then(|s| s.as_ref())
            .map(|s| s.queued_at)
    }

    /// Remove and return the oldest timestamp queued for `dest`.
    pub fn pop_oldest(&mut self, dest: LinkAddr) -> Option<Instant> {
        let idx = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().filter(|s| s.dest == dest).map(|s| (i, s.seq)))
            .min_by_key(|&(_, seq)| seq)
            .map(|(i, _)| i)?;
        self.slots[idx].take().map(|s| s.queued_at)
    }

    /// Drop every entry queued for `dest`. Returns how many were removed.
    pub fn purge(&mut self, dest: LinkAddr) -> usize {
        let mut n = 0;
        for s in &mut self.slots {
            if s.is_some_and(|s| s.dest == dest) {
                *s = None;
                n += 1;
            }
        }
        n
    }

    /// Drop entries queued more than `max_age` before `now`.
    pub fn evict_older_than(&mut self, now: Instant, max_age: Duration) -> usize {
        let mut n = 0;
        for s in &mut self.slots {
            if s.is_some_and(|s| now.saturating_duration_since(s.queued_at) > max_age) {
                *s = None;
                n += 1;
            }
        }
        n
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }
}

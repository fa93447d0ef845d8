use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
    mem,
};

use crate::{
    error::Result,
    id::{IdleId, TimeoutId},
    session::Session,
};

/// A one-shot callback run on the UI thread.
pub type Callback = Box<dyn FnOnce(&mut Session) -> Result<()> + Send>;

/// A scheduled timeout.
struct Pending {
    /// Absolute deadline in clock milliseconds. Signed so that rebasing
    /// past zero keeps relative order.
    deadline: i64,
    /// Enqueue order, for breaking deadline ties.
    seq: u64,
    /// Public identifier.
    id: TimeoutId,
    /// Work to run. `None` stops the loop.
    callback: Option<Callback>,
}

impl Pending {
    /// Ordering key.
    fn key(&self) -> (i64, u64) {
        (self.deadline, self.seq)
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Pending {}

/// Reverse order so the earliest deadline is at the top.
impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reverse order so the earliest deadline is at the top.
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// A timeout that has come due.
pub enum Due {
    /// Run this callback.
    Callback(TimeoutId, Callback),
    /// A stop sentinel fired.
    Stop(TimeoutId),
}

/// Timeouts ordered by deadline, then by enqueue order.
#[derive(Default)]
pub struct TimeoutQueue {
    /// Pending timeouts.
    heap: BinaryHeap<Pending>,
    /// Next sequence number.
    seq: u64,
}

impl TimeoutQueue {
    /// Schedule `callback` at an absolute deadline. A `None` callback is a
    /// stop sentinel.
    pub fn add(&mut self, deadline: u64, callback: Option<Callback>) -> TimeoutId {
        let deadline = i64::try_from(deadline).unwrap_or(i64::MAX);
        let seq = self.seq;
        self.seq += 1;
        let id = TimeoutId(seq);
        self.heap.push(Pending {
            deadline,
            seq,
            id,
            callback,
        });
        id
    }

    /// Cancel a timeout. Returns false if it already ran or never existed.
    pub fn remove(&mut self, id: TimeoutId) -> bool {
        let before = self.heap.len();
        self.heap.retain(|p| p.id != id);
        self.heap.len() != before
    }

    /// The earliest pending deadline. Deadlines rebased below zero read as
    /// zero.
    pub fn next_deadline(&self) -> Option<u64> {
        self.heap.peek().map(|p| p.deadline.max(0).unsigned_abs())
    }

    /// Take the earliest timeout if its deadline is at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<Due> {
        let now = i64::try_from(now).unwrap_or(i64::MAX);
        if self.heap.peek()?.deadline > now {
            return None;
        }
        let p = self.heap.pop()?;
        Some(match p.callback {
            Some(cb) => Due::Callback(p.id, cb),
            None => Due::Stop(p.id),
        })
    }

    /// Shift every deadline by `delta` milliseconds. Relative order is
    /// preserved, including for deadlines pushed below zero.
    pub fn rebase(&mut self, delta: i64) {
        let mut entries = mem::take(&mut self.heap).into_vec();
        for p in &mut entries {
            p.deadline = p.deadline.saturating_add(delta);
        }
        self.heap = entries.into();
    }

    /// Number of pending timeouts.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Are there no pending timeouts?
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// An idle entry that reached the front of the queue.
pub enum Idle {
    /// Run this callback.
    Callback(IdleId, Callback),
    /// The exit-on-idle sentinel fired.
    Stop(IdleId),
}

/// One-shot callbacks run in FIFO order when nothing else is due. A `None`
/// callback is a stop sentinel, like in [`TimeoutQueue`].
#[derive(Default)]
pub struct IdleQueue {
    /// Pending callbacks.
    entries: VecDeque<(IdleId, Option<Callback>)>,
    /// The queued exit-on-idle sentinel.
    stop: Option<IdleId>,
    /// Next identifier.
    seq: u64,
}

impl IdleQueue {
    /// Queue a callback. A `None` callback is a stop sentinel.
    pub fn add(&mut self, callback: Option<Callback>) -> IdleId {
        let id = IdleId(self.seq);
        self.seq += 1;
        self.entries.push_back((id, callback));
        id
    }

    /// Queue or withdraw the single exit-on-idle sentinel. Enabling twice
    /// queues one sentinel.
    pub fn set_stop(&mut self, on: bool) {
        match (on, self.stop) {
            (true, None) => self.stop = Some(self.add(None)),
            (false, Some(id)) => {
                self.remove(id);
            }
            _ => {}
        }
    }

    /// Is an exit-on-idle sentinel queued?
    pub fn has_stop(&self) -> bool {
        self.stop.is_some()
    }

    /// Cancel a queued entry.
    pub fn remove(&mut self, id: IdleId) -> bool {
        if self.stop == Some(id) {
            self.stop = None;
        }
        let before = self.entries.len();
        self.entries.retain(|(i, _)| *i != id);
        self.entries.len() != before
    }

    /// Take the oldest entry.
    pub fn pop(&mut self) -> Option<Idle> {
        let (id, callback) = self.entries.pop_front()?;
        Some(match callback {
            Some(cb) => Idle::Callback(id, cb),
            None => {
                if self.stop == Some(id) {
                    self.stop = None;
                }
                Idle::Stop(id)
            }
        })
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! The tick-ordered event queue.
//!
//! A min-heap of due ticks, each holding an insertion-ordered, deduplicated
//! set of gates pending at that tick — a gate enqueued twice for the same
//! tick (say, two inputs changing in the same propagation step) is only
//! evaluated once, in the order it was first scheduled.
//!
//! `tick` is a monotonic `i64` that never wraps. A multi-decade simulation run
//! at one tick per nanosecond would still take centuries to approach
//! `i64::MAX`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use indexmap::IndexMap;

use crate::data_structures::OrderedPendingSet;
use crate::graph::GlobalGateId;

pub struct Scheduler {
    tick: i64,
    /// tick -> insertion-ordered, dedup'd set of gates due at that tick.
    queue: IndexMap<i64, OrderedPendingSet<GlobalGateId, ()>>,
    /// Min-heap of tick keys with entries in `queue`. May contain stale
    /// duplicates left behind once a tick's `queue` entry is removed; these are
    /// skipped lazily the next time they surface at the top of the heap.
    pq: BinaryHeap<Reverse<i64>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tick: 0,
            queue: IndexMap::new(),
            pq: BinaryHeap::new(),
        }
    }

    pub fn tick(&self) -> i64 {
        self.tick
    }

    pub fn has_pending_events(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Schedules `gate` for evaluation `propagation` ticks from now,
    /// deduplicating against any existing pending entry for the same gate at
    /// the same computed tick.
    pub fn enqueue(&mut self, gate: GlobalGateId, propagation: i64) {
        let at_tick = self.tick + propagation;
        let is_new_tick = !self.queue.contains_key(&at_tick);
        self.queue
            .entry(at_tick)
            .or_insert_with(OrderedPendingSet::new)
            .insert(gate, ());
        if is_new_tick {
            self.pq.push(Reverse(at_tick));
        }
    }

    /// True iff the earliest pending tick is the current tick — i.e. there is
    /// work to drain right now rather than only in the future.
    pub(crate) fn ready_now(&self) -> bool {
        self.pq.peek().map(|Reverse(k)| *k) == Some(self.tick)
    }

    /// `updateGates`'s idle-tick branch: nothing is due, so just let time pass.
    pub(crate) fn advance_idle_tick(&mut self) {
        self.tick += 1;
    }

    /// Begins draining the next ready tick, advancing `self.tick` to it and
    /// returning it. Lazily discards stale duplicate keys `pq` may still hold
    /// from a tick whose `queue` entry has already been fully drained.
    pub(crate) fn begin_drain(&mut self) -> Option<i64> {
        loop {
            let Reverse(k) = *self.pq.peek()?;
            if !self.queue.contains_key(&k) {
                self.pq.pop();
                continue;
            }
            self.pq.pop();
            debug_assert!(k >= self.tick, "scheduler tick moved backwards");
            self.tick = k;
            return Some(k);
        }
    }

    /// Removes and returns the next gate pending at `at_tick`, in first-enqueue
    /// order. The per-tick set may grow between calls if evaluating a gate
    /// re-enqueues work at the same tick.
    pub(crate) fn next_pending(&mut self, at_tick: i64) -> Option<GlobalGateId> {
        self.queue.get_mut(&at_tick)?.pop_front().map(|(gate, ())| gate)
    }

    /// Deletes the now-empty per-tick set and advances the clock past it.
    pub(crate) fn end_drain(&mut self, at_tick: i64) {
        self.queue.shift_remove(&at_tick);
        self.tick = at_tick + 1;
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GateId;

    fn gate(id: &str) -> GlobalGateId {
        GlobalGateId::new("g".into(), GateId::from(id))
    }

    #[test]
    fn enqueue_schedules_relative_to_current_tick() {
        let mut s = Scheduler::new();
        s.enqueue(gate("a"), 3);
        assert!(!s.ready_now());
        assert!(s.has_pending_events());

        let tick = s.begin_drain().unwrap();
        assert_eq!(tick, 3);
        assert_eq!(s.next_pending(tick), Some(gate("a")));
        assert_eq!(s.next_pending(tick), None);
        s.end_drain(tick);
        assert_eq!(s.tick(), 4);
    }

    #[test]
    fn dedups_same_gate_same_tick() {
        let mut s = Scheduler::new();
        s.enqueue(gate("a"), 1);
        s.enqueue(gate("a"), 1);

        let tick = s.begin_drain().unwrap();
        assert_eq!(s.next_pending(tick), Some(gate("a")));
        assert_eq!(s.next_pending(tick), None);
    }

    #[test]
    fn evaluation_order_is_first_enqueue_order() {
        let mut s = Scheduler::new();
        s.enqueue(gate("a"), 1);
        s.enqueue(gate("b"), 1);

        let tick = s.begin_drain().unwrap();
        assert_eq!(s.next_pending(tick), Some(gate("a")));
        assert_eq!(s.next_pending(tick), Some(gate("b")));
    }

    #[test]
    fn reenqueue_during_drain_is_seen_in_same_drain() {
        let mut s = Scheduler::new();
        s.enqueue(gate("a"), 0);

        let tick = s.begin_drain().unwrap();
        assert_eq!(tick, 0);
        assert_eq!(s.next_pending(tick), Some(gate("a")));
        // Evaluating "a" re-enqueues "b" at the same tick.
        s.enqueue(gate("b"), 0);
        assert_eq!(s.next_pending(tick), Some(gate("b")));
        assert_eq!(s.next_pending(tick), None);
    }

    #[test]
    fn idle_tick_advances_without_draining() {
        let mut s = Scheduler::new();
        assert!(!s.ready_now());
        s.advance_idle_tick();
        assert_eq!(s.tick(), 1);
    }
}

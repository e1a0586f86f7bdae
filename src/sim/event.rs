/// The DES event queue: a min-heap on `(time, tiebreak)` with insertion-order
/// tie-breaking, giving fully deterministic replay regardless of hashing.
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::process::{Pid, RequestId};

/// Why a `BlockedToReady` event fires; distinguishes the four ways a process can leave BLOCKED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnblockReason {
    /// Quantum expired while RUNNING; process returns to READY.
    Quantum,
    /// A blocking `read`/`write` syscall just enqueued I/O; process enters BLOCKED.
    IoBlock,
    /// A `wait` syscall with live children; process enters BLOCKED.
    WaitBlock,
    /// Neutral unblock: I/O completed, sleep elapsed, or a waited-for child set exited.
    Unblock,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    ProcessArrival,
    DispatchComplete,
    RunComplete { ran_for: u64 },
    SyscallInvoked,
    IoComplete { device: String, request_id: RequestId },
    SleepComplete,
    BlockedToReady { reason: UnblockReason },
    ProcessExit,
    WaitComplete,
    CpuAvailable,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub time: u64,
    pub tiebreak: u64,
    pub kind: EventKind,
    pub pid: Option<Pid>,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.tiebreak == other.tiebreak
    }
}
impl Eq for Event {}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest (time, tiebreak) pops first.
        (other.time, other.tiebreak).cmp(&(self.time, self.tiebreak))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Thin wrapper over `BinaryHeap<Event>` that owns the insertion-sequence counter.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Event>,
    next_tiebreak: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue {
            heap: BinaryHeap::new(),
            next_tiebreak: 0,
        }
    }

    pub fn push(&mut self, time: u64, kind: EventKind, pid: Option<Pid>) {
        let tiebreak = self.next_tiebreak;
        self.next_tiebreak += 1;
        self.heap.push(Event {
            time,
            tiebreak,
            kind,
            pid,
        });
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_earliest_time_first() {
        let mut q = EventQueue::new();
        q.push(50, EventKind::ProcessExit, Some(1));
        q.push(10, EventKind::ProcessArrival, Some(2));
        q.push(30, EventKind::CpuAvailable, None);

        assert_eq!(q.pop().unwrap().time, 10);
        assert_eq!(q.pop().unwrap().time, 30);
        assert_eq!(q.pop().unwrap().time, 50);
        assert!(q.pop().is_none());
    }

    #[test]
    fn same_time_events_pop_in_insertion_order() {
        let mut q = EventQueue::new();
        q.push(5, EventKind::ProcessArrival, Some(1));
        q.push(5, EventKind::ProcessArrival, Some(2));
        q.push(5, EventKind::ProcessArrival, Some(3));

        assert_eq!(q.pop().unwrap().pid, Some(1));
        assert_eq!(q.pop().unwrap().pid, Some(2));
        assert_eq!(q.pop().unwrap().pid, Some(3));
    }
}

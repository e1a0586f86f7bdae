/// Round-robin CPU dispatcher: a FIFO ready queue plus the PID currently
/// holding the CPU. Pure FIFO, preempted strictly on quantum expiration —
/// no priority, no aging.
use std::collections::VecDeque;

use super::process::Pid;

#[derive(Debug)]
pub struct Scheduler {
    pub time_quantum: u64,
    ready_queue: VecDeque<Pid>,
    pub running: Option<Pid>,
}

impl Scheduler {
    pub fn new(time_quantum: u64) -> Self {
        Scheduler {
            time_quantum,
            ready_queue: VecDeque::new(),
            running: None,
        }
    }

    pub fn enqueue_ready(&mut self, pid: Pid) {
        self.ready_queue.push_back(pid);
    }

    pub fn has_ready(&self) -> bool {
        !self.ready_queue.is_empty()
    }

    pub fn pick_next(&mut self) -> Option<Pid> {
        self.ready_queue.pop_front()
    }
}

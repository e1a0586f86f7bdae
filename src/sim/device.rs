/// A named I/O device with independent read/write bandwidth and a FIFO of
/// pending transfer requests, all serialized through the shared [`super::bus::BusArbiter`].
use super::process::{IoOp, Pid, RequestId};

#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub enqueue_time: u64,
    pub pid: Pid,
    pub op: IoOp,
    pub size_bytes: u64,
    pub request_id: RequestId,
}

#[derive(Debug, Clone)]
pub struct Device {
    pub name: String,
    /// bytes/sec
    pub read_speed: u64,
    /// bytes/sec
    pub write_speed: u64,
    pub queue: Vec<PendingRequest>,
    pub in_use: bool,
}

impl Device {
    pub fn new(name: String, read_speed: u64, write_speed: u64) -> Self {
        Device {
            name,
            read_speed,
            write_speed,
            queue: Vec::new(),
            in_use: false,
        }
    }

    pub fn enqueue(&mut self, enqueue_time: u64, pid: Pid, op: IoOp, size_bytes: u64, request_id: RequestId) {
        self.queue.push(PendingRequest {
            enqueue_time,
            pid,
            op,
            size_bytes,
            request_id,
        });
    }

    /// Minimum `enqueue_time` across this device's queue, used as the
    /// arbiter's tiebreaker. `None` if the queue is empty.
    pub fn earliest_enqueue_time(&self) -> Option<u64> {
        self.queue.iter().map(|r| r.enqueue_time).min()
    }

    /// Remove and return the oldest (smallest `enqueue_time`) pending request.
    pub fn pop_oldest(&mut self) -> Option<PendingRequest> {
        if self.queue.is_empty() {
            return None;
        }
        let idx = self
            .queue
            .iter()
            .enumerate()
            .min_by_key(|(_, r)| r.enqueue_time)
            .map(|(i, _)| i)?;
        Some(self.queue.remove(idx))
    }

    pub fn speed_for(&self, op: IoOp) -> u64 {
        match op {
            IoOp::Read => self.read_speed,
            IoOp::Write => self.write_speed,
        }
    }
}

/// Runtime state of one simulated process, driven entirely by [`super::system::System`].
use super::syscall::SystemCall;

pub type Pid = u32;
pub type RequestId = u64;

/// A process's place in the scheduler's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Blocked,
    Exit,
}

/// Why a BLOCKED process isn't runnable, and the context needed to resume it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockedReason {
    Io {
        device: String,
        op: IoOp,
        size_bytes: u64,
        request_id: RequestId,
    },
    Sleep {
        duration_usecs: u64,
    },
    Wait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Read,
    Write,
}

/// Full state of one simulated process.
#[derive(Debug, Clone)]
pub struct Process {
    pub pid: Pid,
    pub ppid: Option<Pid>,
    pub command_name: String,
    pub syscalls: Vec<SystemCall>,
    /// Index of the next syscall to execute.
    pub pc: usize,
    pub cpu_time_executed: u64,
    pub state: ProcessState,
    /// Microseconds remaining in the current time slice; only meaningful while RUNNING.
    pub quantum_left: u64,
    pub children: Vec<Pid>,
    pub waiting_for_children: bool,
    pub blocked_reason: Option<BlockedReason>,
}

impl Process {
    pub fn new(pid: Pid, command_name: String, mut syscalls: Vec<SystemCall>, ppid: Option<Pid>) -> Self {
        syscalls.sort_by_key(|s| s.when);
        Process {
            pid,
            ppid,
            command_name,
            syscalls,
            pc: 0,
            cpu_time_executed: 0,
            state: ProcessState::New,
            quantum_left: 0,
            children: Vec::new(),
            waiting_for_children: false,
            blocked_reason: None,
        }
    }

    /// Microseconds until the next programmed syscall is due, or `None` if
    /// `pc` has run off the end of the program (no further syscalls).
    pub fn time_until_next_syscall(&self) -> Option<u64> {
        let next = self.syscalls.get(self.pc)?;
        Some(next.when.saturating_sub(self.cpu_time_executed))
    }

    pub fn current_syscall(&self) -> Option<&SystemCall> {
        self.syscalls.get(self.pc)
    }

    pub fn advance_pc(&mut self) {
        self.pc += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::syscall::SyscallKind;

    fn sc(when: u64, kind: SyscallKind) -> SystemCall {
        SystemCall { when, kind }
    }

    #[test]
    fn constructor_sorts_syscalls_by_when() {
        let p = Process::new(
            1,
            "shell".to_string(),
            vec![sc(100, SyscallKind::Exit), sc(10, SyscallKind::Wait)],
            None,
        );
        assert_eq!(p.syscalls[0].when, 10);
        assert_eq!(p.syscalls[1].when, 100);
    }

    #[test]
    fn time_until_next_syscall_accounts_for_cpu_already_spent() {
        let mut p = Process::new(1, "shell".to_string(), vec![sc(100, SyscallKind::Exit)], None);
        assert_eq!(p.time_until_next_syscall(), Some(100));
        p.cpu_time_executed = 40;
        assert_eq!(p.time_until_next_syscall(), Some(60));
    }

    #[test]
    fn time_until_next_syscall_is_none_past_the_last_instruction() {
        let mut p = Process::new(1, "shell".to_string(), vec![sc(0, SyscallKind::Exit)], None);
        p.advance_pc();
        assert_eq!(p.time_until_next_syscall(), None);
        assert!(p.current_syscall().is_none());
    }
}

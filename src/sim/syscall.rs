use std::fmt::{self, Display};

/// One programmed system call: a CPU-time offset at which it fires, plus
/// its opcode and raw string arguments. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCall {
    /// CPU-time offset, in microseconds, from the process's first instruction.
    pub when: u64,
    pub kind: SyscallKind,
}

/// The recognized syscall opcodes and their argument shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyscallKind {
    Spawn { command: String },
    Read { device: String, size_bytes: u64 },
    Write { device: String, size_bytes: u64 },
    Sleep { duration_usecs: u64 },
    Wait,
    Exit,
}

impl SyscallKind {
    pub fn name(&self) -> &'static str {
        match self {
            SyscallKind::Spawn { .. } => "spawn",
            SyscallKind::Read { .. } => "read",
            SyscallKind::Write { .. } => "write",
            SyscallKind::Sleep { .. } => "sleep",
            SyscallKind::Wait => "wait",
            SyscallKind::Exit => "exit",
        }
    }
}

impl Display for SystemCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}us {}", self.when, self.kind.name())
    }
}

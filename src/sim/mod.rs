pub mod bus;
pub mod device;
pub mod event;
pub mod process;
pub mod scheduler;
pub mod syscall;
pub mod system;

pub use device::Device;
pub use process::{BlockedReason, IoOp, Pid, Process, ProcessState};
pub use syscall::{SyscallKind, SystemCall};
pub use system::{SimulationReport, System};

/// The DES core: owns the process table, drives the event loop, applies every
/// state transition, and reports the final utilization summary. This is
/// where every invariant from the data model lives; every other module in
/// `sim` is a passive collaborator `System` mutates directly.
use std::collections::HashMap;

use anyhow::Result;

use crate::error::SchedulerError;
use crate::simio::CommandCatalog;

use super::bus::BusArbiter;
use super::device::Device;
use super::event::{EventKind, EventQueue, UnblockReason};
use super::process::{BlockedReason, IoOp, Pid, Process, ProcessState, RequestId};
use super::scheduler::Scheduler;
use super::syscall::SyscallKind;

/// READY -> RUNNING (dispatch).
pub const CONTEXT_SWITCH_IN: u64 = 5;
/// RUNNING->READY (preempt), RUNNING->BLOCKED, BLOCKED->READY (unblock).
pub const CONTEXT_SWITCH_MOVES: u64 = 10;

/// The engine's final report: total elapsed virtual time and CPU utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationReport {
    pub total_time: u64,
    pub cpu_util: u64,
}

pub struct System {
    devices: Vec<Device>,
    device_index: HashMap<String, usize>,
    commands: CommandCatalog,
    time_quantum: u64,
    verbose: bool,

    current_time: u64,
    event_queue: EventQueue,
    next_pid: Pid,

    scheduler: Scheduler,
    process_table: HashMap<Pid, Process>,
    bus: BusArbiter,

    cpu_busy_time: u64,
}

impl System {
    pub fn new(devices: Vec<Device>, commands: CommandCatalog, time_quantum: u64, verbose: bool) -> Self {
        let device_index = devices
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        System {
            devices,
            device_index,
            commands,
            time_quantum,
            verbose,
            current_time: 0,
            event_queue: EventQueue::new(),
            next_pid: 1,
            scheduler: Scheduler::new(time_quantum),
            process_table: HashMap::new(),
            bus: BusArbiter::new(),
            cpu_busy_time: 0,
        }
    }

    fn push_event(&mut self, time: u64, kind: EventKind, pid: Option<Pid>) {
        if self.verbose {
            println!("[t={}] enqueue {} pid={:?}", time, event_kind_name(&kind), pid);
        }
        self.event_queue.push(time, kind, pid);
    }

    fn create_process(&mut self, command_name: &str, parent: Option<Pid>) -> Result<Pid> {
        let syscalls = self
            .commands
            .iter()
            .find(|(name, _)| name == command_name)
            .map(|(_, calls)| calls.clone())
            .ok_or_else(|| SchedulerError::UnknownCommand(command_name.to_string()))?;

        let pid = self.next_pid;
        self.next_pid += 1;
        log::debug!("create_process pid={} ppid={:?} command={}", pid, parent, command_name);

        let process = Process::new(pid, command_name.to_string(), syscalls, parent);
        self.process_table.insert(pid, process);
        if let Some(ppid) = parent {
            if let Some(p) = self.process_table.get_mut(&ppid) {
                p.children.push(pid);
            }
        }
        Ok(pid)
    }

    /// Creates the entry process (`"shell"` if present, else the first
    /// command in file order) and pumps the event queue to exhaustion.
    /// Returns `None` if the command catalog is empty — nothing to run.
    pub fn start(&mut self) -> Result<Option<SimulationReport>> {
        if self.commands.is_empty() {
            println!("No commands to run.");
            return Ok(None);
        }
        let entry = if self.commands.iter().any(|(name, _)| name == "shell") {
            "shell".to_string()
        } else {
            self.commands[0].0.clone()
        };
        let pid = self.create_process(&entry, None)?;
        self.push_event(0, EventKind::ProcessArrival, Some(pid));
        Ok(Some(self.run()?))
    }

    fn run(&mut self) -> Result<SimulationReport> {
        while let Some(ev) = self.event_queue.pop() {
            self.current_time = ev.time;
            if self.verbose {
                println!(
                    "[t={}] handle {} pid={:?}",
                    self.current_time,
                    event_kind_name(&ev.kind),
                    ev.pid
                );
            }
            match ev.kind {
                EventKind::ProcessArrival => self.handle_arrival(ev.pid.expect("arrival carries a pid")),
                EventKind::DispatchComplete => {
                    self.handle_dispatch_complete(ev.pid.expect("dispatch carries a pid"))
                }
                EventKind::RunComplete { ran_for } => {
                    self.handle_run_complete(ev.pid.expect("run-complete carries a pid"), ran_for)
                }
                EventKind::SyscallInvoked => {
                    self.handle_syscall_invoked(ev.pid.expect("syscall carries a pid"))?
                }
                EventKind::IoComplete { device, request_id } => {
                    self.handle_io_complete(ev.pid.expect("io-complete carries a pid"), &device, request_id)
                }
                EventKind::SleepComplete => {
                    self.handle_sleep_complete(ev.pid.expect("sleep-complete carries a pid"))
                }
                EventKind::BlockedToReady { reason } => {
                    self.handle_blocked_to_ready(ev.pid.expect("blocked-to-ready carries a pid"), reason)
                }
                EventKind::ProcessExit => self.handle_process_exit(ev.pid.expect("exit carries a pid")),
                EventKind::WaitComplete => self.handle_wait_complete(ev.pid.expect("wait-complete carries a pid")),
                EventKind::CpuAvailable => self.handle_cpu_available(),
            }
        }
        Ok(self.report())
    }

    fn report(&self) -> SimulationReport {
        let total_time = self.current_time;
        let cpu_util = if total_time > 0 {
            self.cpu_busy_time * 100 / total_time
        } else {
            0
        };
        println!("measurements {} {}", total_time, cpu_util);
        SimulationReport { total_time, cpu_util }
    }

    // -- handlers --------------------------------------------------------

    fn handle_arrival(&mut self, pid: Pid) {
        let p = self.process_table.get_mut(&pid).expect("pid in process table");
        p.state = ProcessState::Ready;
        self.scheduler.enqueue_ready(pid);
        if self.scheduler.running.is_none() {
            self.attempt_dispatch();
        }
    }

    fn attempt_dispatch(&mut self) {
        if self.scheduler.running.is_some() {
            return;
        }
        if !self.scheduler.has_ready() {
            return;
        }
        let Some(next_pid) = self.scheduler.pick_next() else {
            return;
        };
        log::debug!("dispatch pid={}", next_pid);
        debug_assert!(
            self.process_table.values().filter(|p| p.state == ProcessState::Running).count() == 0,
            "at most one process may be RUNNING at a time"
        );
        self.scheduler.running = Some(next_pid);
        self.cpu_busy_time += CONTEXT_SWITCH_IN;
        self.push_event(
            self.current_time + CONTEXT_SWITCH_IN,
            EventKind::DispatchComplete,
            Some(next_pid),
        );
    }

    fn handle_dispatch_complete(&mut self, pid: Pid) {
        let run_for;
        {
            let p = self.process_table.get_mut(&pid).expect("pid in process table");
            p.state = ProcessState::Running;
            p.quantum_left = self.time_quantum;
            run_for = match p.time_until_next_syscall() {
                Some(t) => self.time_quantum.min(t),
                None => self.time_quantum,
            };
        }
        self.cpu_busy_time += run_for;
        self.push_event(
            self.current_time + run_for,
            EventKind::RunComplete { ran_for: run_for },
            Some(pid),
        );
    }

    fn handle_run_complete(&mut self, pid: Pid, ran_for: u64) {
        let reached_boundary;
        {
            let p = self.process_table.get_mut(&pid).expect("pid in process table");
            p.cpu_time_executed += ran_for;
            p.quantum_left = p.quantum_left.saturating_sub(ran_for);
            reached_boundary = matches!(p.time_until_next_syscall(), Some(0));
        }
        if reached_boundary {
            self.push_event(self.current_time, EventKind::SyscallInvoked, Some(pid));
        } else {
            // Quantum exhausted with no syscall due. A command that runs out
            // of programmed syscalls entirely (`time_until_next_syscall` is
            // `None`) never satisfies `reached_boundary` either, so it keeps
            // cycling through full quanta indefinitely — the reference
            // behavior for a command with no further syscalls scheduled.
            self.push_event(
                self.current_time + CONTEXT_SWITCH_MOVES,
                EventKind::BlockedToReady { reason: UnblockReason::Quantum },
                Some(pid),
            );
            if self.scheduler.running == Some(pid) {
                self.scheduler.running = None;
            }
        }
    }

    fn schedule_continue_running(&mut self, pid: Pid) {
        let run_for;
        {
            let p = self.process_table.get(&pid).expect("pid in process table");
            if p.quantum_left == 0 {
                return;
            }
            run_for = match p.time_until_next_syscall() {
                Some(t) => p.quantum_left.min(t),
                None => p.quantum_left,
            };
        }
        if run_for == 0 {
            return;
        }
        self.cpu_busy_time += run_for;
        self.push_event(
            self.current_time + run_for,
            EventKind::RunComplete { ran_for: run_for },
            Some(pid),
        );
    }

    fn handle_syscall_invoked(&mut self, pid: Pid) -> Result<()> {
        let Some(sc) = self.process_table[&pid].current_syscall().cloned() else {
            return Ok(());
        };

        match sc.kind {
            SyscallKind::Spawn { command } => {
                let child = self.create_process(&command, Some(pid))?;
                self.push_event(self.current_time, EventKind::ProcessArrival, Some(child));
                self.process_table.get_mut(&pid).expect("pid in process table").advance_pc();
                self.schedule_continue_running(pid);
            }
            SyscallKind::Read { device, size_bytes } => {
                self.handle_blocking_io(pid, &device, IoOp::Read, size_bytes)?;
            }
            SyscallKind::Write { device, size_bytes } => {
                self.handle_blocking_io(pid, &device, IoOp::Write, size_bytes)?;
            }
            SyscallKind::Sleep { duration_usecs } => {
                let p = self.process_table.get_mut(&pid).expect("pid in process table");
                p.blocked_reason = Some(BlockedReason::Sleep { duration_usecs });
                p.advance_pc();
                let to_block_time = self.current_time + CONTEXT_SWITCH_MOVES;
                // No explicit ENTER_BLOCKED event fires here: the process is
                // implicitly BLOCKED from this point until SLEEP_COMPLETE.
                self.push_event(to_block_time + duration_usecs, EventKind::SleepComplete, Some(pid));
                if self.scheduler.running == Some(pid) {
                    self.scheduler.running = None;
                }
            }
            SyscallKind::Wait => {
                let has_children = !self.process_table[&pid].children.is_empty();
                if !has_children {
                    self.process_table.get_mut(&pid).expect("pid in process table").advance_pc();
                    self.schedule_continue_running(pid);
                } else {
                    let p = self.process_table.get_mut(&pid).expect("pid in process table");
                    p.waiting_for_children = true;
                    p.blocked_reason = Some(BlockedReason::Wait);
                    p.advance_pc();
                    let to_block_time = self.current_time + CONTEXT_SWITCH_MOVES;
                    self.push_event(
                        to_block_time,
                        EventKind::BlockedToReady { reason: UnblockReason::WaitBlock },
                        Some(pid),
                    );
                    if self.scheduler.running == Some(pid) {
                        self.scheduler.running = None;
                    }
                }
            }
            SyscallKind::Exit => {
                self.process_table.get_mut(&pid).expect("pid in process table").advance_pc();
                self.push_event(self.current_time, EventKind::ProcessExit, Some(pid));
                if self.scheduler.running == Some(pid) {
                    self.scheduler.running = None;
                }
                self.push_event(self.current_time + CONTEXT_SWITCH_MOVES, EventKind::CpuAvailable, None);
            }
        }
        Ok(())
    }

    fn handle_blocking_io(&mut self, pid: Pid, device: &str, op: IoOp, size_bytes: u64) -> Result<()> {
        let device_idx = *self
            .device_index
            .get(device)
            .ok_or_else(|| SchedulerError::UnknownDevice(device.to_string()))?;

        // Unique within this process's lifetime: pid in the high bits, pc in the low bits.
        let request_id: RequestId = ((pid as u64) << 16) | (self.process_table[&pid].pc as u64);

        self.devices[device_idx].enqueue(self.current_time, pid, op, size_bytes, request_id);

        let p = self.process_table.get_mut(&pid).expect("pid in process table");
        p.blocked_reason = Some(BlockedReason::Io {
            device: device.to_string(),
            op,
            size_bytes,
            request_id,
        });
        p.advance_pc();

        let to_block_time = self.current_time + CONTEXT_SWITCH_MOVES;
        self.push_event(
            to_block_time,
            EventKind::BlockedToReady { reason: UnblockReason::IoBlock },
            Some(pid),
        );
        if self.scheduler.running == Some(pid) {
            self.scheduler.running = None;
        }
        self.try_start_bus_transfer();
        Ok(())
    }

    fn handle_blocked_to_ready(&mut self, pid: Pid, reason: UnblockReason) {
        match reason {
            UnblockReason::Quantum => {
                debug_assert!(self.scheduler.running != Some(pid), "a process re-entering READY must have left RUNNING first");
                let p = self.process_table.get_mut(&pid).expect("pid in process table");
                p.state = ProcessState::Ready;
                self.scheduler.enqueue_ready(pid);
            }
            UnblockReason::IoBlock | UnblockReason::WaitBlock => {
                let p = self.process_table.get_mut(&pid).expect("pid in process table");
                p.state = ProcessState::Blocked;
            }
            UnblockReason::Unblock => {
                debug_assert!(self.scheduler.running != Some(pid), "a process re-entering READY must have left RUNNING first");
                let p = self.process_table.get_mut(&pid).expect("pid in process table");
                p.state = ProcessState::Ready;
                p.blocked_reason = None;
                p.waiting_for_children = false;
                self.scheduler.enqueue_ready(pid);
            }
        }
        // The CPU may now be free even when this transition didn't itself
        // make `pid` runnable (e.g. it just entered BLOCKED) — give another
        // ready process a chance.
        self.attempt_dispatch();
    }

    fn handle_io_complete(&mut self, pid: Pid, device: &str, _request_id: RequestId) {
        if let Some(&idx) = self.device_index.get(device) {
            self.bus.free(&mut self.devices, idx);
            debug_assert!(
                !self.bus.bus_busy && !self.devices[idx].in_use,
                "bus_busy must track the selected device's in_use flag"
            );
        }
        self.push_event(
            self.current_time,
            EventKind::BlockedToReady { reason: UnblockReason::Unblock },
            Some(pid),
        );
        self.try_start_bus_transfer();
    }

    fn handle_sleep_complete(&mut self, pid: Pid) {
        self.push_event(
            self.current_time,
            EventKind::BlockedToReady { reason: UnblockReason::Unblock },
            Some(pid),
        );
    }

    fn handle_wait_complete(&mut self, pid: Pid) {
        self.push_event(
            self.current_time,
            EventKind::BlockedToReady { reason: UnblockReason::Unblock },
            Some(pid),
        );
    }

    fn handle_process_exit(&mut self, pid: Pid) {
        self.process_table.get_mut(&pid).expect("pid in process table").state = ProcessState::Exit;

        let ppid = self.process_table[&pid].ppid;
        if let Some(ppid) = ppid {
            let wake_parent = self.process_table.get(&ppid).is_some_and(|parent| {
                parent.waiting_for_children
                    && parent
                        .children
                        .iter()
                        .all(|c| self.process_table[c].state == ProcessState::Exit)
            });
            if wake_parent {
                self.push_event(self.current_time, EventKind::WaitComplete, Some(ppid));
            }
        }

        if self.scheduler.running == Some(pid) {
            self.scheduler.running = None;
        }
        self.push_event(self.current_time + CONTEXT_SWITCH_MOVES, EventKind::CpuAvailable, None);
    }

    fn handle_cpu_available(&mut self) {
        self.attempt_dispatch();
    }

    fn try_start_bus_transfer(&mut self) {
        if let Some(started) = self.bus.try_start_transfer(&mut self.devices, self.current_time) {
            debug_assert!(
                self.bus.bus_busy && self.devices[started.device_index].in_use,
                "bus_busy must track the selected device's in_use flag"
            );
            let device_name = self.devices[started.device_index].name.clone();
            log::trace!(
                "bus: {} pid={} size={}B done@{}",
                device_name,
                started.request.pid,
                started.request.size_bytes,
                started.complete_time
            );
            self.push_event(
                started.complete_time,
                EventKind::IoComplete {
                    device: device_name,
                    request_id: started.request.request_id,
                },
                Some(started.request.pid),
            );
        }
    }
}

fn event_kind_name(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::ProcessArrival => "PROCESS_ARRIVAL",
        EventKind::DispatchComplete => "DISPATCH_COMPLETE",
        EventKind::RunComplete { .. } => "RUN_COMPLETE",
        EventKind::SyscallInvoked => "SYSCALL_INVOKED",
        EventKind::IoComplete { .. } => "IO_COMPLETE",
        EventKind::SleepComplete => "SLEEP_COMPLETE",
        EventKind::BlockedToReady { .. } => "BLOCKED_TO_READY",
        EventKind::ProcessExit => "PROCESS_EXIT",
        EventKind::WaitComplete => "WAIT_COMPLETE",
        EventKind::CpuAvailable => "CPU_AVAILABLE",
    }
}

//! Discrete-event simulation of a single-CPU, multi-device round-robin scheduler
//!
//! Given a machine description (I/O devices, a time quantum) and a catalog of
//! named commands (deterministic syscall sequences), [`sim::System`] advances
//! virtual time from zero until no runnable work remains and reports total
//! elapsed time and CPU utilization.

/// Parsers for the sysconfig and commands input files.
pub mod simio;

/// The simulation engine: event queue, process/device/scheduler state, DES core.
pub mod sim;

/// Crate-local error variants for malformed input and unknown syscalls/devices.
pub mod error;

/// The `clap`-derived CLI argument surface.
pub mod cli;

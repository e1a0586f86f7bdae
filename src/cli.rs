/// Command-line surface: `myscheduler <sysconfig-file> <commands-file> [-v|--verbose]`.
use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "myscheduler", about = "Discrete-event simulator of a single-CPU, multi-device scheduler")]
pub struct Args {
    /// Path to the sysconfig file (devices + time quantum).
    pub sysconfig: PathBuf,
    /// Path to the commands file (named syscall programs).
    pub commands: PathBuf,
    /// Emit a trace of every DES event on stdout.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Sysconfig and command-file parsers.
///
/// Both are line-oriented text scanners in the style the crate already uses
/// for structured text (`open -> BufReader -> lines -> parse each`):
/// blank lines and `#`-prefixed comments are skipped, and every other line
/// is decoded by splitting on whitespace.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Result;

use crate::error::SchedulerError;
use crate::sim::device::Device;
use crate::sim::syscall::{SyscallKind, SystemCall};

/// A command catalog preserving file order, so the "first command in the
/// file" fallback for the entry process (§6.4) is well-defined.
pub type CommandCatalog = Vec<(String, Vec<SystemCall>)>;

const DEFAULT_TIME_QUANTUM: u64 = 100;

/// `device <name> <read>Bps <write>Bps` / `timequantum <N>usec` lines.
pub fn parse_sysconfig(path: &Path) -> Result<(Vec<Device>, u64)> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut devices = Vec::new();
    let mut time_quantum = DEFAULT_TIME_QUANTUM;

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        match parts.as_slice() {
            ["device", name, read_tok, write_tok] => {
                let read_speed =
                    parse_int_suffixed(read_tok, &["Bps"]).map_err(SchedulerError::MalformedSysconfig)?;
                let write_speed =
                    parse_int_suffixed(write_tok, &["Bps"]).map_err(SchedulerError::MalformedSysconfig)?;
                devices.push(Device::new(name.to_string(), read_speed, write_speed));
            }
            ["timequantum", n] => {
                time_quantum =
                    parse_int_suffixed(n, &["usecs", "usec"]).map_err(SchedulerError::MalformedSysconfig)?;
            }
            _ => {
                return Err(SchedulerError::MalformedSysconfig(format!("unrecognized line: {:?}", trimmed)).into())
            }
        }
    }

    Ok((devices, time_quantum))
}

/// Column-0 lines start a new command; indented lines are `<T>usecs <name>
/// [args...]` syscall rows belonging to the most recently started command.
pub fn parse_commands(path: &Path) -> Result<CommandCatalog> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut commands: CommandCatalog = Vec::new();
    let mut current: Option<usize> = None;

    for raw_line in reader.lines() {
        let raw_line = raw_line?;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let is_header = !raw_line.starts_with(' ') && !raw_line.starts_with('\t');
        if is_header {
            commands.push((trimmed.to_string(), Vec::new()));
            current = Some(commands.len() - 1);
        } else {
            let idx = current.ok_or_else(|| {
                SchedulerError::MalformedCommands(format!("syscall line before any command header: {:?}", trimmed))
            })?;
            let syscall = parse_syscall_line(trimmed)?;
            commands[idx].1.push(syscall);
        }
    }

    Ok(commands)
}

fn parse_syscall_line(line: &str) -> Result<SystemCall> {
    let mut parts = line.split_whitespace();
    let when_tok = parts
        .next()
        .ok_or_else(|| SchedulerError::MalformedCommands("missing time offset".to_string()))?;
    let when = parse_int_suffixed(when_tok, &["usecs", "usec"]).map_err(SchedulerError::MalformedCommands)?;

    let name = parts
        .next()
        .ok_or_else(|| SchedulerError::MalformedCommands("missing syscall name".to_string()))?;
    let args: Vec<&str> = parts.collect();

    let kind = match name {
        "spawn" => {
            let command = args
                .first()
                .ok_or_else(|| SchedulerError::MalformedCommands("spawn missing command argument".to_string()))?;
            SyscallKind::Spawn { command: command.to_string() }
        }
        "read" | "write" => {
            let device = args
                .first()
                .ok_or_else(|| SchedulerError::MalformedCommands(format!("{} missing device argument", name)))?;
            let size_tok = args
                .get(1)
                .ok_or_else(|| SchedulerError::MalformedCommands(format!("{} missing size argument", name)))?;
            let size_bytes = parse_int_suffixed(size_tok, &["B"]).map_err(SchedulerError::MalformedCommands)?;
            if name == "read" {
                SyscallKind::Read { device: device.to_string(), size_bytes }
            } else {
                SyscallKind::Write { device: device.to_string(), size_bytes }
            }
        }
        "sleep" => {
            let duration_tok = args
                .first()
                .ok_or_else(|| SchedulerError::MalformedCommands("sleep missing duration argument".to_string()))?;
            let duration_usecs =
                parse_int_suffixed(duration_tok, &["usecs", "usec"]).map_err(SchedulerError::MalformedCommands)?;
            SyscallKind::Sleep { duration_usecs }
        }
        "wait" => SyscallKind::Wait,
        "exit" => SyscallKind::Exit,
        other => return Err(SchedulerError::UnknownSyscall(other.to_string()).into()),
    };

    Ok(SystemCall { when, kind })
}

/// Strips the first matching suffix (checked in order) and parses the
/// remainder as an unsigned integer. Shared by sysconfig parsing, command
/// parsing, and nowhere else — the three suffix families (`Bps`, `usec(s)`,
/// `B`) never overlap in practice.
fn parse_int_suffixed(token: &str, suffixes: &[&str]) -> Result<u64, String> {
    let mut rest = token;
    for suffix in suffixes {
        if let Some(stripped) = rest.strip_suffix(suffix) {
            rest = stripped;
            break;
        }
    }
    rest.parse::<u64>()
        .map_err(|_| format!("expected an integer, got {:?}", token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_devices_and_quantum() {
        let f = write_temp("# comment\ndevice disk1 1000000Bps 800000Bps\ntimequantum 10usec\n");
        let (devices, tq) = parse_sysconfig(f.path()).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "disk1");
        assert_eq!(devices[0].read_speed, 1_000_000);
        assert_eq!(devices[0].write_speed, 800_000);
        assert_eq!(tq, 10);
    }

    #[test]
    fn defaults_quantum_when_absent() {
        let f = write_temp("device disk1 1000Bps 1000Bps\n");
        let (_, tq) = parse_sysconfig(f.path()).unwrap();
        assert_eq!(tq, DEFAULT_TIME_QUANTUM);
    }

    #[test]
    fn rejects_unrecognized_sysconfig_line() {
        let f = write_temp("bogus line here\n");
        assert!(parse_sysconfig(f.path()).is_err());
    }

    #[test]
    fn parses_commands_preserving_order() {
        let f = write_temp(
            "shell\n\t0usecs spawn worker\n\t0usecs exit\nworker\n\t100usecs read disk1 4096B\n\t0usecs exit\n",
        );
        let commands = parse_commands(f.path()).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].0, "shell");
        assert_eq!(commands[1].0, "worker");
        assert_eq!(commands[0].1.len(), 2);
        assert!(matches!(commands[0].1[0].kind, SyscallKind::Spawn { .. }));
        assert!(matches!(commands[1].1[0].kind, SyscallKind::Read { .. }));
    }

    #[test]
    fn rejects_unknown_syscall() {
        let f = write_temp("shell\n\t0usecs frobnicate\n");
        assert!(parse_commands(f.path()).is_err());
    }

    #[test]
    fn rejects_syscall_before_any_header() {
        let f = write_temp("\t0usecs exit\n");
        assert!(parse_commands(f.path()).is_err());
    }
}

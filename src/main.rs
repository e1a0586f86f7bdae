use clap::Parser;

use myscheduler::cli::Args;
use myscheduler::sim::System;
use myscheduler::simio::{parse_commands, parse_sysconfig};

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("myscheduler: {:#}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let (devices, time_quantum) = parse_sysconfig(&args.sysconfig)?;
    let commands = parse_commands(&args.commands)?;

    println!("found {} devices", devices.len());
    println!("time quantum is {}", time_quantum);
    println!("found {} commands", commands.len());

    let mut system = System::new(devices, commands, time_quantum, args.verbose);
    system.start()?;
    Ok(())
}

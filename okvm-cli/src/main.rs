use std::path::PathBuf;
use std::process::ExitCode;

use okvm::{Status, Vm, Width};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

/// Exit code when the VM stops with a fault
const EXIT_PANIC: u8 = 2;

/// Exit code when `--max-ticks` runs out
const EXIT_TIMEOUT: u8 = 3;

/// OK virtual machine runner
#[derive(Parser)]
#[clap(author, about, long_about = None)]
struct Args {
    /// ROM to load and execute
    rom: Option<PathBuf>,

    /// Print version information before running
    #[clap(short = 'v', long = "version")]
    show_version: bool,

    /// Machine word width in bytes, which sets the RAM and ROM size
    #[clap(
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(1..=4)
    )]
    word_size: u8,

    /// Give up after executing this many instructions
    #[clap(long)]
    max_ticks: Option<u64>,
}

fn main() -> Result<ExitCode> {
    let env = env_logger::Env::default()
        .filter_or("OKVM_LOG", "info")
        .write_style_or("OKVM_LOG_STYLE", "always");
    env_logger::init_from_env(env);

    let args = Args::parse();
    if args.show_version {
        println!(
            "okmin - a minimal OK virtual machine, version {}",
            env!("CARGO_PKG_VERSION")
        );
    }
    let Some(rom) = args.rom else {
        if args.show_version {
            return Ok(ExitCode::SUCCESS);
        }
        anyhow::bail!("no ROM provided (usage: okmin [-v] file.rom)");
    };

    let word = Width::new(args.word_size).context("invalid word size")?;
    let mut vm = Vm::from_file(&rom, word)
        .with_context(|| format!("failed to load {rom:?}"))?;
    okvm_devices::install_stdio(&mut vm)
        .context("failed to register devices")?;

    let start = std::time::Instant::now();
    vm.start();
    let mut ticks = 0u64;
    let status = loop {
        if args.max_ticks.is_some_and(|n| ticks >= n) {
            error!("still running after {ticks} ticks, at {:#08x}", vm.pc());
            return Ok(ExitCode::from(EXIT_TIMEOUT));
        }
        let s = vm.tick();
        ticks += 1;
        if s != Status::Running {
            break s;
        }
    };
    info!("{status:?} after {ticks} ticks in {:?}", start.elapsed());

    match status {
        Status::Panic => {
            match vm.fault() {
                Some(f) => error!("VM panicked at {:#08x}: {f}", vm.pc()),
                None => error!("VM panicked at {:#08x}", vm.pc()),
            }
            Ok(ExitCode::from(EXIT_PANIC))
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}

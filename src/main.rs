use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info, LevelFilter};

use ls8::{loader, Cpu, CpuError, LoadError};

const EXIT_LOAD: u8 = 3;
const EXIT_FAULT: u8 = 4;

#[derive(Parser, Debug)]
#[command(name = "ls8")]
#[command(about = "Run an LS-8 program image", long_about = None)]
struct Args {
    /// Program image: one 8-digit binary literal per line, `#` comments allowed.
    program: PathBuf,

    /// Log a TRACE line (PC, next three bytes, registers) before every cycle.
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    // clap exits with status 2 on usage errors
    let args = Args::parse();

    // RUST_LOG=debug shows every decoded instruction; log output goes to stderr
    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if args.trace {
        logger.filter_module("ls8", LevelFilter::Trace);
    }
    logger.init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            if err.downcast_ref::<LoadError>().is_some() {
                ExitCode::from(EXIT_LOAD)
            } else if err.downcast_ref::<CpuError>().is_some() {
                ExitCode::from(EXIT_FAULT)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    info!("Loading {}", args.program.display());
    let image = loader::load_file(&args.program)?;

    let mut cpu = Cpu::new(&image)?;
    info!("Starting execution ({} bytes)", image.len());
    cpu.run()
        .with_context(|| format!("CPU fault at pc={:#04x}", cpu.pc))?;

    info!("Execution completed successfully");
    Ok(())
}

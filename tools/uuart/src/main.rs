//! uuart - Userspace VUART register drill
//!
//! Maps the VUART register page from `/dev/mem`, initialises the device and
//! polls it, logging stalls and resumes to stderr and copying received bytes
//! to stdout.
//!
//! Usage:
//!   uuart [-D] [-E] [-F] [-R] [-T] [--instance vuart1|vuart2] [ITERATIONS]
//!
//! Without ITERATIONS the startup register state is dumped and nothing is
//! written. A negative ITERATIONS polls until the process is killed.

use std::io;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use vuart::{
    dump, initialize, BootClock, Checkpoint, DeviceWindow, Instance, Iterations, PollLoop,
    VuartConfig, VuartError,
};

#[derive(Parser, Debug)]
#[command(name = "uuart")]
#[command(version)]
#[command(about = "Userspace UART driver for exercising the Aspeed VUART")]
struct Args {
    /// Assume MCR[DTR] and MCR[RTS] are set appropriately
    #[arg(short = 'D', long)]
    assume_dtr: bool,

    /// Assume the UART is enabled and configured to not drain the Rx FIFO
    #[arg(short = 'E', long)]
    assume_enabled: bool,

    /// Assume the FIFOs are configured and do not need resetting
    #[arg(short = 'F', long)]
    assume_fifos: bool,

    /// Ignore LSR[DR] and do not read RBR
    #[arg(short = 'R', long)]
    ignore_rx: bool,

    /// Ignore LSR[THRE] and do not write THR
    #[arg(short = 'T', long)]
    ignore_tx: bool,

    /// VUART instance to map
    #[arg(long, value_enum, default_value_t = InstanceArg::Vuart2)]
    instance: InstanceArg,

    /// Physical base address, overriding --instance (default: instance base)
    #[arg(long)]
    base: Option<String>,

    /// Poll iterations; negative polls forever, absent only dumps registers
    #[arg(allow_negative_numbers = true)]
    iterations: Option<i64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InstanceArg {
    Vuart1,
    Vuart2,
}

impl From<InstanceArg> for Instance {
    fn from(arg: InstanceArg) -> Self {
        match arg {
            InstanceArg::Vuart1 => Instance::Vuart1,
            InstanceArg::Vuart2 => Instance::Vuart2,
        }
    }
}

impl Args {
    fn config(&self) -> VuartConfig {
        VuartConfig {
            assume_dtr: self.assume_dtr,
            assume_enabled: self.assume_enabled,
            assume_fifos: self.assume_fifos,
            ignore_rx: self.ignore_rx,
            ignore_tx: self.ignore_tx,
        }
    }

    fn base_address(&self) -> Result<usize> {
        match &self.base {
            Some(base) => parse_hex_or_dec(base).map_err(|e| {
                VuartError::ConfigurationError(format!("--base {base}: {e:#}")).into()
            }),
            None => Ok(Instance::from(self.instance).base()),
        }
    }
}

fn parse_hex_or_dec(s: &str) -> Result<usize> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).context("Invalid hex number")
    } else {
        s.parse::<usize>().context("Invalid decimal number")
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args = Args::parse();
    let config = args.config();
    let base = args.base_address()?;

    log::debug!("Configuration: {config:?}, base {base:#x}");

    let mut window = DeviceWindow::open(base)
        .with_context(|| format!("Failed to map VUART registers at {base:#x}"))?;

    dump(&mut window, Checkpoint::Startup);

    let Some(count) = args.iterations else {
        return Ok(());
    };

    initialize(&mut window, &config);
    dump(&mut window, Checkpoint::Initialised);

    let iterations = Iterations::from(count);
    log::info!("Running for {count} iterations");

    let report = PollLoop::new(&mut window, config, BootClock, io::stdout().lock())
        .run(iterations)
        .context("VUART poll loop failed")?;

    dump(&mut window, Checkpoint::Terminating);
    report.log();

    Ok(())
}

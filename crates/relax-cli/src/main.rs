//! `relax`: run a heat relaxation from the command line.
//!
//! Prints the launch geometry and problem size, runs to convergence, and
//! prints the iteration count and timings. Logging goes to stderr and is
//! controlled by `RUST_LOG` (default `warn`).

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use relax_engine::{DeviceSelection, IterationController, RunConfig, RunError};

/// Fields longer than this are not printed by `--print-field`.
const PRINT_LIMIT: usize = 1_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DeviceArg {
    /// Single-threaded reference device.
    Sequential,
    /// Work-groups evaluated on a rayon thread pool.
    Threads,
}

#[derive(Debug, Parser)]
#[command(
    name = "relax",
    version,
    about = "Relax a 1-D heat field until every interior cell settles within eps"
)]
struct Cli {
    /// Number of cells, boundaries included (minimum 3)
    #[arg(long, default_value_t = RunConfig::DEFAULT_LEN)]
    len: usize,

    /// Fixed value of the left boundary cell
    #[arg(long, default_value_t = 100.0, allow_negative_numbers = true)]
    heat: f64,

    /// Fixed value of the right boundary cell
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    right_boundary: f64,

    /// Convergence tolerance on every interior cell
    #[arg(long, default_value_t = 0.1)]
    eps: f64,

    /// Work-items per work-group
    #[arg(long, default_value_t = RunConfig::DEFAULT_WORK_GROUP_SIZE)]
    work_group_size: usize,

    /// Fail instead of iterating past this many applications
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Compute device
    #[arg(long, value_enum, default_value_t = DeviceArg::Threads)]
    device: DeviceArg,

    /// Worker threads for `--device threads` (default: rayon's global pool)
    #[arg(long)]
    threads: Option<usize>,

    /// Print both fields after the run (only when len <= 1000)
    #[arg(long)]
    print_field: bool,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let device = match self.device {
            DeviceArg::Sequential => DeviceSelection::Sequential,
            DeviceArg::Threads => DeviceSelection::ThreadPool {
                threads: self.threads,
            },
        };
        RunConfig {
            len: self.len,
            heat: self.heat,
            right_boundary: self.right_boundary,
            eps: self.eps,
            work_group_size: self.work_group_size,
            max_iterations: self.max_iterations,
            device,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    Registry::default().with(filter).with(fmt_layer).init();
}

/// The lines printed before the run starts.
fn banner(config: &RunConfig) -> String {
    let mb = config.field_bytes() / (1024 * 1024);
    format!(
        "work group size: {}\nglobal work size: {}\n\nsize   : {} M ({} MB)\nheat   : {:.6}\nepsilon: {:.6}",
        config.work_group_size,
        config.len,
        config.len / 1_000_000,
        mb,
        config.heat,
        config.eps,
    )
}

fn run(cli: &Cli) -> Result<(), RunError> {
    let config = cli.run_config();
    config.validate()?;
    if cli.threads.is_some() && cli.device == DeviceArg::Sequential {
        warn!("--threads is ignored by the sequential device");
    }
    println!("{}", banner(&config));

    let device = config.device.build()?;
    let mut ctl = IterationController::new(config, device)?;
    let report = ctl.run()?;

    println!("{report}");
    if cli.print_field {
        if ctl.fields().len() <= PRINT_LIMIT {
            let (a, b) = (ctl.fields().field_a(), ctl.fields().field_b());
            println!("a: {a}");
            println!("b: {b}");
        } else {
            warn!(
                len = ctl.fields().len(),
                limit = PRINT_LIMIT,
                "field too long to print"
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

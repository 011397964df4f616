use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use blocking_pool::workload::parse_program;
use blocking_pool::{Pool, PoolConfig, ShutdownMode, logging, report};

/// Feed simulated workloads to a pool of blocking-queue workers.
#[derive(Debug, Parser)]
#[command(name = "blocking_pool", version)]
struct Cli {
    /// Letters A-D dispatch a workload; digits 0-9 pause the producer.
    #[arg(value_name = "PROGRAM")]
    program: String,

    /// Number of workers (and queues).
    #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    workers: u16,

    /// Length of one time unit, in milliseconds.
    #[arg(short, long, env = "BLOCKING_POOL_UNIT_MS", default_value_t = 1000)]
    unit_ms: u64,

    /// How workers are told to stop once the program is done.
    #[arg(long, value_enum, default_value_t = ShutdownMode::Sentinel)]
    shutdown: ShutdownMode,
}

fn run(cli: Cli) -> blocking_pool::Result<()> {
    let steps = parse_program(&cli.program);
    tracing::debug!(?cli, steps = steps.len(), "parsed program");

    let config = PoolConfig::new(usize::from(cli.workers), Duration::from_millis(cli.unit_ms));
    let cpu_start = report::cpu_times_seconds();
    let mut pool = Pool::start(config)?;
    pool.run_program(&steps)?;
    let result = pool.shutdown(cli.shutdown)?;
    let cpu = report::cpu_delta(cpu_start, report::cpu_times_seconds());

    print!("{}", report::render(&result, cpu));
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "run failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

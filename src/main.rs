use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sdr_bench::endpoint::EndpointPaths;
use sdr_bench::impairment::NetemShaper;
use sdr_bench::mode::TransferMode;
use sdr_bench::sweep::{self, SweepConfig};
use sdr_bench::trial::PairRunner;
use sdr_bench::report;

#[derive(Parser, Debug)]
#[command(
    name = "sdr_bench",
    author,
    version,
    about = "Run SDR/SR/EC transfer benchmarks under tc netem and emit CSV"
)]
struct Cli {
    /// TCP control port for the endpoint handshake
    #[arg(long = "tcp", default_value_t = 8888)]
    tcp_port: u16,

    /// UDP data port (the impaired flow)
    #[arg(long = "udp", default_value_t = 9999)]
    udp_port: u16,

    /// Interface to install netem rules on
    #[arg(long, default_value = "lo")]
    iface: String,

    /// Loss percentages to sweep
    #[arg(long, num_args = 1.., default_values_t = [0.0, 1.0, 5.0, 10.0])]
    loss: Vec<f64>,

    /// Base delay in ms applied alongside nonzero loss
    #[arg(long, default_value_t = 50)]
    delay: u32,

    /// Delay jitter in ms
    #[arg(long, default_value_t = 10)]
    jitter: u32,

    /// Payload sizes in bytes
    #[arg(long, num_args = 1.., default_values_t = [1_048_576u64])]
    sizes: Vec<u64>,

    /// Iterations per condition
    #[arg(long, default_value_t = 3)]
    iters: u32,

    /// Modes to measure
    #[arg(long, value_enum, num_args = 1.., default_values_t = TransferMode::ALL)]
    modes: Vec<TransferMode>,

    /// Receiver config file, passed through to the receiver binary
    #[arg(long, default_value = "config/receiver.config")]
    config: PathBuf,

    /// Directory containing the sdr_test_receiver / sdr_test_sender binaries
    #[arg(long = "bin-dir", default_value = "build")]
    bin_dir: PathBuf,

    /// CSV output path
    #[arg(long, default_value = "results.csv")]
    output: PathBuf,

    /// Do not touch tc; assume impairment is configured externally
    #[arg(long = "no-netem")]
    no_netem: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Cli::parse();
    let endpoints = EndpointPaths::locate(&args.bin_dir)?;

    let cfg = SweepConfig {
        interface: args.iface,
        udp_port: args.udp_port,
        loss_levels: args.loss,
        delay_ms: args.delay,
        jitter_ms: args.jitter,
        sizes: args.sizes,
        modes: args.modes,
        iterations: args.iters,
        manage_impairment: !args.no_netem,
    };
    let runner = PairRunner::new(
        endpoints.receiver,
        endpoints.sender,
        args.tcp_port,
        args.udp_port,
        args.config,
    );

    let results = sweep::run_sweep(&cfg, &NetemShaper, &runner)?;
    report::write_csv(&args.output, &results)?;

    info!(
        rows = results.len(),
        output = %args.output.display(),
        "benchmark complete"
    );
    info!("empty throughput_mbps cells mean timing could not be parsed; check the endpoint logs");
    Ok(())
}

//! Entry point for `arq-over-udp`.
//!
//! Parses CLI arguments, loads the payload file and runs the requested number
//! of trials in either **stop-and-wait** or **sliding-window** mode.  All
//! protocol work is delegated to the library; `main.rs` owns only process
//! setup (logging, argument parsing, file loading, output).
//!
//! Output is exactly three lines: average throughput (B/s), average
//! per-segment delay (s) and average score, each with seven decimals.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use arq_over_udp::config::{DEFAULT_CHUNK_SIZE, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_WINDOW};
use arq_over_udp::simulator::SimulatorConfig;
use arq_over_udp::trial::run_trials;
use arq_over_udp::SenderConfig;

/// Reliable file transfer over UDP with cumulative ACKs.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Send one segment at a time, waiting for each ACK.
    StopAndWait(SendArgs),
    /// Keep up to `--window` segments in flight.
    SlidingWindow {
        /// Maximum number of unacknowledged segments.
        #[arg(short, long, default_value_t = DEFAULT_WINDOW)]
        window: usize,
        #[command(flatten)]
        args: SendArgs,
    },
}

#[derive(Args)]
struct SendArgs {
    /// Receiver host.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    /// Receiver UDP port.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// File to send.
    #[arg(short, long, default_value = "file.mp3")]
    file: PathBuf,
    /// Payload bytes per data frame.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    /// Retransmission interval in milliseconds.
    #[arg(long, default_value_t = 500)]
    rto_ms: u64,
    /// Retransmission sweep period in milliseconds.
    #[arg(long, default_value_t = 100)]
    sweep_ms: u64,
    /// Receive wait granularity in milliseconds.
    #[arg(long, default_value_t = 100)]
    recv_timeout_ms: u64,
    /// Give up after this many resends of one segment (default: never).
    #[arg(long)]
    max_retransmits: Option<u32>,
    /// Number of transfers to average over.
    #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    trials: u64,
    /// Simulated loss probability applied to every datagram.
    #[arg(long, default_value_t = 0.0)]
    loss_rate: f64,
    /// Seed for the loss simulator.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl SendArgs {
    fn config(&self, window_size: usize) -> SenderConfig {
        SenderConfig {
            host: self.host.clone(),
            port: self.port,
            chunk_size: self.chunk_size,
            window_size,
            retransmit_interval: Duration::from_millis(self.rto_ms),
            sweep_interval: Duration::from_millis(self.sweep_ms),
            recv_timeout: Duration::from_millis(self.recv_timeout_ms),
            max_retransmits: self.max_retransmits,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let (args, config) = match &cli.mode {
        Mode::StopAndWait(args) => (args, args.config(1)),
        Mode::SlidingWindow { window, args } => (args, args.config(*window)),
    };
    config.validate().context("invalid sender configuration")?;

    let payload = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    log::info!(
        "Sending {} ({} bytes) to {}:{} with window {}, {} trial(s)",
        args.file.display(),
        payload.len(),
        config.host,
        config.port,
        config.window_size,
        args.trials
    );

    let faults = SimulatorConfig::lossy(args.loss_rate, args.seed);
    let trials = usize::try_from(args.trials).context("trial count does not fit in usize")?;
    let outcome = run_trials(&config, &payload, trials, &faults).await?;

    println!("{}", outcome.summary);
    Ok(())
}

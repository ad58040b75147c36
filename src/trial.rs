//! Repeated-transfer driver.
//!
//! Network conditions vary from run to run, so the same payload is sent
//! several times, each on a freshly bound endpoint, and the three metrics
//! are averaged.  Trials run one after another; sessions share nothing.

use crate::config::SenderConfig;
use crate::error::SessionError;
use crate::metrics::TrialSummary;
use crate::session::{Session, TransferReport};
use crate::simulator::{Simulator, SimulatorConfig};
use crate::transport::UdpTransport;

/// Outcome of [`run_trials`]: the averaged metrics plus each run's report.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub summary: TrialSummary,
    pub reports: Vec<TransferReport>,
}

/// Send `payload` to the configured peer `trials` times.
///
/// Every trial goes through a [`Simulator`]; with the default
/// [`SimulatorConfig`] it is a pass-through.  Trial `i` seeds the simulator
/// with `faults.seed + i` so runs differ but stay reproducible.
pub async fn run_trials(
    config: &SenderConfig,
    payload: &[u8],
    trials: usize,
    faults: &SimulatorConfig,
) -> Result<TrialOutcome, SessionError> {
    config.validate()?;
    if !faults.is_transparent() {
        log::info!(
            "[trial] simulating loss={} duplication={} seed={}",
            faults.loss_rate,
            faults.duplicate_rate,
            faults.seed
        );
    }
    let mut reports = Vec::with_capacity(trials);

    for trial in 0..trials {
        let udp = UdpTransport::open(&config.host, config.port).await?;
        log::debug!("[trial] {}/{} from {}", trial + 1, trials, udp.local_addr);
        let seeded = SimulatorConfig {
            seed: faults.seed.wrapping_add(trial as u64),
            ..faults.clone()
        };
        let transport = Simulator::new(udp, &seeded);

        let report = Session::new(transport, payload, config)?.run().await?;
        log::info!(
            "[trial] {}/{}: {:.7} B/s, {:.7} s, score {:.7}",
            trial + 1,
            trials,
            report.metrics.throughput,
            report.metrics.mean_delay,
            report.metrics.score
        );
        reports.push(report);
    }

    let runs: Vec<_> = reports.iter().map(|r| r.metrics).collect();
    Ok(TrialOutcome {
        summary: TrialSummary::average(&runs),
        reports,
    })
}

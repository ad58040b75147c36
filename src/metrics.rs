//! Transfer metrics: throughput, mean per-segment delay and composite score.
//!
//! The score formula is fixed and reproduced exactly:
//! `0.3 * (throughput / 1000) + 0.7 / mean_delay`, or `0` when there is no
//! positive delay sample.

use std::fmt;
use std::time::Duration;

/// Collects delay samples while a session runs.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    delays: Vec<Duration>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, delays: impl IntoIterator<Item = Duration>) {
        self.delays.extend(delays);
    }

    pub fn samples(&self) -> usize {
        self.delays.len()
    }

    /// Mean delay in seconds; `0.0` with no samples.
    pub fn mean_delay(&self) -> f64 {
        if self.delays.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.delays.iter().map(Duration::as_secs_f64).sum();
        sum / self.delays.len() as f64
    }

    /// Derive the final metrics for `total_bytes` sent over `elapsed`.
    pub fn finish(&self, total_bytes: usize, elapsed: Duration) -> Metrics {
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 {
            total_bytes as f64 / secs
        } else {
            0.0
        };
        let mean_delay = self.mean_delay();
        Metrics {
            throughput,
            mean_delay,
            score: score(throughput, mean_delay),
        }
    }
}

/// Composite score.  Unbounded as `mean_delay` approaches zero.
pub fn score(throughput: f64, mean_delay: f64) -> f64 {
    if mean_delay > 0.0 {
        0.3 * (throughput / 1000.0) + 0.7 / mean_delay
    } else {
        0.0
    }
}

/// The three per-run results.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    /// Bytes per second over the whole session.
    pub throughput: f64,
    /// Seconds from first send to acknowledgement, averaged over segments.
    pub mean_delay: f64,
    pub score: f64,
}

/// Seven decimals, one value per line, no labels.
impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:.7}", self.throughput)?;
        writeln!(f, "{:.7}", self.mean_delay)?;
        write!(f, "{:.7}", self.score)
    }
}

/// Arithmetic mean of several runs' metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrialSummary {
    pub trials: usize,
    pub average: Metrics,
}

impl TrialSummary {
    pub fn average(runs: &[Metrics]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }
        let n = runs.len() as f64;
        let mean = |f: fn(&Metrics) -> f64| runs.iter().map(f).sum::<f64>() / n;
        Self {
            trials: runs.len(),
            average: Metrics {
                throughput: mean(|m| m.throughput),
                mean_delay: mean(|m| m.mean_delay),
                score: mean(|m| m.score),
            },
        }
    }
}

impl fmt::Display for TrialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.average, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_formula_is_exact() {
        let s = score(50_000.0, 0.25);
        assert_eq!(s, 0.3 * (50_000.0 / 1000.0) + 0.7 / 0.25);
    }

    #[test]
    fn zero_delay_scores_zero() {
        assert_eq!(score(1e9, 0.0), 0.0);
    }

    #[test]
    fn empty_collector() {
        let m = MetricsCollector::new().finish(0, Duration::from_millis(20));
        assert_eq!(m, Metrics { throughput: 0.0, mean_delay: 0.0, score: 0.0 });
    }

    #[test]
    fn throughput_and_mean_delay() {
        let mut c = MetricsCollector::new();
        c.extend([Duration::from_millis(100)]);
        c.extend([Duration::from_millis(300)]);
        assert_eq!(c.samples(), 2);

        let m = c.finish(2_000, Duration::from_secs(2));
        assert_eq!(m.throughput, 1000.0);
        assert!((m.mean_delay - 0.2).abs() < 1e-12);
        assert_eq!(m.score, score(1000.0, m.mean_delay));
    }

    #[test]
    fn zero_elapsed_gives_zero_throughput() {
        let m = MetricsCollector::new().finish(10, Duration::ZERO);
        assert_eq!(m.throughput, 0.0);
        assert!(m.throughput.is_finite());
    }

    #[test]
    fn display_uses_seven_decimals() {
        let m = Metrics { throughput: 1234.5, mean_delay: 0.05, score: 14.37035 };
        assert_eq!(m.to_string(), "1234.5000000\n0.0500000\n14.3703500");
    }

    #[test]
    fn summary_averages_each_field() {
        let runs = [
            Metrics { throughput: 100.0, mean_delay: 0.1, score: 1.0 },
            Metrics { throughput: 300.0, mean_delay: 0.3, score: 3.0 },
        ];
        let s = TrialSummary::average(&runs);
        assert_eq!(s.trials, 2);
        assert_eq!(s.average.throughput, 200.0);
        assert!((s.average.mean_delay - 0.2).abs() < 1e-12);
        assert_eq!(s.average.score, 2.0);
        assert_eq!(TrialSummary::average(&[]).trials, 0);
    }
}

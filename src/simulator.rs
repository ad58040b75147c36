//! Fault-injecting transport for lossy-link experiments and tests.
//!
//! Real networks drop and duplicate datagrams.  To exercise the reliability
//! mechanisms without depending on actual network conditions, [`Simulator`]
//! wraps any [`Transport`] and applies a configurable fault model:
//!
//! | Fault       | Description                                         |
//! |-------------|-----------------------------------------------------|
//! | Loss        | Drop a datagram (either direction) with `loss_rate`. |
//! | Duplication | Send an outbound datagram twice with `duplicate_rate`. |
//!
//! The RNG is seeded, so a failing lossy run can be replayed exactly.

use std::io;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::transport::Transport;

/// Configuration for the fault model.
///
/// Probabilities are clamped into `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Probability that any given datagram is silently dropped.
    pub loss_rate: f64,
    /// Probability that an outbound datagram is delivered twice.
    pub duplicate_rate: f64,
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults: a transparent pass-through.
        Self {
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            seed: 0,
        }
    }
}

impl SimulatorConfig {
    pub fn lossy(loss_rate: f64, seed: u64) -> Self {
        Self {
            loss_rate,
            seed,
            ..Self::default()
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.loss_rate <= 0.0 && self.duplicate_rate <= 0.0
    }
}

/// Counters of injected faults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultStats {
    pub dropped_outbound: u64,
    pub dropped_inbound: u64,
    pub duplicated: u64,
}

/// A fault-injecting wrapper around another transport.
#[derive(Debug)]
pub struct Simulator<T> {
    inner: T,
    loss_rate: f64,
    duplicate_rate: f64,
    rng: StdRng,
    stats: FaultStats,
}

impl<T: Transport> Simulator<T> {
    pub fn new(inner: T, config: &SimulatorConfig) -> Self {
        Self {
            inner,
            loss_rate: config.loss_rate.clamp(0.0, 1.0),
            duplicate_rate: config.duplicate_rate.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(config.seed),
            stats: FaultStats::default(),
        }
    }

    pub fn stats(&self) -> FaultStats {
        self.stats
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn roll(&mut self, p: f64) -> bool {
        p > 0.0 && self.rng.random::<f64>() < p
    }
}

impl<T: Transport> Transport for Simulator<T> {
    async fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        if self.roll(self.loss_rate) {
            self.stats.dropped_outbound += 1;
            log::trace!("[sim] dropped outbound datagram ({} bytes)", datagram.len());
            return Ok(());
        }
        self.inner.send(datagram).await?;
        if self.roll(self.duplicate_rate) {
            self.stats.duplicated += 1;
            self.inner.send(datagram).await?;
        }
        Ok(())
    }

    async fn recv_timeout(&mut self, wait: Duration) -> io::Result<Option<Vec<u8>>> {
        match self.inner.recv_timeout(wait).await? {
            Some(datagram) if self.roll(self.loss_rate) => {
                self.stats.dropped_inbound += 1;
                log::trace!("[sim] dropped inbound datagram ({} bytes)", datagram.len());
                Ok(None)
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Records sends and replays a fixed inbound queue.
    #[derive(Default)]
    struct Loopback {
        sent: Vec<Vec<u8>>,
        inbound: VecDeque<Vec<u8>>,
    }

    impl Transport for Loopback {
        async fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
            self.sent.push(datagram.to_vec());
            Ok(())
        }

        async fn recv_timeout(&mut self, _wait: Duration) -> io::Result<Option<Vec<u8>>> {
            Ok(self.inbound.pop_front())
        }
    }

    #[tokio::test]
    async fn transparent_by_default() {
        let mut sim = Simulator::new(Loopback::default(), &SimulatorConfig::default());
        for i in 0..100u8 {
            sim.send(&[i]).await.unwrap();
        }
        assert_eq!(sim.inner().sent.len(), 100);
        assert_eq!(sim.stats(), FaultStats::default());
        assert!(SimulatorConfig::default().is_transparent());
    }

    #[tokio::test]
    async fn total_loss_drops_both_directions() {
        let inner = Loopback {
            inbound: VecDeque::from(vec![vec![1], vec![2]]),
            ..Default::default()
        };
        let mut sim = Simulator::new(inner, &SimulatorConfig::lossy(1.0, 7));
        sim.send(b"x").await.unwrap();
        assert_eq!(sim.recv_timeout(Duration::ZERO).await.unwrap(), None);
        assert_eq!(sim.recv_timeout(Duration::ZERO).await.unwrap(), None);

        let stats = sim.stats();
        assert_eq!(stats.dropped_outbound, 1);
        assert_eq!(stats.dropped_inbound, 2);
        assert!(sim.into_inner().sent.is_empty());
    }

    #[tokio::test]
    async fn duplication_sends_twice() {
        let config = SimulatorConfig {
            duplicate_rate: 1.0,
            ..SimulatorConfig::default()
        };
        let mut sim = Simulator::new(Loopback::default(), &config);
        sim.send(b"dup").await.unwrap();
        assert_eq!(sim.inner().sent, vec![b"dup".to_vec(), b"dup".to_vec()]);
        assert_eq!(sim.stats().duplicated, 1);
    }

    #[tokio::test]
    async fn same_seed_same_faults() {
        async fn pattern(seed: u64) -> Vec<Vec<u8>> {
            let mut sim = Simulator::new(Loopback::default(), &SimulatorConfig::lossy(0.5, seed));
            for i in 0..64u8 {
                sim.send(&[i]).await.unwrap();
            }
            sim.into_inner().sent
        }
        let a = pattern(42).await;
        assert_eq!(a, pattern(42).await);
        assert!(!a.is_empty() && a.len() < 64);
    }
}

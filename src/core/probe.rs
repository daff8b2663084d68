//! Connectivity probing with bounded exponential backoff.
//!
//! A probe is a plain TCP connect; an ordinary refusal or timeout is a
//! `false`, never an error. The wait loop keeps probing with growing
//! delays until the endpoint accepts or an overall deadline elapses.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

/// Trait for a single reachability probe.
#[async_trait]
pub trait Prober: Send + Sync {
    /// True when a TCP-level connection could be established within the
    /// timeout.
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> bool;
}

/// Production prober using a real TCP connect.
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, host: &str, port: u16, limit: Duration) -> bool {
        matches!(
            timeout(limit, TcpStream::connect((host, port))).await,
            Ok(Ok(_))
        )
    }
}

/// Backoff and deadline settings for one wait loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitSettings {
    /// Overall deadline for the loop in milliseconds
    #[serde(default = "default_overall_timeout")]
    pub overall_timeout_ms: u64,

    /// Delay after the first failed probe in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Cap on the between-probe delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Delay multiplier applied after each failed probe
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Per-probe connect timeout in milliseconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

fn default_overall_timeout() -> u64 {
    300_000
} // 5 min
fn default_initial_delay() -> u64 {
    2_000
}
fn default_max_delay() -> u64 {
    30_000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_probe_timeout() -> u64 {
    5_000
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self::cluster()
    }
}

impl WaitSettings {
    /// Profile for the cluster endpoint: five minutes overall, delays
    /// growing from two seconds to thirty.
    pub fn cluster() -> Self {
        Self {
            overall_timeout_ms: default_overall_timeout(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }

    /// Profile for a freshly-created database: ten minutes overall, delay
    /// cap raised to sixty seconds. Managed engines route per-database
    /// connections through state that converges later than the cluster
    /// endpoint itself.
    pub fn database() -> Self {
        Self {
            overall_timeout_ms: 600_000,
            max_delay_ms: 60_000,
            ..Self::cluster()
        }
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Delay before the next probe, for a 1-indexed failed attempt count
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.initial_delay_ms);
        }

        let delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }
}

/// The overall deadline elapsed without a successful probe. Fatal; aborts
/// the bootstrap.
#[derive(Debug, Clone, Error)]
#[error("{scope} not reachable after {attempts} attempts over {elapsed_ms}ms")]
pub struct ProbeTimeout {
    pub scope: String,
    pub attempts: u32,
    pub elapsed_ms: u64,
}

/// Probe until the endpoint accepts or the deadline elapses.
///
/// `scope` is a display label carried into log lines and the error (the
/// cluster address, or a database name for post-creation waits). Returns
/// the number of probes it took.
pub async fn wait_until_reachable(
    prober: &dyn Prober,
    host: &str,
    port: u16,
    scope: &str,
    settings: &WaitSettings,
) -> Result<u32, ProbeTimeout> {
    let started = Instant::now();
    let deadline = started + settings.overall_timeout();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        if prober.probe(host, port, settings.probe_timeout()).await {
            info!(scope, attempt, "endpoint reachable");
            return Ok(attempt);
        }

        let delay = settings.delay_for_attempt(attempt);
        let now = Instant::now();

        if now >= deadline || now + delay >= deadline {
            return Err(ProbeTimeout {
                scope: scope.to_string(),
                attempts: attempt,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        debug!(
            scope,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "endpoint not reachable yet, backing off"
        );
        sleep(delay).await;
    }
}

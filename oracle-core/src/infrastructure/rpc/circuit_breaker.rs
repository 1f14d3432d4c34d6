use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const MAX_BACKOFF_EXPONENT_SHIFT: u32 = 30;
const BASE_BACKOFF_SECS: u64 = 1;

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct CircuitBreakerConfig {
    /// Failures before opening circuit.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Max time circuit stays open before probing (seconds).
    #[serde(default = "default_open_duration_secs")]
    pub open_duration_secs: u64,
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_open_duration_secs() -> u64 {
    30
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: default_failure_threshold(), open_duration_secs: default_open_duration_secs() }
    }
}

/// Circuit breaker with Closed/Open/HalfOpen states, one per external endpoint.
pub struct CircuitBreaker {
    name: &'static str,
    cfg: CircuitBreakerConfig,
    state: parking_lot::Mutex<State>,
}

#[derive(Debug)]
enum State {
    Closed { failures: u32 },
    Open { until: Instant, open_count: u32 },
    HalfOpen { open_count: u32 },
}

impl CircuitBreaker {
    pub fn new(name: &'static str, cfg: CircuitBreakerConfig) -> Self {
        Self { name, cfg, state: parking_lot::Mutex::new(State::Closed { failures: 0 }) }
    }

    pub fn allow(&self) -> bool {
        let now = Instant::now();
        let mut guard = self.state.lock();
        match *guard {
            State::Closed { .. } | State::HalfOpen { .. } => true,
            State::Open { until, open_count } => {
                if now < until {
                    debug!("circuit breaker open; denying request name={} open_count={}", self.name, open_count);
                    false
                } else {
                    info!("circuit breaker transitioning open->half_open name={} open_count={}", self.name, open_count);
                    *guard = State::HalfOpen { open_count };
                    true
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut guard = self.state.lock();
        match *guard {
            State::Closed { failures: 0 } => {}
            State::Closed { .. } | State::HalfOpen { .. } => {
                debug!("circuit breaker closed name={}", self.name);
                *guard = State::Closed { failures: 0 };
            }
            State::Open { .. } => {}
        }
    }

    pub fn record_failure(&self) {
        let mut guard = self.state.lock();
        match *guard {
            State::Closed { failures } => {
                let next = failures.saturating_add(1);
                if next >= self.cfg.failure_threshold.max(1) {
                    let until = self.open_until(1);
                    warn!("circuit breaker opened name={} failures={} threshold={}", self.name, next, self.cfg.failure_threshold);
                    *guard = State::Open { until, open_count: 1 };
                } else {
                    *guard = State::Closed { failures: next };
                }
            }
            State::HalfOpen { open_count } => {
                let next_open_count = open_count.saturating_add(1);
                warn!("circuit breaker re-opened from half-open name={} open_count={}", self.name, next_open_count);
                *guard = State::Open { until: self.open_until(next_open_count), open_count: next_open_count };
            }
            State::Open { .. } => {}
        }
    }

    fn open_until(&self, open_count: u32) -> Instant {
        // Exponential backoff capped at cfg.open_duration_secs, with +-20% jitter.
        let max = Duration::from_secs(self.cfg.open_duration_secs.max(1));
        let shift = open_count.saturating_sub(1).min(MAX_BACKOFF_EXPONENT_SHIFT);
        let factor = 1u32.checked_shl(shift).unwrap_or(u32::MAX);
        let exp = Duration::from_secs(BASE_BACKOFF_SECS).checked_mul(factor).unwrap_or(max);
        let capped = exp.min(max);
        let jitter = rand::thread_rng().gen_range(0.8..=1.2);
        Instant::now() + capped.mul_f64(jitter)
    }
}

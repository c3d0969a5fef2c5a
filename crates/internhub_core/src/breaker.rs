//! Circuit breaker guarding document-store calls.
//!
//! # States
//! - Closed: calls pass through; consecutive failures are counted.
//! - Open: calls are rejected without touching the store until the cooldown
//!   elapses.
//! - Half-open: exactly one probe call is in flight; its outcome closes or
//!   re-opens the breaker.
//!
//! # Invariants
//! - One breaker instance is shared by every factory of a process, so one
//!   caller's failures isolate the store for all callers.
//! - The guarded operation runs outside the state lock.
//! - The breaker never retries; it only isolates.
//! - An admitted call that panics is recorded as a failure before unwinding
//!   continues.

use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker. Clamped to at least 1.
    pub failure_threshold: u32,
    /// Time the breaker stays open before admitting a probe.
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Time source for cooldown decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Outcome of a guarded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakerError<E> {
    /// Rejected without running the operation.
    Open,
    /// The operation ran and failed.
    Inner(E),
}

impl<E: Display> Display for BreakerError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "circuit breaker is open"),
            Self::Inner(err) => write!(f, "{err}"),
        }
    }
}

impl<E: Error + 'static> Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open => None,
            Self::Inner(err) => Some(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen,
}

pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    phase: Mutex<Phase>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    pub fn with_clock(name: impl Into<String>, config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            config: BreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                reset_timeout: config.reset_timeout,
            },
            clock,
            phase: Mutex::new(Phase::Closed {
                consecutive_failures: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> BreakerConfig {
        self.config
    }

    /// Runs `op` if the breaker admits it and records the outcome.
    pub fn call<T, E>(&self, op: impl FnOnce() -> Result<T, E>) -> Result<T, BreakerError<E>> {
        if !self.admit() {
            return Err(BreakerError::Open);
        }

        let pending = PendingOutcome {
            breaker: self,
            settled: false,
        };
        let outcome = op();
        pending.settle();

        match outcome {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(BreakerError::Inner(err))
            }
        }
    }

    pub fn state(&self) -> BreakerState {
        match *self.lock() {
            Phase::Closed { .. } => BreakerState::Closed,
            Phase::Open { .. } => BreakerState::Open,
            Phase::HalfOpen => BreakerState::HalfOpen,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        match *self.lock() {
            Phase::Closed {
                consecutive_failures,
            } => consecutive_failures,
            Phase::Open { .. } | Phase::HalfOpen => self.config.failure_threshold,
        }
    }

    /// Forces the breaker back to closed with a zero counter.
    pub fn reset(&self) {
        *self.lock() = Phase::Closed {
            consecutive_failures: 0,
        };
        info!(
            "event=breaker_transition module=breaker name={} state=closed reason=reset",
            self.name
        );
    }

    fn admit(&self) -> bool {
        let mut phase = self.lock();
        match *phase {
            Phase::Closed { .. } => true,
            Phase::Open { opened_at } => {
                let elapsed = self.clock.now().saturating_duration_since(opened_at);
                if elapsed < self.config.reset_timeout {
                    return false;
                }
                *phase = Phase::HalfOpen;
                info!(
                    "event=breaker_transition module=breaker name={} state=half_open",
                    self.name
                );
                true
            }
            Phase::HalfOpen => false,
        }
    }

    fn record_success(&self) {
        let mut phase = self.lock();
        if *phase == Phase::HalfOpen {
            info!(
                "event=breaker_transition module=breaker name={} state=closed reason=probe_ok",
                self.name
            );
        }
        *phase = Phase::Closed {
            consecutive_failures: 0,
        };
    }

    fn record_failure(&self) {
        let now = self.clock.now();
        let mut phase = self.lock();
        *phase = match *phase {
            Phase::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures.saturating_add(1);
                if failures >= self.config.failure_threshold {
                    warn!(
                        "event=breaker_transition module=breaker name={} state=open failures={}",
                        self.name, failures
                    );
                    Phase::Open { opened_at: now }
                } else {
                    Phase::Closed {
                        consecutive_failures: failures,
                    }
                }
            }
            Phase::HalfOpen => {
                warn!(
                    "event=breaker_transition module=breaker name={} state=open reason=probe_failed",
                    self.name
                );
                Phase::Open { opened_at: now }
            }
            Phase::Open { opened_at } => Phase::Open { opened_at },
        };
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counts an admitted call that unwound as a failure, so a panicking probe
/// cannot leave the breaker half-open forever.
struct PendingOutcome<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl PendingOutcome<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingOutcome<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(
                "event=breaker_call module=breaker name={} status=panicked",
                self.breaker.name
            );
            self.breaker.record_failure();
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

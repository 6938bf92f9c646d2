//! Circuit breaker guarding an unreliable call.
//!
//! - **Closed**: calls pass through; failures are counted and reaching the
//!   threshold opens the circuit.
//! - **Open**: calls fail fast without running. Once `timeout` has passed since
//!   the last failure, the next call moves the circuit to half-open.
//! - **HalfOpen**: a single trial call runs. Success closes the circuit and
//!   clears the counter; failure re-opens it.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakerError<E> {
    /// Rejected without running the call
    Open,
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for BreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::Open => f.write_str("circuit open"),
            BreakerError::Inner(err) => err.fmt(f),
        }
    }
}

struct Inner {
    state: CircuitState,
    /// Bumped on every state change; outcomes from older admissions are ignored.
    generation: u64,
    failure_count: u32,
    last_failure: Option<Instant>,
    trial_started: Option<Instant>,
}

impl Inner {
    fn transition(&mut self, state: CircuitState) {
        self.state = state;
        self.generation += 1;
    }
}

/// Ticket for an admitted call.
#[derive(Debug, Clone, Copy)]
struct Admission {
    generation: u64,
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                failure_count: 0,
                last_failure: None,
                trial_started: None,
            }),
        }
    }

    pub fn get_state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }

    /// Back to closed with a clean counter. Calls still in flight no longer count.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.transition(CircuitState::Closed);
        inner.failure_count = 0;
        inner.last_failure = None;
        inner.trial_started = None;
    }

    pub async fn call<F, Fut, T, E>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(admission) = self.try_acquire() else {
            return Err(BreakerError::Open);
        };
        match op().await {
            Ok(value) => {
                self.on_success(admission);
                Ok(value)
            }
            Err(err) => {
                self.on_failure(admission);
                Err(BreakerError::Inner(err))
            }
        }
    }

    fn try_acquire(&self) -> Option<Admission> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        let admitted = match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = inner
                    .last_failure
                    .is_none_or(|at| now.saturating_duration_since(at) >= self.config.timeout);
                if cooled {
                    info!("circuit half-open, allowing trial call");
                    inner.transition(CircuitState::HalfOpen);
                    inner.trial_started = Some(now);
                }
                cooled
            }
            CircuitState::HalfOpen => {
                // A trial abandoned by its caller never reports back; allow a new one after `timeout`.
                let free = inner
                    .trial_started
                    .is_none_or(|at| now.saturating_duration_since(at) >= self.config.timeout);
                if free {
                    inner.transition(CircuitState::HalfOpen);
                    inner.trial_started = Some(now);
                }
                free
            }
        };
        admitted.then_some(Admission {
            generation: inner.generation,
        })
    }

    fn on_success(&self, admission: Admission) {
        let mut inner = self.inner.lock();
        if admission.generation != inner.generation {
            return;
        }
        match inner.state {
            CircuitState::HalfOpen => {
                info!("circuit closed after successful trial");
                inner.transition(CircuitState::Closed);
                inner.trial_started = None;
            }
            CircuitState::Closed | CircuitState::Open => {}
        }
        inner.failure_count = 0;
    }

    fn on_failure(&self, admission: Admission) {
        let mut inner = self.inner.lock();
        if admission.generation != inner.generation {
            return;
        }
        inner.last_failure = Some(Instant::now());
        match inner.state {
            CircuitState::HalfOpen => {
                warn!("trial call failed, circuit re-opened");
                inner.transition(CircuitState::Open);
                inner.trial_started = None;
            }
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    warn!(failures = inner.failure_count, "circuit opened");
                    inner.transition(CircuitState::Open);
                }
            }
            CircuitState::Open => {}
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

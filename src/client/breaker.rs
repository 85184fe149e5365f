//! Circuit breaker around API request execution.
//!
//! Counts reset every `interval` while closed. The breaker opens once at
//! least `min_requests` calls were made in the window and the failure ratio
//! reaches `failure_ratio`. After `open_timeout` it lets up to
//! `half_open_max_requests` calls through; that many consecutive successes
//! close it again and any failure reopens it.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use super::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub half_open_max_requests: u32,
    pub interval: Duration,
    pub open_timeout: Duration,
    pub min_requests: u32,
    pub failure_ratio: f64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            half_open_max_requests: 3,
            interval: Duration::from_secs(60),
            open_timeout: Duration::from_secs(30),
            min_requests: 3,
            failure_ratio: 0.6,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    requests: u32,
    total_failures: u32,
    consecutive_successes: u32,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    counts: Counts,
    /// End of the current counting window (closed) or of the open period.
    expiry: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let expiry = Some(Instant::now() + config.interval);
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                counts: Counts::default(),
                expiry,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());
        inner.state
    }

    /// Admit a call, or reject it while the circuit is open or the
    /// half-open budget is spent.
    pub fn before_request(&self) -> Result<(), ClientError> {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());
        match inner.state {
            CircuitState::Open => Err(ClientError::CircuitOpen),
            CircuitState::HalfOpen if inner.counts.requests >= self.config.half_open_max_requests => {
                Err(ClientError::TooManyRequests)
            },
            _ => {
                inner.counts.requests += 1;
                Ok(())
            },
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        let now = Instant::now();
        self.refresh(&mut inner, now);
        inner.counts.consecutive_successes += 1;
        if inner.state == CircuitState::HalfOpen
            && inner.counts.consecutive_successes >= self.config.half_open_max_requests
        {
            self.transition(&mut inner, CircuitState::Closed, now);
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        let now = Instant::now();
        self.refresh(&mut inner, now);
        inner.counts.total_failures += 1;
        inner.counts.consecutive_successes = 0;
        match inner.state {
            CircuitState::Closed if self.ready_to_trip(inner.counts) => {
                self.transition(&mut inner, CircuitState::Open, now)
            },
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Open, now),
            _ => {},
        }
    }

    fn ready_to_trip(&self, counts: Counts) -> bool {
        if counts.requests < self.config.min_requests {
            return false;
        }
        f64::from(counts.total_failures) / f64::from(counts.requests) >= self.config.failure_ratio
    }

    fn refresh(&self, inner: &mut Inner, now: Instant) {
        let expired = inner.expiry.is_some_and(|at| at <= now);
        match inner.state {
            CircuitState::Closed if expired => {
                inner.counts = Counts::default();
                inner.expiry = Some(now + self.config.interval);
            },
            CircuitState::Open if expired => self.transition(inner, CircuitState::HalfOpen, now),
            _ => {},
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState, now: Instant) {
        if inner.state == to {
            return;
        }
        debug!(from = inner.state.as_str(), to = to.as_str(), "circuit breaker state change");
        inner.state = to;
        inner.counts = Counts::default();
        inner.expiry = match to {
            CircuitState::Closed => Some(now + self.config.interval),
            CircuitState::Open => Some(now + self.config.open_timeout),
            CircuitState::HalfOpen => None,
        };
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

/// Whether an error should count against the breaker. Client-side
/// rejections and 4xx answers other than 429 mean the API is healthy.
pub(crate) fn counts_as_failure(err: &ClientError) -> bool {
    match err {
        ClientError::Request(_) => true,
        ClientError::Context { source, .. } => counts_as_failure(source),
        _ => err.is_server_error() || err.is_rate_limited(),
    }
}

//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= threshold
//! Open → Half-Open: admission check after open_timeout has passed
//! Half-Open → Closed: probe request succeeds
//! Half-Open → Open: probe request fails and the count is still >= threshold
//! ```
//!
//! Entering Half-Open does not reset the failure count, so with the default
//! settings the first failed probe reopens the circuit. Any recorded success
//! closes the circuit, whatever the state it started from.
//!
//! # Design Decisions
//! - Per-backend circuit breaker (not global), one mutex each
//! - Fail fast in Open state (no waiting for timeout)
//! - Half-Open admits every request unless `HalfOpenPolicy::SingleProbe` is set
//! - The breaker never logs: state changes are returned as [`Transition`]s

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::{BreakerConfig, HalfOpenPolicy};

/// Health state of a single backend's circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change produced by an admission check or a recorded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
    /// Failure count at the moment of the change.
    pub consecutive_failures: u32,
}

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub transition: Option<Transition>,
}

/// Point-in-time view of a breaker, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Admit,
    Success,
    Failure,
    Release,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    /// Admission time of the outstanding half-open probe, only tracked under
    /// `HalfOpenPolicy::SingleProbe`. A probe older than the open timeout is
    /// considered abandoned (its caller went away) and a new one is admitted.
    probe_started: Option<Instant>,
}

/// Settings copied out of [`BreakerConfig`] once at construction.
#[derive(Debug, Clone, Copy)]
struct Settings {
    failure_threshold: u32,
    open_timeout: Duration,
    half_open: HalfOpenPolicy,
}

/// Per-backend circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    settings: Settings,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(config: &BreakerConfig) -> Self {
        Self {
            settings: Settings {
                failure_threshold: config.failure_threshold.max(1),
                open_timeout: config.open_timeout(),
                half_open: config.half_open,
            },
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
                probe_started: None,
            }),
        }
    }

    /// May a request go to this backend right now?
    pub fn allow_request(&self) -> bool {
        self.admit(Instant::now()).allowed
    }

    /// Record the outcome of a request that was admitted.
    pub fn record_result(&self, success: bool) -> Option<Transition> {
        self.record(success, Instant::now())
    }

    /// Admission check against an explicit clock reading.
    ///
    /// An open breaker whose timeout has passed moves to half-open here.
    pub fn admit(&self, now: Instant) -> Admission {
        let mut inner = self.lock();
        let from = inner.state;
        let allowed = inner.apply(Event::Admit, now, &self.settings);
        Admission {
            allowed,
            transition: inner.transition_from(from),
        }
    }

    /// Record an outcome against an explicit clock reading.
    pub fn record(&self, success: bool, now: Instant) -> Option<Transition> {
        let event = if success { Event::Success } else { Event::Failure };
        let mut inner = self.lock();
        let from = inner.state;
        inner.apply(event, now, &self.settings);
        inner.transition_from(from)
    }

    /// Hand back an admission whose request was never sent.
    ///
    /// Frees a half-open probe slot; counts, timestamps and state are untouched.
    pub fn release(&self) {
        self.lock().apply(Event::Release, Instant::now(), &self.settings);
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        // Critical sections never panic; a poisoned lock still holds consistent state.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BreakerInner {
    /// Apply one event. For `Admit` the return value is the admission decision;
    /// for results it is always true.
    fn apply(&mut self, event: Event, now: Instant, settings: &Settings) -> bool {
        match (self.state, event) {
            (CircuitState::Closed, Event::Admit) => true,
            (CircuitState::Open, Event::Admit) => {
                if self.open_timeout_elapsed(now, settings.open_timeout) {
                    self.state = CircuitState::HalfOpen;
                    if settings.half_open == HalfOpenPolicy::SingleProbe {
                        self.probe_started = Some(now);
                    }
                    true
                } else {
                    false
                }
            }
            (CircuitState::HalfOpen, Event::Admit) => match settings.half_open {
                HalfOpenPolicy::Unlimited => true,
                HalfOpenPolicy::SingleProbe => match self.probe_started {
                    Some(at) if now.saturating_duration_since(at) <= settings.open_timeout => false,
                    _ => {
                        self.probe_started = Some(now);
                        true
                    }
                },
            },
            (_, Event::Release) => {
                self.probe_started = None;
                true
            }
            (_, Event::Success) => {
                self.consecutive_failures = 0;
                self.probe_started = None;
                self.state = CircuitState::Closed;
                true
            }
            (_, Event::Failure) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.last_failure = Some(now);
                self.probe_started = None;
                if self.consecutive_failures >= settings.failure_threshold {
                    self.state = CircuitState::Open;
                }
                true
            }
        }
    }

    fn open_timeout_elapsed(&self, now: Instant, open_timeout: Duration) -> bool {
        match self.last_failure {
            Some(at) => now.saturating_duration_since(at) > open_timeout,
            None => true,
        }
    }

    fn transition_from(&self, from: CircuitState) -> Option<Transition> {
        (from != self.state).then_some(Transition {
            from,
            to: self.state,
            consecutive_failures: self.consecutive_failures,
        })
    }
}

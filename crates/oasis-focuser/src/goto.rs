//! Goto completion tracking.
//!
//! [`GotoSession`] turns a stream of (moving, position) observations into a
//! completion answer. It performs no I/O: when a re-issue is needed it says
//! so and the controller sends the move. Time is passed in, so the session
//! can be driven deterministically.

use crate::config::GotoRetryPolicy;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GotoPhase {
    /// No goto in flight.
    Idle,
    /// Goto issued, focuser moving or still inside the debounce window.
    Moving,
    /// Settled off target after the one automatic re-issue; waiting.
    SettlingCheck,
    /// A re-issue was sent.
    Retrying,
    /// The last goto was abandoned off target.
    Failed,
}

/// Outcome of one completion poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GotoDecision {
    Pending,
    Complete,
    /// Send the move again to this target; the goto is not complete.
    Reissue(i64),
    /// The goto is over without reaching `target`.
    Failed { target: i64, reached: i32 },
}

/// Per-controller goto session.
#[derive(Debug, Clone)]
pub struct GotoSession {
    target: i64,
    retries: u32,
    issued_at: Option<Instant>,
    phase: GotoPhase,
    debounce: Duration,
    max_retry: u32,
    policy: GotoRetryPolicy,
}

impl GotoSession {
    pub fn new(debounce: Duration, max_retry: u32, policy: GotoRetryPolicy) -> Self {
        Self {
            target: 0,
            retries: 0,
            issued_at: None,
            phase: GotoPhase::Idle,
            debounce,
            max_retry,
            policy,
        }
    }

    pub fn target(&self) -> i64 {
        self.target
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn phase(&self) -> GotoPhase {
        self.phase
    }

    /// A new caller-initiated goto: fresh target, retry count and timer.
    pub fn begin(&mut self, target: i64, now: Instant) {
        self.target = target;
        self.retries = 0;
        self.issued_at = Some(now);
        self.phase = GotoPhase::Moving;
    }

    /// The re-issued move went out; restart the debounce window.
    pub fn reissued(&mut self, now: Instant) {
        self.issued_at = Some(now);
        self.phase = GotoPhase::Retrying;
    }

    /// Exhaust the retry budget so no automatic re-issue happens.
    pub fn halt(&mut self) {
        self.retries = self.max_retry.saturating_add(1);
    }

    fn retry_exhausted(&self) -> bool {
        match self.policy {
            GotoRetryPolicy::Single => self.retries > self.max_retry,
            GotoRetryPolicy::Escalating => self.retries >= self.max_retry,
        }
    }

    fn may_reissue(&self) -> bool {
        match self.policy {
            GotoRetryPolicy::Single => self.retries == 0,
            GotoRetryPolicy::Escalating => self.retries < self.max_retry,
        }
    }

    /// Evaluate one observation of the device.
    pub fn poll(&mut self, moving: bool, position: i32, now: Instant) -> GotoDecision {
        let Some(issued_at) = self.issued_at else {
            return if moving {
                GotoDecision::Pending
            } else {
                GotoDecision::Complete
            };
        };

        if matches!(self.phase, GotoPhase::Idle | GotoPhase::Failed) {
            if moving {
                return GotoDecision::Pending;
            }
            self.phase = GotoPhase::Idle;
            return GotoDecision::Complete;
        }

        if now.saturating_duration_since(issued_at) < self.debounce {
            return GotoDecision::Pending;
        }
        if moving {
            self.phase = GotoPhase::Moving;
            return GotoDecision::Pending;
        }

        if i64::from(position) == self.target {
            self.phase = GotoPhase::Idle;
            self.retries = 0;
            return GotoDecision::Complete;
        }

        if self.retry_exhausted() {
            let target = self.target;
            self.phase = GotoPhase::Failed;
            self.retries = 0;
            self.target = i64::from(position);
            return GotoDecision::Failed {
                target,
                reached: position,
            };
        }

        if self.may_reissue() {
            self.retries = self.retries.saturating_add(1);
            self.phase = GotoPhase::Retrying;
            return GotoDecision::Reissue(self.target);
        }

        self.phase = GotoPhase::SettlingCheck;
        GotoDecision::Pending
    }
}

//! Search-input debounce as an explicit two-state machine.
//!
//! Time is always passed in by the caller, so the machine never sleeps and
//! behaves the same under test as in the terminal loop.

use std::time::{Duration, Instant};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    /// The value to commit travels with the pending commit itself.
    PendingCommit { value: String, deadline: Instant },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debounce {
    delay: Duration,
    state: DebounceState,
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: DebounceState::Idle,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, DebounceState::PendingCommit { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            DebounceState::Idle => None,
            DebounceState::PendingCommit { deadline, .. } => Some(*deadline),
        }
    }

    /// Records an input event, replacing any pending commit.
    ///
    /// Returns true when a pending commit was cancelled.
    pub fn input(&mut self, value: String, now: Instant) -> bool {
        let superseded = self.is_pending();
        self.state = DebounceState::PendingCommit {
            value,
            deadline: now + self.delay,
        };
        superseded
    }

    /// Fires the pending commit once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let due = matches!(
            &self.state,
            DebounceState::PendingCommit { deadline, .. } if now >= *deadline
        );
        if !due {
            return None;
        }
        match std::mem::replace(&mut self.state, DebounceState::Idle) {
            DebounceState::PendingCommit { value, .. } => Some(value),
            DebounceState::Idle => None,
        }
    }
}

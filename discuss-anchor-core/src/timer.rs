//! Host-driven timing: debouncing and one-shot task scheduling
//!
//! Nothing here owns a clock. Callers pass the current time (a `Duration`
//! since any fixed origin) and ask for the next deadline so the host can arm a
//! single wake-up timer.

use std::time::Duration;

/// Debouncer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Idle,
    Pending {
        deadline: Duration,
    },
}

/// Defers work until triggers have been quiet for `window`
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    state: DebounceState,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: DebounceState::Idle,
        }
    }

    /// Record activity; any earlier pending deadline is replaced
    pub fn trigger(&mut self, now: Duration) {
        self.state = DebounceState::Pending {
            deadline: now + self.window,
        };
    }

    /// Returns true exactly once when the quiet window has elapsed
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.state {
            DebounceState::Pending { deadline } if now >= deadline => {
                self.state = DebounceState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.state = DebounceState::Idle;
    }

    pub fn deadline(&self) -> Option<Duration> {
        match self.state {
            DebounceState::Idle => None,
            DebounceState::Pending { deadline } => Some(deadline),
        }
    }

    /// Check if activity is waiting for the window to close
    pub fn has_pending(&self) -> bool {
        matches!(self.state, DebounceState::Pending { .. })
    }
}

/// One-shot tasks ordered by deadline, ties broken by insertion order
#[derive(Debug, Clone)]
pub struct Schedule<T> {
    entries: Vec<(Duration, u64, T)>,
    seq: u64,
}

impl<T> Default for Schedule<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            seq: 0,
        }
    }
}

impl<T> Schedule<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, at: Duration, task: T) {
        let key = (at, self.seq);
        self.seq += 1;
        let pos = self
            .entries
            .partition_point(|(deadline, seq, _)| (*deadline, *seq) <= key);
        self.entries.insert(pos, (at, key.1, task));
    }

    /// Remove and return the earliest task whose deadline has passed
    pub fn pop_due(&mut self, now: Duration) -> Option<T> {
        match self.entries.first() {
            Some((deadline, _, _)) if *deadline <= now => Some(self.entries.remove(0).2),
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.first().map(|(deadline, _, _)| *deadline)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every task regardless of deadline, earliest first
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.entries.drain(..).map(|(_, _, task)| task)
    }
}

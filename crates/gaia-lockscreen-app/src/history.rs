//! Bounded transition log.

use std::{collections::VecDeque, fmt};

use gaia_lockscreen_core::StateType;

/// Default number of transitions kept.
pub const DEFAULT_HISTORY_SIZE: usize = 64;

/// One completed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State left
    pub from: StateType,
    /// State entered
    pub to: StateType,
    /// Comment of the matched rule
    pub reason: String,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.reason)
    }
}

/// The most recent transitions, oldest first.
#[derive(Debug, Clone)]
pub struct TransitionLog {
    entries: VecDeque<Transition>,
    capacity: usize,
}

impl TransitionLog {
    /// Keep at most `capacity` transitions.
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Record a transition, evicting the oldest one when full.
    pub fn record(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(transition);
    }

    /// Transitions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.entries.iter()
    }

    /// Most recent transition.
    pub fn last(&self) -> Option<&Transition> {
        self.entries.back()
    }

    /// Number of kept transitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every transition.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// One line per transition.
    pub fn render(&self) -> String {
        self.entries.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    }
}

impl Default for TransitionLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(from: StateType, to: StateType) -> Transition {
        Transition { from, to, reason: "test".to_string() }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut log = TransitionLog::new(2);
        log.record(transition(StateType::SlideShow, StateType::KeypadRising));
        log.record(transition(StateType::KeypadRising, StateType::KeypadShow));
        log.record(transition(StateType::KeypadShow, StateType::KeypadHiding));

        assert_eq!(log.len(), 2);
        assert_eq!(log.iter().next().map(|t| t.from), Some(StateType::KeypadRising));
        assert_eq!(log.last().map(|t| t.to), Some(StateType::KeypadHiding));
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut log = TransitionLog::new(0);
        log.record(transition(StateType::SlideShow, StateType::Unlock));
        assert!(log.is_empty());
    }

    #[test]
    fn renders_one_line_per_transition() {
        let mut log = TransitionLog::default();
        log.record(transition(StateType::SlideShow, StateType::KeypadRising));
        log.record(transition(StateType::KeypadRising, StateType::KeypadShow));

        insta::assert_snapshot!(log.render(), @r"
        slideShow -> keypadRising: test
        keypadRising -> keypadShow: test
        ");
    }
}

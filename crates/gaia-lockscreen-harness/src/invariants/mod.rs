//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during system execution.
//! Unlike example-based tests that check specific scenarios, invariants
//! verify behavioral properties across all possible execution paths.
//!
//! # Architecture
//!
//! The invariant system extracts observable state from the runtime into a
//! [`LockScreenSnapshot`], then runs registered [`Invariant`] checks against
//! it. The scenario runner checks after every cycle.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = LockScreenSnapshot::capture(&runtime);
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    FulfilledOnlyFromKeypadShow, HighlightIsListed, HistoryIsContiguous, PasscodeWithinLength,
    QueueDrainedOnceResolved, SlideShowIsClean,
};
pub use snapshot::LockScreenSnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against LockScreen state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against the current state.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &LockScreenSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
///
/// Use [`InvariantRegistry::standard()`] for the LockScreen invariants.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InvariantRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.invariants.iter().map(|inv| inv.name())).finish()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with every standard invariant.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(SlideShowIsClean);
        registry.add(PasscodeWithinLength);
        registry.add(FulfilledOnlyFromKeypadShow);
        registry.add(HistoryIsContiguous);
        registry.add(QueueDrainedOnceResolved);
        registry.add(HighlightIsListed);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Returns true if no invariant is registered.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &LockScreenSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> = self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking on the first failure.
    ///
    /// Use this in tests where you want immediate failure with context.
    ///
    /// # Panics
    ///
    /// Panics with every violation if any invariant fails.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &LockScreenSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }
}

#[cfg(test)]
mod tests {
    use gaia_lockscreen_app::{ManagerConfig, StateManager, SystemEnv};
    use gaia_lockscreen_core::LockScreenConfig;

    use super::*;

    fn fresh_snapshot() -> LockScreenSnapshot {
        let manager = StateManager::new(SystemEnv, LockScreenConfig::default(), ManagerConfig::default());
        LockScreenSnapshot::from_manager(&manager)
    }

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn fresh_manager_passes_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(registry.check_all(&fresh_snapshot()).is_ok());
    }

    #[test]
    fn every_violation_is_reported() {
        let registry = InvariantRegistry::standard();
        let snapshot = LockScreenSnapshot {
            highlighted: Some("sms-1".to_string()),
            queued_requests: 1,
            passcode_resolved: true,
            ..fresh_snapshot()
        };

        let violations = registry.check_all(&snapshot).unwrap_err();

        let names: Vec<_> = violations.iter().map(|v| v.invariant).collect();
        assert_eq!(names, vec!["queue_drained_once_resolved", "highlight_is_listed"]);
    }

    #[test]
    #[should_panic(expected = "Invariant violation after tap")]
    fn assert_all_panics_with_context() {
        let snapshot = LockScreenSnapshot { highlighted: Some("sms-1".to_string()), ..fresh_snapshot() };
        InvariantRegistry::standard().assert_all(&snapshot, "after tap");
    }
}

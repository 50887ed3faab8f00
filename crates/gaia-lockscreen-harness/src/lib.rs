//! Deterministic simulation harness for the Gaia LockScreen.
//!
//! Simulated implementations of the Environment and Driver traits on the
//! paused tokio clock, so whole LockScreen sessions (keypad animations,
//! fulfilled delays, error timeouts, passcode timeouts, clock ticks) replay
//! identically on every run.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. The [`Scenario`] runner checks
//! [`InvariantRegistry::standard()`] after every event loop cycle.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod invariants;
pub mod scenario;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    FulfilledOnlyFromKeypadShow, HighlightIsListed, HistoryIsContiguous, Invariant, InvariantRegistry,
    InvariantResult, LockScreenSnapshot, PasscodeWithinLength, QueueDrainedOnceResolved, SlideShowIsClean, Violation,
};
pub use scenario::{Scenario, ScenarioError, ScenarioOutcome};
pub use sim_driver::{RenderedFrame, ScriptStep, SimDriver, SimDriverError};
pub use sim_env::{DEFAULT_WALL_CLOCK_SECS, SimEnv};

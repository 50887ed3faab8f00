//! LockScreen controller
//!
//! Rule-driven state manager and generic runtime around the pure building
//! blocks of `gaia-lockscreen-core`, so that the same orchestration code runs
//! in deterministic simulation and on a device.
//!
//! # Components
//!
//! - [`RuleTable`]: ordered transition rules, first match wins
//! - [`StateManager`]: owns the LockScreen and walks the rule table
//! - [`Driver`]: trait for platform-specific I/O
//! - [`Runtime`]: event loop wiring the manager, validator, notifications and
//!   widgets to a Driver
//! - [`SystemEnv`]: production environment

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod event;
mod history;
mod manager;
mod rules;
mod runtime;
mod system_env;

pub use driver::{Driver, Snapshot};
pub use event::LockScreenEvent;
pub use history::{DEFAULT_HISTORY_SIZE, Transition, TransitionLog};
pub use manager::{ActionExecutor, CAMERA_ACTIVITY, DEFAULT_HOP_LIMIT, ManagerConfig, StateManager};
pub use rules::{Conditions, Rule, RuleTable};
pub use runtime::{DEFAULT_DOM_CAPACITY, Runtime, RuntimeConfig};
pub use system_env::SystemEnv;

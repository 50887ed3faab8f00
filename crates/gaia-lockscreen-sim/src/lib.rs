//! Line-driven LockScreen simulator
//!
//! A thin shell over [`gaia_lockscreen_app::Driver`] that reads commands from
//! a terminal or a script and prints what the LockScreen does. All
//! orchestration logic lives in the generic [`gaia_lockscreen_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod console;

pub use command::{Command, ParseError};
pub use console::{ConsoleDriver, ConsoleError};

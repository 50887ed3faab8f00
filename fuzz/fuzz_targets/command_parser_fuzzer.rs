//! Fuzz target for the simulator command parser
//!
//! # Strategy
//!
//! - Arbitrary UTF-8 lines, including multi-byte characters and odd spacing
//! - Every line is parsed on its own, as the console driver does
//!
//! # Invariants
//!
//! - Parsing never panics
//! - `key` commands produce one event per character
//! - Blank and comment lines never produce a command

#![no_main]

use gaia_lockscreen_sim::Command;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|text: &str| {
    for line in text.lines() {
        let parsed = Command::parse(line);

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            assert_eq!(parsed, Ok(None));
            continue;
        }

        if let Ok(Some(Command::Events(events))) = &parsed {
            let mut words = trimmed.split_whitespace();
            if words.next() == Some("key") {
                let keys = words.next().unwrap_or_default();
                assert_eq!(events.len(), keys.chars().count());
            }
        }
    }
});

//! Fuzzing harness for config parsing
//!
//! Arbitrary input may be rejected but must never panic, and anything that
//! parses must also validate without panicking.
//! Run with: cargo fuzz run config_parser

#![no_main]
use bedtime_config::Config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = toml::from_str::<Config>(s) {
            let _ = config.validate();
        }
    }
});

//! Fuzz target: attribute parsing.
//!
//! Feeds arbitrary bytes through JSON parsing and `ModuleConfig` to
//! ensure malformed attribute sets are rejected without panicking, and
//! that anything accepted satisfies the loop bounds.

#![no_main]

use dimled::config::ModuleConfig;
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value};

fuzz_target!(|data: &[u8]| {
    let Ok(attrs) = serde_json::from_slice::<Map<String, Value>>(data) else {
        return;
    };
    let _ = ModuleConfig::validate_attributes(&attrs);
    if let Ok(config) = ModuleConfig::from_attributes(&attrs) {
        let lc = config.loop_config().expect("accepted config must build a LoopConfig");
        assert!(lc.max_distance() > 0.0);
        assert!(lc.blinking_distance() < lc.max_distance());
    }
});

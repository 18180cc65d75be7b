//! Fuzz target: transfer function.
//!
//! Arbitrary bit patterns for the distance and bounds.  Every non-NaN
//! reading under a valid config must yield an in-range decision.

#![no_main]

use dimled::config::LoopConfig;
use dimled::control::transfer::{DUTY_FLOOR, decide};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u64, u64, u64)| {
    let (d, max, blink) = input;
    let (d, max, blink) = (f64::from_bits(d), f64::from_bits(max), f64::from_bits(blink));
    let Ok(config) = LoopConfig::new(max, blink) else {
        return;
    };
    match decide(d, &config) {
        Ok(decision) => {
            assert!((0.0..=max).contains(&decision.clamped()));
            if let Some(duty) = decision.duty() {
                assert!((DUTY_FLOOR..=1.0).contains(&duty));
            }
        }
        Err(_) => assert!(d.is_nan()),
    }
});

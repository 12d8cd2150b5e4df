//! Fuzz target for raw value decoding.
//!
//! The first byte picks the type; the checked decoder must never panic and
//! must agree with the unchecked one whenever the buffer is long enough.

#![no_main]

use libfuzzer_sys::fuzz_target;
use snaptel_types::{decode, try_decode, BasicType};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, bytes)) = data.split_first() else {
        return;
    };
    let ty = BasicType::ALL[selector as usize % BasicType::ALL.len()];
    if let Ok(value) = try_decode(ty, bytes) {
        let unchecked = decode(ty, bytes);
        assert_eq!(value.basic_type(), unchecked.basic_type());
    }
});

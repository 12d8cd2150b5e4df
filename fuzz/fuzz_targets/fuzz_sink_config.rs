//! Fuzz target for sink configuration parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use snaptel_sink::SinkConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = SinkConfig::from_json_str(text) {
        assert!(config.validate().is_ok());
    }
});

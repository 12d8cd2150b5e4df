//! Fuzz target for schema dump parsing.
//!
//! Parsing must return an error rather than panic, and any schema it accepts
//! must survive a dump/parse cycle with the same fields and hash.

#![no_main]

use libfuzzer_sys::fuzz_target;
use snaptel_types::Schema;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(schema) = Schema::parse(text) else {
        return;
    };
    let dumped = schema.to_string();
    let reparsed = Schema::parse(&dumped).expect("dump of a parsed schema must parse");
    assert_eq!(reparsed.hash(), schema.hash());
    assert_eq!(reparsed.len(), schema.len());
});

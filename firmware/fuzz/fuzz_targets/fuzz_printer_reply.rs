//! Fuzz target: printer reply and G-code header parsing
//!
//! Feeds arbitrary text through the telemetry, ack and header parsers.
//!
//! cargo fuzz run fuzz_printer_reply

#![no_main]

use libfuzzer_sys::fuzz_target;
use printbridge::print::gcode::{classify, is_ack, parse_print_time, parse_temperatures, strip_comment};

fuzz_target!(|data: &[u8]| {
    let _ = parse_print_time(data);

    let text = String::from_utf8_lossy(data);
    for line in text.lines() {
        if let Some(r) = parse_temperatures(line) {
            assert!(!r.is_empty());
        }
        let _ = is_ack(line);
        let code = strip_comment(line);
        assert!(!code.contains(';'));
        let _ = classify(code);
    }
});

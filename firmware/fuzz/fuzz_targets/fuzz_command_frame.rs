//! Fuzz target: companion-link framing and command parsing
//!
//! Splits arbitrary bytes into frames, copies each into a bounded command
//! frame and parses verb and arguments. Asserts that nothing panics and
//! that every accepted frame respects the frame bound and the argument
//! grammar.
//!
//! cargo fuzz run fuzz_command_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use printbridge::dispatcher::command::{CMD_FRAME_SIZE, copy_frame, parse_frame, split_frames};

fuzz_target!(|data: &[u8]| {
    for raw in split_frames(data) {
        assert!(!raw.contains(&b'\n'), "frame spans a line break");
        let Ok(frame) = copy_frame(raw) else {
            continue;
        };
        assert!(frame.len() <= CMD_FRAME_SIZE);

        if let Ok((verb, args)) = parse_frame(&frame) {
            assert!(frame.trim_start().starts_with(verb.wire()));
            // Arguments are a sub-slice of the frame.
            assert!(args.len() < frame.len());
        }
    }
});

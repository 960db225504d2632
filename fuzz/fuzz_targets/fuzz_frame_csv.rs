//! Fuzz target for CSV frame parsing.
//!
//! Tests that `Frame::from_csv_reader` handles arbitrary input without
//! panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mhs_common::Frame;

fuzz_target!(|data: &[u8]| {
    // The parser should never panic, only return an error for
    // malformed input
    let _ = Frame::from_csv_reader(data);
});

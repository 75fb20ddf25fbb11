#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    // Malformed headers and truncated records must be errors, never panics
    if let Ok(array) = csstar::records::parse_npy(data, Path::new("fuzz.cs")) {
        for column in array.columns() {
            for row in 0..array.len() {
                let _ = column.f64(row);
                let _ = column.key(row);
            }
        }
    }
});

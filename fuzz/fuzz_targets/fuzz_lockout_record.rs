#![no_main]

use authgate_core::record::{decode_count, decode_timestamp, encode_count, encode_timestamp};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary store contents must never panic
    if let Ok(count) = decode_count(data) {
        // Round-trip
        assert_eq!(decode_count(&encode_count(count)).unwrap(), count);
    }

    if let Ok(timestamp) = decode_timestamp(data) {
        assert_eq!(decode_timestamp(&encode_timestamp(timestamp)).unwrap(), timestamp);
    }
});

//! Fuzz target: `codec::encode_system_info`
//!
//! The identity reply is fixed-width no matter what strings feed it.
//! Multibyte input must truncate without panicking on a char boundary.
//!
//! cargo fuzz run fuzz_system_info

#![no_main]

use libfuzzer_sys::fuzz_target;
use needle_controller::server::codec::encode_system_info;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    let frame = encode_system_info(1, &text, &text, &text, &text);
    assert_eq!(frame.len(), 62, "identity reply must stay fixed-width");
    assert_eq!(frame[0], 62);
    assert_eq!(frame[1], 0);
});

//! Fuzz target: `codec::read_request`
//!
//! Drives arbitrary byte sequences through the request reader and
//! asserts that it never panics and that every accepted request stays
//! within the declared length bounds.
//!
//! cargo fuzz run fuzz_request_decoder

#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use needle_controller::server::codec::{read_request, HEADER_LEN, MAX_REQUEST_LEN};

fuzz_target!(|data: &[u8]| {
    let mut cursor = Cursor::new(data);

    // Keep pulling requests until the stream is exhausted or rejected;
    // back-to-back frames must parse independently.
    while let Ok(request) = read_request(&mut cursor) {
        let total = request.header.length as usize;
        assert!(total >= HEADER_LEN, "accepted request below header size");
        assert!(total <= MAX_REQUEST_LEN, "accepted request above the cap");
        assert_eq!(request.payload.len(), total - HEADER_LEN);
    }
});

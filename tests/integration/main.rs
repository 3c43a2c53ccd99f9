//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the server over a
//! real localhost TCP socket, with the simulated ADC bus behind it.
//! All tests run on the host (x86_64) with no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod protocol_tests;
mod session_tests;
mod stream_tests;
mod support;

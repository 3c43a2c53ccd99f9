//! Request/reply behaviour over a real localhost socket.
//!
//! Every test stands up its own server on an ephemeral port with the
//! simulated bus behind it and speaks the framed protocol byte by byte.

use needle_controller::adc::decode_volts;
use needle_controller::adc::sim::SimAdcBus;

use crate::support::{f32_at, spawn_server, Client, TEST_MAC};

const CODES: [u32; 6] = [
    0x00_0000, 0x40_0000, 0x7F_FFFF, 0x80_0000, 0xC0_0000, 0xFF_FFFF,
];

#[test]
fn status_reports_connected_inside_a_session() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    client.send(0, &[]);
    let (function_id, error_code, body) = client.read_reply();

    assert_eq!(function_id, 0);
    assert_eq!(error_code, 0);
    assert_eq!(body, vec![1], "state must read as connected mid-session");
}

#[test]
fn system_info_is_fixed_width_with_nul_padding() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    client.send(1, &[]);
    let (function_id, error_code, body) = client.read_reply();

    assert_eq!(function_id, 1);
    assert_eq!(error_code, 0);
    assert_eq!(body.len(), 58, "5 + 19 + 14 + 20 bytes after the header");

    assert_eq!(&body[0..5], b"1.1.0");
    assert_eq!(&body[5..23], b"NeedleController01");
    assert_eq!(body[23], 0);
    assert_eq!(&body[24..37], b"192.168.5.101");
    assert_eq!(body[37], 0);
    assert_eq!(&body[38..38 + TEST_MAC.len()], TEST_MAC.as_bytes());
    assert!(body[38 + TEST_MAC.len()..].iter().all(|&b| b == 0));
}

#[test]
fn channel_sweep_decodes_the_injected_codes() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    client.send(2, &[]);
    let (function_id, error_code, body) = client.read_reply();

    assert_eq!(function_id, 2);
    assert_eq!(error_code, 0);
    assert_eq!(body.len(), 24);
    for (i, code) in CODES.iter().enumerate() {
        assert_eq!(f32_at(&body, 4 * i), decode_volts(*code), "channel {i}");
    }
}

#[test]
fn encoder_reply_reflects_recorded_pulses() {
    let (addr, encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    encoders.record_pulses(0, 100_000);
    encoders.record_pulses(2, -50_000);
    let mut client = Client::connect(addr);

    client.send(3, &[]);
    let (function_id, error_code, body) = client.read_reply();

    assert_eq!(function_id, 3);
    assert_eq!(error_code, 0);
    assert_eq!(body.len(), 12);
    assert!((f32_at(&body, 0) - 2.9).abs() < 1e-4);
    assert_eq!(f32_at(&body, 4), 0.0);
    assert!((f32_at(&body, 8) + 1.45).abs() < 1e-4);
}

#[test]
fn snapshot_carries_elapsed_channels_and_axes() {
    let (addr, encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    encoders.record_pulses(1, 10_000);
    let mut client = Client::connect(addr);

    client.send(4, &[]);
    let (function_id, error_code, body) = client.read_reply();

    assert_eq!(function_id, 4);
    assert_eq!(error_code, 0);
    assert_eq!(body.len(), 40);

    let elapsed_us = u32::from_le_bytes([body[0], body[1], body[2], body[3]]);
    assert!(elapsed_us < 5_000_000, "simulated pass finishes well under 5 s");
    for (i, code) in CODES.iter().enumerate() {
        assert_eq!(f32_at(&body, 4 + 4 * i), decode_volts(*code), "channel {i}");
    }
    assert_eq!(f32_at(&body, 28), 0.0);
    assert!((f32_at(&body, 32) - 0.29).abs() < 1e-4);
    assert_eq!(f32_at(&body, 36), 0.0);
}

#[test]
fn averaged_snapshot_echoes_its_function_id() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    client.send(5, &[4]);
    let (function_id, error_code, body) = client.read_reply();

    assert_eq!(function_id, 5);
    assert_eq!(error_code, 0);
    assert_eq!(body.len(), 40);
    for (i, code) in CODES.iter().enumerate() {
        let expected = decode_volts(*code);
        assert!(
            (f32_at(&body, 4 + 4 * i) - expected).abs() < 1e-4,
            "channel {i}: averaging identical codes must land on the code"
        );
    }
}

#[test]
fn averaged_snapshot_without_a_count_is_refused() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    client.send(5, &[]);
    let (function_id, error_code, body) = client.read_reply();

    assert_eq!(function_id, 5);
    assert_eq!(error_code, 1);
    assert!(body.is_empty());
}

#[test]
fn unknown_function_ids_are_refused_without_dropping_the_session() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    for raw in [12u8, 13, 255] {
        client.send(raw, &[]);
        let (function_id, error_code, body) = client.read_reply();
        assert_eq!(function_id, raw, "error reply echoes the request id");
        assert_eq!(error_code, 1);
        assert!(body.is_empty());
    }

    client.send(0, &[]);
    let (function_id, error_code, _body) = client.read_reply();
    assert_eq!(function_id, 0);
    assert_eq!(error_code, 0);
}

#[test]
fn device_reset_reports_unsupported() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    client.send(8, &[]);
    let (function_id, error_code, body) = client.read_reply();

    assert_eq!(function_id, 8);
    assert_eq!(error_code, 1);
    assert!(body.is_empty());
}

#[test]
fn communication_check_sees_the_sim_product_id() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    client.send(9, &[]);
    let (function_id, error_code, body) = client.read_reply();

    assert_eq!(function_id, 9);
    assert_eq!(error_code, 0);
    assert_eq!(body, vec![1]);
}

#[test]
fn settings_are_applied_without_a_reply() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    // Valid rate, valid mode, then an out-of-range mode code. None of
    // the three may produce any bytes back.
    client.send(11, &[0x00]);
    client.send(10, &[0x03]);
    client.send(10, &[0x01]);
    client.send(0, &[]);

    let (function_id, error_code, body) = client.read_reply();
    assert_eq!(function_id, 0, "first bytes back must be the status reply");
    assert_eq!(error_code, 0);
    assert_eq!(body, vec![1]);
}

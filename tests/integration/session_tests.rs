//! Session lifecycle: one client at a time, malformed-frame handling,
//! and listener reuse across sessions.

use std::time::Duration;

use needle_controller::adc::sim::SimAdcBus;

use crate::support::{spawn_server, Client};

#[test]
fn undersized_length_field_drops_the_connection() {
    let (addr, _encoders) = spawn_server(SimAdcBus::new());
    let mut first = Client::connect(addr);

    first.send(0, &[]);
    let _ = first.read_reply();

    // Declared total of 3 bytes cannot even cover the header.
    first.send_raw(&[3, 0, 0, 0]);
    assert!(first.server_closed());

    let mut second = Client::connect(addr);
    second.send(0, &[]);
    let (function_id, error_code, _body) = second.read_reply();
    assert_eq!(function_id, 0);
    assert_eq!(error_code, 0);
}

#[test]
fn oversized_length_field_drops_the_connection() {
    let (addr, _encoders) = spawn_server(SimAdcBus::new());
    let mut first = Client::connect(addr);

    first.send(0, &[]);
    let _ = first.read_reply();

    first.send_raw(&[0xFF, 0xFF, 0, 0]);
    assert!(first.server_closed());

    let mut second = Client::connect(addr);
    second.send(0, &[]);
    let (function_id, _error_code, _body) = second.read_reply();
    assert_eq!(function_id, 0);
}

#[test]
fn partial_header_then_disconnect_frees_the_listener() {
    let (addr, _encoders) = spawn_server(SimAdcBus::new());
    let mut first = Client::connect(addr);

    first.send(0, &[]);
    let _ = first.read_reply();
    first.send_raw(&[8, 0]);
    drop(first);

    let mut second = Client::connect(addr);
    second.send(0, &[]);
    let (function_id, error_code, _body) = second.read_reply();
    assert_eq!(function_id, 0);
    assert_eq!(error_code, 0);
}

#[test]
fn clients_are_served_one_at_a_time() {
    let (addr, _encoders) = spawn_server(SimAdcBus::new());

    // A round trip proves the first client owns the session.
    let mut first = Client::connect(addr);
    first.send(0, &[]);
    let _ = first.read_reply();

    // The second connection completes at TCP level but gets no service
    // while the first session is open.
    let mut second = Client::connect(addr);
    second.send(0, &[]);
    second.set_read_timeout(Duration::from_millis(300));
    assert!(
        second.goes_quiet(Duration::from_millis(300)),
        "second client must wait its turn"
    );

    drop(first);
    second.set_read_timeout(Duration::from_secs(5));
    let (function_id, error_code, body) = second.read_reply();
    assert_eq!(function_id, 0);
    assert_eq!(error_code, 0);
    assert_eq!(body, vec![1]);
}

#[test]
fn listener_serves_sequential_sessions() {
    let (addr, _encoders) = spawn_server(SimAdcBus::new());

    for _ in 0..3 {
        let mut client = Client::connect(addr);
        client.send(0, &[]);
        let (function_id, error_code, body) = client.read_reply();
        assert_eq!(function_id, 0);
        assert_eq!(error_code, 0);
        assert_eq!(body, vec![1]);
    }
}

//! Periodic stream behaviour: cadence, restart, stop, and teardown
//! when the client goes away.

use std::time::Duration;

use needle_controller::adc::decode_volts;
use needle_controller::adc::sim::SimAdcBus;

use crate::support::{spawn_server, Client};

const CODES: [u32; 6] = [
    0x10_0000, 0x10_0000, 0x10_0000, 0x10_0000, 0x10_0000, 0x10_0000,
];

#[test]
fn stream_pushes_headerless_frames_until_stopped() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    client.send(6, &[]);

    let mut last_elapsed = 0u32;
    for i in 0..4 {
        let push = client.read_push();
        if i > 0 {
            assert!(
                push.elapsed_us > last_elapsed,
                "elapsed must grow between pushes"
            );
        }
        last_elapsed = push.elapsed_us;
        let expected = decode_volts(CODES[0]);
        for (ch, v) in push.volts.iter().enumerate() {
            assert!((v - expected).abs() < 1e-4, "channel {ch}");
        }
    }

    client.send(7, &[]);
    assert!(
        client.goes_quiet(Duration::from_millis(200)),
        "no frames may follow a stop once in-flight ones drain"
    );

    // The session itself stays usable.
    client.set_read_timeout(Duration::from_secs(5));
    client.send(0, &[]);
    let (function_id, error_code, _body) = client.read_reply();
    assert_eq!(function_id, 0);
    assert_eq!(error_code, 0);
}

#[test]
fn stream_restart_resets_the_epoch_and_the_axes() {
    let (addr, encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    client.send(6, &[]);
    encoders.record_pulses(0, 100_000);
    let mut last_elapsed = 0u32;
    for _ in 0..5 {
        last_elapsed = client.read_push().elapsed_us;
    }

    client.send(6, &[]);

    // Frames from before the restart may still be in flight; the first
    // one whose elapsed runs backwards belongs to the new epoch.
    let mut restarted = None;
    for _ in 0..100 {
        let push = client.read_push();
        if push.elapsed_us < last_elapsed {
            restarted = Some(push);
            break;
        }
        last_elapsed = push.elapsed_us;
    }
    let push = restarted.expect("restart must reset the elapsed clock");
    assert_eq!(
        push.positions,
        [0.0; 3],
        "restart must rezero the axes before the first frame"
    );

    client.send(7, &[]);
}

#[test]
fn stop_without_a_running_stream_is_harmless() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut client = Client::connect(addr);

    client.send(7, &[]);
    client.send(0, &[]);
    let (function_id, error_code, _body) = client.read_reply();
    assert_eq!(function_id, 0);
    assert_eq!(error_code, 0);
}

#[test]
fn stream_dies_with_its_client() {
    let (addr, _encoders) = spawn_server(SimAdcBus::with_codes(CODES));
    let mut first = Client::connect(addr);

    first.send(6, &[]);
    let _ = first.read_push();
    let _ = first.read_push();
    drop(first);

    // The next session must see clean request/reply traffic only.
    let mut second = Client::connect(addr);
    second.send(0, &[]);
    let (function_id, error_code, body) = second.read_reply();
    assert_eq!(function_id, 0);
    assert_eq!(error_code, 0);
    assert_eq!(body, vec![1]);
    assert!(
        second.goes_quiet(Duration::from_millis(150)),
        "stray frames from the dead session must not leak through"
    );
}

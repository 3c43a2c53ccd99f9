//! Shared harness: a server on an ephemeral port plus a bare-bones
//! TCP client speaking the framed request protocol.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use needle_controller::adc::registers::{ConversionMode, DataRate};
use needle_controller::adc::sim::SimAdcBus;
use needle_controller::adc::Adc18;
use needle_controller::config::InstrumentConfig;
use needle_controller::encoder::EncoderBank;
use needle_controller::server::engine::InstrumentServer;
use needle_controller::status_led::StatusLed;

pub const TEST_MAC: &str = "aa:bb:cc:dd:ee:ff";

/// One decoded 40-byte acquisition frame.
pub struct Push {
    pub elapsed_us: u32,
    pub volts: [f32; 6],
    pub positions: [f32; 3],
}

/// Binds a server on an ephemeral port and drives it from a background
/// thread for the remainder of the test process.
pub fn spawn_server(bus: SimAdcBus) -> (SocketAddr, Arc<EncoderBank>) {
    let config = InstrumentConfig {
        bind_addr: "127.0.0.1".into(),
        tcp_port: 0,
        stream_interval_ms: 5,
        stream_sample_count: 1,
        ..InstrumentConfig::default()
    };
    let encoders = Arc::new(EncoderBank::new(config.encoder_scale));
    let adc = Adc18::new(
        bus,
        DataRate::default(),
        ConversionMode::default(),
        Duration::from_millis(50),
    );
    let mut server = InstrumentServer::bind(
        config,
        adc,
        Arc::clone(&encoders),
        StatusLed::new(),
        TEST_MAC.into(),
    )
    .unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || {
        let _ = server.run();
    });
    (addr, encoders)
}

pub struct Client {
    stream: TcpStream,
}

impl Client {
    /// The listener serves one session at a time, so connect() can
    /// succeed well before the server starts reading from us.
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        Client { stream }
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.stream.set_read_timeout(Some(timeout)).unwrap();
    }

    /// Frames and sends one request. Encoding is spelled out by hand
    /// here so the bytes on the wire are independent of the crate.
    pub fn send(&mut self, function_id: u8, body: &[u8]) {
        let length = (4 + body.len()) as u16;
        let mut frame = vec![length as u8, (length >> 8) as u8, function_id, 0];
        frame.extend_from_slice(body);
        self.stream.write_all(&frame).unwrap();
    }

    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
    }

    /// Reads one framed reply: (function id, error code, body).
    pub fn read_reply(&mut self) -> (u8, u8, Vec<u8>) {
        let mut header = [0u8; 4];
        self.stream.read_exact(&mut header).unwrap();
        let length = u16::from_le_bytes([header[0], header[1]]) as usize;
        assert!(length >= 4, "reply length below header size: {length}");
        let mut body = vec![0u8; length - 4];
        self.stream.read_exact(&mut body).unwrap();
        (header[2], header[3], body)
    }

    /// Reads one headerless 40-byte stream frame.
    pub fn read_push(&mut self) -> Push {
        let mut raw = [0u8; 40];
        self.stream.read_exact(&mut raw).unwrap();
        let mut volts = [0.0f32; 6];
        for (i, v) in volts.iter_mut().enumerate() {
            *v = f32_at(&raw, 4 + 4 * i);
        }
        let mut positions = [0.0f32; 3];
        for (i, p) in positions.iter_mut().enumerate() {
            *p = f32_at(&raw, 28 + 4 * i);
        }
        Push {
            elapsed_us: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            volts,
            positions,
        }
    }

    /// True once the server has closed its end of the connection.
    pub fn server_closed(&mut self) -> bool {
        let mut byte = [0u8; 1];
        matches!(self.stream.read(&mut byte), Ok(0))
    }

    /// Drains in-flight frames, then reports whether the line stayed
    /// silent for a full `window`. Bounded so a still-running stream
    /// fails fast instead of spinning.
    pub fn goes_quiet(&mut self, window: Duration) -> bool {
        self.stream.set_read_timeout(Some(window)).unwrap();
        let mut buf = [0u8; 256];
        for _ in 0..50 {
            match self.stream.read(&mut buf) {
                Ok(0) => return false,
                Ok(_) => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return true;
                }
                Err(_) => return false,
            }
        }
        false
    }
}

pub fn f32_at(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

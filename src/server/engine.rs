//! Command dispatcher and accept loop.
//!
//! `InstrumentServer` owns the listening socket, the ADC behind a
//! mutex, the encoder bank and the stream worker. Connections are
//! served one at a time: the board is single-client by contract, so
//! the accept loop blocks in `serve_client` until the peer goes away,
//! then stops any stream it left running and re-arms.
//!
//! Replies always echo the request's function id. Commands with no
//! reply (stream control, rate and mode settings) are fire-and-forget;
//! a malformed length field ends the connection instead of producing
//! an error reply, because the byte stream offset can no longer be
//! trusted after one.

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::adc::bus::AdcBus;
use crate::adc::registers::{ConversionMode, DataRate};
use crate::adc::Adc18;
use crate::config::InstrumentConfig;
use crate::encoder::EncoderBank;
use crate::error::{ProtocolError, Result};
use crate::status_led::StatusIndicator;

use super::codec::{self, Request, Snapshot};
use super::stream::{StreamPublisher, TickOutcome};
use super::BoardState;

// ---------------------------------------------------------------------------
// Function table
// ---------------------------------------------------------------------------

/// Command identifiers; the raw byte is echoed back as the reply's
/// function id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionId {
    Status = 0,
    SystemInfo = 1,
    ReadChannels = 2,
    ReadEncoders = 3,
    Snapshot = 4,
    SnapshotAveraged = 5,
    StartStream = 6,
    StopStream = 7,
    ResetAdc = 8,
    CheckAdc = 9,
    SetConversionMode = 10,
    SetDataRate = 11,
}

impl FunctionId {
    /// Number of assigned function ids; everything at or above this is
    /// rejected with an error reply.
    pub const COUNT: usize = 12;

    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Status,
            1 => Self::SystemInfo,
            2 => Self::ReadChannels,
            3 => Self::ReadEncoders,
            4 => Self::Snapshot,
            5 => Self::SnapshotAveraged,
            6 => Self::StartStream,
            7 => Self::StopStream,
            8 => Self::ResetAdc,
            9 => Self::CheckAdc,
            10 => Self::SetConversionMode,
            11 => Self::SetDataRate,
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Shared-handle helpers
// ---------------------------------------------------------------------------

/// Locks, recovering the guard if a holder panicked with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Writes one frame under the shared writer lock. Dispatch replies and
/// stream pushes both come through here, so they never interleave
/// mid-frame.
fn send_frame<W: Write>(writer: &Arc<Mutex<W>>, frame: &[u8]) -> bool {
    match lock(writer).write_all(frame) {
        Ok(()) => true,
        Err(e) => {
            warn!("server: socket write failed: {e}");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// TCP front end over one ADC and one encoder bank.
pub struct InstrumentServer<B, L> {
    config: InstrumentConfig,
    adc: Arc<Mutex<Adc18<B>>>,
    encoders: Arc<EncoderBank>,
    indicator: L,
    stream: StreamPublisher,
    listener: TcpListener,
    state: BoardState,
    mac_addr: String,
}

impl<B, L> InstrumentServer<B, L>
where
    B: AdcBus + Send + 'static,
    L: StatusIndicator,
{
    /// Bind the listening socket and take ownership of the instrument
    /// handles. `mac_addr` is reported verbatim in the system info
    /// reply.
    pub fn bind(
        config: InstrumentConfig,
        adc: Adc18<B>,
        encoders: Arc<EncoderBank>,
        mut indicator: L,
        mac_addr: String,
    ) -> Result<Self> {
        let listener = TcpListener::bind((config.bind_addr.as_str(), config.tcp_port))?;
        indicator.set_state(BoardState::WaitForConnection);
        Ok(Self {
            config,
            adc: Arc::new(Mutex::new(adc)),
            encoders,
            indicator,
            stream: StreamPublisher::new(),
            listener,
            state: BoardState::WaitForConnection,
            mac_addr,
        })
    }

    /// Actual bound address, useful when the configured port is 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop; serves one client at a time and never returns on
    /// its own.
    pub fn run(&mut self) -> Result<()> {
        info!("server: listening on {}", self.local_addr()?);
        loop {
            let (socket, peer) = self.listener.accept()?;
            self.handle_client(socket, peer);
        }
    }

    fn set_state(&mut self, state: BoardState) {
        self.state = state;
        self.indicator.set_state(state);
    }

    fn handle_client(&mut self, socket: TcpStream, peer: SocketAddr) {
        info!("server: client connected from {peer}");
        self.set_state(BoardState::Connected);

        match self.serve_client(socket) {
            Ok(()) => info!("server: client {peer} disconnected"),
            Err(e) => warn!("server: client {peer} dropped: {e}"),
        }

        // A stream must not outlive its client's socket.
        self.stream.stop();
        self.set_state(BoardState::WaitForConnection);
    }

    fn serve_client(&mut self, mut socket: TcpStream) -> Result<()> {
        // Reads use the original handle; all writes (replies and
        // stream pushes) share the cloned one behind a mutex.
        let writer = Arc::new(Mutex::new(socket.try_clone()?));
        loop {
            match codec::read_request(&mut socket) {
                Ok(request) => self.dispatch(&request, &writer),
                Err(ProtocolError::Disconnected) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    // ── Dispatch ──────────────────────────────────────────────

    fn dispatch<W>(&mut self, request: &Request, writer: &Arc<Mutex<W>>)
    where
        W: Write + Send + 'static,
    {
        let raw = request.header.function_id;
        let Some(function) = FunctionId::from_u8(raw) else {
            warn!("server: unknown function id {raw}");
            send_frame(writer, &codec::encode_header_only(raw, codec::ERR_NOT_SUPPORTED));
            return;
        };

        match function {
            FunctionId::Status => {
                info!("server: status");
                send_frame(writer, &codec::encode_status(raw, self.state as u8));
            }

            FunctionId::SystemInfo => {
                info!("server: system info");
                let frame = codec::encode_system_info(
                    raw,
                    env!("CARGO_PKG_VERSION"),
                    &self.config.board_id,
                    &self.config.static_ip,
                    &self.mac_addr,
                );
                send_frame(writer, &frame);
            }

            FunctionId::ReadChannels => {
                info!("server: channel read");
                let volts = lock(&self.adc).read_all();
                send_frame(writer, &codec::encode_channels(raw, &volts));
            }

            FunctionId::ReadEncoders => {
                info!("server: encoder read");
                send_frame(writer, &codec::encode_positions(raw, &self.encoders.positions()));
            }

            FunctionId::Snapshot => {
                info!("server: snapshot");
                let snapshot = self.acquire_snapshot(None);
                send_frame(writer, &codec::encode_snapshot_reply(raw, &snapshot));
            }

            FunctionId::SnapshotAveraged => {
                let Some(samples) = request.setting() else {
                    warn!("server: snapshot-averaged without a sample count");
                    send_frame(writer, &codec::encode_header_only(raw, codec::ERR_NOT_SUPPORTED));
                    return;
                };
                info!("server: snapshot averaged over {samples} samples");
                let snapshot = self.acquire_snapshot(Some(samples));
                send_frame(writer, &codec::encode_snapshot_reply(raw, &snapshot));
            }

            FunctionId::StartStream => {
                info!("server: stream start");
                self.start_stream(writer);
            }

            FunctionId::StopStream => {
                info!("server: stream stop");
                self.stream.stop();
            }

            FunctionId::ResetAdc => {
                info!("server: reset request");
                let code = match lock(&self.adc).reset_device() {
                    Ok(()) => codec::ERR_OK,
                    Err(e) => {
                        debug!("server: reset unavailable: {e}");
                        codec::ERR_NOT_SUPPORTED
                    }
                };
                send_frame(writer, &codec::encode_header_only(raw, code));
            }

            FunctionId::CheckAdc => {
                info!("server: communication check");
                let alive = match lock(&self.adc).check_communication() {
                    Ok(flag) => flag,
                    Err(e) => {
                        warn!("server: communication check failed: {e}");
                        false
                    }
                };
                send_frame(writer, &codec::encode_flag(raw, alive));
            }

            FunctionId::SetConversionMode => match request.setting().and_then(ConversionMode::from_code) {
                Some(mode) => {
                    info!("server: conversion mode -> {mode:?}");
                    if let Err(e) = lock(&self.adc).set_conversion_mode(mode) {
                        warn!("server: conversion mode write failed: {e}");
                    }
                }
                None => warn!("server: invalid conversion mode setting {:?}", request.setting()),
            },

            FunctionId::SetDataRate => match request.setting().and_then(DataRate::from_code) {
                Some(rate) => {
                    info!("server: data rate -> {} sps", rate.sps());
                    lock(&self.adc).set_data_rate(rate);
                }
                None => warn!("server: invalid data rate setting {:?}", request.setting()),
            },
        }
    }

    // ── Acquisition ───────────────────────────────────────────

    /// On-demand combined read. `elapsed_us` reports how long the
    /// acquisition itself took.
    fn acquire_snapshot(&mut self, samples: Option<u8>) -> Snapshot {
        let started = Instant::now();
        let volts = {
            let mut adc = lock(&self.adc);
            match samples {
                Some(n) => adc.read_all_averaged(n),
                None => adc.read_all(),
            }
        };
        Snapshot {
            elapsed_us: started.elapsed().as_micros() as u32,
            volts,
            positions: self.encoders.positions(),
        }
    }

    /// Arm the periodic push worker, replacing a running one. Stream
    /// time restarts at zero and the axes are re-referenced.
    fn start_stream<W>(&mut self, writer: &Arc<Mutex<W>>)
    where
        W: Write + Send + 'static,
    {
        let adc = Arc::clone(&self.adc);
        let encoders = Arc::clone(&self.encoders);
        let writer = Arc::clone(writer);
        let samples = self.config.stream_sample_count;
        let interval = Duration::from_millis(u64::from(self.config.stream_interval_ms));

        self.encoders.reset();
        let epoch = Instant::now();

        self.stream.start(interval, move || {
            // Timestamp and axes first; the ADC pass takes the rest of
            // the tick.
            let elapsed_us = epoch.elapsed().as_micros() as u32;
            let positions = encoders.positions();
            let volts = lock(&adc).read_all_averaged(samples);
            let push = codec::encode_snapshot_push(&Snapshot { elapsed_us, volts, positions });
            if send_frame(&writer, &push) {
                TickOutcome::Continue
            } else {
                TickOutcome::Stop
            }
        });
    }
}

//! Unified error types for the instrument firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! server loop's error handling uniform. All variants are `Copy` so they can
//! be passed freely between the dispatch and stream contexts without
//! allocation; underlying HAL error details are logged at the point of
//! failure and not carried upward.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A register exchange on the serial bus failed.
    Bus(BusError),
    /// The ADC misbehaved above the transport level.
    Device(DeviceError),
    /// A client frame could not be read or was malformed.
    Protocol(ProtocolError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// Socket-level failure; only the kind is kept so the variant stays
    /// `Copy`.
    Io(std::io::ErrorKind),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Device(e) => write!(f, "device: {e}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(kind) => write!(f, "i/o: {kind}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Register transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The SPI exchange reported a transfer failure.
    Transfer,
    /// The chip-select line could not be driven.
    ChipSelect,
    /// The ready line could not be sensed.
    ReadyPin,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer => write!(f, "SPI transfer failed"),
            Self::ChipSelect => write!(f, "chip-select write failed"),
            Self::ReadyPin => write!(f, "ready-pin read failed"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

impl std::error::Error for BusError {}

// ---------------------------------------------------------------------------
// ADC device errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// The underlying register exchange failed.
    Bus(BusError),
    /// The ready line never went low within the configured bound.
    ReadyTimeout,
    /// The operation is not wired on this hardware build.
    Unsupported,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "{e}"),
            Self::ReadyTimeout => write!(f, "conversion ready timeout"),
            Self::Unsupported => write!(f, "unsupported on this hardware"),
        }
    }
}

impl From<BusError> for DeviceError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

impl std::error::Error for DeviceError {}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

/// Failures while reading a client frame.
///
/// Anything here ends the connection: a disconnect because the byte stream
/// is gone, a malformed length because the stream offset can no longer be
/// trusted. Per-request errors (unknown function id, missing payload) are
/// not in this enum; those get an error reply and the connection stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Short or failed socket read; clean close and read error are not
    /// distinguished.
    Disconnected,
    /// Declared length smaller than the header itself.
    LengthBelowHeader(u16),
    /// Declared length above the fixed request cap.
    Oversize(u16),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "client disconnected"),
            Self::LengthBelowHeader(n) => write!(f, "declared length {n} below header size"),
            Self::Oversize(n) => write!(f, "declared length {n} above request cap"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl std::error::Error for ProtocolError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

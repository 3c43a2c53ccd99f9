//! Single-client TCP command subsystem.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Command Stack                           │
//! │                                                              │
//! │  ┌──────────┐   ┌──────────┐   ┌──────────────────────────┐  │
//! │  │ TcpStream│──▶│  Codec   │──▶│  Engine (dispatcher)     │  │
//! │  │ (read)   │   │ (framing)│   │  → Adc18 / EncoderBank   │  │
//! │  └──────────┘   └──────────┘   └──────────────────────────┘  │
//! │       ▲                                      │               │
//! │       │               ┌──────────────────────┘               │
//! │       │               ▼                                      │
//! │  ┌──────────┐   ┌──────────┐                                 │
//! │  │ TcpStream│◀──│  Stream  │   (periodic snapshot pushes)    │
//! │  │ (write)  │   │ (worker) │                                 │
//! │  └──────────┘   └──────────┘                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! One client at a time: the accept loop serves a connection to
//! completion before taking the next one, and the board-state byte in
//! the status reply reflects that.

pub mod codec;
pub mod engine;
pub mod stream;

/// Connection state reported by the status command and mirrored on the
/// front-panel LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BoardState {
    WaitForConnection = 0,
    Connected = 1,
}

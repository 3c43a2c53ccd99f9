//! Instrument configuration parameters
//!
//! All tunable parameters for the needle-controller instrument.
//! Values can be overridden via a JSON file next to the binary; anything
//! missing falls back to the shipped defaults below.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Core instrument configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstrumentConfig {
    // --- Network ---
    /// Address the TCP server binds to
    pub bind_addr: String,
    /// TCP listening port
    pub tcp_port: u16,
    /// Static interface address, reported in system info
    pub static_ip: String,
    /// Gateway for static bring-up
    pub gateway: String,
    /// Netmask for static bring-up
    pub netmask: String,
    /// Access point joined by espidf builds; host builds ignore it
    pub wifi_ssid: String,
    /// WPA2 passphrase; empty selects an open network
    pub wifi_psk: String,

    // --- Identity ---
    /// Board identifier string reported in system info
    pub board_id: String,

    // --- ADC ---
    /// Data-rate code (0x00..=0x0F, 1 SPS .. 23040 SPS)
    pub data_rate_code: u8,
    /// Conversion-mode code (0x00 continuous, 0x02 single-cycle,
    /// 0x03 continuous single-cycle)
    pub conversion_mode_code: u8,
    /// Upper bound on the conversion ready-poll (milliseconds). Must cover
    /// one conversion at the slowest configured rate (1 SPS ≈ 1 s).
    /// The hardware has no such bound; this firmware adds one so a stuck
    /// device fails the acquisition instead of hanging the caller.
    pub ready_timeout_ms: u32,

    // --- Encoders ---
    /// Position units per quadrature pulse
    pub encoder_scale: f32,

    // --- Streaming ---
    /// Nominal stream tick period (milliseconds)
    pub stream_interval_ms: u32,
    /// Samples averaged per channel on every stream tick
    pub stream_sample_count: u8,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            // Network
            bind_addr: "0.0.0.0".into(),
            tcp_port: 7851,
            static_ip: "192.168.5.101".into(),
            gateway: "192.168.5.1".into(),
            netmask: "255.255.255.0".into(),
            wifi_ssid: "needle-lab".into(),
            wifi_psk: String::new(),

            // Identity
            board_id: "NeedleController01".into(),

            // ADC
            data_rate_code: 0x0F,      // 23040 SPS
            conversion_mode_code: 0x02, // single-cycle
            ready_timeout_ms: 2000,

            // Encoders
            encoder_scale: 2.9e-5,

            // Streaming
            stream_interval_ms: 10, // 100 Hz nominal
            stream_sample_count: 5,
        }
    }
}

impl InstrumentConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file is absent or unreadable as JSON. A bad config file must never
    /// keep the instrument off the network.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(cfg) => {
                    info!("config: loaded {}", path.display());
                    cfg
                }
                Err(e) => {
                    warn!("config: {} unparseable ({e}), using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                info!("config: {} absent, using defaults", path.display());
                Self::default()
            }
        }
    }
}

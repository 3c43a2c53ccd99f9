//! NeedleController firmware entry point.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Bring-up order                         │
//! │                                                             │
//! │  logging ─▶ config ─▶ board (bus · encoders · network)      │
//! │                          │                                  │
//! │                          ▼                                  │
//! │             Adc18 ── InstrumentServer ── StatusLed          │
//! │                          │                                  │
//! │                          ▼                                  │
//! │                  accept/dispatch loop                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Host builds (the default) run the identical server against the
//! simulated bus; `--features espidf` targets the ESP32-S3 board.

#![deny(unused_must_use)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use needle_controller::adc::registers::{ConversionMode, DataRate};
use needle_controller::adc::Adc18;
use needle_controller::config::InstrumentConfig;
use needle_controller::encoder::EncoderBank;
use needle_controller::server::engine::InstrumentServer;
use needle_controller::status_led::StatusLed;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "needle-controller.json";

fn main() -> Result<()> {
    #[cfg(target_os = "espidf")]
    esp_idf_svc::sys::link_patches();
    init_logging()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  NeedleController v{}             ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = InstrumentConfig::load_or_default(Path::new(CONFIG_PATH));

    let data_rate = DataRate::from_code(config.data_rate_code).unwrap_or_else(|| {
        warn!(
            "config: data rate code 0x{:02X} out of range, using default",
            config.data_rate_code
        );
        DataRate::default()
    });
    let conversion_mode = ConversionMode::from_code(config.conversion_mode_code).unwrap_or_else(|| {
        warn!(
            "config: conversion mode code 0x{:02X} invalid, using default",
            config.conversion_mode_code
        );
        ConversionMode::default()
    });

    let encoders = Arc::new(EncoderBank::new(config.encoder_scale));
    // The `_guards` binding keeps espidf network and interrupt handles
    // alive for the life of the process.
    let board::Board { bus, mac_addr, _guards } = board::bring_up(&config, &encoders)?;

    let mut adc = Adc18::new(
        bus,
        data_rate,
        conversion_mode,
        Duration::from_millis(u64::from(config.ready_timeout_ms)),
    );
    if let Err(e) = adc.init() {
        // The server still comes up; the communication-check command
        // reports the fault to the client side.
        warn!("adc: initial mode write failed: {e}");
    }

    let mut server = InstrumentServer::bind(config, adc, encoders, StatusLed::new(), mac_addr)?;
    server.run()?;
    Ok(())
}

fn init_logging() -> Result<()> {
    #[cfg(target_os = "espidf")]
    esp_idf_logger::init()?;

    #[cfg(not(target_os = "espidf"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    Ok(())
}

// ── Host board ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod board {
    //! Host bring-up: simulated bus and a fixed identity.

    use std::sync::Arc;

    use log::info;

    use needle_controller::adc::sim::SimAdcBus;
    use needle_controller::config::InstrumentConfig;
    use needle_controller::encoder::EncoderBank;

    pub type Bus = SimAdcBus;

    pub struct Guards;

    pub struct Board {
        pub bus: Bus,
        pub mac_addr: String,
        pub _guards: Guards,
    }

    pub fn bring_up(
        _config: &InstrumentConfig,
        _encoders: &Arc<EncoderBank>,
    ) -> anyhow::Result<Board> {
        info!("board: host build, simulated ADC bus");
        Ok(Board {
            bus: SimAdcBus::new().with_noise(),
            mac_addr: "02:00:00:00:00:01".into(),
            _guards: Guards,
        })
    }
}

// ── ESP32-S3 board ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod board {
    //! ESP32-S3 bring-up: SPI link to the converter, quadrature edge
    //! interrupts, station WiFi at the configured static address.

    use std::ffi::c_void;
    use std::sync::{Arc, OnceLock};

    use anyhow::{Context, Result};
    use esp_idf_hal::gpio::{Gpio10, Gpio9, Input, Output, PinDriver};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::spi::{config::Config as SpiConfig, SpiBusDriver, SpiDriver, SpiDriverConfig};
    use esp_idf_hal::units::Hertz;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::ipv4;
    use esp_idf_svc::netif::{EspNetif, NetifConfiguration, NetifStack};
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys::{
        esp, esp_efuse_mac_get_default, gpio_get_level, gpio_install_isr_service,
        gpio_int_type_t_GPIO_INTR_POSEDGE, gpio_isr_handler_add, gpio_mode_t_GPIO_MODE_INPUT,
        gpio_pull_mode_t_GPIO_PULLUP_ONLY, gpio_set_direction, gpio_set_intr_type,
        gpio_set_pull_mode,
    };
    use esp_idf_svc::wifi::{
        AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi, WifiDriver,
    };
    use log::info;

    use needle_controller::adc::bus::SpiAdcBus;
    use needle_controller::config::InstrumentConfig;
    use needle_controller::encoder::EncoderBank;
    use needle_controller::pins;

    pub type Bus = SpiAdcBus<
        SpiBusDriver<'static, SpiDriver<'static>>,
        PinDriver<'static, Gpio10, Output>,
        PinDriver<'static, Gpio9, Input>,
    >;

    pub struct Guards {
        _wifi: BlockingWifi<EspWifi<'static>>,
    }

    pub struct Board {
        pub bus: Bus,
        pub mac_addr: String,
        pub _guards: Guards,
    }

    /// A/B pin pairs per axis, indexed by ISR argument.
    const ENCODER_AXES: [(i32, i32); 3] = [
        (pins::ENC_X_A_GPIO, pins::ENC_X_B_GPIO),
        (pins::ENC_Y_A_GPIO, pins::ENC_Y_B_GPIO),
        (pins::ENC_Z_A_GPIO, pins::ENC_Z_B_GPIO),
    ];

    /// Bank referenced from the edge ISRs; set once during bring-up.
    static ENCODER_BANK: OnceLock<Arc<EncoderBank>> = OnceLock::new();

    pub fn bring_up(config: &InstrumentConfig, encoders: &Arc<EncoderBank>) -> Result<Board> {
        let peripherals = Peripherals::take().context("peripherals already taken")?;

        let spi = SpiDriver::new(
            peripherals.spi2,
            peripherals.pins.gpio12,
            peripherals.pins.gpio11,
            Some(peripherals.pins.gpio13),
            &SpiDriverConfig::new(),
        )
        .context("SPI driver")?;
        let spi_bus = SpiBusDriver::new(spi, &SpiConfig::new().baudrate(Hertz(pins::ADC_SPI_HZ)))
            .context("SPI bus")?;
        let cs = PinDriver::output(peripherals.pins.gpio10)?;
        let rdy = PinDriver::input(peripherals.pins.gpio9)?;
        let bus = SpiAdcBus::new(spi_bus, cs, rdy)
            .map_err(|e| anyhow::anyhow!("chip-select bring-up: {e}"))?;

        wire_encoder_isrs(encoders)?;
        let wifi = bring_up_wifi(peripherals.modem, config)?;

        Ok(Board {
            bus,
            mac_addr: mac_addr(),
            _guards: Guards { _wifi: wifi },
        })
    }

    /// Positive A-phase edge counts one pulse; the B-phase level at
    /// that instant gives the direction.
    unsafe extern "C" fn axis_isr(arg: *mut c_void) {
        let axis = arg as usize;
        if let Some(bank) = ENCODER_BANK.get() {
            let (_, b_gpio) = ENCODER_AXES[axis];
            let delta = if unsafe { gpio_get_level(b_gpio) } == 0 { 1 } else { -1 };
            bank.record_pulses(axis, delta);
        }
    }

    fn wire_encoder_isrs(encoders: &Arc<EncoderBank>) -> Result<()> {
        let _ = ENCODER_BANK.set(Arc::clone(encoders));
        unsafe {
            esp!(gpio_install_isr_service(0))?;
            for (axis, (a, b)) in ENCODER_AXES.iter().enumerate() {
                for pin in [*a, *b] {
                    esp!(gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_INPUT))?;
                    esp!(gpio_set_pull_mode(pin, gpio_pull_mode_t_GPIO_PULLUP_ONLY))?;
                }
                esp!(gpio_set_intr_type(*a, gpio_int_type_t_GPIO_INTR_POSEDGE))?;
                esp!(gpio_isr_handler_add(*a, Some(axis_isr), axis as *mut c_void))?;
            }
        }
        info!("board: encoder edge interrupts armed");
        Ok(())
    }

    fn bring_up_wifi(
        modem: esp_idf_hal::modem::Modem,
        config: &InstrumentConfig,
    ) -> Result<BlockingWifi<EspWifi<'static>>> {
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        let static_ip: std::net::Ipv4Addr = config.static_ip.parse().context("static_ip")?;
        let gateway: std::net::Ipv4Addr = config.gateway.parse().context("gateway")?;
        let netmask: std::net::Ipv4Addr = config.netmask.parse().context("netmask")?;
        let prefix = u32::from(netmask).count_ones() as u8;

        let driver = WifiDriver::new(modem, sysloop.clone(), Some(nvs))?;
        let sta_netif = EspNetif::new_with_conf(&NetifConfiguration {
            ip_configuration: Some(ipv4::Configuration::Client(
                ipv4::ClientConfiguration::Fixed(ipv4::ClientSettings {
                    ip: static_ip,
                    subnet: ipv4::Subnet {
                        gateway,
                        mask: ipv4::Mask(prefix),
                    },
                    dns: None,
                    secondary_dns: None,
                }),
            )),
            ..NetifConfiguration::wifi_default_client()
        })?;
        let wifi = EspWifi::wrap_all(driver, sta_netif, EspNetif::new(NetifStack::Ap)?)?;

        let mut wifi = BlockingWifi::wrap(wifi, sysloop)?;
        let auth_method = if config.wifi_psk.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: config
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|()| anyhow::anyhow!("SSID longer than 32 bytes"))?,
            password: config
                .wifi_psk
                .as_str()
                .try_into()
                .map_err(|()| anyhow::anyhow!("passphrase longer than 64 bytes"))?,
            auth_method,
            ..Default::default()
        }))?;
        wifi.start()?;
        wifi.connect()?;
        wifi.wait_netif_up()?;
        info!("board: station up at {}", config.static_ip);
        Ok(wifi)
    }

    fn mac_addr() -> String {
        let mut mac = [0u8; 6];
        unsafe {
            esp_efuse_mac_get_default(mac.as_mut_ptr());
        }
        format!(
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
        )
    }
}

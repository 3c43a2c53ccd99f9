//! 6-channel precision ADC driver.
//!
//! Acquisition follows the converter's command discipline: select the input
//! pair, start a conversion at the configured rate, poll the ready line,
//! stop the conversion, then read and decode `DCHNL_DATA`. Batch readers
//! never abort on a single channel's failure; the failed channel reports
//! the sentinel voltage and the scan continues.

pub mod bus;
pub mod registers;
#[cfg(not(target_os = "espidf"))]
pub mod sim;

use core::time::Duration;
use std::time::Instant;

use log::{debug, info, warn};

use self::bus::AdcBus;
use self::registers::{
    Channel, ConversionMode, DataRate, DATA_RESOLUTION, DCHNL_CMD, DCHNL_CTRL1, DCHNL_DATA,
    DIFFERENTIAL_PAIRS, FULL_SCALE_VOLTAGE, GEN_CHNL_CTRL, GEN_PROD, PRODUCT_ID,
    STOP_COMMAND_WORD, channel_control_word, mode_control_word, start_command_word,
};
use crate::error::DeviceError;

/// Reported for a channel whose acquisition failed anywhere in the chain.
pub const SENTINEL_VOLTS: f32 = -1.0;

/// Voltages for the 6 differential pairs, acquisition order.
pub type ChannelVolts = [f32; 6];

/// Decode a `DCHNL_DATA` word: sign-extend the 24-bit two's-complement
/// payload and scale to volts.
pub fn decode_volts(word: u32) -> f32 {
    let raw = ((word << 8) as i32) >> 8;
    raw as f32 / DATA_RESOLUTION as f32 * FULL_SCALE_VOLTAGE
}

/// Channel driver over any [`AdcBus`].
pub struct Adc18<B> {
    dev: B,
    data_rate: DataRate,
    conversion_mode: ConversionMode,
    ready_timeout: Duration,
}

impl<B: AdcBus> Adc18<B> {
    pub fn new(dev: B, data_rate: DataRate, conversion_mode: ConversionMode, ready_timeout: Duration) -> Self {
        Self { dev, data_rate, conversion_mode, ready_timeout }
    }

    /// Push the configured conversion mode to the device. Call once at
    /// bring-up; acquisition works without it only until the first
    /// mode-sensitive conversion.
    pub fn init(&mut self) -> Result<(), DeviceError> {
        self.write_mode(self.conversion_mode)?;
        info!(
            "adc: initialised, mode {:?}, rate {} SPS",
            self.conversion_mode,
            self.data_rate.sps()
        );
        Ok(())
    }

    pub const fn data_rate(&self) -> DataRate {
        self.data_rate
    }

    pub const fn conversion_mode(&self) -> ConversionMode {
        self.conversion_mode
    }

    // -----------------------------------------------------------------------
    // Register-level operations
    // -----------------------------------------------------------------------

    /// Route `ch` to the converter, with this instrument's fixed input
    /// test-impedance flags.
    pub fn select_channel(&mut self, ch: Channel) -> Result<(), DeviceError> {
        self.dev.write_register(GEN_CHNL_CTRL, channel_control_word(ch))?;
        Ok(())
    }

    /// Kick off a conversion at the configured data rate.
    pub fn start_conversion(&mut self) -> Result<(), DeviceError> {
        self.dev.write_register(DCHNL_CMD, start_command_word(self.data_rate))?;
        Ok(())
    }

    /// A started conversion is always stopped, even in single-cycle mode.
    pub fn stop_conversion(&mut self) -> Result<(), DeviceError> {
        self.dev.write_register(DCHNL_CMD, STOP_COMMAND_WORD)?;
        Ok(())
    }

    /// Spin until the ready line goes low, bounded by the configured
    /// timeout. The device itself offers no bound; the timeout turns a
    /// wedged converter into a reportable fault instead of a hung caller.
    pub fn wait_ready(&mut self) -> Result<(), DeviceError> {
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            if self.dev.conversion_ready()? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!("adc: ready line stuck for {:?}", self.ready_timeout);
                return Err(DeviceError::ReadyTimeout);
            }
            core::hint::spin_loop();
        }
    }

    /// Read and decode the conversion result register.
    pub fn read_voltage(&mut self) -> Result<f32, DeviceError> {
        let word = self.dev.read_register(DCHNL_DATA)?;
        Ok(decode_volts(word))
    }

    // -----------------------------------------------------------------------
    // Acquisition
    // -----------------------------------------------------------------------

    /// One full acquisition cycle on `ch`.
    pub fn acquire_single(&mut self, ch: Channel) -> Result<f32, DeviceError> {
        self.select_channel(ch)?;
        self.conversion_cycle()
    }

    /// Average of exactly `samples` acquisition cycles on `ch` (the channel
    /// is selected once). `samples == 0` is clamped to 1. A failure anywhere
    /// abandons the channel; partial accumulations are never reported.
    pub fn acquire_averaged(&mut self, ch: Channel, samples: u8) -> Result<f32, DeviceError> {
        let n = samples.max(1);
        self.select_channel(ch)?;
        let mut acc = 0.0f32;
        for _ in 0..n {
            acc += self.conversion_cycle()?;
        }
        Ok(acc / f32::from(n))
    }

    /// One start/wait/stop/read cycle. A conversion that was started is
    /// always stopped, including when the ready poll fails: the stop on
    /// the error branch is best-effort, so the poll fault is what the
    /// caller sees, never left running on the device.
    fn conversion_cycle(&mut self) -> Result<f32, DeviceError> {
        self.start_conversion()?;
        if let Err(e) = self.wait_ready() {
            let _ = self.stop_conversion();
            return Err(e);
        }
        self.stop_conversion()?;
        self.read_voltage()
    }

    /// Single-sample scan of the 6 differential pairs. Failed channels
    /// report [`SENTINEL_VOLTS`]; the scan always completes.
    pub fn read_all(&mut self) -> ChannelVolts {
        let mut volts = [SENTINEL_VOLTS; 6];
        for (i, ch) in DIFFERENTIAL_PAIRS.into_iter().enumerate() {
            match self.acquire_single(ch) {
                Ok(v) => volts[i] = v,
                Err(e) => warn!("adc: channel {i} read failed: {e}"),
            }
        }
        volts
    }

    /// Averaged scan of the 6 differential pairs, `samples` cycles each.
    pub fn read_all_averaged(&mut self, samples: u8) -> ChannelVolts {
        let mut volts = [SENTINEL_VOLTS; 6];
        for (i, ch) in DIFFERENTIAL_PAIRS.into_iter().enumerate() {
            match self.acquire_averaged(ch, samples) {
                Ok(v) => volts[i] = v,
                Err(e) => warn!("adc: channel {i} averaged read failed: {e}"),
            }
        }
        volts
    }

    // -----------------------------------------------------------------------
    // Configuration and health
    // -----------------------------------------------------------------------

    /// Write a new conversion mode to the device and remember it.
    pub fn set_conversion_mode(&mut self, mode: ConversionMode) -> Result<(), DeviceError> {
        self.write_mode(mode)?;
        self.conversion_mode = mode;
        debug!("adc: conversion mode set to {mode:?}");
        Ok(())
    }

    /// Data rate is applied by the next conversion start; no register write
    /// happens here.
    pub fn set_data_rate(&mut self, rate: DataRate) {
        self.data_rate = rate;
        debug!("adc: data rate set to {} SPS", rate.sps());
    }

    /// Read the product-id register and compare the identity byte.
    /// `Ok(false)` means the bus works but the part answered with the wrong
    /// id.
    pub fn check_communication(&mut self) -> Result<bool, DeviceError> {
        let word = self.dev.read_register(GEN_PROD)?;
        let id = ((word >> 16) & 0xFF) as u8;
        let ok = id == PRODUCT_ID;
        if ok {
            debug!("adc: communication check passed");
        } else {
            warn!("adc: product id 0x{id:02X}, expected 0x{PRODUCT_ID:02X}");
        }
        Ok(ok)
    }

    /// The reset line is not wired on this hardware build; callers must not
    /// assume a reset takes effect.
    pub fn reset_device(&mut self) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported)
    }

    fn write_mode(&mut self, mode: ConversionMode) -> Result<(), DeviceError> {
        self.dev.write_register(DCHNL_CTRL1, mode_control_word(mode))?;
        Ok(())
    }
}

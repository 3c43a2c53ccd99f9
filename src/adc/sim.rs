//! Simulated ADC bus for host builds.
//!
//! Behaves like the real frontend at the register level: product id reads
//! back correctly, channel selection and conversion start/stop follow the
//! command register, and `DCHNL_DATA` returns the code configured for the
//! selected differential pair. Failure knobs let tests break exactly one
//! channel or wedge the ready line.
//!
//! The instance owns its state so parallel tests cannot interfere; shared
//! observation (cycle counters) goes through a cloneable handle grabbed
//! before the bus is moved into the driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;

use super::bus::AdcBus;
use super::registers::{self, Channel};
use crate::error::BusError;

/// Exchange counters, observable from outside a moved bus.
#[derive(Debug, Default)]
pub struct SimCounters {
    /// `DCHNL_CMD` start writes (one per acquisition cycle).
    pub starts: AtomicU32,
    /// `DCHNL_CMD` stop writes.
    pub stops: AtomicU32,
    /// `GEN_CHNL_CTRL` writes.
    pub selects: AtomicU32,
}

impl SimCounters {
    pub fn start_count(&self) -> u32 {
        self.starts.load(Ordering::Relaxed)
    }

    pub fn stop_count(&self) -> u32 {
        self.stops.load(Ordering::Relaxed)
    }

    pub fn select_count(&self) -> u32 {
        self.selects.load(Ordering::Relaxed)
    }
}

/// Register-level ADC simulation.
pub struct SimAdcBus {
    /// Raw 24-bit codes returned for the 6 differential pairs.
    codes: [u32; 6],
    /// Channel code most recently written to `GEN_CHNL_CTRL`.
    selected: Option<Channel>,
    converting: bool,
    /// Selecting this channel fails the register write.
    fail_select: Option<Channel>,
    /// Ready line never asserts; conversions never complete.
    ready_stuck: bool,
    /// Replace un-set codes with small random noise around zero.
    noise: bool,
    counters: Arc<SimCounters>,
}

impl SimAdcBus {
    /// All channels read code 0 (0 V) until configured.
    pub fn new() -> Self {
        Self {
            codes: [0; 6],
            selected: None,
            converting: false,
            fail_select: None,
            ready_stuck: false,
            noise: false,
            counters: Arc::new(SimCounters::default()),
        }
    }

    /// Fixed raw codes for the 6 differential pairs, acquisition order.
    pub fn with_codes(codes: [u32; 6]) -> Self {
        Self { codes, ..Self::new() }
    }

    /// Make the `GEN_CHNL_CTRL` write selecting `ch` fail.
    pub fn fail_select(mut self, ch: Channel) -> Self {
        self.fail_select = Some(ch);
        self
    }

    /// Wedge the ready line high so no conversion ever completes.
    pub fn ready_stuck(mut self) -> Self {
        self.ready_stuck = true;
        self
    }

    /// Unconfigured channels return low-amplitude noise instead of zero,
    /// for a livelier host demo.
    pub fn with_noise(mut self) -> Self {
        self.noise = true;
        self
    }

    /// Handle for asserting on exchange counts after the bus has been
    /// moved into a driver.
    pub fn counters(&self) -> Arc<SimCounters> {
        Arc::clone(&self.counters)
    }

    /// Update the code a differential pair reads back (0-based pair index).
    pub fn set_code(&mut self, pair: usize, code: u32) {
        if let Some(slot) = self.codes.get_mut(pair) {
            *slot = code & 0x00FF_FFFF;
        }
    }

    fn data_code(&self) -> u32 {
        let Some(ch) = self.selected else {
            return 0;
        };
        if ch.is_differential() {
            let idx = (ch.code() - Channel::DiffAi1Ai2.code()) as usize;
            self.codes[idx]
        } else if self.noise {
            // A handful of counts around zero, sign-extended two's complement.
            let n: i32 = rand::random::<i32>() % 64;
            (n as u32) & 0x00FF_FFFF
        } else {
            0
        }
    }
}

impl Default for SimAdcBus {
    fn default() -> Self {
        Self::new()
    }
}

impl AdcBus for SimAdcBus {
    fn read_register(&mut self, addr: u8) -> Result<u32, BusError> {
        match addr {
            registers::GEN_PROD => Ok((registers::PRODUCT_ID as u32) << 16),
            registers::DCHNL_DATA => Ok(self.data_code()),
            registers::DCHNL_STA => Ok(u32::from(!self.converting)),
            _ => Ok(0),
        }
    }

    fn write_register(&mut self, addr: u8, value: u32) -> Result<(), BusError> {
        match addr {
            registers::GEN_CHNL_CTRL => {
                self.counters.selects.fetch_add(1, Ordering::Relaxed);
                let ch = Channel::from_code(((value >> 8) & 0xFF) as u8);
                if ch.is_some() && ch == self.fail_select {
                    debug!("sim: injected select failure on {ch:?}");
                    return Err(BusError::Transfer);
                }
                self.selected = ch;
                Ok(())
            }
            registers::DCHNL_CMD => {
                let command = ((value >> 16) & 0xFF) as u8;
                if command & registers::START_CONVERSION == registers::START_CONVERSION {
                    self.counters.starts.fetch_add(1, Ordering::Relaxed);
                    self.converting = true;
                } else if command == registers::STOP_CONVERSION {
                    self.counters.stops.fetch_add(1, Ordering::Relaxed);
                    self.converting = false;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn conversion_ready(&mut self) -> Result<bool, BusError> {
        if self.ready_stuck {
            return Ok(false);
        }
        // Conversions complete instantly once started.
        Ok(self.converting)
    }
}

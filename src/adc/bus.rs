//! Register-level transport for the ADC frontend.
//!
//! One register exchange is exactly one chip-select window: select low,
//! 4 bytes clocked full-duplex, select high. The byte clocked while the
//! control byte goes out lands in bits 31:24 of the reassembled word, which
//! is why register payloads occupy the low 24 bits. Nothing here retries;
//! a failed exchange is reported to the caller as-is.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;
use log::warn;

use super::registers::SPI_READ_BIT;
use crate::error::BusError;

/// Byte-level access to the converter: register exchange plus the
/// conversion-ready line.
///
/// Implemented by the SPI transport on hardware and by the simulated bus on
/// the host; the channel driver is generic over this seam.
pub trait AdcBus {
    /// Read one register; the 24-bit payload sits in the low bits of the
    /// returned word.
    fn read_register(&mut self, addr: u8) -> Result<u32, BusError>;

    /// Write the low 24 bits of `value` to one register.
    fn write_register(&mut self, addr: u8, value: u32) -> Result<(), BusError>;

    /// Sense the ready line; `true` once the pending conversion completed
    /// (line low).
    fn conversion_ready(&mut self) -> Result<bool, BusError>;
}

/// SPI transport: bus + chip-select output + active-low ready input.
pub struct SpiAdcBus<SPI, CS, RDY> {
    spi: SPI,
    cs: CS,
    rdy: RDY,
}

impl<SPI, CS, RDY> SpiAdcBus<SPI, CS, RDY>
where
    SPI: SpiBus,
    CS: OutputPin,
    RDY: InputPin,
{
    /// Takes ownership of the pins; raises chip-select so the bus starts
    /// idle.
    pub fn new(spi: SPI, mut cs: CS, rdy: RDY) -> Result<Self, BusError> {
        cs.set_high().map_err(|_| BusError::ChipSelect)?;
        Ok(Self { spi, cs, rdy })
    }

    /// Run one exchange inside a chip-select window. The select line is
    /// raised again even when the transfer fails.
    fn framed(&mut self, op: impl FnOnce(&mut SPI) -> Result<(), SPI::Error>) -> Result<(), BusError> {
        self.cs.set_low().map_err(|_| BusError::ChipSelect)?;

        let transfer = op(&mut self.spi);
        let flush = self.spi.flush();
        let raise = self.cs.set_high();

        if let Err(e) = transfer {
            warn!("bus: exchange failed: {e:?}");
            return Err(BusError::Transfer);
        }
        if let Err(e) = flush {
            warn!("bus: flush failed: {e:?}");
            return Err(BusError::Transfer);
        }
        raise.map_err(|_| BusError::ChipSelect)
    }
}

impl<SPI, CS, RDY> AdcBus for SpiAdcBus<SPI, CS, RDY>
where
    SPI: SpiBus,
    CS: OutputPin,
    RDY: InputPin,
{
    fn read_register(&mut self, addr: u8) -> Result<u32, BusError> {
        let tx = [(addr << 1) | SPI_READ_BIT, 0, 0, 0];
        let mut rx = [0u8; 4];
        self.framed(|spi| spi.transfer(&mut rx, &tx))?;
        Ok(u32::from_be_bytes(rx))
    }

    fn write_register(&mut self, addr: u8, value: u32) -> Result<(), BusError> {
        let [_, b2, b1, b0] = value.to_be_bytes();
        let tx = [(addr << 1) & !SPI_READ_BIT, b2, b1, b0];
        self.framed(|spi| spi.write(&tx))
    }

    fn conversion_ready(&mut self) -> Result<bool, BusError> {
        self.rdy.is_low().map_err(|_| BusError::ReadyPin)
    }
}

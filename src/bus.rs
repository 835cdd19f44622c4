//!# Byte transport to the controller
//!
//! The register framework and the CAN driver only require the four
//! primitives of [Transport]. [SpiBus] implements them with the MCP25625
//! SPI instruction set; any other synchronous byte channel (or a test
//! double) can be substituted.
//!
//! The transport is a single physical bus without arbitration between
//! logical sessions: callers using the driver from multiple threads must
//! wrap every register transaction and every send/receive in an external
//! exclusive lock.

use core::fmt::Debug;
use embedded_hal::spi::{Operation as SpiOperation, SpiDevice};

/// Synchronous byte-level access to the controller register file
pub trait Transport {
    type Error: Debug;

    /// Resets the controller to its power-on state
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Reads `buffer.len()` bytes starting at the given register address
    fn read_bytes(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes consecutive bytes starting at the given register address
    fn write_bytes(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read-modify-writes a single byte: bits selected by `mask` take the
    /// corresponding bits of `value`, the rest are left unchanged
    fn bit_modify(&mut self, address: u8, mask: u8, value: u8) -> Result<(), Self::Error>;
}

/// SPI instruction set of the MCP25625
#[derive(Copy, Clone)]
enum Instruction {
    Reset = 0b1100_0000,
    Read = 0b0000_0011,
    Write = 0b0000_0010,
    BitModify = 0b0000_0101,
}

/// [Transport] implementation over an SPI device with managed chip select
pub struct SpiBus<D> {
    device: D,
}

impl<D: SpiDevice<u8>> SpiBus<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    /// Releases the SPI device
    pub fn free(self) -> D {
        self.device
    }
}

impl<D: SpiDevice<u8>> Transport for SpiBus<D> {
    type Error = D::Error;

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.device.write(&[Instruction::Reset as u8])
    }

    fn read_bytes(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let command = [Instruction::Read as u8, address];

        let mut operations = [SpiOperation::Write(&command), SpiOperation::Read(buffer)];
        self.device.transaction(&mut operations)
    }

    fn write_bytes(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        let command = [Instruction::Write as u8, address];

        let mut operations = [SpiOperation::Write(&command), SpiOperation::Write(data)];
        self.device.transaction(&mut operations)
    }

    fn bit_modify(&mut self, address: u8, mask: u8, value: u8) -> Result<(), Self::Error> {
        self.device
            .write(&[Instruction::BitModify as u8, address, mask, value])
    }
}

//! # Mock dummy structures for doc examples
//!
//! [ExampleTransport] is an in-memory rendition of the controller register
//! file with just enough behavior for the documentation flows: reset
//! restores the power-on defaults, mode requests are mirrored into the
//! status register and a transmit request loops the frame back into
//! receive buffer 0.

use crate::bus::Transport;
use core::cell::RefCell;
use core::convert::Infallible;
use embedded_time::clock::Error;
use embedded_time::duration::Fraction;
use embedded_time::{Clock, Instant};

/// CANCTRL power-on value: Configuration mode, CLKOUT enabled at F_OSC/8
const CANCTRL_POWER_ON: u8 = 0x87;

/// CANSTAT power-on value: Configuration mode
const CANSTAT_POWER_ON: u8 = 0x80;

/// In-memory register file standing in for the chip
#[derive(Debug)]
pub struct ExampleTransport {
    memory: [u8; 128],
}

impl Default for ExampleTransport {
    fn default() -> Self {
        let mut transport = Self { memory: [0; 128] };
        transport.power_on();
        transport
    }
}

impl ExampleTransport {
    fn power_on(&mut self) {
        self.memory = [0; 128];
        self.memory[0x0F] = CANCTRL_POWER_ON;
        self.memory[0x0E] = CANSTAT_POWER_ON;
    }

    /// Mode requests take effect immediately: CANCTRL.REQOP is mirrored
    /// into CANSTAT.OPMOD
    fn mirror_mode_request(&mut self) {
        self.memory[0x0E] = (self.memory[0x0E] & 0x1F) | (self.memory[0x0F] & 0xE0);
    }

    /// A set TXREQ flag completes at once by looping the buffer 0 frame
    /// (identifier, DLC and data) back into receive buffer 0
    fn loop_back_buffer_0(&mut self) {
        if self.memory[0x30] & 0x08 == 0 {
            return;
        }

        self.memory.copy_within(0x31..0x3E, 0x61);
        self.memory[0x30] &= !0x08;
        self.memory[0x2C] |= 0x01;
    }
}

impl Transport for ExampleTransport {
    type Error = Infallible;

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.power_on();
        Ok(())
    }

    fn read_bytes(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let start = address as usize;
        buffer.copy_from_slice(&self.memory[start..start + buffer.len()]);
        Ok(())
    }

    fn write_bytes(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        let start = address as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);

        if (start..start + data.len()).contains(&0x0F) {
            self.mirror_mode_request();
        }

        if (start..start + data.len()).contains(&0x30) {
            self.loop_back_buffer_0();
        }

        Ok(())
    }

    fn bit_modify(&mut self, address: u8, mask: u8, value: u8) -> Result<(), Self::Error> {
        let current = self.memory[address as usize];
        self.memory[address as usize] = (current & !mask) | (value & mask);
        Ok(())
    }
}

/// Self-advancing microsecond clock: every reading moves time forward by
/// 100 ms, so poll loops always make progress
#[derive(Debug, Default)]
pub struct ExampleClock {
    ticks: RefCell<u64>,
}

impl Clock for ExampleClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, Error> {
        let mut ticks = self.ticks.borrow_mut();
        *ticks += 100_000;

        Ok(Instant::new(*ticks))
    }
}

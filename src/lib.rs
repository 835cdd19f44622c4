#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]
#![allow(dead_code)]

//! # Library for MCP25625 CAN controller
//!
//! Crate currently offers the following features:
//! * CAN2.0 frames with standard and extended ID formats
//! * Declarative register definitions with validated field access
//! * Blocking send/receive with caller-supplied timeouts
//! * Exact-match acceptance filters
//! * no_std support
//!
//!## CAN Tx/Rx example
//!
//!```
//!use mcp25625::can::MCP25625;
//!use mcp25625::example::{ExampleClock, ExampleTransport};
//!use mcp25625::message::Message;
//!use bytes::Bytes;
//!use embedded_can::ExtendedId;
//!use embedded_time::duration::Milliseconds;
//!
//!let bus = ExampleTransport::default();
//!let clock = ExampleClock::default();
//!
//!let mut controller: MCP25625<_, ExampleClock> = MCP25625::new(bus);
//!
//!// Accept only this identifier on filter slot 0
//!let can_id = ExtendedId::new(0x122801F0).unwrap();
//!controller.set_filter_0(can_id);
//!
//!// Reset the chip, program bit timing and the receive filters
//!controller.initialize().unwrap();
//!controller.set_loopback_mode().unwrap();
//!
//!// Create and transmit a message frame
//!let payload = Bytes::copy_from_slice(&[0x01, 0xDE, 0xAD, 0xCA, 0xFE]);
//!let message = Message::new(0x122801F0, true, Some(payload)).unwrap();
//!controller.send(&message, &clock, Some(Milliseconds(500u32))).unwrap();
//!
//!// Receive the looped back message
//!assert!(controller.peek().unwrap());
//!let received = controller.recv(&clock, Some(Milliseconds(500u32))).unwrap();
//!assert_eq!(received.arbitration_id(), 0x122801F0);
//!assert_eq!(received.data(), Some(&[0x01, 0xDE, 0xAD, 0xCA, 0xFE][..]));
//!```

extern crate alloc;

pub mod bus;
pub mod can;
pub mod message;
pub mod regmap;
pub mod registers;

pub mod example;
#[cfg(test)]
pub(crate) mod mocks;
#[cfg(test)]
mod tests;

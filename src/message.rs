//!# CAN Message
//!
//! A [Message] carries an 11 bit standard or 29 bit extended arbitration
//! identifier and up to eight data bytes. Identifier range and payload
//! length are validated at construction, so a message handed to the driver
//! never needs re-checking before it touches the bus.
//!
//! ```
//! use bytes::Bytes;
//! use mcp25625::message::Message;
//!
//! let message = Message::new(0x122801F0, true, Some(Bytes::copy_from_slice(&[0xDE, 0xAD]))).unwrap();
//! assert!(message.is_extended());
//! assert_eq!(message.data(), Some(&[0xDE, 0xAD][..]));
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use embedded_can::{ExtendedId, Id, StandardId};

/// Mask of the 11 bit standard identifier part
pub const STANDARD_IDENTIFIER_MASK: u32 = 0x7FF;

/// Mask of the 18 bit extended identifier part
pub const EXTENDED_IDENTIFIER_MASK: u32 = 0x3FFFF;

/// Maximum CAN 2.0 payload and the width of the data registers in bytes
pub const MAX_PAYLOAD_BYTES: usize = 8;

/// Possible errors when constructing or decoding a [Message]
#[derive(Debug, PartialEq, Eq)]
pub enum MessageError {
    /// Identifier above 11 bits in standard mode
    InvalidStandardId(u32),
    /// Identifier above 29 bits in extended mode
    InvalidExtendedId(u32),
    /// More than [MAX_PAYLOAD_BYTES] data bytes
    DataTooLong(usize),
    /// Data length code above [MAX_PAYLOAD_BYTES]
    InvalidDlc(u8),
}

/// Splits a combined 29 bit identifier into its 11 bit standard part and
/// 18 bit extended part, as laid out in the identifier registers
pub fn split_extended_id(combined: u32) -> (u16, u32) {
    (
        ((combined >> 18) & STANDARD_IDENTIFIER_MASK) as u16,
        combined & EXTENDED_IDENTIFIER_MASK,
    )
}

/// Recombines the standard and extended identifier parts, the inverse of
/// [split_extended_id]
pub fn combine_extended_id(standard: u16, extended: u32) -> u32 {
    (((standard as u32) & STANDARD_IDENTIFIER_MASK) << 18) | (extended & EXTENDED_IDENTIFIER_MASK)
}

/// A validated CAN frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    id: Id,
    data: Option<Bytes>,
}

impl Message {
    /// Creates a new message from a raw arbitration identifier.
    ///
    /// The identifier must fit 29 bits for an extended frame and 11 bits
    /// for a standard frame; `data` may be absent or at most eight bytes.
    pub fn new(arbitration_id: u32, extended: bool, data: Option<Bytes>) -> Result<Self, MessageError> {
        let id = if extended {
            Id::Extended(ExtendedId::new(arbitration_id).ok_or(MessageError::InvalidExtendedId(arbitration_id))?)
        } else {
            let raw =
                u16::try_from(arbitration_id).map_err(|_| MessageError::InvalidStandardId(arbitration_id))?;
            Id::Standard(StandardId::new(raw).ok_or(MessageError::InvalidStandardId(arbitration_id))?)
        };

        Self::from_id(id, data)
    }

    /// Creates a new message from an already validated [embedded_can::Id]
    pub fn from_id(id: Id, data: Option<Bytes>) -> Result<Self, MessageError> {
        if let Some(data) = &data {
            if data.len() > MAX_PAYLOAD_BYTES {
                return Err(MessageError::DataTooLong(data.len()));
            }
        }

        Ok(Self { id, data })
    }

    /// Frame identifier
    pub fn id(&self) -> Id {
        self.id
    }

    /// Raw arbitration identifier value
    pub fn arbitration_id(&self) -> u32 {
        match self.id {
            Id::Standard(sid) => sid.as_raw() as u32,
            Id::Extended(eid) => eid.as_raw(),
        }
    }

    /// Returns true for a 29 bit extended frame
    pub fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    /// Payload bytes, `None` for an empty data message
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Number of valid data bytes, the frame DLC
    pub fn dlc(&self) -> u8 {
        self.data.as_ref().map_or(0, |data| data.len() as u8)
    }

    /// Packs the payload into the 64 bit word written to a transmit data
    /// register: data byte 0 in the most significant lane, lanes beyond
    /// the payload length zero.
    pub(crate) fn serialize(&self) -> u64 {
        let mut packed = 0u64;

        for lane in 0..MAX_PAYLOAD_BYTES {
            packed <<= 8;

            if let Some(data) = &self.data {
                if lane < data.len() {
                    packed |= data[lane] as u64;
                }
            }
        }

        packed
    }

    /// Recovers the payload from the 64 bit receive data register word.
    ///
    /// Only the first `dlc` byte lanes are meaningful; the remaining lanes
    /// are discarded. A DLC of zero yields `None`.
    pub(crate) fn deserialize(packed: u64, dlc: u8) -> Result<Option<Bytes>, MessageError> {
        if dlc as usize > MAX_PAYLOAD_BYTES {
            return Err(MessageError::InvalidDlc(dlc));
        }

        if dlc == 0 {
            return Ok(None);
        }

        let mut data = BytesMut::with_capacity(dlc as usize);
        for lane in 0..dlc as usize {
            data.put_u8((packed >> (8 * (MAX_PAYLOAD_BYTES - 1 - lane))) as u8);
        }

        Ok(Some(data.freeze()))
    }
}

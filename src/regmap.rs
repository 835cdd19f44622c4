//!# Register transaction framework
//!
//! Registers are described declaratively: a [RegisterDef] names an ordered
//! set of [Field]s inside a register of 1..=8 bytes. A [Transaction] is a
//! scoped read-modify-write session over one definition bound to a byte
//! address: the raw value is read once when the transaction opens, field
//! reads and writes operate on the cached value, and [Transaction::commit]
//! writes the register back only if a field actually changed.
//!
//! Caching the raw value for the whole session keeps multi-field updates
//! (e.g. SID + EXIDE + EID in one identifier register) from re-reading
//! stale bits between steps, and the deferred commit matches the chip's
//! atomic register write model.

use crate::bus::Transport;
use byteorder::{BigEndian, ByteOrder};
use log::trace;

/// Largest register in bytes (TX/RX data buffers)
pub const MAX_REGISTER_BYTES: usize = 8;

/// Largest number of fields in a single register (interrupt flag registers)
pub const MAX_FIELDS: usize = 8;

/// Field access mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    /// Read-write
    ReadWrite,
    /// Read-only, writes are rejected
    ReadOnly,
    /// Write-only, reads are rejected
    WriteOnly,
    /// Unimplemented bits, neither read nor written
    Unimplemented,
}

impl Access {
    pub const fn is_readable(self) -> bool {
        matches!(self, Access::ReadWrite | Access::ReadOnly)
    }

    pub const fn is_writable(self) -> bool {
        matches!(self, Access::ReadWrite | Access::WriteOnly)
    }
}

/// One bit range inside a register.
///
/// The offset counts from the MSB side, as in the datasheet bit diagrams:
/// bit 7 is the leftmost bit of a one byte register, bit 31 the leftmost
/// bit of a four byte register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Field {
    msb_offset: u32,
    width: u32,
    access: Access,
    default: u64,
}

impl Field {
    /// Declares a field by MSB offset and bit width.
    ///
    /// The assertions run at const evaluation time, so a field that does not
    /// fit its register fails the build, not the first transaction.
    pub const fn new(msb_offset: u32, width: u32, access: Access, default: u64) -> Self {
        assert!(width > 0, "field width must be at least one bit");
        assert!(1 + msb_offset >= width, "field must fit below its MSB offset");

        Self {
            msb_offset,
            width,
            access,
            default,
        }
    }

    pub const fn access(&self) -> Access {
        self.access
    }

    /// Power-on value from the datasheet. The framework never writes it;
    /// it documents the state a freshly reset chip reports for this field.
    pub const fn default_value(&self) -> u64 {
        self.default
    }

    /// Mask of the field value, right aligned
    pub const fn value_mask(&self) -> u64 {
        if self.width >= u64::BITS {
            u64::MAX
        } else {
            (1 << self.width) - 1
        }
    }

    /// Distance between the field LSB and the register LSB
    pub const fn right_shift(&self) -> u32 {
        1 + self.msb_offset - self.width
    }

    /// Mask of the field in register position
    pub const fn register_mask(&self) -> u64 {
        self.value_mask() << self.right_shift()
    }
}

/// Named, ordered field layout of one register kind.
///
/// Definitions are stateless templates: the three transmit buffers share a
/// single definition bound to three different addresses.
pub struct RegisterDef {
    /// Register name, used in error values
    pub name: &'static str,
    /// Register length in bytes, 1..=8
    pub len: usize,
    /// Ordered (name, field) declarations
    pub fields: &'static [(&'static str, Field)],
}

impl RegisterDef {
    /// Checks the definition for configuration errors: register length out
    /// of range, too many fields, a field reaching beyond the register
    /// bytes, or two fields with intersecting register masks. An overlap
    /// would corrupt unrelated bits on write-back, so it is rejected before
    /// any bus access happens.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.len == 0 || self.len > MAX_REGISTER_BYTES {
            return Err(DefinitionError::InvalidLength {
                register: self.name,
                len: self.len,
            });
        }

        if self.fields.len() > MAX_FIELDS {
            return Err(DefinitionError::TooManyFields { register: self.name });
        }

        // An out-of-range field would fold a raw value wider than the
        // register on write-back
        for (name, field) in self.fields {
            if field.right_shift() + field.width > (self.len * 8) as u32 {
                return Err(DefinitionError::FieldOutOfRange {
                    register: self.name,
                    field: *name,
                });
            }
        }

        for (i, (first_name, first)) in self.fields.iter().enumerate() {
            for (second_name, second) in &self.fields[i + 1..] {
                if first.register_mask() & second.register_mask() != 0 {
                    return Err(DefinitionError::OverlappingFields {
                        register: self.name,
                        first: first_name,
                        second: second_name,
                    });
                }
            }
        }

        Ok(())
    }

    fn field(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, (field_name, _))| *field_name == name)
            .map(|(index, (_, field))| (index, field))
    }
}

/// Fatal configuration errors in a register definition
#[derive(Debug, PartialEq, Eq)]
pub enum DefinitionError {
    /// Register length is zero or above [MAX_REGISTER_BYTES]
    InvalidLength { register: &'static str, len: usize },
    /// More fields than [MAX_FIELDS]
    TooManyFields { register: &'static str },
    /// Field extends beyond the register length
    FieldOutOfRange {
        register: &'static str,
        field: &'static str,
    },
    /// Two fields with intersecting register masks
    OverlappingFields {
        register: &'static str,
        first: &'static str,
        second: &'static str,
    },
}

/// Errors of a register transaction
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// Transport failure
    Bus(E),
    /// Invalid register definition
    Definition(DefinitionError),
    /// Field name not declared in the register definition
    UnknownField {
        register: &'static str,
        field: &'static str,
    },
    /// Read of a write-only or unimplemented field
    ReadProtected {
        register: &'static str,
        field: &'static str,
    },
    /// Write of a read-only or unimplemented field
    WriteProtected {
        register: &'static str,
        field: &'static str,
    },
    /// Value does not fit the field width
    ValueTooWide {
        register: &'static str,
        field: &'static str,
        value: u64,
    },
}

impl<E> From<DefinitionError> for Error<E> {
    fn from(error: DefinitionError) -> Self {
        Error::Definition(error)
    }
}

/// Scoped read-modify-write session on one register instance.
///
/// Borrowing the transport mutably for the lifetime of the transaction
/// means at most one transaction can be open against the bus at a time,
/// there is no reentrant nesting.
pub struct Transaction<'a, B: Transport> {
    bus: &'a mut B,
    def: &'static RegisterDef,
    address: u8,
    raw: u64,
    values: [u64; MAX_FIELDS],
    modified: [bool; MAX_FIELDS],
    dirty: bool,
}

impl<'a, B: Transport> Transaction<'a, B> {
    /// Validates the definition, reads the current register contents and
    /// extracts every declared field.
    pub fn open(bus: &'a mut B, def: &'static RegisterDef, address: u8) -> Result<Self, Error<B::Error>> {
        def.validate()?;

        let mut buffer = [0u8; MAX_REGISTER_BYTES];
        bus.read_bytes(address, &mut buffer[..def.len]).map_err(Error::Bus)?;
        let raw = BigEndian::read_uint(&buffer[..def.len], def.len);

        trace!("{} @ 0x{:02X} opened with 0x{:X}", def.name, address, raw);

        let mut values = [0u64; MAX_FIELDS];
        for (index, (_, field)) in def.fields.iter().enumerate() {
            values[index] = (raw & field.register_mask()) >> field.right_shift();
        }

        Ok(Self {
            bus,
            def,
            address,
            raw,
            values,
            modified: [false; MAX_FIELDS],
            dirty: false,
        })
    }

    /// Returns the locally cached value of a readable field
    pub fn get(&self, field: &'static str) -> Result<u64, Error<B::Error>> {
        let (index, declared) = self.def.field(field).ok_or(Error::UnknownField {
            register: self.def.name,
            field,
        })?;

        if !declared.access().is_readable() {
            return Err(Error::ReadProtected {
                register: self.def.name,
                field,
            });
        }

        Ok(self.values[index])
    }

    /// Updates the locally cached value of a writable field.
    ///
    /// The field and the transaction are marked dirty only if the value
    /// actually changed, so redundant writes cause no bus traffic.
    pub fn set(&mut self, field: &'static str, value: u64) -> Result<(), Error<B::Error>> {
        let (index, declared) = self.def.field(field).ok_or(Error::UnknownField {
            register: self.def.name,
            field,
        })?;

        if !declared.access().is_writable() {
            return Err(Error::WriteProtected {
                register: self.def.name,
                field,
            });
        }

        if value & !declared.value_mask() != 0 {
            return Err(Error::ValueTooWide {
                register: self.def.name,
                field,
                value,
            });
        }

        if self.values[index] != value {
            self.values[index] = value;
            self.modified[index] = true;
            self.dirty = true;
        }

        Ok(())
    }

    /// Sets every writable field to zero, e.g. for clearing an interrupt
    /// flag register in one step
    pub fn zero(&mut self) {
        for (index, (_, field)) in self.def.fields.iter().enumerate() {
            if field.access().is_writable() && self.values[index] != 0 {
                self.values[index] = 0;
                self.modified[index] = true;
                self.dirty = true;
            }
        }
    }

    /// Raw register value as read at open time
    pub fn raw(&self) -> u64 {
        self.raw
    }

    /// Closes the transaction. If any field changed, the modified fields are
    /// folded into the raw value and the register is written back in one
    /// big-endian bus write; otherwise nothing is written.
    pub fn commit(mut self) -> Result<(), Error<B::Error>> {
        if !self.dirty {
            return Ok(());
        }

        for (index, (_, field)) in self.def.fields.iter().enumerate() {
            if self.modified[index] {
                self.raw &= !field.register_mask();
                self.raw |= self.values[index] << field.right_shift();
            }
        }

        let mut buffer = [0u8; MAX_REGISTER_BYTES];
        BigEndian::write_uint(&mut buffer[..self.def.len], self.raw, self.def.len);

        trace!("{} @ 0x{:02X} committing 0x{:X}", self.def.name, self.address, self.raw);

        self.bus
            .write_bytes(self.address, &buffer[..self.def.len])
            .map_err(Error::Bus)
    }
}

//!# MCP25625 register map
//!
//! Every register of the chip expressed as a [RegisterDef]: field layout,
//! byte length and datasheet address. The layouts are a compatibility
//! contract with the silicon, not a design choice; see the register
//! descriptions in the MCP25625 datasheet.
//!
//! Multiple instances share one definition, e.g. the three transmit buffer
//! control registers all use [TXB_CTRL] at 0x30/0x40/0x50.

use crate::bus::Transport;
use crate::regmap::{Access, Error, Field, RegisterDef, Transaction};

const RW: Access = Access::ReadWrite;
const R: Access = Access::ReadOnly;

//
// Field value encodings
//

/// CNF1.SJW: synchronization jump width as a multiple of TQ
pub const SJW_LENGTH_4TQ: u64 = 0b11;
pub const SJW_LENGTH_3TQ: u64 = 0b10;
pub const SJW_LENGTH_2TQ: u64 = 0b01;
pub const SJW_LENGTH_1TQ: u64 = 0b00;

/// CNF2.BTLMODE: PS2 length set by CNF3.PHSEG2
pub const BTLMODE_CNF3_PHSEG2: u64 = 0b1;
/// CNF2.BTLMODE: PS2 length is max(PS1, IPT)
pub const BTLMODE_MAX_PS1_IPT: u64 = 0b0;

/// CNF2.SAM: bus line sampled three times at the sample point
pub const SAM_THREE_POINT_SAMPLE: u64 = 0b1;
/// CNF2.SAM: bus line sampled once at the sample point
pub const SAM_ONE_POINT_SAMPLE: u64 = 0b0;

/// TXBnCTRL.TXREQ: buffer has an outstanding transmit request
pub const TXREQ_BUFFER_PENDING: u64 = 0b1;
/// TXBnCTRL.TXREQ: buffer idle, clearing the bit aborts a pending request
pub const TXREQ_NOT_PENDING: u64 = 0b0;

/// TXBnCTRL.TXP: highest message priority
pub const TXP_HIGHEST_PRIORITY: u64 = 0b11;
pub const TXP_LOWEST_PRIORITY: u64 = 0b00;

/// TXBnDLC.RTR / RXBnDLC.RTR: remote transmission request frame
pub const RTR_REMOTE_REQUEST: u64 = 0b1;
/// TXBnDLC.RTR / RXBnDLC.RTR: data frame
pub const RTR_DATA_FRAME: u64 = 0b0;

/// TXBnID.EXIDE / RXFnID.EXIDE: extended identifier enabled
pub const EXIDE_ENABLED: u64 = 0b1;
pub const EXIDE_DISABLED: u64 = 0b0;

/// RXBnID.IDE: received frame carried an extended identifier
pub const IDE_EXTENDED_FRAME: u64 = 0b1;
/// RXBnID.IDE: received frame carried a standard identifier
pub const IDE_STANDARD_FRAME: u64 = 0b0;

/// RXBnCTRL.RXM: masks/filters off, receives anything (development only)
pub const RXM_MASK_FILTERS_OFF: u64 = 0b11;
/// RXBnCTRL.RXM: only valid extended frames matching the filters
pub const RXM_EXTENDED_FRAMES_ONLY: u64 = 0b10;
/// RXBnCTRL.RXM: only valid standard frames matching the filters
pub const RXM_STANDARD_FRAMES_ONLY: u64 = 0b01;
/// RXBnCTRL.RXM: all valid frames matching the filters
pub const RXM_FILTERED_FRAMES: u64 = 0b00;

//
// Register structures
//

/// CAN control register: operation mode request, transmit abort, one-shot
/// mode and CLKOUT pin control
pub static CANCTRL: RegisterDef = RegisterDef {
    name: "CANCTRL",
    len: 1,
    fields: &[
        ("REQOP", Field::new(7, 3, RW, 0b100)),
        ("ABAT", Field::new(4, 1, RW, 0b0)),
        ("OSM", Field::new(3, 1, RW, 0b0)),
        ("CLKEN", Field::new(2, 1, RW, 0b1)),
        ("CLKPRE", Field::new(1, 2, RW, 0b11)),
    ],
};

/// CAN status register: effective operation mode and interrupt flag code
pub static CANSTAT: RegisterDef = RegisterDef {
    name: "CANSTAT",
    len: 1,
    fields: &[
        ("OPMOD", Field::new(7, 3, R, 0b100)),
        // bit 4 not implemented
        ("ICOD", Field::new(3, 3, R, 0b000)),
        // bit 0 not implemented
    ],
};

/// Bit timing 1: synchronization jump width and baud rate prescaler.
/// TQ = 2 x (BRP + 1) / F_OSC
pub static CNF1: RegisterDef = RegisterDef {
    name: "CNF1",
    len: 1,
    fields: &[
        ("SJW", Field::new(7, 2, RW, SJW_LENGTH_1TQ)),
        ("BRP", Field::new(5, 6, RW, 0b000000)),
    ],
};

/// Bit timing 2: PS2 source, sample count, PS1 and propagation segment.
/// Segment lengths are (value + 1) x TQ
pub static CNF2: RegisterDef = RegisterDef {
    name: "CNF2",
    len: 1,
    fields: &[
        ("BTLMODE", Field::new(7, 1, RW, BTLMODE_MAX_PS1_IPT)),
        ("SAM", Field::new(6, 1, RW, SAM_ONE_POINT_SAMPLE)),
        ("PHSEG1", Field::new(5, 3, RW, 0b000)),
        ("PRSEG", Field::new(2, 3, RW, 0b000)),
    ],
};

/// Bit timing 3: start-of-frame pin function, wake-up filter and PS2.
/// The minimum valid PS2 setting is 2 x TQ
pub static CNF3: RegisterDef = RegisterDef {
    name: "CNF3",
    len: 1,
    fields: &[
        ("SOF", Field::new(7, 1, RW, 0b0)),
        ("WAKFIL", Field::new(6, 1, RW, 0b0)),
        // bits 5..3 not implemented
        ("PHSEG2", Field::new(2, 3, RW, 0b000)),
    ],
};

/// Transmit error counter
pub static TEC: RegisterDef = RegisterDef {
    name: "TEC",
    len: 1,
    fields: &[("TEC", Field::new(7, 8, R, 0))],
};

/// Receive error counter
pub static REC: RegisterDef = RegisterDef {
    name: "REC",
    len: 1,
    fields: &[("REC", Field::new(7, 8, R, 0))],
};

/// Error flag register: overflow, bus-off, error-passive and warning flags
pub static EFLG: RegisterDef = RegisterDef {
    name: "EFLG",
    len: 1,
    fields: &[
        ("RX1OVR", Field::new(7, 1, R, 0)),
        ("RX0OVR", Field::new(6, 1, R, 0)),
        ("TXBO", Field::new(5, 1, R, 0)),
        ("TXEP", Field::new(4, 1, R, 0)),
        ("RXEP", Field::new(3, 1, R, 0)),
        ("TXWAR", Field::new(2, 1, R, 0)),
        ("RXWAR", Field::new(1, 1, R, 0)),
        ("EWARN", Field::new(0, 1, R, 0)),
    ],
};

/// Interrupt enable register
pub static CANINTE: RegisterDef = RegisterDef {
    name: "CANINTE",
    len: 1,
    fields: &[
        ("MERRE", Field::new(7, 1, RW, 0)),
        ("WAKIE", Field::new(6, 1, RW, 0)),
        ("ERRIE", Field::new(5, 1, RW, 0)),
        ("TX2IE", Field::new(4, 1, RW, 0)),
        ("TX1IE", Field::new(3, 1, RW, 0)),
        ("TX0IE", Field::new(2, 1, RW, 0)),
        ("RX1IE", Field::new(1, 1, RW, 0)),
        ("RX0IE", Field::new(0, 1, RW, 0)),
    ],
};

/// Interrupt flag register, flags must be cleared by the MCU
pub static CANINTF: RegisterDef = RegisterDef {
    name: "CANINTF",
    len: 1,
    fields: &[
        ("MERRF", Field::new(7, 1, RW, 0)),
        ("WAKIF", Field::new(6, 1, RW, 0)),
        ("ERRIF", Field::new(5, 1, RW, 0)),
        ("TX2IF", Field::new(4, 1, RW, 0)),
        ("TX1IF", Field::new(3, 1, RW, 0)),
        ("TX0IF", Field::new(2, 1, RW, 0)),
        ("RX1IF", Field::new(1, 1, RW, 0)),
        ("RX0IF", Field::new(0, 1, RW, 0)),
    ],
};

/// TXnRTS pin control and status register
pub static TXRTSCTRL: RegisterDef = RegisterDef {
    name: "TXRTSCTRL",
    len: 1,
    fields: &[
        // bits 7..6 not implemented
        ("B2RTS", Field::new(5, 1, R, 0)),
        ("B1RTS", Field::new(4, 1, R, 0)),
        ("B0RTS", Field::new(3, 1, R, 0)),
        ("B2RTSM", Field::new(2, 1, RW, 0)),
        ("B1RTSM", Field::new(1, 1, RW, 0)),
        ("B0RTSM", Field::new(0, 1, RW, 0)),
    ],
};

/// RXnBF pin control and status register
pub static BFPCTRL: RegisterDef = RegisterDef {
    name: "BFPCTRL",
    len: 1,
    fields: &[
        // bits 7..6 not implemented
        ("B1BFS", Field::new(5, 1, RW, 0)),
        ("B0BFS", Field::new(4, 1, RW, 0)),
        ("B1BFE", Field::new(3, 1, RW, 0)),
        ("B0BFE", Field::new(2, 1, RW, 0)),
        ("B1BFM", Field::new(1, 1, RW, 0)),
        ("B0BFM", Field::new(0, 1, RW, 0)),
    ],
};

/// Transmit buffer control register: abort/arbitration/error status,
/// transmit request flag and buffer priority
pub static TXB_CTRL: RegisterDef = RegisterDef {
    name: "TXBnCTRL",
    len: 1,
    fields: &[
        // bit 7 not implemented
        ("ABTF", Field::new(6, 1, R, 0)),
        ("MLOA", Field::new(5, 1, R, 0)),
        ("TXERR", Field::new(4, 1, R, 0)),
        ("TXREQ", Field::new(3, 1, RW, TXREQ_NOT_PENDING)),
        // bit 2 not implemented
        ("TXP", Field::new(1, 2, RW, TXP_LOWEST_PRIORITY)),
    ],
};

/// Transmit identifier registers, four bytes:
/// SIDH = SID<10:3>, SIDL = SID<2:0> / EXIDE / EID<17:16>,
/// EID8 = EID<15:8>, EID0 = EID<7:0>
pub static TXB_ID: RegisterDef = RegisterDef {
    name: "TXBnID",
    len: 4,
    fields: &[
        ("SID", Field::new(31, 11, RW, 0)),
        // bit 20 not implemented
        ("EXIDE", Field::new(19, 1, RW, EXIDE_DISABLED)),
        // bit 18 not implemented
        ("EID", Field::new(17, 18, RW, 0)),
    ],
};

/// Transmit data length code register
pub static TXB_DLC: RegisterDef = RegisterDef {
    name: "TXBnDLC",
    len: 1,
    fields: &[
        // bit 7 not implemented
        ("RTR", Field::new(6, 1, RW, RTR_DATA_FRAME)),
        // bits 5..4 not implemented
        ("DLC", Field::new(3, 4, RW, 0b0000)),
    ],
};

/// Transmit data buffer, eight byte lanes in one register
pub static TXB_DATA: RegisterDef = RegisterDef {
    name: "TXBnDATA",
    len: 8,
    fields: &[("DATA", Field::new(63, 64, RW, 0))],
};

/// Receive buffer 0 control register
pub static RXB0_CTRL: RegisterDef = RegisterDef {
    name: "RXB0CTRL",
    len: 1,
    fields: &[
        // bit 7 not implemented
        ("RXM", Field::new(6, 2, RW, RXM_FILTERED_FRAMES)),
        // bit 4 not implemented
        ("RXRTR", Field::new(3, 1, R, 0)),
        ("BUKT", Field::new(2, 1, RW, 0)),
        ("BUKT1", Field::new(1, 1, R, 0)),
        ("FILHIT0", Field::new(0, 1, R, 0)),
    ],
};

/// Receive buffer 1 control register
pub static RXB1_CTRL: RegisterDef = RegisterDef {
    name: "RXB1CTRL",
    len: 1,
    fields: &[
        // bit 7 not implemented
        ("RXM", Field::new(6, 2, RW, RXM_FILTERED_FRAMES)),
        // bit 4 not implemented
        ("RXRTR", Field::new(3, 1, R, 0)),
        ("FILHIT", Field::new(2, 3, R, 0)),
    ],
};

/// Receive identifier registers, four bytes:
/// SIDH = SID<10:3>, SIDL = SID<2:0> / SRR / IDE / EID<17:16>,
/// EID8 = EID<15:8>, EID0 = EID<7:0>
pub static RXB_ID: RegisterDef = RegisterDef {
    name: "RXBnID",
    len: 4,
    fields: &[
        ("SID", Field::new(31, 11, R, 0)),
        ("SRR", Field::new(20, 1, R, 0)),
        ("IDE", Field::new(19, 1, R, IDE_STANDARD_FRAME)),
        // bit 18 not implemented
        ("EID", Field::new(17, 18, R, 0)),
    ],
};

/// Receive data length code register. RB1/RB0 are reserved bits the chip
/// reports but the driver never interprets
pub static RXB_DLC: RegisterDef = RegisterDef {
    name: "RXBnDLC",
    len: 1,
    fields: &[
        // bit 7 not implemented
        ("RTR", Field::new(6, 1, R, RTR_DATA_FRAME)),
        ("RB1", Field::new(5, 1, R, 0)),
        ("RB0", Field::new(4, 1, R, 0)),
        ("DLC", Field::new(3, 4, R, 0b0000)),
    ],
};

/// Receive data buffer, eight byte lanes in one register
pub static RXB_DATA: RegisterDef = RegisterDef {
    name: "RXBnDATA",
    len: 8,
    fields: &[("DATA", Field::new(63, 64, R, 0))],
};

/// Acceptance filter identifier registers, same four byte layout as the
/// transmit identifier. Only writable in Configuration mode
pub static RXF_ID: RegisterDef = RegisterDef {
    name: "RXFnID",
    len: 4,
    fields: &[
        ("SID", Field::new(31, 11, RW, 0)),
        // bit 20 not implemented
        ("EXIDE", Field::new(19, 1, RW, EXIDE_DISABLED)),
        // bit 18 not implemented
        ("EID", Field::new(17, 18, RW, 0)),
    ],
};

/// Acceptance mask identifier registers. Only writable in Configuration mode
pub static RXM_ID: RegisterDef = RegisterDef {
    name: "RXMnID",
    len: 4,
    fields: &[
        ("SID", Field::new(31, 11, RW, 0)),
        // bits 20..18 not implemented
        ("EID", Field::new(17, 18, RW, 0)),
    ],
};

/// The full register map bound to one transport.
///
/// Every accessor opens a [Transaction] at the fixed datasheet address of
/// the instance; the mutable borrow guarantees only one transaction is in
/// flight on the bus at a time.
pub struct Registers<B> {
    bus: B,
}

impl<B: Transport> Registers<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Direct access to the transport, e.g. for [Transport::bit_modify]
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Releases the transport
    pub fn free(self) -> B {
        self.bus
    }
}

macro_rules! register_accessors {
    ($($name:ident: $def:ident @ $address:literal,)+) => {
        impl<B: Transport> Registers<B> {
            $(
                pub fn $name(&mut self) -> Result<Transaction<'_, B>, Error<B::Error>> {
                    Transaction::open(&mut self.bus, &$def, $address)
                }
            )+
        }
    };
}

register_accessors! {
    // control and status
    canstat: CANSTAT @ 0x0E,
    canctrl: CANCTRL @ 0x0F,
    cnf1: CNF1 @ 0x2A,
    cnf2: CNF2 @ 0x29,
    cnf3: CNF3 @ 0x28,
    tec: TEC @ 0x1C,
    rec: REC @ 0x1D,
    eflg: EFLG @ 0x2D,
    caninte: CANINTE @ 0x2B,
    canintf: CANINTF @ 0x2C,
    txrtsctrl: TXRTSCTRL @ 0x0D,
    bfpctrl: BFPCTRL @ 0x0C,
    // transmit buffers
    txb0_ctrl: TXB_CTRL @ 0x30,
    txb1_ctrl: TXB_CTRL @ 0x40,
    txb2_ctrl: TXB_CTRL @ 0x50,
    txb0_id: TXB_ID @ 0x31,
    txb1_id: TXB_ID @ 0x41,
    txb2_id: TXB_ID @ 0x51,
    txb0_dlc: TXB_DLC @ 0x35,
    txb1_dlc: TXB_DLC @ 0x45,
    txb2_dlc: TXB_DLC @ 0x55,
    txb0_data: TXB_DATA @ 0x36,
    txb1_data: TXB_DATA @ 0x46,
    txb2_data: TXB_DATA @ 0x56,
    // receive buffers
    rxb0_ctrl: RXB0_CTRL @ 0x60,
    rxb1_ctrl: RXB1_CTRL @ 0x70,
    rxb0_id: RXB_ID @ 0x61,
    rxb1_id: RXB_ID @ 0x71,
    rxb0_dlc: RXB_DLC @ 0x65,
    rxb1_dlc: RXB_DLC @ 0x75,
    rxb0_data: RXB_DATA @ 0x66,
    rxb1_data: RXB_DATA @ 0x76,
    // acceptance filters and masks
    rxf0_id: RXF_ID @ 0x00,
    rxf1_id: RXF_ID @ 0x04,
    rxf2_id: RXF_ID @ 0x08,
    rxf3_id: RXF_ID @ 0x10,
    rxf4_id: RXF_ID @ 0x14,
    rxf5_id: RXF_ID @ 0x18,
    rxm0_id: RXM_ID @ 0x20,
    rxm1_id: RXM_ID @ 0x24,
}

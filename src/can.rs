//!# CAN Controller device
//!
//!```
//!# use bytes::Bytes;
//!# use mcp25625::can::MCP25625;
//!# use mcp25625::example::*;
//!# use mcp25625::message::Message;
//!#
//! let sys_clk = ExampleClock::default();
//! let bus = ExampleTransport::default();
//!
//! // Initialize controller object
//! let mut can_controller: MCP25625<_, ExampleClock> = MCP25625::new(bus);
//!
//! // Reset the chip and program bit timing and receive buffers
//! can_controller.initialize().unwrap();
//! can_controller.set_loopback_mode().unwrap();
//!
//! // Loop a frame back through the controller
//! let message = Message::new(0x78, false, Some(Bytes::copy_from_slice(&[0x12, 0x34]))).unwrap();
//! can_controller.send(&message, &sys_clk, None).unwrap();
//!
//! assert!(can_controller.peek().unwrap());
//! let received = can_controller.recv(&sys_clk, None).unwrap();
//! assert_eq!(received.data(), Some(&[0x12, 0x34][..]));
//! ```
//!
//! The driver is a blocking busy-poll design without internal threads or
//! interrupt handling. It holds no lock of its own: callers sharing one
//! controller between threads must serialize every call externally.

use crate::bus::Transport;
use crate::message::{combine_extended_id, split_extended_id, Message, MessageError};
use crate::regmap::{Error, Transaction};
use crate::registers::{
    Registers, BTLMODE_CNF3_PHSEG2, EXIDE_DISABLED, EXIDE_ENABLED, IDE_EXTENDED_FRAME, IDE_STANDARD_FRAME,
    RTR_DATA_FRAME, RXM_EXTENDED_FRAMES_ONLY, RXM_MASK_FILTERS_OFF, SAM_ONE_POINT_SAMPLE, SJW_LENGTH_3TQ,
    TXP_HIGHEST_PRIORITY, TXREQ_BUFFER_PENDING, TXREQ_NOT_PENDING,
};
use core::marker::PhantomData;
use embedded_can::{ExtendedId, Id, StandardId};
use embedded_time::duration::Milliseconds;
use embedded_time::{Clock, Instant};
use log::debug;

/// Transmissions use buffer 0 exclusively, so frames leave the bus in the
/// order they were sent
const TX_BUFFER_INDEX: u8 = 0;

/// Receptions use buffer 0 exclusively
const RX_BUFFER_INDEX: u8 = 0;

/// Poll interval while waiting for a transmit request to clear
const TX_POLL_INTERVAL: Milliseconds = Milliseconds(100u32);

/// Poll interval while waiting for a frame to arrive
const RX_POLL_INTERVAL: Milliseconds = Milliseconds(100u32);

// 500 kbit/s timing at a 16 MHz oscillator, matching the HuskySat-1 bus.
// TQ = 2 x (BRP + 1) / F_OSC, segment lengths are (value + 1) x TQ.
const BIT_TIMING_SJW: u64 = SJW_LENGTH_3TQ;
const BIT_TIMING_BRP: u64 = 0b000111;
const BIT_TIMING_PHSEG1: u64 = 0b111;
const BIT_TIMING_PRSEG: u64 = 0b111;
const BIT_TIMING_PHSEG2: u64 = 0b010;

/// Requestable operation modes, the REQOP/OPMOD encodings of CANCTRL and
/// CANSTAT
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperationMode {
    /// Normal operation, frames are sent and acknowledged on the bus
    Normal = 0b000,
    /// Low-power sleep mode, wake on bus activity
    Sleep = 0b001,
    /// Frames are routed internally from transmit to receive buffers
    Loopback = 0b010,
    /// Receive-only, no acknowledgements are generated
    ListenOnly = 0b011,
    /// Configuration mode, required for bit timing and filter setup
    Configuration = 0b100,
}

impl OperationMode {
    pub const fn bits(self) -> u64 {
        self as u64
    }
}

/// Possible CAN errors during configuration, transmission and reception
#[derive(Debug, PartialEq)]
pub enum CanError<E> {
    /// Register transaction or transport failure
    Register(Error<E>),
    /// The chip did not arbitrate into the requested operation mode
    ModeMismatch { requested: OperationMode, actual: u64 },
    /// The transmit buffer already has an outstanding request
    TransmitPending(u8),
    /// The transmit request did not complete within the timeout and
    /// has been aborted
    TransmitTimeout(u8),
    /// No frame arrived within the timeout
    ReceiveTimeout(u8),
    /// The received identifier registers carry an inconsistent frame format
    UnknownFrameFormat,
    /// Invalid received frame contents
    Message(MessageError),
    /// Internal clock error
    ClockError,
}

impl<E> From<Error<E>> for CanError<E> {
    fn from(error: Error<E>) -> Self {
        CanError::Register(error)
    }
}

impl<E> From<MessageError> for CanError<E> {
    fn from(error: MessageError) -> Self {
        CanError::Message(error)
    }
}

impl<E> From<embedded_time::clock::Error> for CanError<E> {
    fn from(_error: embedded_time::clock::Error) -> Self {
        CanError::ClockError
    }
}

/// Main MCP25625 CAN controller device
pub struct MCP25625<B: Transport, CLK: Clock> {
    /// Register map bound to the transport
    regs: Registers<B>,

    /// Acceptance filter RXF0, programmed during [MCP25625::initialize]
    filter0: Option<ExtendedId>,

    /// Acceptance filter RXF1, programmed during [MCP25625::initialize]
    filter1: Option<ExtendedId>,

    /// System clock
    clock: PhantomData<CLK>,
}

impl<B, CLK> MCP25625<B, CLK>
where
    B: Transport,
    CLK: Clock,
{
    pub fn new(bus: B) -> Self {
        Self {
            regs: Registers::new(bus),
            filter0: None,
            filter1: None,
            clock: Default::default(),
        }
    }

    /// Direct access to the register map, e.g. for reading the error
    /// counters TEC/REC or the EFLG error flags
    pub fn registers(&mut self) -> &mut Registers<B> {
        &mut self.regs
    }

    /// Releases the transport
    pub fn free(self) -> B {
        self.regs.free()
    }

    /// Accepts only frames with this exact extended identifier on filter
    /// slot 0. Takes effect at the next [MCP25625::initialize]
    pub fn set_filter_0(&mut self, filter: ExtendedId) {
        self.filter0 = Some(filter);
    }

    /// Accepts only frames with this exact extended identifier on filter
    /// slot 1. Takes effect at the next [MCP25625::initialize]
    pub fn set_filter_1(&mut self, filter: ExtendedId) {
        self.filter1 = Some(filter);
    }

    /// Resets the chip and programs bit timing, transmit pin control and the
    /// receive buffers. The controller is left parked in Configuration mode;
    /// call one of the mode setters to go on-bus.
    pub fn initialize(&mut self) -> Result<(), CanError<B::Error>> {
        self.regs
            .bus_mut()
            .reset()
            .map_err(|error| CanError::Register(Error::Bus(error)))?;

        // The chip powers up in Configuration mode, anything else means the
        // reset did not take
        let mut canctrl = self.regs.canctrl()?;
        let mode = canctrl.get("REQOP")?;
        if mode != OperationMode::Configuration.bits() {
            debug!("reset did not enter configuration mode, REQOP = {:#05b}", mode);
            return Err(CanError::ModeMismatch {
                requested: OperationMode::Configuration,
                actual: mode,
            });
        }
        canctrl.set("CLKPRE", 0b00)?;
        canctrl.commit()?;

        let mut cnf1 = self.regs.cnf1()?;
        cnf1.set("SJW", BIT_TIMING_SJW)?;
        cnf1.set("BRP", BIT_TIMING_BRP)?;
        cnf1.commit()?;

        let mut cnf2 = self.regs.cnf2()?;
        cnf2.set("BTLMODE", BTLMODE_CNF3_PHSEG2)?;
        cnf2.set("SAM", SAM_ONE_POINT_SAMPLE)?;
        cnf2.set("PHSEG1", BIT_TIMING_PHSEG1)?;
        cnf2.set("PRSEG", BIT_TIMING_PRSEG)?;
        cnf2.commit()?;

        let mut cnf3 = self.regs.cnf3()?;
        cnf3.set("SOF", 0)?;
        cnf3.set("WAKFIL", 0)?;
        cnf3.set("PHSEG2", BIT_TIMING_PHSEG2)?;
        cnf3.commit()?;

        let mut txrtsctrl = self.regs.txrtsctrl()?;
        txrtsctrl.zero();
        txrtsctrl.commit()?;

        self.configure_receive()
    }

    /// Requests the given operation mode and confirms it against the
    /// effective mode the chip reports
    pub fn set_mode(&mut self, mode: OperationMode) -> Result<(), CanError<B::Error>> {
        let mut canctrl = self.regs.canctrl()?;
        canctrl.set("REQOP", mode.bits())?;
        canctrl.commit()?;

        // OPMOD reflects the mode actually entered; the chip may refuse to
        // leave e.g. while a transmission is in flight
        let actual = self.regs.canstat()?.get("OPMOD")?;
        if actual != mode.bits() {
            debug!("mode change to {:?} not confirmed, OPMOD = {:#05b}", mode, actual);
            return Err(CanError::ModeMismatch { requested: mode, actual });
        }

        debug!("operation mode {:?} confirmed", mode);
        Ok(())
    }

    pub fn set_normal_mode(&mut self) -> Result<(), CanError<B::Error>> {
        self.set_mode(OperationMode::Normal)
    }

    pub fn set_loopback_mode(&mut self) -> Result<(), CanError<B::Error>> {
        self.set_mode(OperationMode::Loopback)
    }

    pub fn set_listen_only_mode(&mut self) -> Result<(), CanError<B::Error>> {
        self.set_mode(OperationMode::ListenOnly)
    }

    pub fn set_sleep_mode(&mut self) -> Result<(), CanError<B::Error>> {
        self.set_mode(OperationMode::Sleep)
    }

    /// Transmits a message on buffer 0 and waits for the request to
    /// complete.
    ///
    /// Using a single buffer keeps frames on the bus in call order. The
    /// request flag is polled every 100 ms until the deadline; `None` waits
    /// indefinitely. On timeout the request is aborted, unless it completed
    /// in the race window between the last poll and the abort.
    pub fn send(
        &mut self,
        message: &Message,
        clock: &CLK,
        timeout: Option<Milliseconds>,
    ) -> Result<(), CanError<B::Error>> {
        self.begin_send(message)?;

        let deadline = Self::deadline(clock, timeout)?;

        loop {
            if self.regs.txb0_ctrl()?.get("TXREQ")? == TXREQ_NOT_PENDING {
                return Ok(());
            }

            if Self::expired(clock, &deadline)? {
                return self.abort_send();
            }

            Self::sleep(clock, TX_POLL_INTERVAL)?;
        }
    }

    /// Returns true if a received frame is waiting in buffer 0. A true
    /// result guarantees the next [MCP25625::recv] returns without blocking.
    pub fn peek(&mut self) -> Result<bool, CanError<B::Error>> {
        Ok(self.regs.canintf()?.get("RX0IF")? == 1)
    }

    /// Receives the frame waiting in buffer 0, polling every 100 ms until
    /// the deadline; `None` waits indefinitely. A timeout leaves the buffer
    /// and interrupt flags untouched.
    pub fn recv(&mut self, clock: &CLK, timeout: Option<Milliseconds>) -> Result<Message, CanError<B::Error>> {
        let deadline = Self::deadline(clock, timeout)?;

        loop {
            if self.peek()? {
                break;
            }

            if Self::expired(clock, &deadline)? {
                return Err(CanError::ReceiveTimeout(RX_BUFFER_INDEX));
            }

            Self::sleep(clock, RX_POLL_INTERVAL)?;
        }

        let id_reg = self.regs.rxb0_id()?;
        let id = match id_reg.get("IDE")? {
            IDE_EXTENDED_FRAME => {
                let combined = combine_extended_id(id_reg.get("SID")? as u16, id_reg.get("EID")? as u32);
                Id::Extended(ExtendedId::new(combined).ok_or(CanError::UnknownFrameFormat)?)
            }
            IDE_STANDARD_FRAME => {
                Id::Standard(StandardId::new(id_reg.get("SID")? as u16).ok_or(CanError::UnknownFrameFormat)?)
            }
            _ => return Err(CanError::UnknownFrameFormat),
        };

        let dlc = self.regs.rxb0_dlc()?.get("DLC")? as u8;
        let packed = self.regs.rxb0_data()?.get("DATA")?;
        let data = Message::deserialize(packed, dlc)?;

        // Releases the buffer for the next frame
        let mut flags = self.regs.canintf()?;
        flags.zero();
        flags.commit()?;

        Ok(Message::from_id(id, data)?)
    }

    /// Loads the frame into buffer 0 and sets the transmit request flag
    fn begin_send(&mut self, message: &Message) -> Result<(), CanError<B::Error>> {
        if self.regs.txb0_ctrl()?.get("TXREQ")? == TXREQ_BUFFER_PENDING {
            return Err(CanError::TransmitPending(TX_BUFFER_INDEX));
        }

        let mut flags = self.regs.canintf()?;
        flags.set("TX0IF", 0)?;
        flags.commit()?;

        let mut id = self.regs.txb0_id()?;
        match message.id() {
            Id::Standard(sid) => {
                id.set("SID", sid.as_raw() as u64)?;
                id.set("EXIDE", EXIDE_DISABLED)?;
            }
            Id::Extended(eid) => {
                let (standard, extended) = split_extended_id(eid.as_raw());
                id.set("SID", standard as u64)?;
                id.set("EXIDE", EXIDE_ENABLED)?;
                id.set("EID", extended as u64)?;
            }
        }
        id.commit()?;

        let mut dlc = self.regs.txb0_dlc()?;
        dlc.set("RTR", RTR_DATA_FRAME)?;
        dlc.set("DLC", message.dlc() as u64)?;
        dlc.commit()?;

        if message.data().is_some() {
            let mut data = self.regs.txb0_data()?;
            data.set("DATA", message.serialize())?;
            data.commit()?;
        }

        let mut ctrl = self.regs.txb0_ctrl()?;
        ctrl.set("TXP", TXP_HIGHEST_PRIORITY)?;
        ctrl.set("TXREQ", TXREQ_BUFFER_PENDING)?;
        ctrl.commit()?;

        Ok(())
    }

    /// Aborts an expired transmit request. The frame may have gone out
    /// between the last poll and the deadline, in which case this is a
    /// regular completion.
    fn abort_send(&mut self) -> Result<(), CanError<B::Error>> {
        let mut ctrl = self.regs.txb0_ctrl()?;

        if ctrl.get("TXREQ")? == TXREQ_NOT_PENDING {
            return Ok(());
        }

        debug!("aborting expired transmit request on buffer {}", TX_BUFFER_INDEX);
        ctrl.set("TXREQ", TXREQ_NOT_PENDING)?;
        ctrl.commit()?;

        Err(CanError::TransmitTimeout(TX_BUFFER_INDEX))
    }

    /// Zeroes the receive control, mask and filter registers and programs
    /// the configured acceptance filters
    fn configure_receive(&mut self) -> Result<(), CanError<B::Error>> {
        Self::zero_register(self.regs.rxb0_ctrl()?)?;
        Self::zero_register(self.regs.rxb1_ctrl()?)?;

        Self::zero_register(self.regs.rxm0_id()?)?;
        Self::zero_register(self.regs.rxm1_id()?)?;

        Self::zero_register(self.regs.rxf0_id()?)?;
        Self::zero_register(self.regs.rxf1_id()?)?;
        Self::zero_register(self.regs.rxf2_id()?)?;
        Self::zero_register(self.regs.rxf3_id()?)?;
        Self::zero_register(self.regs.rxf4_id()?)?;
        Self::zero_register(self.regs.rxf5_id()?)?;

        if self.filter0.is_some() || self.filter1.is_some() {
            // Exact match on all 29 identifier bits
            let (mask_sid, mask_eid) = split_extended_id(ExtendedId::MAX.as_raw());
            let mut mask = self.regs.rxm0_id()?;
            mask.set("SID", mask_sid as u64)?;
            mask.set("EID", mask_eid as u64)?;
            mask.commit()?;

            if let Some(id) = self.filter0 {
                Self::program_filter(self.regs.rxf0_id()?, id)?;
            }

            if let Some(id) = self.filter1 {
                Self::program_filter(self.regs.rxf1_id()?, id)?;
            }

            let mut rxb0_ctrl = self.regs.rxb0_ctrl()?;
            rxb0_ctrl.set("RXM", RXM_EXTENDED_FRAMES_ONLY)?;
            rxb0_ctrl.commit()?;

            // Buffer 1 stays open so filtered-out traffic remains observable
            let mut rxb1_ctrl = self.regs.rxb1_ctrl()?;
            rxb1_ctrl.set("RXM", RXM_MASK_FILTERS_OFF)?;
            rxb1_ctrl.commit()?;
        }

        let mut flags = self.regs.canintf()?;
        flags.set("RX0IF", 0)?;
        flags.set("RX1IF", 1)?;
        flags.commit()?;

        Ok(())
    }

    /// Programs one acceptance filter register with an exact extended
    /// identifier match
    fn program_filter(mut filter: Transaction<'_, B>, id: ExtendedId) -> Result<(), Error<B::Error>> {
        let (sid, eid) = split_extended_id(id.as_raw());

        filter.set("EXIDE", EXIDE_ENABLED)?;
        filter.set("SID", sid as u64)?;
        filter.set("EID", eid as u64)?;
        filter.commit()
    }

    fn zero_register(mut register: Transaction<'_, B>) -> Result<(), Error<B::Error>> {
        register.zero();
        register.commit()
    }

    /// Absolute deadline for a relative timeout, `None` means unbounded
    fn deadline(clock: &CLK, timeout: Option<Milliseconds>) -> Result<Option<Instant<CLK>>, CanError<B::Error>> {
        match timeout {
            Some(duration) => Ok(Some(
                clock.try_now()?.checked_add(duration).ok_or(CanError::ClockError)?,
            )),
            None => Ok(None),
        }
    }

    fn expired(clock: &CLK, deadline: &Option<Instant<CLK>>) -> Result<bool, CanError<B::Error>> {
        match deadline {
            Some(target) => Ok(clock.try_now()? > *target),
            None => Ok(false),
        }
    }

    /// Busy-waits on the system clock
    fn sleep(clock: &CLK, duration: Milliseconds) -> Result<(), CanError<B::Error>> {
        let target = clock.try_now()?.checked_add(duration).ok_or(CanError::ClockError)?;

        while clock.try_now()? < target {}

        Ok(())
    }
}

use crate::mocks::MockBus;
use crate::regmap::Error;
use crate::registers::*;

#[test]
fn test_register_map_validates() {
    let defs = [
        &CANCTRL, &CANSTAT, &CNF1, &CNF2, &CNF3, &TEC, &REC, &EFLG, &CANINTE, &CANINTF, &TXRTSCTRL, &BFPCTRL,
        &TXB_CTRL, &TXB_ID, &TXB_DLC, &TXB_DATA, &RXB0_CTRL, &RXB1_CTRL, &RXB_ID, &RXB_DLC, &RXB_DATA, &RXF_ID,
        &RXM_ID,
    ];

    for def in defs {
        assert_eq!(Ok(()), def.validate(), "{}", def.name);
    }
}

#[test]
fn test_power_on_defaults_match_datasheet() {
    let (_, reqop) = CANCTRL.fields.iter().find(|(name, _)| *name == "REQOP").unwrap();
    assert_eq!(0b100, reqop.default_value());

    let (_, clkpre) = CANCTRL.fields.iter().find(|(name, _)| *name == "CLKPRE").unwrap();
    assert_eq!(0b11, clkpre.default_value());
}

#[test]
fn test_canctrl_power_on_state() {
    let mut bus = MockBus::new();
    bus.expect_read_bytes().times(1).returning(|address, buffer| {
        assert_eq!(0x0F, address);
        assert_eq!(1, buffer.len());
        buffer[0] = 0x87;
        Ok(())
    });

    let mut regs = Registers::new(bus);
    let canctrl = regs.canctrl().unwrap();

    assert_eq!(0b100, canctrl.get("REQOP").unwrap());
    assert_eq!(0b0, canctrl.get("ABAT").unwrap());
    assert_eq!(0b1, canctrl.get("CLKEN").unwrap());
    assert_eq!(0b11, canctrl.get("CLKPRE").unwrap());
}

#[test]
fn test_transmit_identifier_layout() {
    let mut bus = MockBus::new();
    bus.expect_read_bytes().times(1).returning(|address, buffer| {
        assert_eq!(0x31, address);
        assert_eq!(4, buffer.len());
        Ok(())
    });
    bus.expect_write_bytes().times(1).returning(|address, data| {
        assert_eq!(0x31, address);
        assert_eq!([0x91, 0x48, 0x01, 0xF0], data);
        Ok(())
    });

    let mut regs = Registers::new(bus);
    let mut id = regs.txb0_id().unwrap();
    id.set("SID", 0x48A).unwrap();
    id.set("EXIDE", EXIDE_ENABLED).unwrap();
    id.set("EID", 0x1F0).unwrap();
    id.commit().unwrap();
}

#[test]
fn test_receive_data_word() {
    let mut bus = MockBus::new();
    bus.expect_read_bytes().times(1).returning(|address, buffer| {
        assert_eq!(0x76, address);
        assert_eq!(8, buffer.len());
        buffer.copy_from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        Ok(())
    });

    let mut regs = Registers::new(bus);
    let data = regs.rxb1_data().unwrap();

    assert_eq!(0x0102_0304_0506_0708, data.get("DATA").unwrap());
}

#[test]
fn test_filter_and_mask_addresses() {
    let mut bus = MockBus::new();
    bus.expect_read_bytes().times(1).returning(|address, buffer| {
        assert_eq!(0x10, address);
        assert_eq!(4, buffer.len());
        Ok(())
    });
    bus.expect_read_bytes().times(1).returning(|address, buffer| {
        assert_eq!(0x24, address);
        assert_eq!(4, buffer.len());
        Ok(())
    });

    let mut regs = Registers::new(bus);
    regs.rxf3_id().unwrap();
    regs.rxm1_id().unwrap();
}

#[test]
fn test_error_counters() {
    let mut bus = MockBus::new();
    bus.expect_read_bytes().times(1).returning(|address, buffer| {
        assert_eq!(0x1C, address);
        buffer[0] = 0x2A;
        Ok(())
    });
    bus.expect_read_bytes().times(1).returning(|address, buffer| {
        assert_eq!(0x1D, address);
        buffer[0] = 0x07;
        Ok(())
    });

    let mut regs = Registers::new(bus);
    assert_eq!(0x2A, regs.tec().unwrap().get("TEC").unwrap());
    assert_eq!(0x07, regs.rec().unwrap().get("REC").unwrap());
}

#[test]
fn test_error_flags_are_read_only() {
    let mut bus = MockBus::new();
    bus.expect_read_bytes().times(1).returning(|address, buffer| {
        assert_eq!(0x2D, address);
        buffer[0] = 0b1010_0000;
        Ok(())
    });

    let mut regs = Registers::new(bus);
    let mut eflg = regs.eflg().unwrap();

    assert_eq!(0b1, eflg.get("RX1OVR").unwrap());
    assert_eq!(0b0, eflg.get("RX0OVR").unwrap());
    assert_eq!(0b1, eflg.get("TXBO").unwrap());
    assert!(matches!(
        eflg.set("TXBO", 0),
        Err(Error::WriteProtected {
            register: "EFLG",
            field: "TXBO",
        })
    ));
}

#[test]
fn test_received_identifier_fields() {
    let mut bus = MockBus::new();
    bus.expect_read_bytes().times(1).returning(|address, buffer| {
        assert_eq!(0x61, address);
        buffer.copy_from_slice(&[0x91, 0x48, 0x01, 0xF0]);
        Ok(())
    });

    let mut regs = Registers::new(bus);
    let id = regs.rxb0_id().unwrap();

    assert_eq!(0x48A, id.get("SID").unwrap());
    assert_eq!(IDE_EXTENDED_FRAME, id.get("IDE").unwrap());
    assert_eq!(0x1F0, id.get("EID").unwrap());
    assert_eq!(0b0, id.get("SRR").unwrap());
}

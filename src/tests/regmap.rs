use crate::example::ExampleTransport;
use crate::mocks::MockBus;
use crate::regmap::{Access, DefinitionError, Error, Field, RegisterDef, Transaction};

static DEMO: RegisterDef = RegisterDef {
    name: "DEMO",
    len: 2,
    fields: &[
        ("HIGH", Field::new(15, 4, Access::ReadWrite, 0)),
        ("LOW", Field::new(3, 4, Access::ReadWrite, 0)),
        ("STATUS", Field::new(11, 2, Access::ReadOnly, 0)),
        ("TRIGGER", Field::new(9, 1, Access::WriteOnly, 0)),
    ],
};

static OVERLAPPING: RegisterDef = RegisterDef {
    name: "OVERLAPPING",
    len: 1,
    fields: &[
        ("A", Field::new(7, 4, Access::ReadWrite, 0)),
        ("B", Field::new(5, 4, Access::ReadWrite, 0)),
    ],
};

static OUT_OF_RANGE: RegisterDef = RegisterDef {
    name: "OUT_OF_RANGE",
    len: 1,
    fields: &[("WIDE", Field::new(15, 4, Access::ReadWrite, 0))],
};

static OVERSIZED: RegisterDef = RegisterDef {
    name: "OVERSIZED",
    len: 9,
    fields: &[("A", Field::new(7, 4, Access::ReadWrite, 0))],
};

#[test]
fn test_field_masks() {
    let exide = Field::new(19, 1, Access::ReadWrite, 0);
    assert_eq!(19, exide.right_shift());
    assert_eq!(0b1, exide.value_mask());
    assert_eq!(1 << 19, exide.register_mask());

    let data = Field::new(63, 64, Access::ReadOnly, 0);
    assert_eq!(0, data.right_shift());
    assert_eq!(u64::MAX, data.value_mask());
    assert_eq!(u64::MAX, data.register_mask());
}

#[test]
fn test_round_trip_through_commit() {
    let mut bus = ExampleTransport::default();

    let mut transaction = Transaction::open(&mut bus, &DEMO, 0x10).unwrap();
    transaction.set("HIGH", 0xA).unwrap();
    transaction.set("LOW", 0x5).unwrap();
    transaction.commit().unwrap();

    let reopened = Transaction::open(&mut bus, &DEMO, 0x10).unwrap();
    assert_eq!(0xA, reopened.get("HIGH").unwrap());
    assert_eq!(0x5, reopened.get("LOW").unwrap());
    assert_eq!(0xA005, reopened.raw());
}

#[test]
fn test_overlap_rejected() {
    assert_eq!(
        Err(DefinitionError::OverlappingFields {
            register: "OVERLAPPING",
            first: "A",
            second: "B",
        }),
        OVERLAPPING.validate()
    );

    let mut bus = ExampleTransport::default();
    assert!(Transaction::open(&mut bus, &OVERLAPPING, 0x10).is_err());
}

#[test]
fn test_field_beyond_register_length_rejected() {
    assert_eq!(
        Err(DefinitionError::FieldOutOfRange {
            register: "OUT_OF_RANGE",
            field: "WIDE",
        }),
        OUT_OF_RANGE.validate()
    );

    // Rejected at open, so commit can never fold an oversized raw value
    let mut bus = ExampleTransport::default();
    assert!(Transaction::open(&mut bus, &OUT_OF_RANGE, 0x10).is_err());
}

#[test]
fn test_invalid_length_rejected() {
    assert_eq!(
        Err(DefinitionError::InvalidLength {
            register: "OVERSIZED",
            len: 9,
        }),
        OVERSIZED.validate()
    );
}

#[test]
fn test_access_protection() {
    let mut bus = ExampleTransport::default();
    let mut transaction = Transaction::open(&mut bus, &DEMO, 0x10).unwrap();

    assert_eq!(
        Err(Error::ReadProtected {
            register: "DEMO",
            field: "TRIGGER",
        }),
        transaction.get("TRIGGER")
    );
    assert_eq!(
        Err(Error::WriteProtected {
            register: "DEMO",
            field: "STATUS",
        }),
        transaction.set("STATUS", 0b1)
    );
    assert_eq!(
        Err(Error::UnknownField {
            register: "DEMO",
            field: "BOGUS",
        }),
        transaction.get("BOGUS")
    );
    assert_eq!(
        Err(Error::ValueTooWide {
            register: "DEMO",
            field: "LOW",
            value: 0x10,
        }),
        transaction.set("LOW", 0x10)
    );
}

#[test]
fn test_clean_transaction_writes_nothing() {
    let mut bus = MockBus::new();
    bus.expect_read_bytes().times(1).returning(|address, buffer| {
        assert_eq!(0x10, address);
        buffer[0] = 0xA0;
        buffer[1] = 0x05;
        Ok(())
    });

    let mut transaction = Transaction::open(&mut bus, &DEMO, 0x10).unwrap();
    transaction.set("HIGH", 0xA).unwrap();
    transaction.set("LOW", 0x5).unwrap();
    transaction.commit().unwrap();
}

#[test]
fn test_zero_preserves_read_only_bits() {
    let mut bus = MockBus::new();
    bus.expect_read_bytes().times(1).returning(|address, buffer| {
        assert_eq!(0x10, address);
        buffer[0] = 0xFF;
        buffer[1] = 0xFF;
        Ok(())
    });
    bus.expect_write_bytes().times(1).returning(|address, data| {
        assert_eq!(0x10, address);
        assert_eq!([0x0D, 0xF0], data);
        Ok(())
    });

    let mut transaction = Transaction::open(&mut bus, &DEMO, 0x10).unwrap();
    transaction.zero();
    transaction.commit().unwrap();
}

#[test]
fn test_bus_error_propagation() {
    let mut bus = MockBus::new();
    bus.expect_read_bytes().times(1).returning(|_, _| Err(42));

    let result = Transaction::open(&mut bus, &DEMO, 0x10);
    assert!(matches!(result, Err(Error::Bus(42))));
}

#[test]
fn test_write_error_propagation() {
    let mut bus = MockBus::new();
    bus.expect_read_bytes().times(1).returning(|_, _| Ok(()));
    bus.expect_write_bytes().times(1).returning(|_, _| Err(42));

    let mut transaction = Transaction::open(&mut bus, &DEMO, 0x10).unwrap();
    transaction.set("HIGH", 0xF).unwrap();
    assert_eq!(Err(Error::Bus(42)), transaction.commit());
}

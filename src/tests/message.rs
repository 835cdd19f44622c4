use crate::message::{combine_extended_id, split_extended_id, Message, MessageError};
use alloc::vec::Vec;
use bytes::Bytes;
use embedded_can::Id;

#[test]
fn test_standard_id_validation() {
    let message = Message::new(0x78, false, None).unwrap();
    assert!(!message.is_extended());
    assert_eq!(0x78, message.arbitration_id());

    assert_eq!(
        Err(MessageError::InvalidStandardId(0x800)),
        Message::new(0x800, false, None)
    );
    assert_eq!(
        Err(MessageError::InvalidStandardId(0x10000)),
        Message::new(0x10000, false, None)
    );
}

#[test]
fn test_extended_id_validation() {
    let message = Message::new(0x122801F0, true, None).unwrap();
    assert!(message.is_extended());
    assert_eq!(0x122801F0, message.arbitration_id());

    assert_eq!(
        Err(MessageError::InvalidExtendedId(0x2000_0000)),
        Message::new(0x2000_0000, true, None)
    );
}

#[test]
fn test_payload_length_validation() {
    let payload = Bytes::copy_from_slice(&[0u8; 9]);
    assert_eq!(Err(MessageError::DataTooLong(9)), Message::new(0x78, false, Some(payload)));
}

#[test]
fn test_split_combine_identity() {
    for id in [0x0, 0x1F0, 0x122801F0, 0x1FFF_FFFF] {
        let (standard, extended) = split_extended_id(id);
        assert_eq!(id, combine_extended_id(standard, extended));
    }

    assert_eq!((0x48A, 0x1F0), split_extended_id(0x122801F0));
}

#[test]
fn test_serialize_lane_placement() {
    let payload = Bytes::copy_from_slice(&[0x01, 0xDE, 0xAD, 0xCA, 0xFE]);
    let message = Message::new(0x122801F0, true, Some(payload)).unwrap();

    assert_eq!(0x01DE_ADCA_FE00_0000, message.serialize());
}

#[test]
fn test_serialize_empty() {
    let message = Message::new(0x78, false, None).unwrap();

    assert_eq!(0, message.serialize());
    assert_eq!(0, message.dlc());
}

#[test]
fn test_codec_round_trip() {
    for len in 0..=8usize {
        let payload: Vec<u8> = (0..len as u8).map(|byte| byte.wrapping_mul(31).wrapping_add(7)).collect();
        let data = if len == 0 {
            None
        } else {
            Some(Bytes::copy_from_slice(&payload))
        };

        let message = Message::new(0x122801F0, true, data.clone()).unwrap();
        let recovered = Message::deserialize(message.serialize(), len as u8).unwrap();
        assert_eq!(data, recovered);
    }
}

#[test]
fn test_deserialize_rejects_oversized_dlc() {
    assert_eq!(Err(MessageError::InvalidDlc(9)), Message::deserialize(0, 9));
}

#[test]
fn test_deserialize_discards_stale_lanes() {
    // lanes beyond the DLC carry leftovers from a previous frame
    let recovered = Message::deserialize(0x1234_5678_9ABC_DEF0, 2).unwrap();
    assert_eq!(Some(Bytes::copy_from_slice(&[0x12, 0x34])), recovered);
}

#[test]
fn test_from_id_accessors() {
    let message = Message::new(0x78, false, Some(Bytes::copy_from_slice(&[0x12, 0x34]))).unwrap();

    assert_eq!(Some(&[0x12, 0x34][..]), message.data());
    assert_eq!(2, message.dlc());
    assert!(matches!(message.id(), Id::Standard(_)));
}

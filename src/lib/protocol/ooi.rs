use super::{EepromProtocol, ProtocolError, ProtocolHelper, ProtocolId, Result};
use crate::port::Bus;
use log::debug;

pub const OOI_SLOT_SIZE: usize = 15;

const OPCODE_QUERY_INFO: u8 = 0x05;
const OPCODE_WRITE_INFO: u8 = 0x06;

const HEADER_SIZE: usize = 2;
const PACKET_SIZE: usize = HEADER_SIZE + OOI_SLOT_SIZE;

pub struct OoiEepromProtocol {}

impl OoiEepromProtocol {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for OoiEepromProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolHelper for OoiEepromProtocol {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::Ooi
    }

    fn eeprom(&self) -> Option<&dyn EepromProtocol> {
        Some(self)
    }
}

impl EepromProtocol for OoiEepromProtocol {
    fn read_eeprom_slot(&self, bus: &mut dyn Bus, slot: u32) -> Result<Vec<u8>> {
        let slot = slot_byte(slot)?;
        let mut buffer = [0u8; PACKET_SIZE];

        let len_write = encode_query(&mut buffer, slot);

        debug!("query info slot {}", slot);
        debug!("send {:02x?}", &buffer[0..len_write]);
        bus.write_all(&buffer[0..len_write])?;
        bus.flush()?;

        bus.read_exact(&mut buffer)?;
        debug!("recv {:02x?}", &buffer[..]);

        decode_reply(&buffer, slot)
            .map(|data| data.to_vec())
            .ok_or_else(|| ProtocolError::BadReply.into())
    }

    fn write_eeprom_slot(&self, bus: &mut dyn Bus, slot: u32, data: &[u8]) -> Result<usize> {
        let slot = slot_byte(slot)?;
        let mut buffer = [0u8; PACKET_SIZE];

        let (len_write, written) = encode_write(&mut buffer, slot, data);
        if written < data.len() {
            debug!(
                "slot {} holds {} bytes, dropping {}",
                slot,
                OOI_SLOT_SIZE,
                data.len() - written
            );
        }

        debug!("write info slot {} {:?}", slot, &data[..written]);
        debug!("send {:02x?}", &buffer[0..len_write]);
        bus.write_all(&buffer[0..len_write])?;
        bus.flush()?;

        Ok(written)
    }
}

fn slot_byte(slot: u32) -> Result<u8> {
    u8::try_from(slot).map_err(|_| ProtocolError::InvalidSlot(slot).into())
}

fn encode_query(buffer: &mut [u8], slot: u8) -> usize {
    buffer[0] = OPCODE_QUERY_INFO;
    buffer[1] = slot;
    HEADER_SIZE
}

/// Returns the packet length and the number of payload bytes that fit.
fn encode_write(buffer: &mut [u8], slot: u8, data: &[u8]) -> (usize, usize) {
    assert!(buffer.len() >= PACKET_SIZE);

    let written = data.len().min(OOI_SLOT_SIZE);

    buffer[0] = OPCODE_WRITE_INFO;
    buffer[1] = slot;
    buffer[HEADER_SIZE..HEADER_SIZE + written].copy_from_slice(&data[..written]);
    buffer[HEADER_SIZE + written..PACKET_SIZE].fill(0);

    (PACKET_SIZE, written)
}

fn decode_reply(buffer: &[u8], slot: u8) -> Option<&[u8]> {
    if buffer.len() < PACKET_SIZE || buffer[0..HEADER_SIZE] != [OPCODE_QUERY_INFO, slot] {
        return None;
    }

    Some(&buffer[HEADER_SIZE..PACKET_SIZE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::mock::MockDevice;

    #[test]
    fn encode_query_packet() {
        let mut check = [0u8; PACKET_SIZE];

        assert_eq!(encode_query(&mut check, 3), 2);
        assert_eq!(check[0..2], [0x05, 0x03]);
    }

    #[test]
    fn encode_write_pads_short_data() {
        let mut check = [0xAAu8; PACKET_SIZE];

        assert_eq!(encode_write(&mut check, 1, b"3.14"), (PACKET_SIZE, 4));
        assert_eq!(check[0..6], [0x06, 0x01, b'3', b'.', b'1', b'4']);
        assert!(check[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn encode_write_truncates_long_data() {
        let mut check = [0u8; PACKET_SIZE];
        let data = [b'7'; 20];

        assert_eq!(encode_write(&mut check, 0, &data), (PACKET_SIZE, OOI_SLOT_SIZE));
        assert!(check[2..].iter().all(|&b| b == b'7'));
    }

    #[test]
    fn decode_reply_checks_echo() {
        let mut reply = [0u8; PACKET_SIZE];
        reply[0] = 0x05;
        reply[1] = 0x02;
        reply[2] = b'X';

        assert_eq!(decode_reply(&reply, 2).map(|d| d[0]), Some(b'X'));
        assert_eq!(decode_reply(&reply, 3), None);
        assert_eq!(decode_reply(&reply[..10], 2), None);
    }

    #[test]
    fn read_slot_from_device() {
        let mut dev = MockDevice::new();
        dev.program(4, b"42");

        let data = OoiEepromProtocol::new()
            .read_eeprom_slot(&mut dev, 4)
            .unwrap();

        assert_eq!(data.len(), OOI_SLOT_SIZE);
        assert_eq!(&data[..3], b"42\0");
        assert_eq!(dev.sent(), &[vec![0x05, 0x04]]);
    }

    #[test]
    fn read_rejects_wrong_echo() {
        let mut dev = MockDevice::new();
        dev.corrupt_replies();

        let err = OoiEepromProtocol::new()
            .read_eeprom_slot(&mut dev, 1)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::BadReply)
        ));
    }

    #[test]
    fn slot_out_of_range_does_not_touch_bus() {
        let mut dev = MockDevice::new();
        let proto = OoiEepromProtocol::new();

        assert!(proto.read_eeprom_slot(&mut dev, 256).is_err());
        assert!(proto.write_eeprom_slot(&mut dev, 300, b"1").is_err());
        assert!(dev.sent().is_empty());
    }

    #[test]
    fn write_then_read_back() {
        let mut dev = MockDevice::new();
        let proto = OoiEepromProtocol::new();

        assert_eq!(proto.write_eeprom_slot(&mut dev, 7, b"0.25").unwrap(), 4);

        let data = proto.read_eeprom_slot(&mut dev, 7).unwrap();
        assert_eq!(&data[..5], b"0.25\0");
    }
}

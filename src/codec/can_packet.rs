//-----------------------------------------------------------------------------
// Module can_packet
// Hardware CAN packet, the reference wire format
//
// Layout, 24 bytes, all words little endian, fields allocated most significant field first:
//  header    u16   IDE(1) SRR(1) SID(11) EDL(1) BRS(1) ESI(1)
//  eid       u16   EID(12) TXMSG(1) TXAborted(1) TXLostArb(1) TXError(1)
//  dlc       u16   DLC(4) RB0(1) IVRIF(1) HVEnable(1) ExtendedNetworkIndex(1) RB1(1) RTR(1) EID2(6)
//  data      [u8; 8]
//  stats     u16
//  timestamp u64   TS(60) reserved(3) IsExtended(1)

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use byteorder::{LittleEndian, ReadBytesExt};
use bytes::{BufMut, BytesMut};
use std::io::{Cursor, Read};

use crate::error::{Error, Result};
use crate::message::{CanMessage, CanStatus, CanTxStatus, Message};

use super::{Packet, PacketFormat};

const MAX_STANDARD_ID: u32 = 0x7FF;
const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;
const MAX_TIMESTAMP: u64 = (1 << 60) - 1;
const MAX_DATA_LEN: usize = 8;

// Extract a field of width bits at shift
fn get_field(word: u64, shift: u32, width: u32) -> u64 {
    (word >> shift) & ((1u64 << width) - 1)
}

fn get_bit(word: u64, shift: u32) -> bool {
    get_field(word, shift, 1) != 0
}

// Insert a field, fails if value does not fit into width bits
fn put_field(word: &mut u64, shift: u32, width: u32, value: u64) -> Result<()> {
    if value >> width != 0 {
        return Err(Error::Encode("value exceeds field width"));
    }
    *word |= value << shift;
    Ok(())
}

fn put_bit(word: &mut u64, shift: u32, value: bool) {
    *word |= u64::from(value) << shift;
}

//-----------------------------------------------------------------------------
// HardwareCanPacket

/// Field level image of the hardware CAN packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardwareCanPacket {
    // header
    pub ide: bool,
    pub srr: bool,
    pub sid: u16,
    pub edl: bool,
    pub brs: bool,
    pub esi: bool,
    // eid
    pub eid: u16,
    pub tx_msg: bool,
    pub tx_aborted: bool,
    pub tx_lost_arb: bool,
    pub tx_error: bool,
    // dlc
    pub dlc: u8,
    pub rb0: bool,
    pub ivrif: bool,
    pub hv_enable: bool,
    pub extended_network_index: bool,
    pub rb1: bool,
    pub rtr: bool,
    pub eid2: u8,
    pub data: [u8; 8],
    pub stats: u16,
    // timestamp
    pub timestamp: u64,
    pub timestamp_reserved: u8,
    pub timestamp_flag: bool,
}

impl HardwareCanPacket {
    /// Size of a packet on the wire
    pub const SIZE: usize = 24;

    /// Split a byte frame into its fields
    /// Only the frame length is checked here
    pub fn from_bytes(bytes: &[u8]) -> Option<HardwareCanPacket> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        let mut c = Cursor::new(bytes);
        let header = c.read_u16::<LittleEndian>().ok()? as u64;
        let eid = c.read_u16::<LittleEndian>().ok()? as u64;
        let dlc = c.read_u16::<LittleEndian>().ok()? as u64;
        let mut data = [0u8; 8];
        c.read_exact(&mut data).ok()?;
        let stats = c.read_u16::<LittleEndian>().ok()?;
        let timestamp = c.read_u64::<LittleEndian>().ok()?;

        Some(HardwareCanPacket {
            ide: get_bit(header, 15),
            srr: get_bit(header, 14),
            sid: get_field(header, 3, 11) as u16,
            edl: get_bit(header, 2),
            brs: get_bit(header, 1),
            esi: get_bit(header, 0),
            eid: get_field(eid, 4, 12) as u16,
            tx_msg: get_bit(eid, 3),
            tx_aborted: get_bit(eid, 2),
            tx_lost_arb: get_bit(eid, 1),
            tx_error: get_bit(eid, 0),
            dlc: get_field(dlc, 12, 4) as u8,
            rb0: get_bit(dlc, 11),
            ivrif: get_bit(dlc, 10),
            hv_enable: get_bit(dlc, 9),
            extended_network_index: get_bit(dlc, 8),
            rb1: get_bit(dlc, 7),
            rtr: get_bit(dlc, 6),
            eid2: get_field(dlc, 0, 6) as u8,
            data,
            stats,
            timestamp: get_field(timestamp, 4, 60),
            timestamp_reserved: get_field(timestamp, 1, 3) as u8,
            timestamp_flag: get_bit(timestamp, 0),
        })
    }

    /// Lay out the fields bit exact
    /// Fails if a field value exceeds its width, reserved bits are always written as zero
    pub fn to_bytes(&self) -> Result<[u8; Self::SIZE]> {
        let mut header = 0u64;
        put_bit(&mut header, 15, self.ide);
        put_bit(&mut header, 14, self.srr);
        put_field(&mut header, 3, 11, self.sid as u64)?;
        put_bit(&mut header, 2, self.edl);
        put_bit(&mut header, 1, self.brs);
        put_bit(&mut header, 0, self.esi);

        let mut eid = 0u64;
        put_field(&mut eid, 4, 12, self.eid as u64)?;
        put_bit(&mut eid, 3, self.tx_msg);
        put_bit(&mut eid, 2, self.tx_aborted);
        put_bit(&mut eid, 1, self.tx_lost_arb);
        put_bit(&mut eid, 0, self.tx_error);

        let mut dlc = 0u64;
        put_field(&mut dlc, 12, 4, self.dlc as u64)?;
        put_bit(&mut dlc, 10, self.ivrif);
        put_bit(&mut dlc, 9, self.hv_enable);
        put_bit(&mut dlc, 8, self.extended_network_index);
        put_bit(&mut dlc, 6, self.rtr);
        put_field(&mut dlc, 0, 6, self.eid2 as u64)?;

        let mut timestamp = 0u64;
        put_field(&mut timestamp, 4, 60, self.timestamp)?;
        put_bit(&mut timestamp, 0, self.timestamp_flag);

        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u16_le(header as u16);
        buf.put_u16_le(eid as u16);
        buf.put_u16_le(dlc as u16);
        buf.put_slice(&self.data);
        buf.put_u16_le(self.stats);
        buf.put_u64_le(timestamp);

        let mut bytes = [0u8; Self::SIZE];
        bytes.copy_from_slice(&buf);
        Ok(bytes)
    }

    /// Decode a byte frame into a CAN message
    /// Returns None on a length mismatch, on nonzero reserved bits and on field combinations a CAN message can not represent
    pub fn decode_to_message(packet: &Packet) -> Option<Message> {
        let p = match HardwareCanPacket::from_bytes(&packet.data) {
            Some(p) => p,
            None => {
                debug!("HardwareCanPacket: invalid length {}", packet.data.len());
                return None;
            }
        };
        if p.timestamp_reserved != 0 || p.rb0 || p.rb1 {
            debug!("HardwareCanPacket: reserved bits set");
            return None;
        }
        let len = p.dlc as usize;
        if len > MAX_DATA_LEN {
            debug!("HardwareCanPacket: dlc {} out of range", p.dlc);
            return None;
        }
        if p.data[len..].iter().any(|b| *b != 0) {
            debug!("HardwareCanPacket: nonzero padding");
            return None;
        }
        let arbid = if p.ide {
            ((p.sid as u32) << 18) | ((p.eid as u32) << 6) | p.eid2 as u32
        } else {
            if p.eid != 0 || p.eid2 != 0 {
                debug!("HardwareCanPacket: extended id bits in standard frame");
                return None;
            }
            p.sid as u32
        };

        let mut tx_status = CanTxStatus::empty();
        tx_status.set(CanTxStatus::TX_MSG, p.tx_msg);
        tx_status.set(CanTxStatus::TX_ABORTED, p.tx_aborted);
        tx_status.set(CanTxStatus::TX_LOST_ARB, p.tx_lost_arb);
        tx_status.set(CanTxStatus::TX_ERROR, p.tx_error);
        let mut status = CanStatus::empty();
        status.set(CanStatus::IVRIF, p.ivrif);
        status.set(CanStatus::HV_ENABLE, p.hv_enable);
        status.set(CanStatus::EXTENDED_NETWORK_INDEX, p.extended_network_index);

        Some(Message::Can(CanMessage {
            network: packet.network,
            timestamp: p.timestamp,
            timestamp_flag: p.timestamp_flag,
            arbid,
            is_extended: p.ide,
            srr: p.srr,
            is_remote: p.rtr,
            is_canfd: p.edl,
            baudrate_switch: p.brs,
            error_state_indicator: p.esi,
            tx_status,
            status,
            stats: p.stats,
            data: p.data[..len].to_vec(),
        }))
    }

    /// Encode a CAN message into a byte frame
    pub fn encode_from_message(message: &CanMessage) -> Result<[u8; Self::SIZE]> {
        if message.data.len() > MAX_DATA_LEN {
            return Err(Error::Encode("CAN data exceeds 8 bytes"));
        }
        if message.timestamp > MAX_TIMESTAMP {
            return Err(Error::Encode("timestamp exceeds 60 bits"));
        }
        let (sid, eid, eid2) = if message.is_extended {
            if message.arbid > MAX_EXTENDED_ID {
                return Err(Error::Encode("extended id exceeds 29 bits"));
            }
            ((message.arbid >> 18) as u16, ((message.arbid >> 6) & 0xFFF) as u16, (message.arbid & 0x3F) as u8)
        } else {
            if message.arbid > MAX_STANDARD_ID {
                return Err(Error::Encode("standard id exceeds 11 bits"));
            }
            (message.arbid as u16, 0, 0)
        };

        let mut data = [0u8; 8];
        data[..message.data.len()].copy_from_slice(&message.data);

        HardwareCanPacket {
            ide: message.is_extended,
            srr: message.srr,
            sid,
            edl: message.is_canfd,
            brs: message.baudrate_switch,
            esi: message.error_state_indicator,
            eid,
            tx_msg: message.tx_status.contains(CanTxStatus::TX_MSG),
            tx_aborted: message.tx_status.contains(CanTxStatus::TX_ABORTED),
            tx_lost_arb: message.tx_status.contains(CanTxStatus::TX_LOST_ARB),
            tx_error: message.tx_status.contains(CanTxStatus::TX_ERROR),
            dlc: message.data.len() as u8,
            rb0: false,
            ivrif: message.status.contains(CanStatus::IVRIF),
            hv_enable: message.status.contains(CanStatus::HV_ENABLE),
            extended_network_index: message.status.contains(CanStatus::EXTENDED_NETWORK_INDEX),
            rb1: false,
            rtr: message.is_remote,
            eid2,
            data,
            stats: message.stats,
            timestamp: message.timestamp,
            timestamp_reserved: 0,
            timestamp_flag: message.timestamp_flag,
        }
        .to_bytes()
    }
}

//-----------------------------------------------------------------------------
// CanPacketFormat

/// Packet format of all CAN networks
#[derive(Debug, Default)]
pub struct CanPacketFormat;

impl PacketFormat for CanPacketFormat {
    fn decode(&self, packet: &Packet) -> Option<Message> {
        HardwareCanPacket::decode_to_message(packet)
    }

    fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        match message {
            Message::Can(can) => Ok(HardwareCanPacket::encode_from_message(can)?.to_vec()),
            _ => Err(Error::Encode("not a CAN message")),
        }
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

#[cfg(test)]
mod can_packet_tests {

    use super::*;
    use crate::network::NetId;

    fn packet(data: Vec<u8>) -> Packet {
        Packet { network: NetId::HsCan, data }
    }

    fn sample_messages() -> Vec<CanMessage> {
        let mut fd = CanMessage::new_extended(NetId::HsCan, 0x1ABC_DE12, &[1, 2, 3, 4, 5, 6, 7, 8]);
        fd.is_canfd = true;
        fd.baudrate_switch = true;
        fd.error_state_indicator = true;
        fd.timestamp = MAX_TIMESTAMP;
        fd.timestamp_flag = true;
        fd.stats = 0xBEEF;
        fd.tx_status = CanTxStatus::TX_MSG | CanTxStatus::TX_LOST_ARB;
        fd.status = CanStatus::IVRIF | CanStatus::EXTENDED_NETWORK_INDEX;

        let mut remote = CanMessage::new(NetId::HsCan, 0x7FF, &[]);
        remote.is_remote = true;
        remote.timestamp = 12345;

        vec![CanMessage::new(NetId::HsCan, 0x123, &[0xDE, 0xAD]), CanMessage::new(NetId::HsCan, 0, &[]), fd, remote]
    }

    #[test]
    fn test_message_round_trip() {
        for m in sample_messages() {
            let bytes = HardwareCanPacket::encode_from_message(&m).unwrap();
            let decoded = HardwareCanPacket::decode_to_message(&packet(bytes.to_vec())).unwrap();
            assert_eq!(decoded, Message::Can(m));
        }
    }

    #[test]
    fn test_bytes_round_trip() {
        for m in sample_messages() {
            let bytes = HardwareCanPacket::encode_from_message(&m).unwrap();
            let Some(Message::Can(decoded)) = HardwareCanPacket::decode_to_message(&packet(bytes.to_vec())) else {
                panic!("decode failed");
            };
            assert_eq!(HardwareCanPacket::encode_from_message(&decoded).unwrap(), bytes);
        }
    }

    #[test]
    fn test_bit_layout() {
        // Standard id 0x123, dlc 2
        let m = CanMessage::new(NetId::HsCan, 0x123, &[0xDE, 0xAD]);
        let bytes = HardwareCanPacket::encode_from_message(&m).unwrap();
        let header = u16::from_le_bytes([bytes[0], bytes[1]]);
        assert_eq!(header, 0x123 << 3);
        let dlc = u16::from_le_bytes([bytes[4], bytes[5]]);
        assert_eq!(dlc, 2 << 12);
        assert_eq!(&bytes[6..8], &[0xDE, 0xAD]);

        // Extended id splits into SID, EID and EID2
        let m = CanMessage::new_extended(NetId::HsCan, 0x1FFF_FFFF, &[]);
        let p = HardwareCanPacket::from_bytes(&HardwareCanPacket::encode_from_message(&m).unwrap()).unwrap();
        assert!(p.ide && p.srr);
        assert_eq!((p.sid, p.eid, p.eid2), (0x7FF, 0xFFF, 0x3F));

        // Timestamp flag is bit 0, ticks start at bit 4
        let mut m = CanMessage::new(NetId::HsCan, 1, &[]);
        m.timestamp = 1;
        m.timestamp_flag = true;
        let bytes = HardwareCanPacket::encode_from_message(&m).unwrap();
        assert_eq!(u64::from_le_bytes(bytes[16..24].try_into().unwrap()), 0x11);
    }

    #[test]
    fn test_decode_rejects() {
        let good = HardwareCanPacket::encode_from_message(&CanMessage::new(NetId::HsCan, 0x10, &[1])).unwrap();

        assert!(HardwareCanPacket::decode_to_message(&packet(good[..23].to_vec())).is_none());
        let mut long = good.to_vec();
        long.push(0);
        assert!(HardwareCanPacket::decode_to_message(&packet(long)).is_none());

        // Reserved timestamp bits
        let mut bad = good;
        bad[16] |= 0x02;
        assert!(HardwareCanPacket::decode_to_message(&packet(bad.to_vec())).is_none());

        // RB0
        let mut bad = good;
        bad[5] |= 0x08;
        assert!(HardwareCanPacket::decode_to_message(&packet(bad.to_vec())).is_none());

        // Padding after dlc
        let mut bad = good;
        bad[8] = 0x55;
        assert!(HardwareCanPacket::decode_to_message(&packet(bad.to_vec())).is_none());

        // EID bits in a standard frame
        let mut bad = good;
        bad[2] = 0x10;
        assert!(HardwareCanPacket::decode_to_message(&packet(bad.to_vec())).is_none());
    }

    #[test]
    fn test_encode_rejects() {
        assert!(HardwareCanPacket::encode_from_message(&CanMessage::new(NetId::HsCan, 0x800, &[])).is_err());
        assert!(HardwareCanPacket::encode_from_message(&CanMessage::new_extended(NetId::HsCan, 0x2000_0000, &[])).is_err());
        assert!(HardwareCanPacket::encode_from_message(&CanMessage::new(NetId::HsCan, 1, &[0; 9])).is_err());
        let mut m = CanMessage::new(NetId::HsCan, 1, &[]);
        m.timestamp = 1 << 60;
        assert!(HardwareCanPacket::encode_from_message(&m).is_err());

        let p = HardwareCanPacket { sid: 0x800, ..Default::default() };
        assert!(p.to_bytes().is_err());
    }
}

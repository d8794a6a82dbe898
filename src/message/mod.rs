//-----------------------------------------------------------------------------
// Module message
// Decoded, typed units of traffic

mod filter;

pub use filter::MessageFilter;

use bitflags::bitflags;

use crate::network::NetId;

//-----------------------------------------------------------------------------
// CAN status flags

bitflags! {
    /// Transmit report bits of a CAN packet
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CanTxStatus: u8 {
        const TX_MSG = 0x01;
        const TX_ABORTED = 0x02;
        const TX_LOST_ARB = 0x04;
        const TX_ERROR = 0x08;
    }
}

bitflags! {
    /// Status bits of the CAN packet dlc block
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CanStatus: u8 {
        const IVRIF = 0x01;
        const HV_ENABLE = 0x02;
        const EXTENDED_NETWORK_INDEX = 0x04;
    }
}

//-----------------------------------------------------------------------------
// CanMessage

/// Classic CAN or CAN FD frame with up to 8 data bytes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CanMessage {
    pub network: NetId,
    pub timestamp: u64,       // Device ticks, 60 bit
    pub timestamp_flag: bool, // Extended timestamp indicator bit
    pub arbid: u32,           // 11 bit or 29 bit identifier
    pub is_extended: bool,
    pub srr: bool,
    pub is_remote: bool,
    pub is_canfd: bool,
    pub baudrate_switch: bool,
    pub error_state_indicator: bool,
    pub tx_status: CanTxStatus,
    pub status: CanStatus,
    pub stats: u16,
    pub data: Vec<u8>,
}

impl CanMessage {
    /// Create a standard 11 bit identifier data frame
    pub fn new(network: NetId, arbid: u32, data: &[u8]) -> CanMessage {
        CanMessage {
            network,
            arbid,
            data: data.to_vec(),
            ..Default::default()
        }
    }

    /// Create a 29 bit identifier data frame
    pub fn new_extended(network: NetId, arbid: u32, data: &[u8]) -> CanMessage {
        CanMessage {
            network,
            arbid,
            is_extended: true,
            srr: true,
            data: data.to_vec(),
            ..Default::default()
        }
    }
}

//-----------------------------------------------------------------------------
// EthernetMessage

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetMessage {
    pub network: NetId,
    pub timestamp: u64,
    pub data: Vec<u8>, // Complete ethernet frame
}

//-----------------------------------------------------------------------------
// DiskDataMessage

/// One chunk of a block storage read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskDataMessage {
    pub network: NetId,
    pub timestamp: u64,
    pub data: Vec<u8>,
}

//-----------------------------------------------------------------------------
// RawMessage

/// Packet on a network without a registered format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub network: NetId,
    pub timestamp: u64,
    pub data: Vec<u8>,
}

//-----------------------------------------------------------------------------
// Message

/// Message kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Can,
    Ethernet,
    DiskData,
    Raw,
}

/// Decoded message, shared by reference with all callbacks of one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Can(CanMessage),
    Ethernet(EthernetMessage),
    DiskData(DiskDataMessage),
    Raw(RawMessage),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Can(_) => MessageKind::Can,
            Message::Ethernet(_) => MessageKind::Ethernet,
            Message::DiskData(_) => MessageKind::DiskData,
            Message::Raw(_) => MessageKind::Raw,
        }
    }

    pub fn network(&self) -> NetId {
        match self {
            Message::Can(m) => m.network,
            Message::Ethernet(m) => m.network,
            Message::DiskData(m) => m.network,
            Message::Raw(m) => m.network,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Message::Can(m) => m.timestamp,
            Message::Ethernet(m) => m.timestamp,
            Message::DiskData(m) => m.timestamp,
            Message::Raw(m) => m.timestamp,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Message::Can(m) => &m.data,
            Message::Ethernet(m) => &m.data,
            Message::DiskData(m) => &m.data,
            Message::Raw(m) => &m.data,
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Message::Can(m) => {
                if m.is_extended {
                    write!(f, "{} CAN 0x{:08X}", m.network, m.arbid)?;
                } else {
                    write!(f, "{} CAN 0x{:03X}", m.network, m.arbid)?;
                }
                if m.is_remote {
                    write!(f, " RTR")?;
                }
                if m.is_canfd {
                    write!(f, " FD")?;
                }
                write!(f, " [{}]", m.data.len())?;
            }
            _ => write!(f, "{} {:?} [{}]", self.network(), self.kind(), self.payload().len())?,
        }
        for b in self.payload() {
            write!(f, " {:02X}", b)?;
        }
        Ok(())
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

#[cfg(test)]
mod message_tests {

    use super::*;

    #[test]
    fn test_message_accessors() {
        let m = Message::Can(CanMessage::new(NetId::HsCan, 0x123, &[1, 2, 3]));
        assert_eq!(m.kind(), MessageKind::Can);
        assert_eq!(m.network(), NetId::HsCan);
        assert_eq!(m.payload(), &[1, 2, 3]);
        assert_eq!(m.to_string(), "HsCan CAN 0x123 [3] 01 02 03");

        let m = Message::DiskData(DiskDataMessage {
            network: NetId::DiskRead,
            timestamp: 7,
            data: vec![0xAA],
        });
        assert_eq!(m.kind(), MessageKind::DiskData);
        assert_eq!(m.timestamp(), 7);
        assert_eq!(m.to_string(), "DiskRead DiskData [1] AA");
    }
}

//-----------------------------------------------------------------------------
// Module formats
// Pass through packet formats for ethernet, disk read responses and unknown networks

use crate::error::{Error, Result};
use crate::message::{DiskDataMessage, EthernetMessage, Message, RawMessage};

use super::{Packet, PacketFormat};

//-----------------------------------------------------------------------------
// EthernetFormat

/// Packet payload is one complete ethernet frame
#[derive(Debug, Default)]
pub struct EthernetFormat;

impl PacketFormat for EthernetFormat {
    fn decode(&self, packet: &Packet) -> Option<Message> {
        if packet.data.is_empty() {
            return None;
        }
        Some(Message::Ethernet(EthernetMessage {
            network: packet.network,
            timestamp: 0,
            data: packet.data.clone(),
        }))
    }

    fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        match message {
            Message::Ethernet(m) if !m.data.is_empty() => Ok(m.data.clone()),
            Message::Ethernet(_) => Err(Error::Encode("empty ethernet frame")),
            _ => Err(Error::Encode("not an ethernet message")),
        }
    }
}

//-----------------------------------------------------------------------------
// DiskDataFormat

/// Packet payload is one chunk of disk read response data
#[derive(Debug, Default)]
pub struct DiskDataFormat;

impl PacketFormat for DiskDataFormat {
    fn decode(&self, packet: &Packet) -> Option<Message> {
        if packet.data.is_empty() {
            return None;
        }
        Some(Message::DiskData(DiskDataMessage {
            network: packet.network,
            timestamp: 0,
            data: packet.data.clone(),
        }))
    }

    fn encode(&self, _message: &Message) -> Result<Vec<u8>> {
        Err(Error::Encode("disk data is receive only"))
    }
}

//-----------------------------------------------------------------------------
// RawFormat

/// Fallback for networks without a registered format
#[derive(Debug, Default)]
pub struct RawFormat;

impl PacketFormat for RawFormat {
    fn decode(&self, packet: &Packet) -> Option<Message> {
        Some(Message::Raw(RawMessage {
            network: packet.network,
            timestamp: 0,
            data: packet.data.clone(),
        }))
    }

    fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        match message {
            Message::Raw(m) => Ok(m.data.clone()),
            _ => Err(Error::Encode("no packet format for this message")),
        }
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

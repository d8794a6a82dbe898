//-----------------------------------------------------------------------------
// Module packetizer
// Transport packet framing
//
// Each packet on the byte stream is [length:2 LE][netid:2 LE][payload:length]

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::network::NetId;

use super::Packet;

const HEADER_SIZE: usize = 4;

//-----------------------------------------------------------------------------
// Packetizer

/// Reassembles transport packets from arbitrarily split byte chunks
/// A header with zero or oversize length is treated as a framing error, the packetizer resynchronises by dropping one byte at a time
pub struct Packetizer {
    buffer: Vec<u8>,
    max_packet_length: usize,
    in_sync: bool,
}

impl Packetizer {
    pub fn new(max_packet_length: usize) -> Packetizer {
        Packetizer {
            buffer: Vec::new(),
            max_packet_length,
            in_sync: true,
        }
    }

    /// Frame a payload for transmission
    pub fn frame(network: NetId, payload: &[u8]) -> Result<Vec<u8>> {
        if payload.is_empty() {
            return Err(Error::Encode("empty packet payload"));
        }
        let len: u16 = payload.len().try_into().map_err(|_| Error::Encode("packet payload exceeds 65535 bytes"))?;
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
        buf.put_u16_le(len);
        buf.put_u16_le(u16::from(network));
        buf.put_slice(payload);
        Ok(buf.to_vec())
    }

    /// Feed received bytes
    /// Returns the completed packets and the number of framing errors detected
    pub fn input(&mut self, bytes: &[u8]) -> (Vec<Packet>, usize) {
        self.buffer.extend_from_slice(bytes);

        let mut packets = Vec::new();
        let mut errors = 0;
        let mut pos = 0;
        while self.buffer.len() - pos >= HEADER_SIZE {
            let len = LittleEndian::read_u16(&self.buffer[pos..]) as usize;
            if len == 0 || len > self.max_packet_length {
                if self.in_sync {
                    warn!("Packetizer: invalid packet length {}, resynchronizing", len);
                    errors += 1;
                    self.in_sync = false;
                }
                pos += 1;
                continue;
            }
            if self.buffer.len() - pos < HEADER_SIZE + len {
                break; // Incomplete
            }
            let network = NetId::from(LittleEndian::read_u16(&self.buffer[pos + 2..]));
            let data = self.buffer[pos + HEADER_SIZE..pos + HEADER_SIZE + len].to_vec();
            trace!("Packetizer: packet network={} len={}", network, len);
            packets.push(Packet { network, data });
            self.in_sync = true;
            pos += HEADER_SIZE + len;
        }
        self.buffer.drain(..pos);
        (packets, errors)
    }

    /// Number of buffered bytes of an incomplete packet
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_sync = true;
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

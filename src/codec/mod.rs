//-----------------------------------------------------------------------------
// Module codec
// Conversion between raw transport packets and typed messages

mod can_packet;
mod command;
mod formats;
mod packetizer;

pub use can_packet::CanPacketFormat;
pub use can_packet::HardwareCanPacket;
pub use command::CommandBuilder;
pub use formats::DiskDataFormat;
pub use formats::EthernetFormat;
pub use formats::RawFormat;
pub use packetizer::Packetizer;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::error::Result;
use crate::message::Message;
use crate::network::{NetId, NetworkType};

//-----------------------------------------------------------------------------
// Packet

/// Payload of one transport packet and the network it was received on or is sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub network: NetId,
    pub data: Vec<u8>,
}

//-----------------------------------------------------------------------------
// PacketFormat

/// Wire format of the packet payload of a network
/// Dispatch and buffering only depend on this trait, new formats are added by registering them in the Codec
pub trait PacketFormat: Send + Sync {
    /// Decode a packet, None if it is malformed, no partial decoding
    fn decode(&self, packet: &Packet) -> Option<Message>;

    /// Encode a message into packet payload bytes
    fn encode(&self, message: &Message) -> Result<Vec<u8>>;
}

//-----------------------------------------------------------------------------
// Codec

enum Route {
    Network(NetId),
    NetworkType(NetworkType),
}

/// Selects the packet format by network
/// Formats registered for a single network take precedence over formats registered for a network type
pub struct Codec {
    routes: Vec<(Route, Box<dyn PacketFormat>)>,
    fallback: Box<dyn PacketFormat>,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec {
    /// Create a codec with the default formats
    pub fn new() -> Codec {
        let mut codec = Codec {
            routes: Vec::new(),
            fallback: Box::new(RawFormat),
        };
        codec.register_network_type(NetworkType::Can, CanPacketFormat);
        codec.register_network_type(NetworkType::Ethernet, EthernetFormat);
        codec.register_network(NetId::DiskRead, DiskDataFormat);
        codec
    }

    /// Register a format for one network, replaces a previous registration
    pub fn register_network<P: PacketFormat + 'static>(&mut self, network: NetId, format: P) {
        self.routes.retain(|(r, _)| !matches!(r, Route::Network(n) if *n == network));
        self.routes.push((Route::Network(network), Box::new(format)));
    }

    /// Register a format for all networks of a type, replaces a previous registration
    pub fn register_network_type<P: PacketFormat + 'static>(&mut self, network_type: NetworkType, format: P) {
        self.routes.retain(|(r, _)| !matches!(r, Route::NetworkType(t) if *t == network_type));
        self.routes.push((Route::NetworkType(network_type), Box::new(format)));
    }

    fn format(&self, network: NetId) -> &dyn PacketFormat {
        let by_network = self.routes.iter().find(|(r, _)| matches!(r, Route::Network(n) if *n == network));
        let by_type = || {
            let network_type = network.network_type();
            self.routes.iter().find(|(r, _)| matches!(r, Route::NetworkType(t) if *t == network_type))
        };
        match by_network.or_else(by_type) {
            Some((_, format)) => format.as_ref(),
            None => self.fallback.as_ref(),
        }
    }

    /// Decode a packet with the format of its network
    pub fn decode(&self, packet: &Packet) -> Option<Message> {
        let message = self.format(packet.network).decode(packet);
        if message.is_none() {
            debug!("Codec: failed to decode packet on {} len={}", packet.network, packet.data.len());
        }
        message
    }

    /// Encode a message with the format of its network and add the transport packet header
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        let payload = self.format(message.network()).encode(message)?;
        Packetizer::frame(message.network(), &payload)
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

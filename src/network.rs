//-----------------------------------------------------------------------------
// Module network
// Network identifiers carried in the transport packet header

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

//-----------------------------------------------------------------------------
// NetworkType

/// Physical or logical class of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NetworkType {
    Can,
    Lin,
    Ethernet,
    Internal, // Device internal streams like disk read responses
    Other,
}

//-----------------------------------------------------------------------------
// NetId

/// Network identifier
/// Unknown identifiers are kept as Other(id), the conversion from and to u16 is lossless
/// Equality and hashing use the numeric identifier, Other(1) is the same network as HsCan
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NetId {
    Device,
    HsCan,
    MsCan,
    SwCan,
    LsftCan,
    Lin,
    HsCan2,
    HsCan3,
    Ethernet,
    DiskRead,
    Other(u16),
}

const NETID_DEVICE: u16 = 0;
const NETID_HSCAN: u16 = 1;
const NETID_MSCAN: u16 = 2;
const NETID_SWCAN: u16 = 3;
const NETID_LSFTCAN: u16 = 4;
const NETID_LIN: u16 = 5;
const NETID_HSCAN2: u16 = 42;
const NETID_HSCAN3: u16 = 44;
const NETID_ETHERNET: u16 = 93;
const NETID_DISK_READ: u16 = 0x0200;

impl From<u16> for NetId {
    fn from(id: u16) -> Self {
        match id {
            NETID_DEVICE => NetId::Device,
            NETID_HSCAN => NetId::HsCan,
            NETID_MSCAN => NetId::MsCan,
            NETID_SWCAN => NetId::SwCan,
            NETID_LSFTCAN => NetId::LsftCan,
            NETID_LIN => NetId::Lin,
            NETID_HSCAN2 => NetId::HsCan2,
            NETID_HSCAN3 => NetId::HsCan3,
            NETID_ETHERNET => NetId::Ethernet,
            NETID_DISK_READ => NetId::DiskRead,
            _ => NetId::Other(id),
        }
    }
}

impl From<NetId> for u16 {
    fn from(id: NetId) -> u16 {
        match id {
            NetId::Device => NETID_DEVICE,
            NetId::HsCan => NETID_HSCAN,
            NetId::MsCan => NETID_MSCAN,
            NetId::SwCan => NETID_SWCAN,
            NetId::LsftCan => NETID_LSFTCAN,
            NetId::Lin => NETID_LIN,
            NetId::HsCan2 => NETID_HSCAN2,
            NetId::HsCan3 => NETID_HSCAN3,
            NetId::Ethernet => NETID_ETHERNET,
            NetId::DiskRead => NETID_DISK_READ,
            NetId::Other(id) => id,
        }
    }
}

impl Default for NetId {
    fn default() -> Self {
        NetId::HsCan
    }
}

impl PartialEq for NetId {
    fn eq(&self, other: &NetId) -> bool {
        u16::from(*self) == u16::from(*other)
    }
}

impl Eq for NetId {}

impl Hash for NetId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        u16::from(*self).hash(state);
    }
}

impl NetId {
    /// Canonical form, Other(id) only for identifiers without a named variant
    pub fn normalized(self) -> NetId {
        NetId::from(u16::from(self))
    }

    /// Get the network type of this identifier
    pub fn network_type(self) -> NetworkType {
        match self.normalized() {
            NetId::HsCan | NetId::MsCan | NetId::SwCan | NetId::LsftCan | NetId::HsCan2 | NetId::HsCan3 => NetworkType::Can,
            NetId::Lin => NetworkType::Lin,
            NetId::Ethernet => NetworkType::Ethernet,
            NetId::Device | NetId::DiskRead => NetworkType::Internal,
            NetId::Other(_) => NetworkType::Other,
        }
    }
}

impl std::fmt::Display for NetId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.normalized() {
            NetId::Other(id) => write!(f, "Other(0x{:04X})", id),
            id => write!(f, "{:?}", id),
        }
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

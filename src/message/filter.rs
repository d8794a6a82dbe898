//-----------------------------------------------------------------------------
// Module filter
// Types:
//  MessageFilter

use crate::dispatch::Filter;
use crate::network::{NetId, NetworkType};

use super::{Message, MessageKind};

/// Message predicate by network identifier, network type and message kind
/// Criteria which are not set match everything, the default filter matches all messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageFilter {
    network: Option<NetId>,
    network_type: Option<NetworkType>,
    kind: Option<MessageKind>,
}

impl MessageFilter {
    /// Filter matching all messages
    pub fn all() -> MessageFilter {
        MessageFilter::default()
    }

    /// Filter matching messages on one network
    pub fn network(network: NetId) -> MessageFilter {
        MessageFilter {
            network: Some(network),
            ..Default::default()
        }
    }

    /// Filter matching messages on all networks of a type
    pub fn network_type(network_type: NetworkType) -> MessageFilter {
        MessageFilter {
            network_type: Some(network_type),
            ..Default::default()
        }
    }

    /// Filter matching one message kind
    pub fn kind(kind: MessageKind) -> MessageFilter {
        MessageFilter {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Additionally require a message kind
    pub fn with_kind(mut self, kind: MessageKind) -> MessageFilter {
        self.kind = Some(kind);
        self
    }

    pub fn matches_all(&self) -> bool {
        self.network.is_none() && self.network_type.is_none() && self.kind.is_none()
    }
}

impl Filter<Message> for MessageFilter {
    fn matches(&self, message: &Message) -> bool {
        if let Some(network) = self.network {
            if message.network() != network {
                return false;
            }
        }
        if let Some(network_type) = self.network_type {
            if message.network().network_type() != network_type {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if message.kind() != kind {
                return false;
            }
        }
        true
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

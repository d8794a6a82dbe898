//-----------------------------------------------------------------------------
// Module event
// Diagnostic events and per thread errors

mod error_slot;
mod event_store;

pub use error_slot::ErrorSlots;
pub use event_store::DowngradeGuard;
pub use event_store::EventStore;

use std::thread::ThreadId;
use std::time::SystemTime;

use crate::dispatch::Filter;
use crate::network::NetId;

//-----------------------------------------------------------------------------
// Severity

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

//-----------------------------------------------------------------------------
// EventType

/// Event type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    NoErrorFound,
    TooManyEvents,
    Unknown,
    ParameterOutOfRange,
    PacketDecodingError,
    PacketEncodingError,
    PollingMessageOverflow,
    ResponseOverflow,
    Timeout,
    TransportError,
    ConfigError,
}

impl EventType {
    /// Numeric event code
    pub fn code(self) -> u32 {
        match self {
            EventType::NoErrorFound => 0x0000,
            EventType::TooManyEvents => 0x0001,
            EventType::Unknown => 0x0002,
            EventType::ParameterOutOfRange => 0x1000,
            EventType::PacketDecodingError => 0x1001,
            EventType::PacketEncodingError => 0x1002,
            EventType::PollingMessageOverflow => 0x1003,
            EventType::ResponseOverflow => 0x1004,
            EventType::Timeout => 0x1005,
            EventType::TransportError => 0x2000,
            EventType::ConfigError => 0x2001,
        }
    }

    /// Severity used when the event is reported without an explicit one
    pub fn default_severity(self) -> Severity {
        match self {
            EventType::NoErrorFound => Severity::Info,
            EventType::TooManyEvents | EventType::PollingMessageOverflow => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            EventType::NoErrorFound => "No errors found.",
            EventType::TooManyEvents => "Too many events have occurred. The list has been truncated.",
            EventType::Unknown => "An unknown internal error occurred.",
            EventType::ParameterOutOfRange => "A parameter was out of range or misaligned.",
            EventType::PacketDecodingError => "A packet could not be decoded.",
            EventType::PacketEncodingError => "A message could not be encoded.",
            EventType::PollingMessageOverflow => "Too many messages have been received for the polling message buffer, some have been lost!",
            EventType::ResponseOverflow => "The device sent more data than requested.",
            EventType::Timeout => "The device did not respond in time.",
            EventType::TransportError => "Communication with the device failed.",
            EventType::ConfigError => "The configuration could not be loaded or saved.",
        }
    }
}

//-----------------------------------------------------------------------------
// EventRecord

/// One diagnostic event or error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event_type: EventType,
    pub severity: Severity,
    pub timestamp: SystemTime,
    pub network: Option<NetId>,
    pub thread: Option<ThreadId>, // Set for errors owned by an error slot
}

impl EventRecord {
    pub fn new(event_type: EventType, severity: Severity) -> EventRecord {
        EventRecord {
            event_type,
            severity,
            timestamp: SystemTime::now(),
            network: None,
            thread: None,
        }
    }

    pub fn with_network(mut self, network: NetId) -> EventRecord {
        self.network = Some(network);
        self
    }

    pub fn description(&self) -> &'static str {
        self.event_type.description()
    }
}

impl std::fmt::Display for EventRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.network {
            Some(network) => write!(f, "{:?}: {} ({})", self.severity, self.description(), network),
            None => write!(f, "{:?}: {}", self.severity, self.description()),
        }
    }
}

//-----------------------------------------------------------------------------
// EventFilter

/// Event predicate by type, minimum severity and network
/// Criteria which are not set match everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFilter {
    event_type: Option<EventType>,
    min_severity: Option<Severity>,
    network: Option<NetId>,
}

impl EventFilter {
    pub fn all() -> EventFilter {
        EventFilter::default()
    }

    pub fn event_type(event_type: EventType) -> EventFilter {
        EventFilter {
            event_type: Some(event_type),
            ..Default::default()
        }
    }

    pub fn min_severity(severity: Severity) -> EventFilter {
        EventFilter {
            min_severity: Some(severity),
            ..Default::default()
        }
    }

    pub fn network(network: NetId) -> EventFilter {
        EventFilter {
            network: Some(network),
            ..Default::default()
        }
    }
}

impl Filter<EventRecord> for EventFilter {
    fn matches(&self, event: &EventRecord) -> bool {
        self.event_type.is_none_or(|t| t == event.event_type)
            && self.min_severity.is_none_or(|s| event.severity >= s)
            && self.network.is_none_or(|n| event.network == Some(n))
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

#[cfg(test)]
mod event_tests {

    use super::*;

    #[test]
    fn test_event_filter() {
        let warning = EventRecord::new(EventType::TooManyEvents, Severity::Warning);
        let error = EventRecord::new(EventType::Timeout, Severity::Error).with_network(NetId::DiskRead);

        assert!(EventFilter::all().matches(&warning));
        assert!(EventFilter::event_type(EventType::Timeout).matches(&error));
        assert!(!EventFilter::event_type(EventType::Timeout).matches(&warning));
        assert!(EventFilter::min_severity(Severity::Warning).matches(&warning));
        assert!(!EventFilter::min_severity(Severity::Error).matches(&warning));
        assert!(EventFilter::network(NetId::DiskRead).matches(&error));
        assert!(!EventFilter::network(NetId::DiskRead).matches(&warning));
    }

    #[test]
    fn test_event_display() {
        let e = EventRecord::new(EventType::NoErrorFound, Severity::Info);
        assert_eq!(e.to_string(), "Info: No errors found.");
        let e = EventRecord::new(EventType::Timeout, Severity::Error).with_network(NetId::DiskRead);
        assert_eq!(e.to_string(), "Error: The device did not respond in time. (DiskRead)");
        assert_eq!(EventType::TooManyEvents.code(), 1);
        assert_eq!(EventType::TooManyEvents.default_severity(), Severity::Warning);
        assert_eq!(EventType::Timeout.default_severity(), Severity::Error);
    }
}

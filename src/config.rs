//-----------------------------------------------------------------------------
// Module config
// Link configuration

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//-----------------------------------------------------------------------------
// LinkConfig

/// Limits and defaults of a Link
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkConfig {
    /// Capacity of the event buffer, one slot is reserved for the TooManyEvents sentinel
    pub event_limit: usize,
    /// Capacity of the polling message buffer
    pub polling_message_limit: usize,
    /// Timeout of disk reads if the caller does not specify one
    pub disk_timeout: Duration,
    /// Maximum payload length accepted by the packetizer
    pub max_packet_length: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            event_limit: 10_000,
            polling_message_limit: 20_000,
            disk_timeout: Duration::from_secs(2),
            max_packet_length: 0x4000,
        }
    }
}

impl LinkConfig {
    pub fn new() -> LinkConfig {
        LinkConfig::default()
    }

    pub fn set_event_limit(mut self, event_limit: usize) -> Self {
        self.event_limit = event_limit;
        self
    }

    pub fn set_polling_message_limit(mut self, polling_message_limit: usize) -> Self {
        self.polling_message_limit = polling_message_limit;
        self
    }

    pub fn set_disk_timeout(mut self, disk_timeout: Duration) -> Self {
        self.disk_timeout = disk_timeout;
        self
    }

    pub fn set_max_packet_length(mut self, max_packet_length: usize) -> Self {
        self.max_packet_length = max_packet_length;
        self
    }
}

//-----------------------------------------------------------------------------
// Load/Save

#[cfg(feature = "serde")]
impl LinkConfig {
    /// Load a configuration from json file
    /// Missing fields get their default values
    pub fn load<P: AsRef<std::path::Path>>(filename: P) -> crate::Result<LinkConfig> {
        let path = filename.as_ref();
        info!("Load link configuration from file {}", path.display());
        let file = std::fs::File::open(path).map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader::<_, LinkConfig>(reader).map_err(|e| crate::Error::Config(format!("serde_json::from_reader failed: {}", e)))
    }

    /// Write the configuration to json file
    pub fn save<P: AsRef<std::path::Path>>(&self, filename: P) -> crate::Result<()> {
        let path = filename.as_ref();
        info!("Save link configuration to file {}", path.display());
        let file = std::fs::File::create(path).map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
        let mut writer = std::io::BufWriter::new(file);
        let s = serde_json::to_string_pretty(self).map_err(|e| crate::Error::Config(format!("serde_json::to_string failed: {}", e)))?;
        std::io::Write::write_all(&mut writer, s.as_ref()).map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

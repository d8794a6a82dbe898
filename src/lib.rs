//-----------------------------------------------------------------------------
// Crate vnetlink
// Path: src/lib.rs

//
// Communication core for vehicle network interface devices
// - Decode transport packets into typed messages (CAN, Ethernet, disk data, raw)
// - Dispatch messages to filtered callbacks and a bounded polling buffer
// - Record diagnostic events and per thread errors
// - Synchronous request/response transactions, used for aligned logical disk reads
//
// Use cargo test --features=serde -- --nocapture

// This crate is a library
#![crate_type = "lib"]
// The library crate is named "vnetlink"
#![crate_name = "vnetlink"]

//-----------------------------------------------------------------------------

mod error;
pub use error::Error;
pub use error::Result;

mod config;
pub use config::LinkConfig;

pub mod network;
pub use network::NetId;
pub use network::NetworkType;

pub mod message;
pub use message::Message;
pub use message::MessageFilter;
pub use message::MessageKind;

pub mod codec;
pub use codec::Codec;
pub use codec::PacketFormat;

pub mod dispatch;
pub use dispatch::CallbackId;
pub use dispatch::Filter;

pub mod event;
pub use event::EventFilter;
pub use event::EventRecord;
pub use event::EventStore;
pub use event::EventType;
pub use event::Severity;

pub mod bridge;

pub mod disk;
pub use disk::DiskReadDriver;
pub use disk::SdCardReadDriver;

mod link;
pub use link::Link;
pub use link::ReaderHandle;
pub use link::Transport;

//-----------------------------------------------------------------------------
// Test helpers

#[cfg(test)]
pub(crate) fn test_setup() {
    let _ = env_logger::builder().is_test(true).filter_level(log::LevelFilter::Info).try_init();
}

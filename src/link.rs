//-----------------------------------------------------------------------------
// Module link
// Top level device handle

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::codec::{Codec, Packet, Packetizer};
use crate::config::LinkConfig;
use crate::disk::{DiskReadDriver, SdCardReadDriver};
use crate::dispatch::{BoundedBuffer, CallbackId, CallbackRegistry, Filter};
use crate::error::{Error, Result};
use crate::event::{EventFilter, EventRecord, EventStore, EventType, Severity};
use crate::message::{Message, MessageFilter};

const READ_BUFFER_SIZE: usize = 4096;

//-----------------------------------------------------------------------------
// Transport

/// Outbound byte channel to the device
pub trait Transport: Send + Sync {
    fn write(&self, bytes: &[u8]) -> std::io::Result<()>;
}

//-----------------------------------------------------------------------------
// Link

/// Handle of one device connection
///
/// Incoming byte chunks are framed, decoded and dispatched to the message callbacks on the thread delivering them.
/// Synchronous operations return their errors and also raise them into the error slot of the calling thread.
pub struct Link {
    config: LinkConfig,
    transport: Arc<dyn Transport>,
    codec: Codec,
    packetizer: Mutex<Packetizer>,
    message_callbacks: CallbackRegistry<Message, MessageFilter>,
    polling: Arc<BoundedBuffer<Message>>,
    polling_callback: Mutex<Option<CallbackId>>,
    events: Arc<EventStore>,
    disk_driver: Box<dyn DiskReadDriver>,
}

impl Link {
    /// Create a link with the default codec and the SD card disk driver
    pub fn new(transport: Arc<dyn Transport>, config: LinkConfig) -> Link {
        Link::with_components(transport, config, Codec::new(), Box::new(SdCardReadDriver::new()))
    }

    pub fn with_components(transport: Arc<dyn Transport>, config: LinkConfig, codec: Codec, disk_driver: Box<dyn DiskReadDriver>) -> Link {
        debug!("Link: create, event_limit={} polling_message_limit={}", config.event_limit, config.polling_message_limit);
        Link {
            packetizer: Mutex::new(Packetizer::new(config.max_packet_length)),
            polling: Arc::new(BoundedBuffer::new(config.polling_message_limit)),
            events: Arc::new(EventStore::new(config.event_limit)),
            config,
            transport,
            codec,
            message_callbacks: CallbackRegistry::new(),
            polling_callback: Mutex::new(None),
            disk_driver,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    // Raise the error of a failed synchronous operation into the error slot of the caller
    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            debug!("Link: {}", e);
            self.events.raise(e.event_type());
        }
        result
    }

    //---------------------------------------------------------------------------------------------------------
    // Receive

    /// Feed a chunk of received bytes
    /// Decodes and dispatches all completed packets on the calling thread
    pub fn on_receive(&self, bytes: &[u8]) {
        let (packets, errors) = self.packetizer.lock().input(bytes);
        for _ in 0..errors {
            self.events.raise(EventType::PacketDecodingError);
        }
        for packet in &packets {
            self.handle_packet(packet);
        }
    }

    /// Decode and dispatch one packet
    /// Returns false if the packet could not be decoded, this is recorded as PacketDecodingError
    pub fn handle_packet(&self, packet: &Packet) -> bool {
        match self.codec.decode(packet) {
            Some(message) => {
                let n = self.message_callbacks.dispatch(&message);
                trace!("Link: dispatched {} to {} callbacks", message, n);
                true
            }
            None => {
                self.events.add(EventRecord::new(EventType::PacketDecodingError, Severity::Error).with_network(packet.network));
                false
            }
        }
    }

    /// Start an internal reader thread feeding all bytes read from reader into this link
    /// Errors on the reader thread are recorded as warning events
    pub fn start_reader<R>(self: &Arc<Self>, mut reader: R) -> Result<ReaderHandle>
    where
        R: Read + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let r = Arc::clone(&running);
        let link = Arc::clone(self);
        let thread = std::thread::Builder::new().name("vnet_reader".to_string()).spawn(move || {
            let _guard = link.events.downgrade_current_thread();
            info!("Reader thread started");
            let mut packetizer = Packetizer::new(link.config.max_packet_length);
            let mut buf = vec![0u8; READ_BUFFER_SIZE];
            while r.load(Ordering::Acquire) {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        info!("Reader thread: end of stream");
                        break;
                    }
                    Ok(n) => {
                        let (packets, errors) = packetizer.input(&buf[..n]);
                        for _ in 0..errors {
                            link.events.raise(EventType::PacketDecodingError);
                        }
                        for packet in &packets {
                            link.handle_packet(packet);
                        }
                    }
                    Err(e) if matches!(e.kind(), std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {}
                    Err(e) => {
                        warn!("Reader thread: read failed: {}", e);
                        link.events.raise(EventType::TransportError);
                        break;
                    }
                }
            }
            r.store(false, Ordering::Release);
            info!("Reader thread stopped");
        })?;
        Ok(ReaderHandle { running, thread: Some(thread) })
    }

    //---------------------------------------------------------------------------------------------------------
    // Transmit

    /// Encode and send a message
    pub fn transmit(&self, message: &Message) -> Result<()> {
        let result = self.codec.encode(message).and_then(|frame| self.write(&frame));
        self.report(result)
    }

    /// Send bytes to the device as they are
    pub fn raw_write(&self, bytes: &[u8]) -> Result<()> {
        let result = self.write(bytes);
        self.report(result)
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        trace!("Link: write {} bytes", bytes.len());
        self.transport.write(bytes).map_err(Error::from)
    }

    //---------------------------------------------------------------------------------------------------------
    // Message callbacks

    /// Registry of the message callbacks
    pub fn message_callbacks(&self) -> &CallbackRegistry<Message, MessageFilter> {
        &self.message_callbacks
    }

    /// Register a callback for messages matching filter
    /// The callback runs on the thread delivering the message and may add or remove callbacks
    pub fn add_message_callback<C>(&self, filter: MessageFilter, callback: C) -> CallbackId
    where
        C: Fn(&Message) + Send + Sync + 'static,
    {
        self.message_callbacks.subscribe(filter, callback)
    }

    pub fn remove_message_callback(&self, id: CallbackId) -> bool {
        self.message_callbacks.unsubscribe(id)
    }

    //---------------------------------------------------------------------------------------------------------
    // Message polling

    /// Start collecting all received messages in the polling buffer
    pub fn enable_message_polling(&self) {
        let mut polling_callback = self.polling_callback.lock();
        if polling_callback.is_some() {
            return;
        }
        let polling = Arc::clone(&self.polling);
        let events = Arc::clone(&self.events);
        let id = self.message_callbacks.subscribe(MessageFilter::all(), move |message: &Message| {
            let outcome = polling.push(message.clone());
            if outcome.evicted > 0 {
                warn!("Link: polling message buffer full, {} messages dropped", outcome.evicted);
                events.add(EventRecord::new(EventType::PollingMessageOverflow, EventType::PollingMessageOverflow.default_severity()).with_network(message.network()));
            }
        });
        *polling_callback = Some(id);
        debug!("Link: message polling enabled");
    }

    /// Stop collecting messages and clear the polling buffer
    pub fn disable_message_polling(&self) {
        if let Some(id) = self.polling_callback.lock().take() {
            self.message_callbacks.unsubscribe(id);
            self.polling.clear();
            debug!("Link: message polling disabled");
        }
    }

    pub fn is_message_polling_enabled(&self) -> bool {
        self.polling_callback.lock().is_some()
    }

    /// Remove and return all polled messages matching filter, oldest first
    pub fn get_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        if !self.is_message_polling_enabled() {
            return self.report(Err(Error::Validation("message polling is not enabled")));
        }
        Ok(self.polling.take_matching(|m| filter.matches(m)))
    }

    /// Number of polled messages
    pub fn polling_message_count(&self) -> usize {
        self.polling.len()
    }

    /// Change the polling buffer capacity, shrinking drops the oldest messages
    pub fn set_polling_message_limit(&self, limit: usize) {
        let outcome = self.polling.set_capacity(limit);
        if outcome.evicted > 0 {
            self.events.report(EventType::PollingMessageOverflow, Severity::Warning);
        }
    }

    pub fn get_polling_message_limit(&self) -> usize {
        self.polling.capacity()
    }

    //---------------------------------------------------------------------------------------------------------
    // Events

    pub fn events(&self) -> &Arc<EventStore> {
        &self.events
    }

    /// Remove and return the buffered events matching filter
    pub fn get_events(&self, filter: &EventFilter) -> Vec<EventRecord> {
        self.events.get_events(filter)
    }

    /// Return and clear the last error of the calling thread
    pub fn get_last_error(&self) -> EventRecord {
        self.events.get_last_error()
    }

    pub fn add_event_callback<C>(&self, filter: EventFilter, callback: C) -> CallbackId
    where
        C: Fn(&EventRecord) + Send + Sync + 'static,
    {
        self.events.add_event_callback(filter, callback)
    }

    pub fn remove_event_callback(&self, id: CallbackId) -> bool {
        self.events.remove_event_callback(id)
    }

    //---------------------------------------------------------------------------------------------------------
    // Disk

    pub fn disk_driver(&self) -> &dyn DiskReadDriver {
        self.disk_driver.as_ref()
    }

    /// Read into.len() bytes of the logical disk at pos, any alignment
    /// Uses the configured disk timeout if timeout is None
    pub fn read_logical_disk(&self, pos: u64, into: &mut [u8], timeout: Option<Duration>) -> Result<u64> {
        let timeout = timeout.unwrap_or(self.config.disk_timeout);
        let result = self.disk_driver.read_logical_disk(self, pos, into, timeout);
        self.report(result)
    }

    /// Read into.len() bytes of the logical disk at pos, pos and length must be block aligned
    pub fn read_logical_disk_aligned(&self, pos: u64, into: &mut [u8], timeout: Option<Duration>) -> Result<u64> {
        let timeout = timeout.unwrap_or(self.config.disk_timeout);
        let result = self.disk_driver.read_logical_disk_aligned(self, pos, into, timeout);
        self.report(result)
    }

    /// Read length bytes of the logical disk at pos, any alignment
    pub fn read_disk(&self, pos: u64, length: usize, timeout: Option<Duration>) -> Result<Vec<u8>> {
        let mut data = vec![0u8; length];
        self.read_logical_disk(pos, &mut data, timeout)?;
        Ok(data)
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        debug!("Link: drop");
        // The event store may outlive the link through events()
        self.events.clear_errors();
    }
}

//-----------------------------------------------------------------------------
// ReaderHandle

/// Handle of an internal reader thread
/// The thread stops at end of stream, on a read error or after stop, checked between reads
pub struct ReaderHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Wait for the reader thread to terminate
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Reader thread panicked");
            }
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

#[cfg(test)]
mod link_tests {

    use super::*;
    use crate::message::{CanMessage, MessageKind};
    use crate::network::NetId;
    use crate::test_setup;

    #[derive(Default)]
    struct Sink {
        frames: Mutex<Vec<Vec<u8>>>,
    }

    impl Transport for Sink {
        fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
            self.frames.lock().push(bytes.to_vec());
            Ok(())
        }
    }

    fn can_frame(id: u32) -> Vec<u8> {
        Codec::new().encode(&Message::Can(CanMessage::new(NetId::HsCan, id, &[1, 2]))).unwrap()
    }

    #[test]
    fn test_transmit() {
        test_setup();
        let sink = Arc::new(Sink::default());
        let link = Link::new(sink.clone(), LinkConfig::default());
        link.transmit(&Message::Can(CanMessage::new(NetId::HsCan, 0x123, &[1, 2]))).unwrap();
        assert_eq!(sink.frames.lock()[0], can_frame(0x123));

        // Standard id wider than 11 bits
        assert!(link.transmit(&Message::Can(CanMessage::new(NetId::HsCan, 0x800, &[]))).is_err());
        assert_eq!(link.get_last_error().event_type, EventType::PacketEncodingError);
        assert_eq!(sink.frames.lock().len(), 1);
    }

    #[test]
    fn test_polling() {
        test_setup();
        let link = Link::new(Arc::new(Sink::default()), LinkConfig::default().set_polling_message_limit(3));
        assert!(link.get_messages(&MessageFilter::all()).is_err());
        assert_eq!(link.get_last_error().event_type, EventType::ParameterOutOfRange);

        link.enable_message_polling();
        link.enable_message_polling();
        assert_eq!(link.message_callbacks().len(), 1);
        for id in 1..=5 {
            link.on_receive(&can_frame(id));
        }
        assert_eq!(link.polling_message_count(), 3);
        let messages = link.get_messages(&MessageFilter::kind(MessageKind::Can)).unwrap();
        let ids: Vec<u32> = messages
            .iter()
            .filter_map(|m| match m {
                Message::Can(c) => Some(c.arbid),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert_eq!(link.events().event_count(&EventFilter::event_type(EventType::PollingMessageOverflow)), 2);

        link.disable_message_polling();
        assert!(!link.is_message_polling_enabled());
        assert!(link.message_callbacks().is_empty());
    }

    #[test]
    fn test_decode_error_event() {
        test_setup();
        let link = Link::new(Arc::new(Sink::default()), LinkConfig::default());
        let bad = Packetizer::frame(NetId::HsCan, &[0u8; 5]).unwrap();
        link.on_receive(&bad);
        let e = link.get_last_error();
        assert_eq!(e.event_type, EventType::PacketDecodingError);
        assert_eq!(e.network, Some(NetId::HsCan));
    }
}

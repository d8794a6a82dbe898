//-----------------------------------------------------------------------------
// Module event_store
// Types:
//  EventStore, DowngradeGuard

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::thread::ThreadId;

use crate::dispatch::{BoundedBuffer, CallbackId, CallbackRegistry, Filter};

use super::{ErrorSlots, EventFilter, EventRecord, EventType, Severity};

fn too_many_events() -> EventRecord {
    EventRecord::new(EventType::TooManyEvents, EventType::TooManyEvents.default_severity())
}

//-----------------------------------------------------------------------------
// EventStore

/// Shared store of diagnostic events and per thread errors, owned by the top level handle
///
/// Info and warning events are kept in a bounded buffer with one slot reserved for a TooManyEvents sentinel.
/// Errors are kept in the error slot of the raising thread, except on internal worker threads which have no caller to read a slot:
/// there errors are downgraded to warnings and stored in the shared buffer.
pub struct EventStore {
    events: BoundedBuffer<EventRecord>,
    errors: ErrorSlots,
    downgraded: Mutex<HashSet<ThreadId>>,
    callbacks: CallbackRegistry<EventRecord, EventFilter>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EVENT_LIMIT)
    }
}

impl EventStore {
    /// Default capacity of the event buffer, including the sentinel slot
    pub const DEFAULT_EVENT_LIMIT: usize = 10_000;

    pub fn new(event_limit: usize) -> EventStore {
        EventStore {
            events: BoundedBuffer::with_sentinel(event_limit, too_many_events),
            errors: ErrorSlots::new(),
            downgraded: Mutex::new(HashSet::new()),
            callbacks: CallbackRegistry::new(),
        }
    }

    //---------------------------------------------------------------------------------------------------------
    // Add

    /// Add an event or error
    pub fn add(&self, mut record: EventRecord) {
        let thread = std::thread::current().id();
        if record.severity == Severity::Error {
            if self.is_downgraded(thread) {
                debug!("EventStore: downgrade error {:?} on worker thread", record.event_type);
                record.severity = Severity::Warning;
            } else {
                self.errors.set(thread, record.clone());
                record.thread = Some(thread);
                self.callbacks.dispatch(&record);
                return;
            }
        }

        let outcome = self.events.push(record.clone());
        self.callbacks.dispatch(&record);
        if outcome.sentinel_added {
            warn!("EventStore: event buffer full, oldest events dropped");
            self.callbacks.dispatch(&too_many_events());
        }
    }

    /// Add an event of type with severity
    pub fn report(&self, event_type: EventType, severity: Severity) {
        self.add(EventRecord::new(event_type, severity));
    }

    /// Raise an error on the calling thread
    pub fn raise(&self, event_type: EventType) {
        self.add(EventRecord::new(event_type, Severity::Error));
    }

    //---------------------------------------------------------------------------------------------------------
    // Read

    /// Remove and return all events matching filter, oldest first
    pub fn get_events(&self, filter: &EventFilter) -> Vec<EventRecord> {
        self.events.take_matching(|e| filter.matches(e))
    }

    /// Remove and return all events
    pub fn drain(&self) -> Vec<EventRecord> {
        self.events.drain()
    }

    /// Return and clear the last error of the calling thread
    /// Returns a NoErrorFound info record if there is none
    pub fn get_last_error(&self) -> EventRecord {
        self.errors
            .take(std::thread::current().id())
            .unwrap_or_else(|| EventRecord::new(EventType::NoErrorFound, Severity::Info))
    }

    /// Number of threads holding an unread error
    pub fn pending_error_count(&self) -> usize {
        self.errors.len()
    }

    /// Drop the unread errors of all threads
    /// Slots of exited threads are only released here or when the store is dropped
    pub fn clear_errors(&self) {
        let count = self.errors.len();
        if count > 0 {
            debug!("EventStore: {} unread errors dropped", count);
        }
        self.errors.clear();
    }

    /// Number of buffered events matching filter
    pub fn event_count(&self, filter: &EventFilter) -> usize {
        self.events.count_matching(|e| filter.matches(e))
    }

    /// Drop buffered events matching filter and the calling thread's error if it matches
    pub fn discard(&self, filter: &EventFilter) -> usize {
        let thread = std::thread::current().id();
        let mut count = self.events.discard_matching(|e| filter.matches(e));
        if self.errors.peek(thread).is_some_and(|e| filter.matches(&e)) {
            self.errors.take(thread);
            count += 1;
        }
        count
    }

    //---------------------------------------------------------------------------------------------------------
    // Limit

    /// Change the event buffer capacity, shrinking drops the oldest events
    pub fn set_event_limit(&self, event_limit: usize) {
        let outcome = self.events.set_capacity(event_limit);
        if outcome.sentinel_added {
            self.callbacks.dispatch(&too_many_events());
        }
    }

    pub fn get_event_limit(&self) -> usize {
        self.events.capacity()
    }

    //---------------------------------------------------------------------------------------------------------
    // Worker threads

    /// Route errors raised on the calling thread to the shared buffer as warnings, until the guard is dropped
    pub fn downgrade_current_thread(&self) -> DowngradeGuard<'_> {
        let thread = std::thread::current().id();
        self.downgraded.lock().insert(thread);
        DowngradeGuard { store: self, thread }
    }

    pub fn is_downgraded(&self, thread: ThreadId) -> bool {
        self.downgraded.lock().contains(&thread)
    }

    //---------------------------------------------------------------------------------------------------------
    // Callbacks

    /// Register a callback for events and errors matching filter
    /// Callbacks run on the thread adding the event, after it has been stored
    pub fn add_event_callback<C>(&self, filter: EventFilter, callback: C) -> CallbackId
    where
        C: Fn(&EventRecord) + Send + Sync + 'static,
    {
        self.callbacks.subscribe(filter, callback)
    }

    pub fn remove_event_callback(&self, id: CallbackId) -> bool {
        self.callbacks.unsubscribe(id)
    }
}

//-----------------------------------------------------------------------------
// DowngradeGuard

/// Marks the current thread as internal worker thread while alive
pub struct DowngradeGuard<'a> {
    store: &'a EventStore,
    thread: ThreadId,
}

impl Drop for DowngradeGuard<'_> {
    fn drop(&mut self) {
        self.store.downgraded.lock().remove(&self.thread);
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

#[cfg(test)]
mod event_store_tests {

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_no_error_found() {
        let store = EventStore::default();
        let e = store.get_last_error();
        assert_eq!(e.event_type, EventType::NoErrorFound);
        assert_eq!(e.severity, Severity::Info);
    }

    #[test]
    fn test_error_is_thread_scoped() {
        let store = Arc::new(EventStore::default());
        store.raise(EventType::Timeout);

        let other = store.clone();
        let seen = thread::spawn(move || other.get_last_error().event_type).join().unwrap();
        assert_eq!(seen, EventType::NoErrorFound);

        assert_eq!(store.get_last_error().event_type, EventType::Timeout);
        assert_eq!(store.get_last_error().event_type, EventType::NoErrorFound);
        assert_eq!(store.event_count(&EventFilter::all()), 0);
    }

    #[test]
    fn test_clear_errors_of_exited_threads() {
        let store = Arc::new(EventStore::default());
        for _ in 0..4 {
            let s = store.clone();
            thread::spawn(move || s.raise(EventType::Timeout)).join().unwrap();
        }
        store.raise(EventType::ResponseOverflow);
        assert_eq!(store.pending_error_count(), 5);

        store.clear_errors();
        assert_eq!(store.pending_error_count(), 0);
        assert_eq!(store.get_last_error().event_type, EventType::NoErrorFound);
    }

    #[test]
    fn test_worker_thread_downgrade() {
        let store = Arc::new(EventStore::default());
        let worker = store.clone();
        thread::spawn(move || {
            let _guard = worker.downgrade_current_thread();
            worker.raise(EventType::PacketDecodingError);
            assert_eq!(worker.get_last_error().event_type, EventType::NoErrorFound);
        })
        .join()
        .unwrap();

        let events = store.get_events(&EventFilter::all());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::PacketDecodingError);
        assert_eq!(events[0].severity, Severity::Warning);

        // After the guard is dropped errors go to the slot again
        store.raise(EventType::Timeout);
        assert_eq!(store.event_count(&EventFilter::all()), 0);
    }

    #[test]
    fn test_too_many_events() {
        let store = EventStore::new(10);
        for _ in 0..9 {
            store.report(EventType::Unknown, Severity::Info);
        }
        assert_eq!(store.event_count(&EventFilter::all()), 9);
        assert_eq!(store.event_count(&EventFilter::event_type(EventType::TooManyEvents)), 0);

        for _ in 0..25 {
            store.report(EventType::Unknown, Severity::Warning);
            assert!(store.event_count(&EventFilter::all()) <= 10);
        }
        assert_eq!(store.event_count(&EventFilter::event_type(EventType::TooManyEvents)), 1);

        let events = store.get_events(&EventFilter::all());
        assert_eq!(events.len(), 10);
        assert_eq!(events.last().map(|e| e.event_type), Some(EventType::TooManyEvents));
        assert!(events[..9].iter().all(|e| e.severity == Severity::Warning));
    }

    #[test]
    fn test_event_callbacks() {
        let store = EventStore::new(2);
        let count = Arc::new(AtomicUsize::new(0));
        let sentinels = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        store.add_event_callback(EventFilter::all(), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let s = sentinels.clone();
        let id = store.add_event_callback(EventFilter::event_type(EventType::TooManyEvents), move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        store.report(EventType::Unknown, Severity::Info);
        store.report(EventType::Unknown, Severity::Info);
        store.raise(EventType::Timeout);
        assert_eq!(count.load(Ordering::SeqCst), 4); // 3 events + 1 sentinel
        assert_eq!(sentinels.load(Ordering::SeqCst), 1);

        assert!(store.remove_event_callback(id));
        assert!(!store.remove_event_callback(id));
    }

    #[test]
    fn test_discard_and_limit() {
        let store = EventStore::new(100);
        for _ in 0..50 {
            store.report(EventType::Unknown, Severity::Info);
        }
        store.report(EventType::PollingMessageOverflow, Severity::Warning);
        store.raise(EventType::Timeout);
        assert_eq!(store.discard(&EventFilter::min_severity(Severity::Warning)), 2);
        assert_eq!(store.get_last_error().event_type, EventType::NoErrorFound);

        store.set_event_limit(11);
        assert_eq!(store.get_event_limit(), 11);
        assert_eq!(store.event_count(&EventFilter::all()), 11);
        assert_eq!(store.event_count(&EventFilter::event_type(EventType::TooManyEvents)), 1);
        store.drain();
        assert_eq!(store.event_count(&EventFilter::all()), 0);
    }
}

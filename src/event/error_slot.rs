//-----------------------------------------------------------------------------
// Module error_slot
// Types:
//  ErrorSlots

use parking_lot::Mutex;
use std::collections::HashMap;
use std::thread::ThreadId;

use super::EventRecord;

/// One single entry error cell per calling thread
/// Only the most recent error of a thread is kept, reading a slot clears it
/// A slot lives until its error is taken or the slots are cleared, errors of exited threads which were never read stay in the map
#[derive(Default)]
pub struct ErrorSlots {
    slots: Mutex<HashMap<ThreadId, EventRecord>>,
}

impl ErrorSlots {
    pub fn new() -> ErrorSlots {
        ErrorSlots::default()
    }

    /// Store an error in the slot of thread, overwriting a previous one
    pub fn set(&self, thread: ThreadId, mut record: EventRecord) {
        record.thread = Some(thread);
        self.slots.lock().insert(thread, record);
    }

    /// Take the error of thread, leaving the slot empty
    pub fn take(&self, thread: ThreadId) -> Option<EventRecord> {
        self.slots.lock().remove(&thread)
    }

    /// Get a copy of the error of thread without clearing it
    pub fn peek(&self, thread: ThreadId) -> Option<EventRecord> {
        self.slots.lock().get(&thread).cloned()
    }

    /// Number of threads with a pending error
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Drop the errors of all threads
    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

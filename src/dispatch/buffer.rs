//-----------------------------------------------------------------------------
// Module buffer
// Types:
//  BoundedBuffer

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;

//-----------------------------------------------------------------------------
// PushOutcome

/// Result of a push into a bounded buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOutcome {
    pub evicted: usize,       // Number of oldest entries dropped to make room
    pub sentinel_added: bool, // The overflow sentinel was inserted by this push
}

//-----------------------------------------------------------------------------
// BoundedBuffer

struct BufferState<T> {
    items: VecDeque<T>,
    sentinel: Option<T>,
    capacity: usize,
}

/// Fixed capacity FIFO with drop oldest overflow policy
///
/// A buffer created with a sentinel factory reserves one of its slots for an overflow sentinel.
/// The sentinel is inserted on the first eviction, it is always the logically last element and there is at most one until it is drained.
/// Size including the sentinel never exceeds the capacity.
pub struct BoundedBuffer<T> {
    state: Mutex<BufferState<T>>,
    sentinel_factory: Option<fn() -> T>,
}

impl<T> BoundedBuffer<T> {
    /// Create a buffer without overflow sentinel
    pub fn new(capacity: usize) -> BoundedBuffer<T> {
        BoundedBuffer {
            state: Mutex::new(BufferState {
                items: VecDeque::new(),
                sentinel: None,
                capacity,
            }),
            sentinel_factory: None,
        }
    }

    /// Create a buffer with one slot reserved for an overflow sentinel created by sentinel_factory
    pub fn with_sentinel(capacity: usize, sentinel_factory: fn() -> T) -> BoundedBuffer<T> {
        BoundedBuffer {
            state: Mutex::new(BufferState {
                items: VecDeque::new(),
                sentinel: None,
                capacity,
            }),
            sentinel_factory: Some(sentinel_factory),
        }
    }

    fn usable(&self, capacity: usize) -> usize {
        if self.sentinel_factory.is_some() { capacity.saturating_sub(1) } else { capacity }
    }

    // Drop oldest entries until limit is met and insert the sentinel if something was dropped
    fn evict(&self, state: &mut BufferState<T>, limit: usize) -> PushOutcome {
        let mut outcome = PushOutcome::default();
        while state.items.len() > limit {
            state.items.pop_front();
            outcome.evicted += 1;
        }
        if outcome.evicted > 0 && state.sentinel.is_none() && state.capacity > 0 {
            if let Some(factory) = self.sentinel_factory {
                state.sentinel = Some(factory());
                outcome.sentinel_added = true;
            }
        }
        outcome
    }

    /// Append an item, dropping the oldest entries when the buffer is full
    pub fn push(&self, item: T) -> PushOutcome {
        let mut state = self.state.lock();
        let usable = self.usable(state.capacity);
        if usable == 0 {
            // No room at all, the new item is the one dropped
            let mut outcome = self.evict(&mut state, 0);
            outcome.evicted += 1;
            if state.sentinel.is_none() && state.capacity > 0 {
                if let Some(factory) = self.sentinel_factory {
                    state.sentinel = Some(factory());
                    outcome.sentinel_added = true;
                }
            }
            return outcome;
        }
        let outcome = self.evict(&mut state, usable - 1);
        state.items.push_back(item);
        outcome
    }

    /// Remove and return all items matching the predicate, the relative order of the remainder is preserved
    /// The sentinel is tested like any other item and returned last
    pub fn take_matching<P>(&self, predicate: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        let mut state = self.state.lock();
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(state.items.len());
        for item in state.items.drain(..) {
            if predicate(&item) {
                taken.push(item);
            } else {
                kept.push_back(item);
            }
        }
        state.items = kept;
        if state.sentinel.as_ref().is_some_and(&predicate) {
            if let Some(sentinel) = state.sentinel.take() {
                taken.push(sentinel);
            }
        }
        taken
    }

    /// Remove and return all items including the sentinel
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.state.lock();
        let mut taken: Vec<T> = state.items.drain(..).collect();
        if let Some(sentinel) = state.sentinel.take() {
            taken.push(sentinel);
        }
        taken
    }

    /// Remove all items matching the predicate without returning them
    /// Returns the number of removed items
    pub fn discard_matching<P>(&self, predicate: P) -> usize
    where
        P: Fn(&T) -> bool,
    {
        self.take_matching(predicate).len()
    }

    /// Count the items matching the predicate
    pub fn count_matching<P>(&self, predicate: P) -> usize
    where
        P: Fn(&T) -> bool,
    {
        let state = self.state.lock();
        state.items.iter().filter(|item| predicate(item)).count() + state.sentinel.iter().filter(|item| predicate(item)).count()
    }

    /// Change the capacity, evicting the oldest entries if the buffer shrinks below its size
    pub fn set_capacity(&self, capacity: usize) -> PushOutcome {
        let mut state = self.state.lock();
        state.capacity = capacity;
        if capacity == 0 {
            state.sentinel = None;
        }
        let usable = self.usable(capacity);
        let outcome = self.evict(&mut state, usable);
        if outcome.evicted > 0 {
            warn!("BoundedBuffer: capacity reduced to {}, {} entries dropped", capacity, outcome.evicted);
        }
        outcome
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Number of stored items including the sentinel
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.items.len() + usize::from(state.sentinel.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if an overflow sentinel is present
    pub fn has_sentinel(&self) -> bool {
        self.state.lock().sentinel.is_some()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.items.clear();
        state.sentinel = None;
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

#[cfg(test)]
mod buffer_tests {

    use super::*;

    const SENTINEL: i32 = -1;

    fn sentinel() -> i32 {
        SENTINEL
    }

    #[test]
    fn test_fifo_order() {
        let buffer = BoundedBuffer::new(10);
        for i in 0..5 {
            assert_eq!(buffer.push(i), PushOutcome::default());
        }
        assert_eq!(buffer.drain(), vec![0, 1, 2, 3, 4]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drop_oldest_without_sentinel() {
        let buffer = BoundedBuffer::new(3);
        for i in 0..5 {
            buffer.push(i);
        }
        assert_eq!(buffer.len(), 3);
        assert!(!buffer.has_sentinel());
        assert_eq!(buffer.drain(), vec![2, 3, 4]);
    }

    #[test]
    fn test_single_sentinel() {
        let buffer = BoundedBuffer::with_sentinel(4, sentinel);
        for i in 0..3 {
            let outcome = buffer.push(i);
            assert_eq!(outcome.evicted, 0);
        }
        assert_eq!(buffer.len(), 3);
        assert!(!buffer.has_sentinel());

        let outcome = buffer.push(3);
        assert_eq!(outcome, PushOutcome { evicted: 1, sentinel_added: true });
        assert_eq!(buffer.len(), 4);

        // Further overflows do not add a second sentinel
        for i in 4..100 {
            let outcome = buffer.push(i);
            assert!(!outcome.sentinel_added);
            assert!(buffer.len() <= 4);
        }
        assert_eq!(buffer.count_matching(|v| *v == SENTINEL), 1);
        assert_eq!(buffer.drain(), vec![97, 98, 99, SENTINEL]);

        // After a full drain the next overflow adds a new sentinel
        for i in 0..4 {
            buffer.push(i);
        }
        assert!(buffer.has_sentinel());
    }

    #[test]
    fn test_take_matching_keeps_order() {
        let buffer = BoundedBuffer::new(10);
        for i in 0..8 {
            buffer.push(i);
        }
        assert_eq!(buffer.take_matching(|v| v % 2 == 0), vec![0, 2, 4, 6]);
        assert_eq!(buffer.drain(), vec![1, 3, 5, 7]);
    }

    #[test]
    fn test_sentinel_filtered_like_any_item() {
        let buffer = BoundedBuffer::with_sentinel(3, sentinel);
        for i in 0..5 {
            buffer.push(i);
        }
        assert_eq!(buffer.take_matching(|v| *v > 0), vec![3, 4]);
        assert!(buffer.has_sentinel());
        assert_eq!(buffer.take_matching(|_| true), vec![SENTINEL]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_shrink_capacity() {
        let buffer = BoundedBuffer::with_sentinel(10, sentinel);
        for i in 0..9 {
            buffer.push(i);
        }
        let outcome = buffer.set_capacity(4);
        assert_eq!(outcome.evicted, 6);
        assert!(outcome.sentinel_added);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.drain(), vec![6, 7, 8, SENTINEL]);
    }

    #[test]
    fn test_degenerate_capacity() {
        let buffer = BoundedBuffer::with_sentinel(1, sentinel);
        let outcome = buffer.push(1);
        assert_eq!(outcome, PushOutcome { evicted: 1, sentinel_added: true });
        assert_eq!(buffer.drain(), vec![SENTINEL]);

        let buffer = BoundedBuffer::new(0);
        assert_eq!(buffer.push(1).evicted, 1);
        assert!(buffer.is_empty());
    }
}

//-----------------------------------------------------------------------------
// Module registry
// Types:
//  CallbackRegistry

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::Filter;

/// Handle of a subscription, unique for the lifetime of a registry
pub type CallbackId = u64;

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

struct Subscription<T, F> {
    id: CallbackId,
    filter: F,
    callback: Callback<T>,
}

//-----------------------------------------------------------------------------
// CallbackRegistry

/// Thread safe list of (filter, callback) subscriptions
///
/// Dispatch takes a snapshot of the subscription list and invokes the matching callbacks in subscription order on the calling thread.
/// The registry lock is only held while the list is copied or mutated, never while a callback runs.
/// Callbacks may subscribe or unsubscribe (including themselves) while being invoked, changes take effect with the next dispatch.
pub struct CallbackRegistry<T, F> {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Arc<Subscription<T, F>>>>,
}

impl<T: 'static, F: Filter<T> + 'static> Default for CallbackRegistry<T, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static, F: Filter<T> + 'static> CallbackRegistry<T, F> {
    pub fn new() -> CallbackRegistry<T, F> {
        CallbackRegistry {
            next_id: AtomicU64::new(1),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Add a subscription, returns its id
    /// Ids are issued monotonically and never reused
    pub fn subscribe<C>(&self, filter: F, callback: C) -> CallbackId
    where
        C: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let subscription = Arc::new(Subscription {
            id,
            filter,
            callback: Box::new(callback),
        });
        self.subscriptions.lock().push(subscription);
        debug!("CallbackRegistry: subscribe id={}", id);
        id
    }

    /// Remove a subscription
    /// Returns false if there is no subscription with this id, which is not an error
    pub fn unsubscribe(&self, id: CallbackId) -> bool {
        let mut subscriptions = self.subscriptions.lock();
        if let Some(pos) = subscriptions.iter().position(|s| s.id == id) {
            subscriptions.remove(pos);
            debug!("CallbackRegistry: unsubscribe id={}", id);
            true
        } else {
            false
        }
    }

    /// Invoke all matching callbacks for item
    /// Returns the number of callbacks invoked
    pub fn dispatch(&self, item: &T) -> usize {
        let snapshot: Vec<Arc<Subscription<T, F>>> = self.subscriptions.lock().clone();
        let mut count = 0;
        for subscription in snapshot.iter() {
            if subscription.filter.matches(item) {
                (subscription.callback)(item);
                count += 1;
            }
        }
        count
    }

    /// Check if a subscription with this id exists
    pub fn contains(&self, id: CallbackId) -> bool {
        self.subscriptions.lock().iter().any(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.lock().is_empty()
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

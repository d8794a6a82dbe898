//-----------------------------------------------------------------------------
// Module bridge
// Synchronous transactions over asynchronously delivered response messages

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::dispatch::{CallbackRegistry, Filter};
use crate::error::{Error, Result};
use crate::message::Message;

//-----------------------------------------------------------------------------
// TransactionState

/// Idle -> Sent -> Receiving* -> Complete | Errored | TimedOut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Sent,
    Receiving,
    Complete,
    Errored,
    TimedOut,
}

impl TransactionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionState::Complete | TransactionState::Errored | TransactionState::TimedOut)
    }
}

/// Verdict of a response handler on one response message
#[derive(Debug)]
pub enum Progress {
    Pending,
    Complete,
    Failed(Error),
}

//-----------------------------------------------------------------------------
// Transaction

struct TransactionInner<T> {
    state: TransactionState,
    value: Option<T>,
    failure: Option<Error>,
}

/// One synchronous call spanning multiple asynchronous response deliveries
///
/// The transaction subscribes a temporary callback for the response stream, sends one request and blocks on its own condvar.
/// The waiter never holds the registry lock, the response callback only takes the transaction lock.
/// The temporary subscription is removed on every exit path before execute returns.
/// Responses dispatched after the terminal state was reached are ignored.
pub struct Transaction<T> {
    inner: Mutex<TransactionInner<T>>,
    done: Condvar,
}

impl<T: Send + 'static> Transaction<T> {
    /// Run a transaction
    ///
    /// # Arguments
    /// * `registry` - Registry the response messages are dispatched to
    /// * `filter` - Selects the response stream
    /// * `initial` - Initial accumulator value
    /// * `timeout` - Maximum time to wait for completion, measured on a monotonic clock, a timeout beyond the clock range waits without limit
    /// * `send` - Sends the request, called once after the response callback is subscribed
    /// * `handler` - Validates a response and updates the accumulator, must not modify the accumulator if it fails
    /// # Returns
    /// The accumulator on completion, the handler error, a send error or Error::Timeout otherwise
    pub fn execute<F, S, H>(registry: &CallbackRegistry<Message, F>, filter: F, initial: T, timeout: Duration, send: S, handler: H) -> Result<T>
    where
        F: Filter<Message> + 'static,
        S: FnOnce() -> Result<()>,
        H: Fn(&mut T, &Message) -> Progress + Send + Sync + 'static,
    {
        let transaction = Arc::new(Transaction {
            inner: Mutex::new(TransactionInner {
                state: TransactionState::Idle,
                value: Some(initial),
                failure: None,
            }),
            done: Condvar::new(),
        });

        // None waits without deadline
        let deadline = Instant::now().checked_add(timeout);

        let t = Arc::clone(&transaction);
        let id = registry.subscribe(filter, move |message: &Message| t.on_response(message, &handler));

        if let Err(e) = send() {
            registry.unsubscribe(id);
            debug!("Transaction: send failed: {}", e);
            return Err(e);
        }

        let (state, value, failure) = {
            let mut inner = transaction.inner.lock();
            if inner.state == TransactionState::Idle {
                inner.state = TransactionState::Sent;
            }
            while !inner.state.is_terminal() {
                match deadline {
                    Some(deadline) => {
                        if transaction.done.wait_until(&mut inner, deadline).timed_out() {
                            if !inner.state.is_terminal() {
                                inner.state = TransactionState::TimedOut;
                            }
                            break;
                        }
                    }
                    None => transaction.done.wait(&mut inner),
                }
            }
            (inner.state, inner.value.take(), inner.failure.take())
        };

        registry.unsubscribe(id);

        match (state, value) {
            (TransactionState::Complete, Some(value)) => {
                debug!("Transaction: complete");
                Ok(value)
            }
            (TransactionState::TimedOut, _) => {
                warn!("Transaction: timeout after {} ms", timeout.as_millis());
                Err(Error::Timeout(timeout.as_millis()))
            }
            _ => Err(failure.unwrap_or(Error::Decode("transaction failed"))),
        }
    }

    fn on_response<H>(&self, message: &Message, handler: &H)
    where
        H: Fn(&mut T, &Message) -> Progress,
    {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            trace!("Transaction: late response dropped");
            return;
        }
        let progress = match inner.value.as_mut() {
            Some(value) => handler(value, message),
            None => return,
        };
        match progress {
            Progress::Pending => inner.state = TransactionState::Receiving,
            Progress::Complete => {
                inner.state = TransactionState::Complete;
                self.done.notify_all();
            }
            Progress::Failed(e) => {
                debug!("Transaction: response rejected: {}", e);
                inner.state = TransactionState::Errored;
                inner.failure = Some(e);
                self.done.notify_all();
            }
        }
    }
}

//-------------------------------------------------------------------------------------------------
// Test module

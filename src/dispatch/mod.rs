//-----------------------------------------------------------------------------
// Module dispatch
// Filtered callback registry and bounded buffers shared by messages and events

mod buffer;
mod registry;

pub use buffer::BoundedBuffer;
pub use buffer::PushOutcome;
pub use registry::CallbackId;
pub use registry::CallbackRegistry;

//-----------------------------------------------------------------------------
// Filter

/// Predicate selecting the items a subscription receives or a poll removes
pub trait Filter<T>: Send + Sync {
    fn matches(&self, item: &T) -> bool;
}

impl<T, F: Filter<T> + ?Sized> Filter<T> for Box<F> {
    fn matches(&self, item: &T) -> bool {
        (**self).matches(item)
    }
}

/// Filter matching every item
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl<T> Filter<T> for MatchAll {
    fn matches(&self, _item: &T) -> bool {
        true
    }
}

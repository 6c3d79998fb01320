//! Observer/Subject notification fabric
//!
//! A [`Subject`] holds weak back-references to its observers. It never keeps an
//! observer alive: dropping the last `Arc` to an observer unsubscribes it.
//!
//! `notify()` works on a snapshot of the observer list taken under a short read
//! lock, so `attach`/`detach` from another thread (or from inside an `update`)
//! never corrupts an in-flight notification.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Failure reported by an observer's `update`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("observer update failed: {0}")]
pub struct ObserverError(pub String);

impl ObserverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Receiver of messages of type `T`
///
/// `update` runs synchronously on the notifying thread (usually an engine
/// worker). It must not block: push onto a private queue and return.
pub trait Observer<T>: Send + Sync {
    fn update(&self, message: &T) -> Result<(), ObserverError>;
}

/// One-to-many broadcaster of `T` messages
pub struct Subject<T> {
    observers: RwLock<Vec<Weak<dyn Observer<T>>>>,
}

/// Identity of an observer, independent of the trait-object vtable
fn identity<T>(observer: &Weak<dyn Observer<T>>) -> *const () {
    observer.as_ptr() as *const ()
}

impl<T> Subject<T> {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer
    ///
    /// Returns `false` if it was already attached.
    pub fn attach<O>(&self, observer: &Arc<O>) -> bool
    where
        O: Observer<T> + 'static,
    {
        let as_dyn: Arc<dyn Observer<T>> = observer.clone();
        let weak = Arc::downgrade(&as_dyn);
        let id = identity(&weak);

        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        observers.retain(|o| o.strong_count() > 0);
        if observers.iter().any(|o| identity(o) == id) {
            return false;
        }
        observers.push(weak);
        true
    }

    /// Deregister an observer
    ///
    /// Returns `false` if it was not attached.
    pub fn detach<O>(&self, observer: &Arc<O>) -> bool
    where
        O: Observer<T> + 'static,
    {
        let id = Arc::as_ptr(observer) as *const ();
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let found = observers
            .iter()
            .any(|o| identity(o) == id && o.strong_count() > 0);
        observers.retain(|o| identity(o) != id && o.strong_count() > 0);
        found
    }

    /// Number of live observers; prunes dropped ones
    pub fn observer_count(&self) -> usize {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        observers.retain(|o| o.strong_count() > 0);
        observers.len()
    }

    /// Deliver `message` to every live observer in attachment order
    ///
    /// Each call is isolated: an `Err` or a panic from one observer is logged
    /// and the remaining observers are still notified. Returns the number of
    /// observers that accepted the message.
    pub fn notify(&self, message: &T) -> usize {
        let snapshot: Vec<Arc<dyn Observer<T>>> = {
            let observers = self
                .observers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            observers.iter().filter_map(Weak::upgrade).collect()
        };

        let mut delivered = 0;
        for observer in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| observer.update(message))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => log::warn!("Subject: {}", e),
                Err(_) => log::error!("Subject: observer panicked during update"),
            }
        }
        delivered
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

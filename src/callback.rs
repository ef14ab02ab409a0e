//! Ordered, cancellable observer lists.
//!
//! [`CallbackHandleCollection`] is the uniform primitive behind mouse-event
//! dispatch, per-frame render hooks and item-change notification: multiple
//! independent subscribers observe the same event without coupling to each
//! other. Dispatch is FIFO in registration order and a callback may halt the
//! current dispatch by returning [`CallbackStatus::Stop`].
//!
//! Every subscription returns a [`CallbackHandle`]; the owner must release
//! it when deactivating, or the callback keeps firing.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Result of a single callback invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackStatus {
    /// Keep dispatching to the remaining callbacks.
    #[default]
    Continue,
    /// Halt the current dispatch. Remaining callbacks are skipped for this
    /// call only; they stay registered for the next one.
    Stop,
}

type Callback<Args> = Box<dyn FnMut(&Args) -> CallbackStatus>;

struct Entry<Args> {
    id: u64,
    // Taken out during its own invocation so a callback may re-enter the
    // collection (add/release) without a double borrow.
    callback: Option<Callback<Args>>,
}

struct Inner<Args> {
    next_id: u64,
    entries: Vec<Entry<Args>>,
}

/// Handle to a single registered callback.
///
/// `release()` removes exactly that callback and is idempotent; releasing a
/// handle whose collection is already gone is a silent no-op. Dropping the
/// handle without releasing leaves the callback registered.
pub struct CallbackHandle {
    id: u64,
    release: Option<Box<dyn FnOnce(u64)>>,
}

impl CallbackHandle {
    /// The id assigned at registration. Ids are never reused within one
    /// collection.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the registered callback. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}

impl std::fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandle")
            .field("id", &self.id)
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// An ordered collection of callbacks sharing one argument type.
pub struct CallbackHandleCollection<Args> {
    inner: Rc<RefCell<Inner<Args>>>,
}

impl<Args: 'static> Default for CallbackHandleCollection<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Clone for CallbackHandleCollection<Args> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<Args: 'static> CallbackHandleCollection<Args> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a callback; returns the handle used to release it.
    pub fn add(&self, callback: impl FnMut(&Args) -> CallbackStatus + 'static) -> CallbackHandle {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(Entry {
            id,
            callback: Some(Box::new(callback)),
        });

        let weak: Weak<RefCell<Inner<Args>>> = Rc::downgrade(&self.inner);
        CallbackHandle {
            id,
            release: Some(Box::new(move |id| {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().entries.retain(|e| e.id != id);
                }
            })),
        }
    }

    /// Remove a callback by id. No-op if already removed.
    pub fn remove(&self, id: u64) {
        self.inner.borrow_mut().entries.retain(|e| e.id != id);
    }

    /// Invoke all registered callbacks in insertion order.
    ///
    /// Stops early if any callback returns [`CallbackStatus::Stop`] and
    /// reports that status. Callbacks registered during the dispatch are not
    /// invoked until the next call.
    pub fn call(&self, args: &Args) -> CallbackStatus {
        let ids: Vec<u64> = self.inner.borrow().entries.iter().map(|e| e.id).collect();

        for id in ids {
            let callback = {
                let mut inner = self.inner.borrow_mut();
                match inner.entries.iter_mut().find(|e| e.id == id) {
                    Some(entry) => entry.callback.take(),
                    None => None, // released mid-dispatch
                }
            };
            let Some(mut callback) = callback else {
                continue;
            };

            let status = callback(args);

            // Hand the callback back unless it released itself meanwhile.
            let mut inner = self.inner.borrow_mut();
            if let Some(entry) = inner.entries.iter_mut().find(|e| e.id == id) {
                entry.callback = Some(callback);
            }

            if status == CallbackStatus::Stop {
                return CallbackStatus::Stop;
            }
        }

        CallbackStatus::Continue
    }

    /// Number of live callbacks.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Drop all registered callbacks.
    pub fn clear(&self) {
        self.inner.borrow_mut().entries.clear();
    }
}

impl<Args: 'static> std::fmt::Debug for CallbackHandleCollection<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandleCollection")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callbacks_run_in_insertion_order() {
        let collection: CallbackHandleCollection<()> = CallbackHandleCollection::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let order = Rc::clone(&order);
            let _handle = collection.add(move |_| {
                order.borrow_mut().push(i);
                CallbackStatus::Continue
            });
        }

        collection.call(&());
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_stop_halts_current_dispatch_only() {
        let collection: CallbackHandleCollection<()> = CallbackHandleCollection::new();
        let calls = Rc::new(RefCell::new(Vec::new()));

        let c = Rc::clone(&calls);
        let _h1 = collection.add(move |_| {
            c.borrow_mut().push("first");
            CallbackStatus::Stop
        });
        let c = Rc::clone(&calls);
        let _h2 = collection.add(move |_| {
            c.borrow_mut().push("second");
            CallbackStatus::Continue
        });

        assert_eq!(collection.call(&()), CallbackStatus::Stop);
        assert_eq!(*calls.borrow(), vec!["first"]);

        // Stop does not persist: the next call reaches every live callback
        // again, and still halts at the stopping one.
        collection.call(&());
        assert_eq!(*calls.borrow(), vec!["first", "first"]);
    }

    #[test]
    fn test_release_removes_single_entry() {
        let collection: CallbackHandleCollection<()> = CallbackHandleCollection::new();
        let hits = Rc::new(RefCell::new(0));

        let h = Rc::clone(&hits);
        let mut first = collection.add(move |_| {
            *h.borrow_mut() += 1;
            CallbackStatus::Continue
        });
        let h = Rc::clone(&hits);
        let _second = collection.add(move |_| {
            *h.borrow_mut() += 10;
            CallbackStatus::Continue
        });

        first.release();
        collection.call(&());
        assert_eq!(*hits.borrow(), 10);
    }

    #[test]
    fn test_release_is_idempotent() {
        let collection: CallbackHandleCollection<()> = CallbackHandleCollection::new();
        let mut handle = collection.add(|_| CallbackStatus::Continue);
        let _other = collection.add(|_| CallbackStatus::Continue);

        handle.release();
        handle.release(); // second release must not remove anything else
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_release_after_collection_dropped() {
        let collection: CallbackHandleCollection<()> = CallbackHandleCollection::new();
        let mut handle = collection.add(|_| CallbackStatus::Continue);
        drop(collection);
        handle.release(); // silent no-op
    }

    #[test]
    fn test_callback_may_release_itself_mid_dispatch() {
        let collection: CallbackHandleCollection<()> = CallbackHandleCollection::new();
        let count = Rc::new(RefCell::new(0));

        let handle: Rc<RefCell<Option<CallbackHandle>>> = Rc::new(RefCell::new(None));
        let handle_clone = Rc::clone(&handle);
        let c = Rc::clone(&count);
        let h = collection.add(move |_| {
            *c.borrow_mut() += 1;
            if let Some(handle) = handle_clone.borrow_mut().as_mut() {
                handle.release();
            }
            CallbackStatus::Continue
        });
        *handle.borrow_mut() = Some(h);

        collection.call(&());
        collection.call(&());
        assert_eq!(*count.borrow(), 1);
        assert!(collection.is_empty());
    }

    #[test]
    fn test_clear_drops_everything() {
        let collection: CallbackHandleCollection<()> = CallbackHandleCollection::new();
        let _a = collection.add(|_| CallbackStatus::Continue);
        let _b = collection.add(|_| CallbackStatus::Continue);
        collection.clear();
        assert!(collection.is_empty());
    }
}

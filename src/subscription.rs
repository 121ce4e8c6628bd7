//! Listener bookkeeping shared by the document store and the auth provider.
//!
//! Events are never handed to a listener while the producer is running.
//! They are queued per listener and delivered later by `deliver_pending`,
//! one at a time and in the order they were queued, which is how the event
//! loop of a UI thread hands out notifications. Cancelling a subscription
//! drops whatever was still queued for it, so a replaced or torn-down view
//! never sees a stale snapshot.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;

pub type ListenerId = u64;

/// Handle to a registered listener. Dropping it releases the listener.
#[must_use = "dropping a subscription cancels it immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Releases the listener. Calling it again does nothing.
    pub fn cancel(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

type Callback<E> = Rc<RefCell<dyn FnMut(&E)>>;

struct Listener<K, E> {
    key: K,
    callback: Callback<E>,
}

struct Inner<K, E> {
    next_id: ListenerId,
    listeners: BTreeMap<ListenerId, Listener<K, E>>,
    pending: VecDeque<(ListenerId, E)>,
}

/// Listeners keyed by what they asked for (`K`), receiving events `E`
pub struct Registry<K, E> {
    inner: Rc<RefCell<Inner<K, E>>>,
}

impl<K: Clone + 'static, E: 'static> Registry<K, E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                next_id: 1,
                listeners: BTreeMap::new(),
                pending: VecDeque::new(),
            })),
        }
    }

    pub fn register(
        &self,
        key: K,
        callback: impl FnMut(&E) + 'static,
    ) -> (ListenerId, Subscription) {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(
                id,
                Listener {
                    key,
                    callback: Rc::new(RefCell::new(callback)),
                },
            );
            id
        };
        tracing::debug!(listener = id, "listener registered");

        let registry = Rc::downgrade(&self.inner);
        let subscription = Subscription::new(move || {
            let Some(inner) = registry.upgrade() else {
                return;
            };
            // The listener is dropped after the borrow ends so a callback
            // owning other subscriptions can release them.
            let removed = {
                let mut inner = inner.borrow_mut();
                inner.pending.retain(|(target, _)| *target != id);
                inner.listeners.remove(&id)
            };
            if removed.is_some() {
                tracing::debug!(listener = id, "listener released");
            }
            drop(removed);
        });

        (id, subscription)
    }

    /// Queues an event for one listener. Ignored if it is no longer registered.
    pub fn enqueue(&self, id: ListenerId, event: E) {
        let mut inner = self.inner.borrow_mut();
        if inner.listeners.contains_key(&id) {
            inner.pending.push_back((id, event));
        }
    }

    /// Snapshot of the registered listeners and their keys
    pub fn keys(&self) -> Vec<(ListenerId, K)> {
        self.inner
            .borrow()
            .listeners
            .iter()
            .map(|(id, listener)| (*id, listener.key.clone()))
            .collect()
    }

    pub fn active(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Delivers queued events in FIFO order and returns how many were
    /// delivered. Events queued by callbacks are delivered in the same call.
    pub fn deliver_pending(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let Some((id, event)) = inner.pending.pop_front() else {
                    break;
                };
                inner
                    .listeners
                    .get(&id)
                    .map(|listener| (Rc::clone(&listener.callback), event))
            };

            if let Some((callback, event)) = next {
                (&mut *callback.borrow_mut())(&event);
                delivered += 1;
            }
        }
        delivered
    }
}

impl<K: Clone + 'static, E: 'static> Default for Registry<K, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl FnMut(&u32) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |event: &u32| sink.borrow_mut().push(*event))
    }

    #[test]
    fn test_events_are_delivered_in_order_only_when_pumped() {
        let registry: Registry<(), u32> = Registry::new();
        let (seen, callback) = recorder();
        let (id, _subscription) = registry.register((), callback);

        registry.enqueue(id, 1);
        registry.enqueue(id, 2);
        registry.enqueue(id, 3);
        assert!(seen.borrow().is_empty());

        assert_eq!(registry.deliver_pending(), 3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_cancel_is_idempotent_and_drops_queued_events() {
        let registry: Registry<(), u32> = Registry::new();
        let (seen, callback) = recorder();
        let (id, mut subscription) = registry.register((), callback);
        registry.enqueue(id, 7);

        subscription.cancel();
        subscription.cancel();

        assert!(!subscription.is_active());
        assert_eq!(registry.active(), 0);
        assert_eq!(registry.pending(), 0);
        assert_eq!(registry.deliver_pending(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_dropping_the_handle_releases_the_listener() {
        let registry: Registry<&'static str, u32> = Registry::new();
        let (_, callback) = recorder();
        {
            let (_id, _subscription) = registry.register("open", callback);
            assert_eq!(registry.active(), 1);
            assert_eq!(registry.keys()[0].1, "open");
        }
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn test_enqueue_for_released_listener_is_ignored() {
        let registry: Registry<(), u32> = Registry::new();
        let (_, callback) = recorder();
        let (id, subscription) = registry.register((), callback);
        drop(subscription);

        registry.enqueue(id, 1);

        assert_eq!(registry.pending(), 0);
    }

    #[test]
    fn test_listener_can_cancel_itself_while_being_called() {
        let registry: Registry<(), u32> = Registry::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(Cell::new(0));

        let own_slot = Rc::clone(&slot);
        let own_calls = Rc::clone(&calls);
        let (id, subscription) = registry.register((), move |_event: &u32| {
            own_calls.set(own_calls.get() + 1);
            if let Some(mut subscription) = own_slot.borrow_mut().take() {
                subscription.cancel();
            }
        });
        *slot.borrow_mut() = Some(subscription);

        registry.enqueue(id, 1);
        registry.enqueue(id, 2);
        registry.deliver_pending();

        assert_eq!(calls.get(), 1);
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn test_handle_outliving_registry_is_harmless() {
        let registry: Registry<(), u32> = Registry::new();
        let (_, callback) = recorder();
        let (_id, mut subscription) = registry.register((), callback);
        drop(registry);

        subscription.cancel();

        assert!(!subscription.is_active());
    }
}

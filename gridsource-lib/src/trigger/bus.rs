//! Synchronous, ordered event bus.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::trace;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct BusInner<E> {
    listeners: Vec<(u64, Listener<E>)>,
    queue: VecDeque<E>,
    delivering: bool,
    next_id: u64,
}

/// Event channel delivering events synchronously, in post order.
///
/// Posting while a delivery is in progress (for example from inside a
/// listener) queues the event; it is delivered after the current event has
/// reached every listener. Listeners are never invoked re-entrantly.
///
/// The bus is cheap to clone; clones share listeners and the queue.
///
/// # Example
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use gridsource_lib::trigger::TriggerBus;
///
/// let bus = TriggerBus::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&seen);
/// let sub = bus.subscribe(move |n: &u32| sink.lock().unwrap().push(*n));
///
/// bus.post(1);
/// bus.post(2);
/// sub.unsubscribe();
/// bus.post(3);
///
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
/// ```
pub struct TriggerBus<E> {
    inner: Arc<Mutex<BusInner<E>>>,
}

impl<E> TriggerBus<E> {
    /// Creates a bus with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                listeners: Vec::new(),
                queue: VecDeque::new(),
                delivering: false,
                next_id: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusInner<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a listener. Returns the handle that removes it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
        E: Send + 'static,
    {
        let mut guard = self.lock();
        let id = guard.next_id;
        guard.next_id += 1;
        guard.listeners.push((id, Arc::new(listener)));

        let weak: Weak<Mutex<BusInner<E>>> = Arc::downgrade(&self.inner);
        Subscription {
            remove: Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
                    guard.listeners.retain(|(lid, _)| *lid != id);
                }
            }),
        }
    }

    /// Posts an event.
    ///
    /// If no delivery is running, the event (and anything queued while it is
    /// delivered) reaches all listeners before this call returns.
    pub fn post(&self, event: E) {
        let mut guard = self.lock();
        guard.queue.push_back(event);
        if guard.delivering {
            trace!("bus busy, queued event ({} pending)", guard.queue.len());
            return;
        }
        guard.delivering = true;
        drop(guard);

        let _reset = DeliveryReset { inner: &*self.inner };
        loop {
            let mut guard = self.lock();
            let Some(event) = guard.queue.pop_front() else {
                break;
            };
            let listeners: Vec<Listener<E>> =
                guard.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
            drop(guard);

            for listener in &listeners {
                listener(&event);
            }
        }
    }

    /// Removes every listener and drops queued events.
    pub fn clear(&self) {
        let mut guard = self.lock();
        guard.listeners.clear();
        guard.queue.clear();
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

impl<E> Default for TriggerBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for TriggerBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> std::fmt::Debug for TriggerBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.lock();
        f.debug_struct("TriggerBus")
            .field("listeners", &guard.listeners.len())
            .field("queued", &guard.queue.len())
            .field("delivering", &guard.delivering)
            .finish()
    }
}

/// Clears the delivering flag when delivery ends, including on unwind.
struct DeliveryReset<'a, E> {
    inner: &'a Mutex<BusInner<E>>,
}

impl<E> Drop for DeliveryReset<'_, E> {
    fn drop(&mut self) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.delivering = false;
        if std::thread::panicking() {
            guard.queue.clear();
        }
    }
}

/// Handle returned by [`TriggerBus::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
pub struct Subscription {
    remove: Box<dyn FnOnce() + Send + Sync>,
}

impl Subscription {
    /// Removes the listener from the bus.
    pub fn unsubscribe(self) {
        (self.remove)();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Subscription(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Clone) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, move |s: &str| sink.lock().unwrap().push(s.to_string()))
    }

    #[test]
    fn test_delivery_in_post_order() {
        let bus = TriggerBus::new();
        let (log, record) = recorder();
        let _sub = bus.subscribe(move |n: &u32| record(&n.to_string()));

        for n in 0..5 {
            bus.post(n);
        }
        assert_eq!(*log.lock().unwrap(), vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn test_post_from_listener_is_queued_not_reentrant() {
        let bus: TriggerBus<u32> = TriggerBus::new();
        let (log, record) = recorder();

        let inner_bus = bus.clone();
        let first = record.clone();
        let _a = bus.subscribe(move |n: &u32| {
            first(&format!("a:start:{n}"));
            if *n == 1 {
                inner_bus.post(2);
            }
            first(&format!("a:end:{n}"));
        });
        let second = record.clone();
        let _b = bus.subscribe(move |n: &u32| second(&format!("b:{n}")));

        bus.post(1);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:start:1", "a:end:1", "b:1", "a:start:2", "a:end:2", "b:2"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let bus = TriggerBus::new();
        let (log, record) = recorder();
        let sub = bus.subscribe(move |n: &u32| record(&n.to_string()));
        assert_eq!(bus.listener_count(), 1);

        bus.post(1);
        sub.unsubscribe();
        bus.post(2);

        assert_eq!(bus.listener_count(), 0);
        assert_eq!(*log.lock().unwrap(), vec!["1"]);
    }

    #[test]
    fn test_clear_removes_listeners() {
        let bus = TriggerBus::new();
        let (log, record) = recorder();
        let _sub = bus.subscribe(move |n: &u32| record(&n.to_string()));

        bus.clear();
        bus.post(1);

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_listener_panic_does_not_wedge_bus() {
        let bus: TriggerBus<u32> = TriggerBus::new();
        let (log, record) = recorder();
        let _sub = bus.subscribe(move |n: &u32| {
            if *n == 0 {
                panic!("listener failure");
            }
            record(&n.to_string());
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| bus.post(0)));
        assert!(result.is_err());

        bus.post(1);
        assert_eq!(*log.lock().unwrap(), vec!["1"]);
    }
}

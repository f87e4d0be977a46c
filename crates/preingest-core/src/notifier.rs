//! Publish/subscribe fan-out of lifecycle notifications.
//!
//! Two kinds of observers attach to an [`EventNotifier`]:
//!
//! - in-process listeners registered with [`EventNotifier::subscribe`], called
//!   synchronously on the publishing thread (the action recorder is one);
//! - live streams from [`EventNotifier::stream`], backed by a tokio broadcast
//!   channel (the SSE endpoint is one).
//!
//! Delivery is fire-and-forget. A stream that is not attached when an event is
//! published never sees it, and a stream that lags behind the channel capacity
//! loses the oldest events.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::broadcast;

use crate::action::PreingestEvent;

const STREAM_CAPACITY: usize = 256;

/// Receives every notification published while it is subscribed.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &PreingestEvent);
}

impl<F> EventListener for F
where
    F: Fn(&PreingestEvent) + Send + Sync,
{
    fn on_event(&self, event: &PreingestEvent) {
        self(event)
    }
}

type ListenerList = Vec<(u64, Arc<dyn EventListener>)>;

struct Inner {
    tx: broadcast::Sender<PreingestEvent>,
    listeners: Mutex<ListenerList>,
    next_id: AtomicU64,
}

impl Inner {
    fn listeners(&self) -> MutexGuard<'_, ListenerList> {
        // A listener that panicked must not take the notifier down with it.
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared notification hub. Cloning yields another handle to the same hub.
#[derive(Clone)]
pub struct EventNotifier {
    inner: Arc<Inner>,
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EventNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(STREAM_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                tx,
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register `listener` until the returned [`Subscription`] is dropped.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners().push((id, listener));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Attach a live stream. Only events published after this call are seen.
    pub fn stream(&self) -> broadcast::Receiver<PreingestEvent> {
        self.inner.tx.subscribe()
    }

    /// Deliver `event` to all current listeners and streams.
    ///
    /// Never blocks on slow or absent subscribers.
    pub fn publish(&self, event: PreingestEvent) {
        // Snapshot so listeners may subscribe/unsubscribe from inside a callback.
        let listeners: Vec<Arc<dyn EventListener>> = self
            .inner
            .listeners()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            // A panicking listener must not cost the others (or the step) the event.
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(&event)));
            if let Err(cause) = delivered {
                tracing::error!(
                    process_id = %event.process_id(),
                    phase = %event.action_type,
                    cause = panic_message(&*cause),
                    "event listener panicked"
                );
            }
        }

        // Err only means nobody is streaming right now.
        let _ = self.inner.tx.send(event);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }

    pub fn stream_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Handle to a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionPhase, ResultPayload};
    use chrono::Utc;

    fn event(description: &str) -> PreingestEvent {
        PreingestEvent {
            description: description.to_string(),
            initiate: Utc::now(),
            action_type: ActionPhase::Executing,
            preingest_action: ResultPayload::default(),
        }
    }

    fn collecting() -> (Arc<Mutex<Vec<String>>>, Arc<dyn EventListener>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: Arc<dyn EventListener> = Arc::new(move |e: &PreingestEvent| {
            sink.lock().unwrap().push(e.description.clone());
        });
        (seen, listener)
    }

    #[test]
    fn listener_receives_events_until_unsubscribed() {
        let notifier = EventNotifier::new();
        let (seen, listener) = collecting();

        let sub = notifier.subscribe(listener);
        notifier.publish(event("one"));
        sub.unsubscribe();
        notifier.publish(event("two"));

        assert_eq!(*seen.lock().unwrap(), vec!["one"]);
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn dropping_subscription_detaches_listener() {
        let notifier = EventNotifier::new();
        let (seen, listener) = collecting();
        {
            let _sub = notifier.subscribe(listener);
            assert_eq!(notifier.listener_count(), 1);
        }
        notifier.publish(event("after drop"));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let notifier = EventNotifier::new();
        notifier.publish(event("nobody listening"));
        assert_eq!(notifier.stream_count(), 0);
    }

    #[test]
    fn late_stream_misses_earlier_events() {
        let notifier = EventNotifier::new();
        notifier.publish(event("before"));
        let mut rx = notifier.stream();
        notifier.publish(event("after"));

        assert_eq!(rx.try_recv().unwrap().description, "after");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn panicking_listener_does_not_stop_delivery() {
        let notifier = EventNotifier::new();
        let _faulty = notifier.subscribe(Arc::new(|_: &PreingestEvent| panic!("listener bug")));
        let (seen, listener) = collecting();
        let _sub = notifier.subscribe(listener);
        let mut rx = notifier.stream();

        notifier.publish(event("one"));
        notifier.publish(event("two"));

        assert_eq!(*seen.lock().unwrap(), vec!["one", "two"]);
        assert_eq!(rx.try_recv().unwrap().description, "one");
        assert_eq!(notifier.listener_count(), 2);
    }

    #[test]
    fn clones_share_the_same_hub() {
        let notifier = EventNotifier::new();
        let other = notifier.clone();
        let (seen, listener) = collecting();
        let _sub = notifier.subscribe(listener);

        other.publish(event("via clone"));
        assert_eq!(*seen.lock().unwrap(), vec!["via clone"]);
    }

    #[test]
    fn concurrent_publishers_reach_every_listener() {
        let notifier = EventNotifier::new();
        let (seen, listener) = collecting();
        let _sub = notifier.subscribe(listener);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let n = notifier.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        n.publish(event(&format!("{i}-{j}")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(seen.lock().unwrap().len(), 100);
    }
}

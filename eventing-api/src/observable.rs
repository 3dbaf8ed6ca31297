//! Synchronous publish/subscribe sink
//!
//! Callback-list observable used for the per-subscription notification
//! stream and the manager's aggregate health flag. Every publish invokes
//! all subscribers synchronously, in subscription order, so observers see
//! values in receipt order.

use std::fmt;
use std::sync::Mutex;

type Callback<T> = Box<dyn Fn(&T) + Send>;

pub struct Observable<T> {
    subscribers: Mutex<Vec<Callback<T>>>,
}

impl<T> Observable<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register an observer. Observers cannot be removed; they live as
    /// long as the observable.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + 'static) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(Box::new(callback));
        }
    }

    /// Deliver a value to every observer, synchronously.
    pub fn publish(&self, value: &T) {
        if let Ok(subscribers) = self.subscribers.lock() {
            for callback in subscribers.iter() {
                callback(value);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<T> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn publish_reaches_all_subscribers_in_order() {
        let observable = Observable::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            observable.subscribe(move |value: &u32| {
                seen.lock().unwrap().push((tag, *value));
            });
        }

        observable.publish(&7);
        observable.publish(&8);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![("first", 7), ("second", 7), ("first", 8), ("second", 8)]
        );
    }

    #[test]
    fn publish_is_synchronous() {
        let observable = Observable::<()>::new();
        let count = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&count);
        observable.subscribe(move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        observable.publish(&());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_subscribers_is_fine() {
        let observable = Observable::<String>::new();
        observable.publish(&"nobody home".to_string());
        assert_eq!(observable.subscriber_count(), 0);
    }
}

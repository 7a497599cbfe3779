use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tokio::sync::mpsc;

type Observer<S> = Arc<dyn Fn(&Arc<S>) + Send + Sync>;

struct Inner<S> {
    current: RwLock<Arc<S>>,
    observers: Mutex<Vec<(u64, Observer<S>)>>,
    next_id: AtomicU64,
    /// Held across swap + notify so observers see snapshots in replace order.
    /// Reentrant so an observer may itself call `replace`.
    publish: ReentrantMutex<()>,
}

impl<S> Inner<S> {
    fn remove(&self, id: u64) {
        self.observers.lock().retain(|(observer, _)| *observer != id);
    }
}

/// Holds the one current snapshot of a feature and fans it out to observers.
///
/// Snapshots are never mutated in place: `replace` swaps the whole value and
/// every observer receives the full new snapshot.
pub struct Store<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<S: Default + Send + Sync + 'static> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Send + Sync + 'static> Store<S> {
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                current: RwLock::new(Arc::new(initial)),
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                publish: ReentrantMutex::new(()),
            }),
        }
    }

    pub fn current(&self) -> Arc<S> {
        self.inner.current.read().clone()
    }

    pub fn replace(&self, next: S) {
        let _publishing = self.inner.publish.lock();
        let next = Arc::new(next);
        *self.inner.current.write() = next.clone();
        let observers: Vec<Observer<S>> = self.inner.observers.lock().iter().map(|(_, o)| o.clone()).collect();
        for observer in observers {
            observer(&next);
        }
    }

    /// Called on every later `replace`. Dropping the returned handle unsubscribes.
    pub fn subscribe(&self, observer: impl Fn(&Arc<S>) + Send + Sync + 'static) -> Subscription {
        let id = self.insert(Arc::new(observer));
        let inner: Weak<Inner<S>> = Arc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.remove(id);
                }
            })),
        }
    }

    /// Channel of snapshots, starting with the current one. The subscription
    /// ends once the receiver is dropped and the next snapshot is published.
    pub fn updates(&self) -> mpsc::UnboundedReceiver<Arc<S>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _publishing = self.inner.publish.lock();
        let _ = tx.send(self.current());
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let inner: Weak<Inner<S>> = Arc::downgrade(&self.inner);
        let observer: Observer<S> = Arc::new(move |state: &Arc<S>| {
            if tx.send(state.clone()).is_err() {
                if let Some(inner) = inner.upgrade() {
                    inner.remove(id);
                }
            }
        });
        self.inner.observers.lock().push((id, observer));
        rx
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }

    fn insert(&self, observer: Observer<S>) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.observers.lock().push((id, observer));
        id
    }
}

#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    /// Keep the observer for the lifetime of the store.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

//! Ordered observer registries.
//!
//! Listeners receive notifications only; they cannot change how a message is
//! processed. Behavior is customized through [`MidiCiStrategy`](crate::MidiCiStrategy).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::RwLock;

/// Handle returned by [`Listeners::add`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Listeners<T> {
    entries: RwLock<Vec<(ListenerId, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> std::fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if the listener was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(i, _)| *i != id);
        entries.len() != before
    }

    /// Calls every listener in registration order.
    pub fn notify(&self, value: &T) {
        // snapshot so listeners may add or remove listeners re-entrantly
        let snapshot: Vec<Callback<T>> = self.entries.read().iter().map(|(_, f)| f.clone()).collect();
        for listener in snapshot {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<T: Clone + Send + 'static> Listeners<T> {
    /// Mirrors every notification into an unbounded channel.
    ///
    /// The listener stays registered after the receiver is dropped; sends to a
    /// disconnected channel are ignored.
    pub fn channel(&self) -> Receiver<T> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.add(move |value: &T| {
            let _ = tx.send(value.clone());
        });
        rx
    }
}

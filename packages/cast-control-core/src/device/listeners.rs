//! Listener bookkeeping shared by session implementations.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::traits::{ListenerId, StatusListener};
use super::types::{DeviceEvent, EventCategory};

struct Registration {
    categories: HashSet<EventCategory>,
    listener: Arc<dyn StatusListener>,
}

/// Thread-safe set of subscribed listeners keyed by [`ListenerId`].
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: DashMap<ListenerId, Registration>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        categories: &[EventCategory],
        listener: Arc<dyn StatusListener>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(
            id,
            Registration {
                categories: categories.iter().copied().collect(),
                listener,
            },
        );
        id
    }

    /// Returns whether the id was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&self) {
        self.listeners.clear();
    }

    /// Delivers `event` to every listener subscribed to its category.
    ///
    /// Listeners are collected first and invoked outside the map's shard
    /// locks, so a listener may unsubscribe itself from inside the callback.
    pub fn dispatch(&self, event: &DeviceEvent) {
        let category = event.category();
        let targets: Vec<Arc<dyn StatusListener>> = self
            .listeners
            .iter()
            .filter(|entry| entry.categories.contains(&category))
            .map(|entry| Arc::clone(&entry.listener))
            .collect();

        for listener in targets {
            listener.on_event(event.clone());
        }
    }
}

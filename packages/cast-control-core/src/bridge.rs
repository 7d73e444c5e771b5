//! Listener bridge between device callbacks and the desktop bus.
//!
//! The bridge is the only writer of the [`StatusCache`]. Each callback is
//! handled entirely under the bridge's state lock: teardown takes the same
//! lock, so once [`ListenerBridge::teardown`] returns no callback can touch
//! the cache or the emitter again.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::device::{DeviceEvent, DeviceHandle, EventCategory, ListenerId, StatusListener};
use crate::events::PropertyEmitter;
use crate::status::{self, StatusCache};

/// Lifecycle of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Created, not yet subscribed.
    Idle,
    /// Subscribed and forwarding.
    Active,
    /// Deregistered; every further callback is ignored.
    TornDown,
}

struct Inner {
    state: BridgeState,
    listener: Option<ListenerId>,
}

/// Forwards device status callbacks into the cache and onto the bus.
pub struct ListenerBridge {
    inner: Mutex<Inner>,
    handle: DeviceHandle,
    cache: Arc<StatusCache>,
    emitter: Arc<dyn PropertyEmitter>,
    lost: Arc<Notify>,
}

impl ListenerBridge {
    /// Creates an idle bridge. `lost` is notified once when the session
    /// reports a disconnection.
    pub fn new(
        handle: DeviceHandle,
        cache: Arc<StatusCache>,
        emitter: Arc<dyn PropertyEmitter>,
        lost: Arc<Notify>,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                state: BridgeState::Idle,
                listener: None,
            }),
            handle,
            cache,
            emitter,
            lost,
        })
    }

    pub fn state(&self) -> BridgeState {
        self.inner.lock().state
    }

    /// Subscribes to cast, connection and media callbacks, then refreshes
    /// the cache from the session's current statuses. Callbacks arriving in
    /// between wait on the state lock and run after the refresh.
    ///
    /// Only the first call on an idle bridge has an effect.
    pub fn activate(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        if inner.state != BridgeState::Idle {
            return;
        }

        let listener: Arc<dyn StatusListener> = Arc::clone(self) as Arc<dyn StatusListener>;
        inner.listener = Some(self.handle.subscribe(&EventCategory::ALL, listener));

        let previous = self.cache.snapshot();
        let current = self.cache.seed(
            self.handle.cast_status(),
            self.handle.media_status(),
            Instant::now(),
        );
        let changes = status::diff(&previous, &current, Instant::now());
        if !changes.is_empty() {
            self.emitter.emit_changes(changes);
        }

        inner.state = BridgeState::Active;
        log::debug!("[Bridge] active for {}", self.handle.name());
    }

    /// Deregisters from the session. Waits for an in-flight callback to
    /// finish; later callbacks are ignored.
    pub fn teardown(&self) {
        let mut inner = self.inner.lock();
        if let Some(id) = inner.listener.take() {
            self.handle.unsubscribe(id);
        }
        if inner.state != BridgeState::TornDown {
            log::debug!("[Bridge] torn down for {}", self.handle.name());
        }
        inner.state = BridgeState::TornDown;
    }
}

impl StatusListener for ListenerBridge {
    fn on_event(&self, event: DeviceEvent) {
        let mut inner = self.inner.lock();
        if inner.state != BridgeState::Active {
            log::trace!("[Bridge] ignoring {:?} in state {:?}", event.category(), inner.state);
            return;
        }

        if let DeviceEvent::Connection(status) = &event {
            if status.is_disconnected() {
                log::warn!("[Bridge] {} connection {}", self.handle.name(), status);
                if let Some(id) = inner.listener.take() {
                    self.handle.unsubscribe(id);
                }
                inner.state = BridgeState::TornDown;
                self.lost.notify_one();
                return;
            }
        }

        let now = Instant::now();
        if let Some((previous, current)) = self.cache.apply(&event, now) {
            let changes = status::diff(&previous, &current, now);
            if !changes.is_empty() {
                self.emitter.emit_changes(changes);
            }
        }
    }
}

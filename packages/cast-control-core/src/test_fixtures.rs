//! Shared in-memory doubles for the device, discovery and bus seams.
//!
//! Used by the adapter, bridge and supervisor test modules.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::adapter::DeviceAdapter;
use crate::bus::{BusPublisher, Publication};
use crate::device::{
    CastStatus, ConnectionStatus, DeviceDiscovery, DeviceEvent, DeviceQuery, DeviceSession,
    EventCategory, ListenerId, ListenerRegistry, MediaCommand, MediaStatus, StatusListener,
};
use crate::error::{BusError, BusResult, DeviceError, DeviceResult, DiscoveryResult};
use crate::events::{PropertyChanges, PropertyEmitter};

// ─────────────────────────────────────────────────────────────────────────────
// Device session
// ─────────────────────────────────────────────────────────────────────────────

/// Session whose statuses are set by the test and whose callbacks are
/// delivered synchronously on the calling thread.
pub struct MockSession {
    name: String,
    cast: Mutex<CastStatus>,
    media: Mutex<MediaStatus>,
    connection: Mutex<ConnectionStatus>,
    sent: Mutex<Vec<MediaCommand>>,
    closed: AtomicBool,
    listeners: ListenerRegistry,
    on_subscribe: Mutex<Option<DeviceEvent>>,
    unsubscribes: AtomicUsize,
    disconnects: AtomicUsize,
}

impl MockSession {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cast: Mutex::new(CastStatus::Unknown),
            media: Mutex::new(MediaStatus::Unknown),
            connection: Mutex::new(ConnectionStatus::Connected),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            listeners: ListenerRegistry::new(),
            on_subscribe: Mutex::new(None),
            unsubscribes: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn set_cast(&self, status: CastStatus) {
        *self.cast.lock() = status;
    }

    /// Stores the status carried by `event` and delivers it to listeners.
    pub fn emit(&self, event: DeviceEvent) {
        match &event {
            DeviceEvent::Cast(status) => *self.cast.lock() = status.clone(),
            DeviceEvent::Media(status) => *self.media.lock() = status.clone(),
            DeviceEvent::Connection(status) => *self.connection.lock() = status.clone(),
        }
        self.listeners.dispatch(&event);
    }

    /// Emits `event` inside the next `subscribe`, before the new listener is
    /// registered.
    pub fn emit_on_subscribe(&self, event: DeviceEvent) {
        *self.on_subscribe.lock() = Some(event);
    }

    /// Makes further commands fail as if the worker had stopped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<MediaCommand> {
        self.sent.lock().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl DeviceSession for MockSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn uuid(&self) -> Option<&str> {
        None
    }

    fn cast_status(&self) -> CastStatus {
        self.cast.lock().clone()
    }

    fn connection_status(&self) -> ConnectionStatus {
        self.connection.lock().clone()
    }

    fn media_status(&self) -> MediaStatus {
        self.media.lock().clone()
    }

    fn send(&self, command: MediaCommand) -> DeviceResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DeviceError::SessionClosed);
        }
        self.sent.lock().push(command);
        Ok(())
    }

    fn subscribe(
        &self,
        categories: &[EventCategory],
        listener: Arc<dyn StatusListener>,
    ) -> ListenerId {
        let pending = self.on_subscribe.lock().take();
        if let Some(event) = pending {
            self.emit(event);
        }
        self.listeners.subscribe(categories, listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        if self.listeners.unsubscribe(id) {
            self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.listeners.clear();
        *self.connection.lock() = ConnectionStatus::Disconnected { reason: None };
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

/// Hands out queued sessions, one per lookup, then finds nothing.
pub struct MockDiscovery {
    sessions: Mutex<VecDeque<Arc<dyn DeviceSession>>>,
    calls: Mutex<Vec<tokio::time::Instant>>,
}

impl MockDiscovery {
    pub fn empty() -> Self {
        Self::with_sessions(Vec::new())
    }

    pub fn with_sessions(sessions: Vec<Arc<MockSession>>) -> Self {
        Self {
            sessions: Mutex::new(
                sessions
                    .into_iter()
                    .map(|s| s as Arc<dyn DeviceSession>)
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl DeviceDiscovery for MockDiscovery {
    async fn find_device(
        &self,
        _query: &DeviceQuery,
    ) -> DiscoveryResult<Option<Arc<dyn DeviceSession>>> {
        self.calls.lock().push(tokio::time::Instant::now());
        Ok(self.sessions.lock().pop_front())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bus
// ─────────────────────────────────────────────────────────────────────────────

/// Records every batch it is given.
#[derive(Default)]
pub struct RecordingEmitter {
    batches: Mutex<Vec<PropertyChanges>>,
}

impl RecordingEmitter {
    pub fn batches(&self) -> Vec<PropertyChanges> {
        self.batches.lock().clone()
    }

    pub fn clear(&self) {
        self.batches.lock().clear();
    }
}

impl PropertyEmitter for RecordingEmitter {
    fn emit_changes(&self, changes: PropertyChanges) {
        self.batches.lock().push(changes);
    }
}

#[derive(Default)]
struct PublisherCounters {
    published: AtomicUsize,
    unpublished: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    failures_left: AtomicUsize,
}

/// Publisher that only counts publications.
#[derive(Default)]
pub struct MockPublisher {
    counters: Arc<PublisherCounters>,
}

impl MockPublisher {
    /// Fails the first `count` publications.
    pub fn failing_first(count: usize) -> Self {
        let publisher = Self::default();
        publisher
            .counters
            .failures_left
            .store(count, Ordering::SeqCst);
        publisher
    }

    pub fn published(&self) -> usize {
        self.counters.published.load(Ordering::SeqCst)
    }

    pub fn unpublished(&self) -> usize {
        self.counters.unpublished.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live publications seen.
    pub fn max_live(&self) -> usize {
        self.counters.max_live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BusPublisher for MockPublisher {
    async fn publish(
        &self,
        device_name: &str,
        _adapter: Arc<DeviceAdapter>,
    ) -> BusResult<Box<dyn Publication>> {
        let failures = &self.counters.failures_left;
        if failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BusError::InvalidName(device_name.to_string()));
        }

        self.counters.published.fetch_add(1, Ordering::SeqCst);
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(MockPublication {
            counters: Arc::clone(&self.counters),
            emitter: Arc::new(RecordingEmitter::default()),
            withdrawn: AtomicBool::new(false),
        }))
    }
}

struct MockPublication {
    counters: Arc<PublisherCounters>,
    emitter: Arc<RecordingEmitter>,
    withdrawn: AtomicBool,
}

#[async_trait]
impl Publication for MockPublication {
    fn emitter(&self) -> Arc<dyn PropertyEmitter> {
        self.emitter.clone()
    }

    async fn unpublish(&self) {
        if !self.withdrawn.swap(true, Ordering::SeqCst) {
            self.counters.unpublished.fetch_add(1, Ordering::SeqCst);
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

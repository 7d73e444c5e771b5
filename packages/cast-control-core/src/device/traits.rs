//! Trait abstractions for the device transport.
//!
//! The supervisor, adapter and bridge depend on these traits rather than on
//! `rust_cast`/`mdns-sd` directly, so the whole control loop can be driven by
//! in-memory sessions in tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DeviceResult, DiscoveryResult};

use super::types::{
    CastStatus, ConnectionStatus, DeviceEvent, DeviceQuery, EventCategory, MediaCommand,
    MediaStatus,
};

/// Opaque handle returned by [`DeviceSession::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receives status callbacks from a device session.
///
/// Called from the session's own delivery thread; implementations must not
/// block on anything the bus thread may hold.
pub trait StatusListener: Send + Sync {
    fn on_event(&self, event: DeviceEvent);
}

/// A live connection to a cast device.
pub trait DeviceSession: Send + Sync {
    /// Friendly name of the device.
    fn name(&self) -> &str;

    /// Device UUID, when the transport knows it.
    fn uuid(&self) -> Option<&str>;

    /// Last-known receiver status.
    fn cast_status(&self) -> CastStatus;

    /// Last-known socket status.
    fn connection_status(&self) -> ConnectionStatus;

    /// Last-known media status.
    fn media_status(&self) -> MediaStatus;

    /// Queues a command. Returns once queued; the effect is observed through
    /// the next status callback.
    fn send(&self, command: MediaCommand) -> DeviceResult<()>;

    /// Registers `listener` for the given categories.
    fn subscribe(&self, categories: &[EventCategory], listener: Arc<dyn StatusListener>)
        -> ListenerId;

    /// Removes a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);

    /// Closes the session. Idempotent.
    fn disconnect(&self);
}

/// Locates devices and opens sessions to them.
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// Runs one lookup. `Ok(None)` means nothing matched.
    async fn find_device(&self, query: &DeviceQuery)
        -> DiscoveryResult<Option<Arc<dyn DeviceSession>>>;
}

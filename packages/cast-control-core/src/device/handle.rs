//! Handle the adapter and the bridge hold on a connected device.
//!
//! Reads come from the session's last-known state. Commands go through
//! [`DeviceHandle::send`] and are never awaited.

use std::fmt;
use std::sync::Arc;

use crate::error::DeviceResult;

use super::traits::{DeviceSession, ListenerId, StatusListener};
use super::types::{CastStatus, ConnectionStatus, EventCategory, MediaCommand, MediaStatus};

/// Cheap, cloneable accessor over a live [`DeviceSession`].
///
/// Reads return copies of the session's last-known state and never block on
/// the device. Commands are queued and acknowledged only through later
/// status callbacks.
#[derive(Clone)]
pub struct DeviceHandle {
    session: Arc<dyn DeviceSession>,
}

impl DeviceHandle {
    pub fn new(session: Arc<dyn DeviceSession>) -> Self {
        Self { session }
    }

    pub fn name(&self) -> &str {
        self.session.name()
    }

    pub fn uuid(&self) -> Option<&str> {
        self.session.uuid()
    }

    pub fn cast_status(&self) -> CastStatus {
        self.session.cast_status()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.session.connection_status()
    }

    pub fn media_status(&self) -> MediaStatus {
        self.session.media_status()
    }

    pub fn send(&self, command: MediaCommand) -> DeviceResult<()> {
        self.session.send(command)
    }

    pub(crate) fn subscribe(
        &self,
        categories: &[EventCategory],
        listener: Arc<dyn StatusListener>,
    ) -> ListenerId {
        self.session.subscribe(categories, listener)
    }

    pub(crate) fn unsubscribe(&self, id: ListenerId) {
        self.session.unsubscribe(id);
    }

    /// Releases the underlying session.
    pub fn disconnect(&self) {
        self.session.disconnect();
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("name", &self.name())
            .field("uuid", &self.uuid())
            .finish()
    }
}

//! Desktop-bus publication.
//!
//! The supervisor publishes each connected device through a [`BusPublisher`]
//! and withdraws it through the returned [`Publication`]. The MPRIS/zbus
//! implementation lives in [`mpris`].

pub mod mpris;

use std::sync::Arc;

use async_trait::async_trait;

use crate::adapter::DeviceAdapter;
use crate::error::BusResult;
use crate::events::PropertyEmitter;

pub use mpris::{bus_name_for, MprisPublisher};

/// Makes an adapter reachable on the desktop bus.
#[async_trait]
pub trait BusPublisher: Send + Sync {
    /// Claims a bus name derived from `device_name` and serves `adapter`.
    async fn publish(
        &self,
        device_name: &str,
        adapter: Arc<DeviceAdapter>,
    ) -> BusResult<Box<dyn Publication>>;
}

/// A live publication.
#[async_trait]
pub trait Publication: Send + Sync {
    /// Emitter that announces property changes on this publication.
    fn emitter(&self) -> Arc<dyn PropertyEmitter>;

    /// Releases the bus name and stops serving. Idempotent.
    async fn unpublish(&self);
}

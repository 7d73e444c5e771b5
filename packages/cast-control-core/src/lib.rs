//! Cast Control Core - bridges Google Cast devices to MPRIS media controls.
//!
//! A connected cast device is published on the D-Bus session bus as an MPRIS
//! media player, so desktop media keys, applets and `playerctl` can see what
//! is playing on it and control it.
//!
//! # Architecture
//!
//! - [`device`]: cast sessions, mDNS discovery and the [`DeviceHandle`]
//! - [`status`]: the [`StatusCache`] snapshot and per-field change diff
//! - [`adapter`]: the MPRIS control surface over a cache and a handle
//! - [`bridge`]: the [`ListenerBridge`] turning status callbacks into
//!   property-change batches
//! - [`bus`]: MPRIS publication over `zbus`
//! - [`supervisor`]: the discover, publish and reconnect loop
//! - [`events`]: property-change batches and emitters
//! - [`error`]: centralized error types
//!
//! # Abstraction Traits
//!
//! - [`DeviceSession`](device::DeviceSession) / [`DeviceDiscovery`](device::DeviceDiscovery):
//!   the cast transport
//! - [`BusPublisher`](bus::BusPublisher) / [`Publication`](bus::Publication):
//!   desktop-bus publication
//! - [`PropertyEmitter`](events::PropertyEmitter): change notification sink

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod bridge;
pub mod bus;
pub mod daemon_args;
pub mod device;
pub mod error;
pub mod events;
pub mod icons;
pub mod paths;
pub mod protocol_constants;
pub mod status;
pub mod supervisor;

#[cfg(test)]
mod test_fixtures;

// Re-export commonly used types at the crate root
pub use adapter::{DeviceAdapter, Metadata};
pub use bridge::{BridgeState, ListenerBridge};
pub use bus::{bus_name_for, BusPublisher, MprisPublisher, Publication};
pub use daemon_args::DaemonArgs;
pub use device::{
    CastDiscovery, CastSession, DeviceDiscovery, DeviceHandle, DeviceIdentity, DeviceSession,
    DiscoveryConfig,
};
pub use error::{
    AdapterError, BusError, CastControlError, CastControlResult, DeviceError, DiscoveryError,
    ErrorCode, StateError,
};
pub use events::{PlayerProperty, PropertyChanges, PropertyEmitter};
pub use icons::DefaultIcons;
pub use paths::AppPaths;
pub use status::{PlayState, StatusCache, StatusSnapshot};
pub use supervisor::{ConnectionState, ConnectionSupervisor, RetryPolicy};

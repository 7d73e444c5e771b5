//! Cast device layer.
//!
//! - [`types`]: status unions, commands and device selection
//! - [`traits`]: the [`DeviceSession`] and [`DeviceDiscovery`] seams
//! - [`handle`]: [`DeviceHandle`], the accessor the rest of the crate uses
//! - [`cast_session`]: `rust_cast`-backed session worker
//! - [`discovery`]: mDNS lookup via `mdns-sd`

pub mod cast_session;
pub mod discovery;
mod handle;
mod listeners;
mod traits;
mod types;
pub mod youtube;

pub use cast_session::CastSession;
pub use discovery::{CastDiscovery, DiscoveryConfig};
pub use handle::DeviceHandle;
pub use listeners::ListenerRegistry;
pub use traits::{DeviceDiscovery, DeviceSession, ListenerId, StatusListener};
pub use types::{
    CastInfo, CastStatus, CastTarget, ConnectionStatus, DeviceEvent, DeviceIdentity, DeviceQuery,
    EventCategory, LoopStatus, MediaCommand, MediaInfo, MediaStatus, PlayerState,
    SupportedCommands,
};

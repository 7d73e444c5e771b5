//! Centralized error types for the Cast Control core library.
//!
//! Each layer has its own `thiserror` enum; [`CastControlError`] aggregates
//! them for the supervisor and the binary, and maps fatal categories to the
//! process exit statuses.

use std::path::PathBuf;

use thiserror::Error;

use crate::protocol_constants::{RC_NO_DEVICE, RC_NOT_RUNNING};

/// Trait for error types that provide machine-readable error codes.
///
/// Used in log lines so failures can be grepped without parsing messages.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

// ─────────────────────────────────────────────────────────────────────────────
// Layer errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while locating a device.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The mDNS daemon could not be started or browsed.
    #[error("mDNS daemon error: {0}")]
    MdnsDaemon(String),

    /// A device was located but the session could not be opened.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: DeviceError,
    },
}

/// Errors raised by a live device session.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// TCP/TLS connection to the device failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The device rejected or failed a protocol request.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The session worker has stopped; commands can no longer be delivered.
    #[error("session closed")]
    SessionClosed,

    /// The command is not supported by this transport.
    #[error("unsupported command: {0}")]
    Unsupported(String),
}

/// Errors raised by the desktop-bus layer.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),

    #[error("invalid bus name: {0}")]
    InvalidName(String),
}

/// Errors raised while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("no usable home, data or state directory")]
    NoHomeDir,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed state file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors returned by adapter operations the device cannot perform.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("not capable: {0}")]
    NotCapable(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::MdnsDaemon(_) => "mdns_daemon_failed",
            Self::Connect { .. } => "device_connect_failed",
        }
    }
}

impl ErrorCode for DeviceError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "device_connection_failed",
            Self::Protocol(_) => "device_protocol_error",
            Self::SessionClosed => "device_session_closed",
            Self::Unsupported(_) => "device_command_unsupported",
        }
    }
}

impl ErrorCode for BusError {
    fn code(&self) -> &'static str {
        match self {
            Self::DBus(_) => "dbus_error",
            Self::InvalidName(_) => "invalid_bus_name",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application error
// ─────────────────────────────────────────────────────────────────────────────

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum CastControlError {
    /// No device matched and retrying is disabled.
    #[error("Device {0} not found")]
    DeviceNotFound(String),

    /// `service reconnect` found nothing to reconnect.
    #[error("Daemon isn't running")]
    NotRunning,

    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl CastControlError {
    /// Process exit status for errors that terminate the daemon.
    pub fn exit_code(&self) -> Option<u8> {
        match self {
            Self::DeviceNotFound(_) => Some(RC_NO_DEVICE),
            Self::NotRunning => Some(RC_NOT_RUNNING),
            _ => None,
        }
    }
}

impl ErrorCode for CastControlError {
    fn code(&self) -> &'static str {
        match self {
            Self::DeviceNotFound(_) => "device_not_found",
            Self::NotRunning => "not_running",
            Self::Discovery(e) => e.code(),
            Self::Device(e) => e.code(),
            Self::Bus(e) => e.code(),
            Self::State(_) => "state_error",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
pub type DeviceResult<T> = Result<T, DeviceError>;
pub type BusResult<T> = Result<T, BusError>;
pub type StateResult<T> = Result<T, StateError>;

/// Convenient Result alias for application-wide operations.
pub type CastControlResult<T> = Result<T, CastControlError>;

//! Fixed protocol constants and application-wide defaults.
//!
//! Values in the CASTV2 and MPRIS sections are fixed by those protocols.

// ─────────────────────────────────────────────────────────────────────────────
// Application identity
// ─────────────────────────────────────────────────────────────────────────────

/// Human-readable application name, used as the fallback media title.
pub const APP_DISPLAY_NAME: &str = "Cast Control";

/// Machine name used for directories, files and the D-Bus name segment.
pub const APP_NAME: &str = "cast_control";

/// Placeholder used in log lines when no device identifier was supplied.
pub const NO_DEVICE: &str = "Device";

// ─────────────────────────────────────────────────────────────────────────────
// Process exit statuses
// ─────────────────────────────────────────────────────────────────────────────

/// Normal termination.
pub const RC_OK: u8 = 0;

/// No cast device could be found and retrying was disabled.
pub const RC_NO_DEVICE: u8 = 1;

/// `service reconnect` found no running background service.
pub const RC_NOT_RUNNING: u8 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Retry defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Seconds to wait before reconnecting after a live session drops.
pub const DEFAULT_RETRY_WAIT_SECS: f64 = 5.0;

// ─────────────────────────────────────────────────────────────────────────────
// CASTV2
// ─────────────────────────────────────────────────────────────────────────────

/// mDNS service type advertised by cast devices (trailing dot required by mdns-sd).
pub const CAST_SERVICE_TYPE: &str = "_googlecast._tcp.local.";

/// TCP port cast devices listen on.
pub const DEFAULT_CAST_PORT: u16 = 8009;

/// Destination id of the platform receiver.
pub const RECEIVER_DESTINATION_ID: &str = "receiver-0";

/// App id of the YouTube receiver application.
pub const YOUTUBE_APP_ID: &str = "233637DE";

/// Interval between heartbeat pings to a connected device (milliseconds).
/// Each ping also bounds how long pushed status waits to be read.
pub const HEARTBEAT_INTERVAL_MS: u64 = 1000;

/// How long an mDNS browse collects answers before giving up (milliseconds).
pub const DISCOVERY_BROWSE_TIMEOUT_MS: u64 = 5000;

/// `supportedMediaCommands` bit flags reported in media status entries.
pub mod media_commands {
    pub const PAUSE: u32 = 1;
    pub const SEEK: u32 = 2;
    pub const STREAM_VOLUME: u32 = 4;
    pub const STREAM_MUTE: u32 = 8;
    pub const QUEUE_NEXT: u32 = 64;
    pub const QUEUE_PREV: u32 = 128;
    pub const QUEUE_SHUFFLE: u32 = 256;
    pub const QUEUE_REPEAT_ALL: u32 = 1024;
    pub const QUEUE_REPEAT_ONE: u32 = 2048;
}

// ─────────────────────────────────────────────────────────────────────────────
// MPRIS
// ─────────────────────────────────────────────────────────────────────────────

/// Object path every MPRIS interface is served at.
pub const MPRIS_OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";

/// Prefix of the well-known bus name claimed per device.
pub const MPRIS_BUS_NAME_PREFIX: &str = "org.mpris.MediaPlayer2";

/// Track id MPRIS reserves for "no track".
pub const MPRIS_NO_TRACK: &str = "/org/mpris/MediaPlayer2/TrackList/NoTrack";

/// Prefix for synthesized per-item track ids.
pub const TRACK_ID_PREFIX: &str = "/org/cast_control/track";

/// Microseconds per second (MPRIS positions are in microseconds).
pub const US_IN_SEC: f64 = 1_000_000.0;

/// Position jumps larger than this are reported as seeks (microseconds).
pub const SEEK_TOLERANCE_US: u64 = 1_500_000;

/// Disc number reported for every item.
pub const DEFAULT_DISC_NUMBER: i32 = 1;

/// URI schemes the receiver can open.
pub const SUPPORTED_URI_SCHEMES: &[&str] = &["http", "https"];

/// MIME types the default media receiver can open.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "audio/aac",
    "audio/flac",
    "audio/mp4",
    "audio/mpeg",
    "audio/ogg",
    "audio/wav",
    "audio/webm",
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/webp",
    "video/mp4",
    "video/webm",
];

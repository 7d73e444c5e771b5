//! Status and command types exchanged with a device session.
//!
//! Each status category is an explicit tagged union with an "unknown"
//! variant, so consumers never have to guess whether a field was populated.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{media_commands, DEFAULT_CAST_PORT, NO_DEVICE, YOUTUBE_APP_ID};

// ─────────────────────────────────────────────────────────────────────────────
// Device selection
// ─────────────────────────────────────────────────────────────────────────────

/// User-supplied identifiers used to pick a device.
///
/// When none are set the first device found is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub name: Option<String>,
    pub host: Option<String>,
    pub uuid: Option<String>,
}

impl DeviceIdentity {
    pub fn new(name: Option<String>, host: Option<String>, uuid: Option<String>) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            name: non_empty(name),
            host: non_empty(host),
            uuid: non_empty(uuid),
        }
    }

    /// Lookups to attempt, in order, until one yields a device.
    ///
    /// Host wins over UUID, UUID over name. With no identifiers the only
    /// lookup is "first device found".
    pub fn queries(&self) -> Vec<DeviceQuery> {
        let mut queries = Vec::new();

        if let Some(host) = &self.host {
            queries.push(DeviceQuery::Host {
                host: host.clone(),
                name: self.name.clone(),
            });
        }
        if let Some(uuid) = &self.uuid {
            queries.push(DeviceQuery::Uuid(uuid.clone()));
        }
        if let Some(name) = &self.name {
            queries.push(DeviceQuery::Name(name.clone()));
        }
        if queries.is_empty() {
            queries.push(DeviceQuery::First);
        }

        queries
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self
            .name
            .as_deref()
            .or(self.host.as_deref())
            .or(self.uuid.as_deref())
            .unwrap_or(NO_DEVICE);
        f.write_str(label)
    }
}

/// A single discovery lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceQuery {
    /// First device that answers.
    First,
    /// Device whose friendly name matches (case-insensitive).
    Name(String),
    /// Device at a known address; `name` is used as its friendly name.
    Host { host: String, name: Option<String> },
    /// Device whose UUID matches.
    Uuid(String),
}

impl fmt::Display for DeviceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first device"),
            Self::Name(name) => write!(f, "name={}", name),
            Self::Host { host, .. } => write!(f, "host={}", host),
            Self::Uuid(uuid) => write!(f, "uuid={}", uuid),
        }
    }
}

/// Where to reach a device once it has been located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastTarget {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub uuid: Option<String>,
    pub model: Option<String>,
}

impl CastTarget {
    pub fn from_host(host: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_CAST_PORT,
            name: name.into(),
            uuid: None,
            model: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cast (receiver) status
// ─────────────────────────────────────────────────────────────────────────────

/// Receiver-level status: device volume and the running application.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CastStatus {
    #[default]
    Unknown,
    Known(CastInfo),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CastInfo {
    /// Device volume, 0.0–1.0.
    pub volume_level: f64,
    pub volume_muted: bool,
    pub app_id: Option<String>,
    pub app_display_name: Option<String>,
    pub icon_url: Option<String>,
}

impl CastStatus {
    pub fn info(&self) -> Option<&CastInfo> {
        match self {
            Self::Known(info) => Some(info),
            Self::Unknown => None,
        }
    }

    pub fn app_id(&self) -> Option<&str> {
        self.info().and_then(|info| info.app_id.as_deref())
    }

    pub fn is_youtube(&self) -> bool {
        self.info().is_some_and(|info| {
            info.app_id.as_deref() == Some(YOUTUBE_APP_ID)
                || info.app_display_name.as_deref() == Some("YouTube")
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection status
// ─────────────────────────────────────────────────────────────────────────────

/// Socket-level status of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Unknown,
    Connecting,
    Connected,
    Disconnected { reason: Option<String> },
    Lost { reason: Option<String> },
    Failed { reason: Option<String> },
}

impl ConnectionStatus {
    /// Whether this status means the session is gone.
    pub fn is_disconnected(&self) -> bool {
        matches!(
            self,
            Self::Disconnected { .. } | Self::Lost { .. } | Self::Failed { .. }
        )
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Disconnected { reason } | Self::Lost { reason } | Self::Failed { reason } => {
                reason.as_deref()
            }
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::Lost { .. } => "lost",
            Self::Failed { .. } => "failed",
        };
        match self.reason() {
            Some(reason) => write!(f, "{} ({})", label, reason),
            None => f.write_str(label),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Media status
// ─────────────────────────────────────────────────────────────────────────────

/// Status of the media session inside the running app.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MediaStatus {
    /// No media status has been received.
    #[default]
    Unknown,
    /// The app runs but has nothing loaded.
    Idle,
    Loaded(MediaInfo),
}

impl MediaStatus {
    pub fn info(&self) -> Option<&MediaInfo> {
        match self {
            Self::Loaded(info) => Some(info),
            _ => None,
        }
    }
}

/// Player state reported by the receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Idle,
    Buffering,
    Playing,
    Paused,
}

/// Commands the media session advertises support for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportedCommands(pub u32);

impl SupportedCommands {
    fn has(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub fn pause(self) -> bool {
        self.has(media_commands::PAUSE)
    }

    pub fn seek(self) -> bool {
        self.has(media_commands::SEEK)
    }

    pub fn queue_next(self) -> bool {
        self.has(media_commands::QUEUE_NEXT)
    }

    pub fn queue_prev(self) -> bool {
        self.has(media_commands::QUEUE_PREV)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub content_id: Option<String>,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub series_title: Option<String>,
    pub subtitle: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
    /// Image URLs, best first.
    pub images: Vec<String>,
    pub player_state: PlayerState,
    /// Seconds into the item.
    pub current_time: Option<f64>,
    /// Item length in seconds, when known.
    pub duration: Option<f64>,
    pub playback_rate: f64,
    pub supported_commands: SupportedCommands,
}

// ─────────────────────────────────────────────────────────────────────────────
// Events and commands
// ─────────────────────────────────────────────────────────────────────────────

/// Categories a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Cast,
    Connection,
    Media,
}

impl EventCategory {
    pub const ALL: [EventCategory; 3] = [Self::Cast, Self::Connection, Self::Media];
}

/// A status callback delivered by a device session.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Cast(CastStatus),
    Connection(ConnectionStatus),
    Media(MediaStatus),
}

impl DeviceEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            Self::Cast(_) => EventCategory::Cast,
            Self::Connection(_) => EventCategory::Connection,
            Self::Media(_) => EventCategory::Media,
        }
    }
}

/// Repeat mode, named after the MPRIS `LoopStatus` property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopStatus {
    #[default]
    None,
    Track,
    Playlist,
}

impl LoopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Track => "Track",
            Self::Playlist => "Playlist",
        }
    }

    /// Parses the MPRIS spelling; unknown values are rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "None" => Some(Self::None),
            "Track" => Some(Self::Track),
            "Playlist" => Some(Self::Playlist),
            _ => None,
        }
    }
}

/// Commands issued to a device session. Delivery is fire-and-forget.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCommand {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    /// Absolute position in seconds.
    Seek(f64),
    /// Device volume, 0.0–1.0.
    SetVolume(f64),
    SetMuted(bool),
    SetShuffle(bool),
    SetRepeat(LoopStatus),
    SetRate(f64),
    /// Stop the running receiver application.
    QuitApp,
    /// Load a URI in the default media receiver.
    Load { uri: String, content_type: String },
}

//! Property-change notifications for the desktop bus.
//!
//! This module provides:
//! - [`PlayerProperty`], the MPRIS properties the bridge tracks
//! - [`PropertyChanges`], one batch of changes produced by a status callback
//! - [`PropertyEmitter`] trait the bridge emits through
//! - [`ChannelPropertyEmitter`] that hands batches to the bus task

mod bridge;
mod emitter;

pub use bridge::ChannelPropertyEmitter;
pub use emitter::PropertyEmitter;

/// MPRIS properties whose changes are announced with `PropertiesChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerProperty {
    // org.mpris.MediaPlayer2.Player
    PlaybackStatus,
    LoopStatus,
    Rate,
    Shuffle,
    Metadata,
    Volume,
    CanGoNext,
    CanGoPrevious,
    CanPlay,
    CanPause,
    CanSeek,
    // org.mpris.MediaPlayer2.TrackList
    Tracks,
}

impl PlayerProperty {
    /// Property name as it appears on the bus.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlaybackStatus => "PlaybackStatus",
            Self::LoopStatus => "LoopStatus",
            Self::Rate => "Rate",
            Self::Shuffle => "Shuffle",
            Self::Metadata => "Metadata",
            Self::Volume => "Volume",
            Self::CanGoNext => "CanGoNext",
            Self::CanGoPrevious => "CanGoPrevious",
            Self::CanPlay => "CanPlay",
            Self::CanPause => "CanPause",
            Self::CanSeek => "CanSeek",
            Self::Tracks => "Tracks",
        }
    }
}

/// Changes produced by a single status callback.
///
/// `seeked` carries the new position in microseconds when playback jumped
/// rather than advanced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyChanges {
    pub properties: Vec<PlayerProperty>,
    pub seeked: Option<i64>,
}

impl PropertyChanges {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.seeked.is_none()
    }

    pub fn contains(&self, property: PlayerProperty) -> bool {
        self.properties.contains(&property)
    }
}

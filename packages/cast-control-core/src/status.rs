//! Last-known playback state, derived from device status callbacks.
//!
//! The [`StatusCache`] keeps the raw cast and media statuses together with a
//! derived [`StatusSnapshot`]. Every callback replaces one raw status and
//! recomputes the whole snapshot under a single write lock, so readers always
//! see the result of exactly one callback.

use std::time::Instant;

use parking_lot::RwLock;

use crate::device::youtube;
use crate::device::{CastStatus, DeviceEvent, LoopStatus, MediaStatus, PlayerState};
use crate::events::{PlayerProperty, PropertyChanges};
use crate::protocol_constants::{APP_DISPLAY_NAME, SEEK_TOLERANCE_US, US_IN_SEC};

/// Maximum number of title candidates used (title, artist, album).
const MAX_TITLES: usize = 3;

/// Playback status as exposed on the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl PlayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
        }
    }
}

impl From<PlayerState> for PlayState {
    /// Buffering counts as playing: the user asked for playback and the
    /// position keeps its meaning.
    fn from(state: PlayerState) -> Self {
        match state {
            PlayerState::Playing | PlayerState::Buffering => Self::Playing,
            PlayerState::Paused => Self::Paused,
            PlayerState::Idle => Self::Stopped,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Titles
// ─────────────────────────────────────────────────────────────────────────────

/// Title, artist and album picked from whatever text the device reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Titles {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl Titles {
    /// Takes the first three non-empty candidates in the order media title,
    /// series title, subtitle, artist, album, app display name.
    pub fn derive(cast: &CastStatus, media: &MediaStatus) -> Self {
        let media = media.info();
        let candidates = [
            media.and_then(|m| m.title.as_deref()),
            media.and_then(|m| m.series_title.as_deref()),
            media.and_then(|m| m.subtitle.as_deref()),
            media.and_then(|m| m.artist.as_deref()),
            media.and_then(|m| m.album.as_deref()),
            cast.info().and_then(|c| c.app_display_name.as_deref()),
        ];

        let mut titles = candidates
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .take(MAX_TITLES)
            .map(str::to_string);

        Self {
            title: titles.next().unwrap_or_else(|| APP_DISPLAY_NAME.to_string()),
            artist: titles.next(),
            album: titles.next(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Consistent view of everything the bus reads.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub art_url: Option<String>,
    pub content_url: Option<String>,
    pub track_number: Option<u32>,
    /// Position in microseconds at `observed_at`.
    pub position_us: Option<i64>,
    pub observed_at: Option<Instant>,
    pub duration_us: Option<i64>,
    /// Device volume, 0.0–1.0, regardless of mute.
    pub volume: f64,
    pub muted: bool,
    pub shuffle: bool,
    pub loop_status: LoopStatus,
    pub play_state: PlayState,
    pub rate: f64,
    pub is_youtube: bool,
    pub media_loaded: bool,
    pub can_pause: bool,
    pub can_seek: bool,
    pub can_go_next: bool,
    pub can_go_previous: bool,
    pub app_id: Option<String>,
    /// Increments whenever the loaded item changes.
    pub serial: u64,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            title: APP_DISPLAY_NAME.to_string(),
            artist: None,
            album: None,
            art_url: None,
            content_url: None,
            track_number: None,
            position_us: None,
            observed_at: None,
            duration_us: None,
            volume: 0.0,
            muted: false,
            shuffle: false,
            loop_status: LoopStatus::None,
            play_state: PlayState::Stopped,
            rate: 1.0,
            is_youtube: false,
            media_loaded: false,
            can_pause: false,
            can_seek: false,
            can_go_next: false,
            can_go_previous: false,
            app_id: None,
            serial: 0,
        }
    }
}

impl StatusSnapshot {
    /// Position at `now`, advanced by elapsed time while playing and clamped
    /// to the duration.
    pub fn position_at(&self, now: Instant) -> i64 {
        let Some(position) = self.position_us else {
            return 0;
        };

        let position = match (self.play_state, self.observed_at) {
            (PlayState::Playing, Some(at)) => {
                let elapsed = now.saturating_duration_since(at).as_secs_f64();
                position.saturating_add((elapsed * self.rate * US_IN_SEC).round() as i64)
            }
            _ => position,
        };

        match self.duration_us {
            Some(duration) => position.clamp(0, duration),
            None => position.max(0),
        }
    }

    /// Volume as reported on the bus: zero while muted.
    pub fn effective_volume(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn can_play(&self) -> bool {
        self.media_loaded
    }

    pub fn can_pause(&self) -> bool {
        self.media_loaded && self.can_pause
    }

    pub fn can_seek(&self) -> bool {
        self.media_loaded && self.can_seek
    }

    pub fn can_go_next(&self) -> bool {
        self.media_loaded && self.can_go_next
    }

    pub fn can_go_previous(&self) -> bool {
        self.media_loaded && self.can_go_previous
    }

    fn metadata_differs(&self, other: &Self) -> bool {
        self.title != other.title
            || self.artist != other.artist
            || self.album != other.album
            || self.art_url != other.art_url
            || self.content_url != other.content_url
            || self.track_number != other.track_number
            || self.duration_us != other.duration_us
            || self.serial != other.serial
            || self.media_loaded != other.media_loaded
    }
}

/// Lists the bus properties that differ between two snapshots.
///
/// A position that moved further than the seek tolerance from where the
/// previous snapshot predicted it is reported through `seeked`.
pub fn diff(prev: &StatusSnapshot, current: &StatusSnapshot, now: Instant) -> PropertyChanges {
    let mut properties = Vec::new();
    let mut push = |changed: bool, property: PlayerProperty| {
        if changed {
            properties.push(property);
        }
    };

    push(prev.play_state != current.play_state, PlayerProperty::PlaybackStatus);
    push(prev.loop_status != current.loop_status, PlayerProperty::LoopStatus);
    push(prev.rate != current.rate, PlayerProperty::Rate);
    push(prev.shuffle != current.shuffle, PlayerProperty::Shuffle);
    push(current.metadata_differs(prev), PlayerProperty::Metadata);
    push(
        prev.effective_volume() != current.effective_volume(),
        PlayerProperty::Volume,
    );
    push(prev.can_go_next() != current.can_go_next(), PlayerProperty::CanGoNext);
    push(
        prev.can_go_previous() != current.can_go_previous(),
        PlayerProperty::CanGoPrevious,
    );
    push(prev.can_play() != current.can_play(), PlayerProperty::CanPlay);
    push(prev.can_pause() != current.can_pause(), PlayerProperty::CanPause);
    push(prev.can_seek() != current.can_seek(), PlayerProperty::CanSeek);
    push(
        prev.media_loaded != current.media_loaded || prev.serial != current.serial,
        PlayerProperty::Tracks,
    );

    let same_item = prev.media_loaded && current.media_loaded && prev.serial == current.serial;
    let seeked = if same_item && current.position_us.is_some() && prev.position_us.is_some() {
        let expected = prev.position_at(now);
        let actual = current.position_at(now);
        (expected.abs_diff(actual) > SEEK_TOLERANCE_US).then_some(actual)
    } else {
        None
    };

    PropertyChanges { properties, seeked }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

/// Last device-provided icon, reusable while the app and title stay the same.
#[derive(Debug, Clone)]
struct CachedIcon {
    url: String,
    app_id: Option<String>,
    title: String,
}

#[derive(Default)]
struct CacheState {
    cast: CastStatus,
    media: MediaStatus,
    snapshot: StatusSnapshot,
    icon: Option<CachedIcon>,
    longest_position_us: Option<i64>,
    item_key: Option<(Option<String>, String)>,
    serial: u64,
}

/// Thread-safe store of the current [`StatusSnapshot`].
///
/// Written only by the listener bridge; read by the adapter.
pub struct StatusCache {
    state: RwLock<CacheState>,
    default_art: Option<String>,
}

impl StatusCache {
    /// Creates an empty cache. `default_art` is the URL used when neither the
    /// device nor the icon cache provide artwork.
    pub fn new(default_art: Option<String>) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            default_art,
        }
    }

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.state.read().snapshot.clone()
    }

    /// Replaces both raw statuses at once and returns the new snapshot.
    pub fn seed(&self, cast: CastStatus, media: MediaStatus, now: Instant) -> StatusSnapshot {
        let mut state = self.state.write();
        state.cast = cast;
        state.media = media;
        state.snapshot = state.recompute(now, self.default_art.as_deref());
        state.snapshot.clone()
    }

    /// Applies one status callback.
    ///
    /// Returns the previous and the new snapshot, or `None` for events that
    /// carry no playback state (connection events).
    pub fn apply(
        &self,
        event: &DeviceEvent,
        now: Instant,
    ) -> Option<(StatusSnapshot, StatusSnapshot)> {
        let mut state = self.state.write();
        match event {
            DeviceEvent::Cast(cast) => state.cast = cast.clone(),
            DeviceEvent::Media(media) => state.media = media.clone(),
            DeviceEvent::Connection(_) => return None,
        }

        let current = state.recompute(now, self.default_art.as_deref());
        let previous = std::mem::replace(&mut state.snapshot, current.clone());
        Some((previous, current))
    }
}

impl CacheState {
    fn recompute(&mut self, now: Instant, default_art: Option<&str>) -> StatusSnapshot {
        let titles = Titles::derive(&self.cast, &self.media);
        let cast = self.cast.info();
        let media = self.media.info();
        let app_id = self.cast.app_id().map(str::to_string);
        let is_youtube = self.cast.is_youtube();

        if let Some(media) = media {
            let key = (media.content_id.clone(), titles.title.clone());
            if self.item_key.as_ref() != Some(&key) {
                self.serial += 1;
                self.item_key = Some(key);
                self.longest_position_us = None;
            }
        }

        let position_us = media
            .and_then(|m| m.current_time)
            .map(|secs| (secs * US_IN_SEC).round() as i64);
        if let Some(position) = position_us {
            let longest = self.longest_position_us.get_or_insert(position);
            *longest = (*longest).max(position);
        }

        let duration_us = media
            .and_then(|m| m.duration)
            .filter(|d| *d > 0.0)
            .map(|secs| (secs * US_IN_SEC).round() as i64)
            .or(self.longest_position_us.filter(|l| *l > 0));

        let device_art = media
            .and_then(|m| m.images.first().cloned())
            .or_else(|| cast.and_then(|c| c.icon_url.clone()));
        let art_url = match device_art {
            Some(url) => {
                self.icon = Some(CachedIcon {
                    url: url.clone(),
                    app_id: app_id.clone(),
                    title: titles.title.clone(),
                });
                Some(url)
            }
            None => self
                .icon
                .as_ref()
                .filter(|icon| icon.app_id == app_id && icon.title == titles.title)
                .map(|icon| icon.url.clone())
                .or_else(|| default_art.map(str::to_string)),
        };

        let content_url = media.and_then(|m| m.content_id.as_deref()).map(|id| {
            if is_youtube && youtube::is_bare_video_id(id) {
                youtube::video_url(id)
            } else {
                id.to_string()
            }
        });

        let volume = cast.map_or(0.0, |c| c.volume_level).clamp(0.0, 1.0);
        let muted = cast.is_some_and(|c| c.volume_muted);

        let commands = media.map(|m| m.supported_commands).unwrap_or_default();

        StatusSnapshot {
            title: titles.title,
            artist: titles.artist,
            album: titles.album,
            art_url,
            content_url,
            track_number: media.and_then(|m| m.track_number),
            position_us,
            observed_at: position_us.map(|_| now),
            duration_us,
            volume,
            muted,
            shuffle: false,
            loop_status: LoopStatus::None,
            play_state: media
                .map(|m| PlayState::from(m.player_state))
                .unwrap_or_default(),
            rate: media
                .map(|m| m.playback_rate)
                .filter(|r| *r > 0.0)
                .unwrap_or(1.0),
            is_youtube,
            media_loaded: media.is_some(),
            can_pause: commands.pause(),
            can_seek: commands.seek(),
            can_go_next: commands.queue_next(),
            can_go_previous: commands.queue_prev(),
            app_id,
            serial: self.serial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{CastInfo, MediaInfo, SupportedCommands};
    use crate::protocol_constants::{media_commands, YOUTUBE_APP_ID};
    use std::sync::Arc;
    use std::time::Duration;

    fn cast(app_name: &str, icon: Option<&str>) -> CastStatus {
        CastStatus::Known(CastInfo {
            volume_level: 0.5,
            app_id: Some("CC1AD845".into()),
            app_display_name: Some(app_name.into()),
            icon_url: icon.map(str::to_string),
            ..Default::default()
        })
    }

    fn media(title: &str, content_id: &str) -> MediaStatus {
        MediaStatus::Loaded(MediaInfo {
            content_id: Some(content_id.into()),
            title: Some(title.into()),
            player_state: PlayerState::Playing,
            current_time: Some(10.0),
            duration: Some(100.0),
            playback_rate: 1.0,
            supported_commands: SupportedCommands(media_commands::PAUSE | media_commands::SEEK),
            ..Default::default()
        })
    }

    #[test]
    fn titles_default_to_app_name() {
        let titles = Titles::derive(&CastStatus::Unknown, &MediaStatus::Unknown);
        assert_eq!(titles.title, APP_DISPLAY_NAME);
        assert_eq!(titles.artist, None);
    }

    #[test]
    fn titles_take_first_three_candidates() {
        let media = MediaStatus::Loaded(MediaInfo {
            title: Some("Song".into()),
            artist: Some("Band".into()),
            album: Some("Record".into()),
            ..Default::default()
        });
        let titles = Titles::derive(&cast("Spotify", None), &media);
        assert_eq!(titles.title, "Song");
        assert_eq!(titles.artist.as_deref(), Some("Band"));
        assert_eq!(titles.album.as_deref(), Some("Record"));
    }

    #[test]
    fn titles_skip_blank_candidates() {
        let media = MediaStatus::Loaded(MediaInfo {
            title: Some("  ".into()),
            ..Default::default()
        });
        let titles = Titles::derive(&cast("Netflix", None), &media);
        assert_eq!(titles.title, "Netflix");
    }

    #[test]
    fn buffering_counts_as_playing() {
        assert_eq!(PlayState::from(PlayerState::Buffering), PlayState::Playing);
        assert_eq!(PlayState::from(PlayerState::Idle), PlayState::Stopped);
    }

    #[test]
    fn art_url_falls_back_through_icon_cache_to_default() {
        let cache = StatusCache::new(Some("file:///icons/cc.svg".into()));
        let now = Instant::now();

        let snapshot = cache.seed(cast("Plex", Some("http://icon/plex.png")), MediaStatus::Idle, now);
        assert_eq!(snapshot.art_url.as_deref(), Some("http://icon/plex.png"));

        // Same app and title without an icon reuses the cached one.
        let (_, current) = cache
            .apply(&DeviceEvent::Cast(cast("Plex", None)), now)
            .expect("cast event updates the cache");
        assert_eq!(current.art_url.as_deref(), Some("http://icon/plex.png"));

        // A different title invalidates the cached icon.
        let (_, current) = cache
            .apply(&DeviceEvent::Cast(cast("Plex Beta", None)), now)
            .expect("cast event updates the cache");
        assert_eq!(current.art_url.as_deref(), Some("file:///icons/cc.svg"));
    }

    #[test]
    fn media_image_wins_over_app_icon() {
        let cache = StatusCache::new(None);
        let media = MediaStatus::Loaded(MediaInfo {
            title: Some("Film".into()),
            images: vec!["http://img/poster.jpg".into()],
            ..Default::default()
        });
        let snapshot = cache.seed(cast("Plex", Some("http://icon/plex.png")), media, Instant::now());
        assert_eq!(snapshot.art_url.as_deref(), Some("http://img/poster.jpg"));
    }

    #[test]
    fn serial_changes_only_with_item() {
        let cache = StatusCache::new(None);
        let now = Instant::now();
        let first = cache.seed(cast("App", None), media("A", "a"), now);

        let (_, same) = cache
            .apply(&DeviceEvent::Media(media("A", "a")), now)
            .expect("media event updates the cache");
        assert_eq!(same.serial, first.serial);

        let (_, next) = cache
            .apply(&DeviceEvent::Media(media("B", "b")), now)
            .expect("media event updates the cache");
        assert_eq!(next.serial, first.serial + 1);
    }

    #[test]
    fn duration_falls_back_to_longest_position() {
        let cache = StatusCache::new(None);
        let now = Instant::now();
        let live = |time: f64| {
            MediaStatus::Loaded(MediaInfo {
                content_id: Some("live".into()),
                title: Some("Radio".into()),
                player_state: PlayerState::Paused,
                current_time: Some(time),
                ..Default::default()
            })
        };

        cache.seed(CastStatus::Unknown, live(30.0), now);
        let (_, current) = cache
            .apply(&DeviceEvent::Media(live(12.0)), now)
            .expect("media event updates the cache");
        assert_eq!(current.duration_us, Some(30_000_000));
    }

    #[test]
    fn youtube_ids_become_watch_urls() {
        let cache = StatusCache::new(None);
        let youtube_cast = CastStatus::Known(CastInfo {
            app_id: Some(YOUTUBE_APP_ID.into()),
            app_display_name: Some("YouTube".into()),
            ..Default::default()
        });
        let snapshot = cache.seed(youtube_cast, media("Video", "dQw4w9WgXcQ"), Instant::now());
        assert!(snapshot.is_youtube);
        assert_eq!(
            snapshot.content_url.as_deref(),
            Some("https://youtube.com/watch?v=dQw4w9WgXcQ")
        );
    }

    #[test]
    fn position_interpolates_while_playing_and_clamps() {
        let now = Instant::now();
        let snapshot = StatusSnapshot {
            position_us: Some(10_000_000),
            observed_at: Some(now),
            duration_us: Some(12_000_000),
            play_state: PlayState::Playing,
            ..Default::default()
        };
        assert_eq!(snapshot.position_at(now + Duration::from_secs(1)), 11_000_000);
        assert_eq!(snapshot.position_at(now + Duration::from_secs(5)), 12_000_000);

        let paused = StatusSnapshot {
            play_state: PlayState::Paused,
            ..snapshot
        };
        assert_eq!(paused.position_at(now + Duration::from_secs(5)), 10_000_000);
    }

    #[test]
    fn absurd_positions_saturate() {
        let now = Instant::now();
        let prev = StatusSnapshot {
            media_loaded: true,
            serial: 1,
            position_us: Some(i64::MAX - 1),
            observed_at: Some(now),
            play_state: PlayState::Playing,
            rate: 2.0,
            ..Default::default()
        };
        assert_eq!(prev.position_at(now + Duration::from_secs(10)), i64::MAX);

        let rewound = StatusSnapshot {
            position_us: Some(i64::MIN),
            play_state: PlayState::Paused,
            ..prev.clone()
        };
        assert_eq!(diff(&prev, &rewound, now).seeked, Some(0));
    }

    #[test]
    fn muted_volume_reads_zero() {
        let snapshot = StatusSnapshot {
            volume: 0.7,
            muted: true,
            ..Default::default()
        };
        assert_eq!(snapshot.effective_volume(), 0.0);
    }

    #[test]
    fn diff_lists_exactly_the_changed_properties() {
        let now = Instant::now();
        let prev = StatusSnapshot::default();
        let current = StatusSnapshot {
            volume: 0.4,
            ..Default::default()
        };
        let changes = diff(&prev, &current, now);
        assert_eq!(changes.properties, vec![PlayerProperty::Volume]);
        assert_eq!(changes.seeked, None);

        assert!(diff(&current, &current.clone(), now).is_empty());
    }

    #[test]
    fn diff_reports_jumps_as_seeks() {
        let now = Instant::now();
        let prev = StatusSnapshot {
            media_loaded: true,
            serial: 1,
            position_us: Some(10_000_000),
            observed_at: Some(now),
            play_state: PlayState::Paused,
            ..Default::default()
        };
        let small = StatusSnapshot {
            position_us: Some(10_500_000),
            ..prev.clone()
        };
        let jump = StatusSnapshot {
            position_us: Some(60_000_000),
            ..prev.clone()
        };

        assert_eq!(diff(&prev, &small, now).seeked, None);
        assert_eq!(diff(&prev, &jump, now).seeked, Some(60_000_000));
    }

    #[test]
    fn connection_events_leave_cache_untouched() {
        let cache = StatusCache::new(None);
        let event = DeviceEvent::Connection(crate::device::ConnectionStatus::Connected);
        assert!(cache.apply(&event, Instant::now()).is_none());
    }

    #[test]
    fn concurrent_reads_never_mix_two_callbacks() {
        let cache = Arc::new(StatusCache::new(None));
        let a = MediaStatus::Loaded(MediaInfo {
            content_id: Some("http://media/a.mp3".into()),
            title: Some("A".into()),
            duration: Some(10.0),
            ..Default::default()
        });
        let b = MediaStatus::Loaded(MediaInfo {
            content_id: Some("http://media/b.mp3".into()),
            title: Some("B".into()),
            duration: Some(20.0),
            ..Default::default()
        });

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    let media = if i % 2 == 0 { a.clone() } else { b.clone() };
                    cache.apply(&DeviceEvent::Media(media), Instant::now());
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        let s = cache.snapshot();
                        match s.title.as_str() {
                            "A" => {
                                assert_eq!(s.content_url.as_deref(), Some("http://media/a.mp3"));
                                assert_eq!(s.duration_us, Some(10_000_000));
                            }
                            "B" => {
                                assert_eq!(s.content_url.as_deref(), Some("http://media/b.mp3"));
                                assert_eq!(s.duration_us, Some(20_000_000));
                            }
                            other => assert_eq!(other, APP_DISPLAY_NAME),
                        }
                    }
                })
            })
            .collect();

        writer.join().expect("writer thread");
        for reader in readers {
            reader.join().expect("reader thread");
        }
    }
}

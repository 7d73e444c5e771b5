//! Control surface exposed on the desktop bus.
//!
//! [`DeviceAdapter`] answers every read from the [`StatusCache`] snapshot and
//! turns every mutation into a queued [`MediaCommand`]. Nothing here waits on
//! the device: the effect of a command shows up later through the bridge.

use std::sync::Arc;
use std::time::Instant;

use url::Url;

use crate::device::youtube;
use crate::device::{DeviceHandle, LoopStatus, MediaCommand};
use crate::error::{AdapterError, ErrorCode};
use crate::protocol_constants::{
    DEFAULT_DISC_NUMBER, MPRIS_NO_TRACK, SUPPORTED_URI_SCHEMES, TRACK_ID_PREFIX, US_IN_SEC,
};
use crate::status::{PlayState, StatusCache, StatusSnapshot};

/// Result type for adapter operations that can be refused.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Slowest playback rate the receiver accepts.
pub const MIN_RATE: f64 = 0.5;

/// Fastest playback rate the receiver accepts.
pub const MAX_RATE: f64 = 2.0;

/// Content type used when the URI's extension is unknown.
const FALLBACK_CONTENT_TYPE: &str = "video/mp4";

/// Metadata of the loaded item.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// D-Bus object path identifying the item.
    pub track_id: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub art_url: Option<String>,
    /// Length in microseconds.
    pub length_us: Option<i64>,
    pub url: Option<String>,
    pub track_number: Option<u32>,
    pub disc_number: i32,
}

impl Metadata {
    fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        Self {
            track_id: track_id(snapshot),
            title: snapshot.title.clone(),
            artist: snapshot.artist.clone(),
            album: snapshot.album.clone(),
            art_url: snapshot.art_url.clone(),
            length_us: snapshot.duration_us,
            url: snapshot.content_url.clone(),
            track_number: snapshot.track_number,
            disc_number: DEFAULT_DISC_NUMBER,
        }
    }
}

fn track_id(snapshot: &StatusSnapshot) -> String {
    if snapshot.media_loaded {
        format!("{}/{}", TRACK_ID_PREFIX, snapshot.serial)
    } else {
        MPRIS_NO_TRACK.to_string()
    }
}

/// Guesses a content type from the last path segment's extension.
fn content_type_for(url: &Url) -> &'static str {
    let extension = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("aac") => "audio/aac",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        Some("ogg" | "oga" | "opus") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("weba") => "audio/webm",
        Some("gif") => "image/gif",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("webm") => "video/webm",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Adapter between bus calls and a device session.
pub struct DeviceAdapter {
    handle: DeviceHandle,
    cache: Arc<StatusCache>,
    desktop_entry: Option<String>,
}

impl DeviceAdapter {
    pub fn new(handle: DeviceHandle, cache: Arc<StatusCache>) -> Self {
        Self {
            handle,
            cache,
            desktop_entry: None,
        }
    }

    /// Sets the desktop entry name advertised by the root interface.
    pub fn with_desktop_entry(mut self, entry: Option<String>) -> Self {
        self.desktop_entry = entry;
        self
    }

    fn snapshot(&self) -> StatusSnapshot {
        self.cache.snapshot()
    }

    fn dispatch(&self, command: MediaCommand) {
        log::debug!("[Adapter] {:?} -> {}", command, self.handle.name());
        if let Err(e) = self.handle.send(command) {
            log::warn!(
                "[Adapter] command not delivered to {}: {} ({})",
                self.handle.name(),
                e,
                e.code()
            );
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity
    // ─────────────────────────────────────────────────────────────────────────

    /// Friendly name of the connected device.
    pub fn identity(&self) -> &str {
        self.handle.name()
    }

    pub fn desktop_entry(&self) -> Option<&str> {
        self.desktop_entry.as_deref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Capabilities
    // ─────────────────────────────────────────────────────────────────────────

    pub fn can_quit(&self) -> bool {
        true
    }

    pub fn can_control(&self) -> bool {
        true
    }

    pub fn can_play(&self) -> bool {
        self.snapshot().can_play()
    }

    pub fn can_pause(&self) -> bool {
        self.snapshot().can_pause()
    }

    pub fn can_seek(&self) -> bool {
        self.snapshot().can_seek()
    }

    pub fn can_play_next(&self) -> bool {
        self.snapshot().can_go_next()
    }

    pub fn can_play_prev(&self) -> bool {
        self.snapshot().can_go_previous()
    }

    pub fn can_edit_tracks(&self) -> bool {
        false
    }

    pub fn has_tracklist(&self) -> bool {
        true
    }

    pub fn has_current_time(&self) -> bool {
        let snapshot = self.snapshot();
        snapshot.media_loaded && snapshot.position_us.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get_playstate(&self) -> PlayState {
        self.snapshot().play_state
    }

    /// Volume in 0.0–1.0; zero while muted.
    pub fn get_volume(&self) -> f64 {
        self.snapshot().effective_volume()
    }

    pub fn is_mute(&self) -> bool {
        self.snapshot().muted
    }

    pub fn get_rate(&self) -> f64 {
        self.snapshot().rate
    }

    pub fn get_shuffle(&self) -> bool {
        self.snapshot().shuffle
    }

    pub fn is_repeating(&self) -> bool {
        self.snapshot().loop_status != LoopStatus::None
    }

    pub fn get_loop_status(&self) -> LoopStatus {
        self.snapshot().loop_status
    }

    pub fn get_stream_title(&self) -> String {
        self.snapshot().title
    }

    pub fn get_art_url(&self) -> Option<String> {
        self.snapshot().art_url
    }

    /// Position in microseconds, advanced by elapsed time while playing.
    pub fn get_current_position(&self) -> i64 {
        self.snapshot().position_at(Instant::now())
    }

    /// Duration in microseconds, if known or inferable.
    pub fn get_duration(&self) -> Option<i64> {
        self.snapshot().duration_us
    }

    pub fn metadata(&self) -> Metadata {
        Metadata::from_snapshot(&self.snapshot())
    }

    /// The single loaded item, or nothing.
    pub fn get_tracks(&self) -> Vec<Metadata> {
        let snapshot = self.snapshot();
        if snapshot.media_loaded {
            vec![Metadata::from_snapshot(&snapshot)]
        } else {
            Vec::new()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    pub fn play(&self) {
        self.dispatch(MediaCommand::Play);
    }

    pub fn pause(&self) {
        self.dispatch(MediaCommand::Pause);
    }

    pub fn play_pause(&self) {
        match self.get_playstate() {
            PlayState::Playing => self.pause(),
            PlayState::Paused | PlayState::Stopped => self.play(),
        }
    }

    pub fn stop(&self) {
        self.dispatch(MediaCommand::Stop);
    }

    /// Skips to the next queue item. No effect unless `CanGoNext` holds.
    pub fn next(&self) {
        if self.can_play_next() {
            self.dispatch(MediaCommand::Next);
        } else {
            log::debug!("[Adapter] next ignored: no next item");
        }
    }

    /// Returns to the previous queue item. No effect unless `CanGoPrevious`
    /// holds.
    pub fn previous(&self) {
        if self.can_play_prev() {
            self.dispatch(MediaCommand::Previous);
        } else {
            log::debug!("[Adapter] previous ignored: no previous item");
        }
    }

    /// Seeks relative to the current position.
    ///
    /// Seeking past the end skips to the next item, or stops playback when
    /// there is none; seeking before the start lands on zero.
    pub fn seek(&self, offset_us: i64) {
        let snapshot = self.snapshot();
        let target = snapshot.position_at(Instant::now()).saturating_add(offset_us);

        if snapshot.duration_us.is_some_and(|duration| target > duration) {
            if snapshot.can_go_next() {
                self.dispatch(MediaCommand::Next);
            } else {
                self.stop();
            }
            return;
        }
        self.seek_to(target.max(0));
    }

    /// Seeks to an absolute position within `track_id`.
    ///
    /// Ignored when the track is not the current one or the position is out
    /// of range.
    pub fn set_position(&self, track_id: &str, position_us: i64) {
        let snapshot = self.snapshot();
        if track_id != self::track_id(&snapshot) {
            log::debug!("[Adapter] set_position for stale track {}", track_id);
            return;
        }
        if position_us < 0 || snapshot.duration_us.is_some_and(|d| position_us > d) {
            log::debug!("[Adapter] set_position out of range: {}", position_us);
            return;
        }
        self.seek_to(position_us);
    }

    fn seek_to(&self, position_us: i64) {
        self.dispatch(MediaCommand::Seek(position_us as f64 / US_IN_SEC));
    }

    pub fn set_volume(&self, volume: f64) {
        self.dispatch(MediaCommand::SetVolume(volume.clamp(0.0, 1.0)));
    }

    pub fn set_mute(&self, muted: bool) {
        self.dispatch(MediaCommand::SetMuted(muted));
    }

    pub fn set_shuffle(&self, shuffle: bool) {
        self.dispatch(MediaCommand::SetShuffle(shuffle));
    }

    pub fn set_repeating(&self, repeating: bool) {
        let status = if repeating {
            LoopStatus::Playlist
        } else {
            LoopStatus::None
        };
        self.set_loop_status(status);
    }

    pub fn set_loop_status(&self, status: LoopStatus) {
        self.dispatch(MediaCommand::SetRepeat(status));
    }

    pub fn set_rate(&self, rate: f64) {
        self.dispatch(MediaCommand::SetRate(rate.clamp(MIN_RATE, MAX_RATE)));
    }

    /// Loads `uri` in the default media receiver.
    pub fn open_uri(&self, uri: &str) -> AdapterResult<()> {
        let url = Url::parse(uri.trim())
            .map_err(|e| AdapterError::InvalidArgument(format!("invalid URI {}: {}", uri, e)))?;
        if !SUPPORTED_URI_SCHEMES.contains(&url.scheme()) {
            return Err(AdapterError::InvalidArgument(format!(
                "unsupported URI scheme: {}",
                url.scheme()
            )));
        }
        if youtube::is_youtube_url(&url) {
            return Err(AdapterError::NotCapable("opening YouTube links"));
        }

        let content_type = content_type_for(&url).to_string();
        self.dispatch(MediaCommand::Load {
            uri: url.into(),
            content_type,
        });
        Ok(())
    }

    /// Stops the running receiver application.
    pub fn quit(&self) {
        self.dispatch(MediaCommand::QuitApp);
    }

    pub fn add_track(&self, _uri: &str, _after_track: &str, _set_as_current: bool) -> AdapterResult<()> {
        Err(AdapterError::NotCapable("editing the track list"))
    }

    pub fn remove_track(&self, _track_id: &str) -> AdapterResult<()> {
        Err(AdapterError::NotCapable("editing the track list"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{
        CastInfo, CastStatus, MediaInfo, MediaStatus, PlayerState, SupportedCommands,
    };
    use crate::protocol_constants::media_commands;
    use crate::test_fixtures::MockSession;

    fn loaded(state: PlayerState) -> MediaStatus {
        MediaStatus::Loaded(MediaInfo {
            content_id: Some("http://media/song.mp3".into()),
            title: Some("Song".into()),
            player_state: state,
            current_time: Some(30.0),
            duration: Some(200.0),
            playback_rate: 1.0,
            supported_commands: SupportedCommands(
                media_commands::PAUSE | media_commands::SEEK | media_commands::QUEUE_NEXT,
            ),
            ..Default::default()
        })
    }

    fn adapter_with(media: MediaStatus) -> (DeviceAdapter, Arc<MockSession>) {
        let session = Arc::new(MockSession::new("Kitchen"));
        let cast = CastStatus::Known(CastInfo {
            volume_level: 0.6,
            ..Default::default()
        });
        let cache = Arc::new(StatusCache::new(None));
        cache.seed(cast, media, Instant::now());
        let adapter = DeviceAdapter::new(DeviceHandle::new(session.clone()), cache);
        (adapter, session)
    }

    #[test]
    fn no_media_disables_everything_but_control_and_quit() {
        let (adapter, _) = adapter_with(MediaStatus::Idle);
        assert!(adapter.can_control());
        assert!(adapter.can_quit());
        assert!(!adapter.can_play());
        assert!(!adapter.can_pause());
        assert!(!adapter.can_seek());
        assert!(!adapter.can_play_next());
        assert!(!adapter.can_play_prev());
        assert!(!adapter.can_edit_tracks());
        assert!(!adapter.has_current_time());
    }

    #[test]
    fn tracks_view_has_zero_or_one_entries() {
        let (idle, _) = adapter_with(MediaStatus::Idle);
        assert!(idle.get_tracks().is_empty());
        assert_eq!(idle.metadata().track_id, MPRIS_NO_TRACK);

        let (playing, _) = adapter_with(loaded(PlayerState::Playing));
        let tracks = playing.get_tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Song");
        assert!(tracks[0].track_id.starts_with(TRACK_ID_PREFIX));
        assert!(!playing.can_edit_tracks());
    }

    #[test]
    fn seek_then_read_does_not_block() {
        let (adapter, session) = adapter_with(loaded(PlayerState::Playing));

        adapter.seek(10_000_000);
        assert_eq!(adapter.get_playstate(), PlayState::Playing);

        match session.sent().as_slice() {
            [MediaCommand::Seek(secs)] => assert!((*secs - 40.0).abs() < 0.5),
            other => panic!("unexpected commands: {:?}", other),
        }
    }

    #[test]
    fn seek_past_end_skips_to_next() {
        let (adapter, session) = adapter_with(loaded(PlayerState::Paused));
        adapter.seek(500_000_000);
        assert_eq!(session.sent(), vec![MediaCommand::Next]);
    }

    #[test]
    fn seek_past_end_without_queue_stops() {
        let media = MediaStatus::Loaded(MediaInfo {
            content_id: Some("http://media/song.mp3".into()),
            player_state: PlayerState::Playing,
            current_time: Some(30.0),
            duration: Some(200.0),
            supported_commands: SupportedCommands(media_commands::PAUSE | media_commands::SEEK),
            ..Default::default()
        });
        let (adapter, session) = adapter_with(media);

        adapter.seek(500_000_000);
        adapter.next();
        adapter.previous();

        assert_eq!(session.sent(), vec![MediaCommand::Stop]);
    }

    #[test]
    fn seek_on_closed_session_is_swallowed() {
        let (adapter, session) = adapter_with(loaded(PlayerState::Paused));
        session.close();

        adapter.seek(1_000_000);
        assert_eq!(adapter.get_playstate(), PlayState::Paused);
    }

    #[test]
    fn set_position_ignores_stale_track() {
        let (adapter, session) = adapter_with(loaded(PlayerState::Paused));
        adapter.set_position("/org/cast_control/track/999", 1_000_000);
        assert!(session.sent().is_empty());

        let current = adapter.metadata().track_id;
        adapter.set_position(&current, 5_000_000);
        assert_eq!(session.sent(), vec![MediaCommand::Seek(5.0)]);
    }

    #[test]
    fn play_pause_toggles_on_cached_state() {
        let (adapter, session) = adapter_with(loaded(PlayerState::Playing));
        adapter.play_pause();
        assert_eq!(session.sent(), vec![MediaCommand::Pause]);

        let (adapter, session) = adapter_with(loaded(PlayerState::Paused));
        adapter.play_pause();
        assert_eq!(session.sent(), vec![MediaCommand::Play]);
    }

    #[test]
    fn mutators_do_not_touch_the_cache() {
        let (adapter, _) = adapter_with(loaded(PlayerState::Playing));
        adapter.set_volume(0.1);
        adapter.set_mute(true);
        adapter.set_shuffle(true);
        assert_eq!(adapter.get_volume(), 0.6);
        assert!(!adapter.is_mute());
        assert!(!adapter.get_shuffle());
    }

    #[test]
    fn rate_and_volume_are_clamped() {
        let (adapter, session) = adapter_with(loaded(PlayerState::Playing));
        adapter.set_rate(10.0);
        adapter.set_volume(-1.0);
        assert_eq!(
            session.sent(),
            vec![MediaCommand::SetRate(MAX_RATE), MediaCommand::SetVolume(0.0)]
        );
    }

    #[test]
    fn open_uri_guesses_content_type() {
        let (adapter, session) = adapter_with(MediaStatus::Idle);
        adapter.open_uri("https://cdn.example.com/a/track.MP3?sig=1").unwrap();
        assert_eq!(
            session.sent(),
            vec![MediaCommand::Load {
                uri: "https://cdn.example.com/a/track.MP3?sig=1".into(),
                content_type: "audio/mpeg".into(),
            }]
        );
    }

    #[test]
    fn open_uri_accepts_any_scheme_case() {
        let (adapter, session) = adapter_with(MediaStatus::Idle);
        adapter.open_uri("HTTPS://cdn.example.com/a.mp3").unwrap();
        assert_eq!(
            session.sent(),
            vec![MediaCommand::Load {
                uri: "https://cdn.example.com/a.mp3".into(),
                content_type: "audio/mpeg".into(),
            }]
        );
    }

    #[test]
    fn open_uri_rejects_regional_youtube_hosts() {
        let (adapter, session) = adapter_with(MediaStatus::Idle);
        assert_eq!(
            adapter.open_uri("https://www.youtube.co.uk/watch?v=abc"),
            Err(AdapterError::NotCapable("opening YouTube links"))
        );
        assert!(matches!(
            adapter.open_uri("not a uri"),
            Err(AdapterError::InvalidArgument(_))
        ));
        assert!(session.sent().is_empty());
    }

    #[test]
    fn open_uri_rejects_unsupported_targets() {
        let (adapter, session) = adapter_with(MediaStatus::Idle);
        assert!(matches!(
            adapter.open_uri("file:///home/me/a.mp3"),
            Err(AdapterError::InvalidArgument(_))
        ));
        assert_eq!(
            adapter.open_uri("https://youtu.be/abc"),
            Err(AdapterError::NotCapable("opening YouTube links"))
        );
        assert!(session.sent().is_empty());
    }

    #[test]
    fn track_editing_is_not_capable() {
        let (adapter, _) = adapter_with(loaded(PlayerState::Playing));
        assert!(adapter.add_track("http://a", MPRIS_NO_TRACK, false).is_err());
        assert!(adapter.remove_track(MPRIS_NO_TRACK).is_err());
    }
}

//! MPRIS publication over the session bus.
//!
//! Every connected device gets its own bus connection owning
//! `org.mpris.MediaPlayer2.cast_control.<device>`, with the three MPRIS
//! interfaces served at `/org/mpris/MediaPlayer2`. Property reads and method
//! calls go straight to the [`DeviceAdapter`]; change notifications arrive
//! from the bridge through a [`ChannelPropertyEmitter`] and are turned into
//! `PropertiesChanged` and `Seeked` signals by a forwarding task.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zbus::object_server::{InterfaceRef, SignalContext};
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};
use zbus::{connection, fdo, interface, Connection};

use crate::adapter::{DeviceAdapter, Metadata, MAX_RATE, MIN_RATE};
use crate::device::LoopStatus;
use crate::error::{AdapterError, BusError, BusResult};
use crate::events::{ChannelPropertyEmitter, PlayerProperty, PropertyChanges, PropertyEmitter};
use crate::protocol_constants::{
    APP_NAME, MPRIS_BUS_NAME_PREFIX, MPRIS_NO_TRACK, MPRIS_OBJECT_PATH, SUPPORTED_MIME_TYPES,
    SUPPORTED_URI_SCHEMES,
};

use super::{BusPublisher, Publication};

/// Well-known bus name for a device.
///
/// Characters outside `[A-Za-z0-9_]` become `_`, and a leading digit is
/// prefixed with `_`, since bus name elements may not start with one.
pub fn bus_name_for(device_name: &str) -> String {
    let mut element: String = device_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if element.is_empty() {
        element.push_str("device");
    }
    if element.starts_with(|c: char| c.is_ascii_digit()) {
        element.insert(0, '_');
    }

    format!("{}.{}.{}", MPRIS_BUS_NAME_PREFIX, APP_NAME, element)
}

impl From<AdapterError> for fdo::Error {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::NotCapable(_) => fdo::Error::NotSupported(err.to_string()),
            AdapterError::InvalidArgument(_) => fdo::Error::InvalidArgs(err.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metadata conversion
// ─────────────────────────────────────────────────────────────────────────────

type MetadataMap = HashMap<String, OwnedValue>;

fn insert<'a>(map: &mut MetadataMap, key: &str, value: impl Into<Value<'a>>) {
    match OwnedValue::try_from(value.into()) {
        Ok(value) => {
            map.insert(key.to_string(), value);
        }
        Err(e) => log::debug!("[Mpris] skipping metadata {}: {}", key, e),
    }
}

fn object_path(track_id: &str) -> ObjectPath<'static> {
    ObjectPath::try_from(track_id.to_string())
        .unwrap_or_else(|_| ObjectPath::from_static_str_unchecked(MPRIS_NO_TRACK))
}

/// Converts metadata to the `a{sv}` map MPRIS clients expect.
fn metadata_map(metadata: &Metadata) -> MetadataMap {
    let mut map = MetadataMap::new();

    insert(&mut map, "mpris:trackid", object_path(&metadata.track_id));
    insert(&mut map, "xesam:title", metadata.title.as_str());
    if let Some(artist) = &metadata.artist {
        insert(&mut map, "xesam:artist", vec![artist.clone()]);
    }
    if let Some(album) = &metadata.album {
        insert(&mut map, "xesam:album", album.as_str());
    }
    if let Some(art_url) = &metadata.art_url {
        insert(&mut map, "mpris:artUrl", art_url.as_str());
    }
    if let Some(length) = metadata.length_us {
        insert(&mut map, "mpris:length", length);
    }
    if let Some(url) = &metadata.url {
        insert(&mut map, "xesam:url", url.as_str());
    }
    if let Some(track_number) = metadata.track_number {
        insert(&mut map, "xesam:trackNumber", track_number as i32);
    }
    insert(&mut map, "xesam:discNumber", metadata.disc_number);

    map
}

// ─────────────────────────────────────────────────────────────────────────────
// Interfaces
// ─────────────────────────────────────────────────────────────────────────────

struct RootInterface {
    adapter: Arc<DeviceAdapter>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootInterface {
    fn raise(&self) {}

    fn quit(&self) {
        self.adapter.quit();
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        self.adapter.can_quit()
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn fullscreen(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn can_set_fullscreen(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        self.adapter.has_tracklist()
    }

    #[zbus(property)]
    fn identity(&self) -> String {
        self.adapter.identity().to_string()
    }

    #[zbus(property)]
    fn desktop_entry(&self) -> String {
        self.adapter.desktop_entry().unwrap_or_default().to_string()
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        SUPPORTED_URI_SCHEMES.iter().map(|s| s.to_string()).collect()
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        SUPPORTED_MIME_TYPES.iter().map(|s| s.to_string()).collect()
    }
}

struct PlayerInterface {
    adapter: Arc<DeviceAdapter>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerInterface {
    fn next(&self) {
        self.adapter.next();
    }

    fn previous(&self) {
        self.adapter.previous();
    }

    fn pause(&self) {
        self.adapter.pause();
    }

    fn play_pause(&self) {
        self.adapter.play_pause();
    }

    fn stop(&self) {
        self.adapter.stop();
    }

    fn play(&self) {
        self.adapter.play();
    }

    fn seek(&self, offset: i64) {
        self.adapter.seek(offset);
    }

    fn set_position(&self, track_id: OwnedObjectPath, position: i64) {
        self.adapter.set_position(track_id.as_str(), position);
    }

    fn open_uri(&self, uri: String) -> fdo::Result<()> {
        self.adapter.open_uri(&uri).map_err(Into::into)
    }

    #[zbus(signal)]
    async fn seeked(ctxt: &SignalContext<'_>, position: i64) -> zbus::Result<()>;

    #[zbus(property)]
    fn playback_status(&self) -> String {
        self.adapter.get_playstate().as_str().to_string()
    }

    #[zbus(property)]
    fn loop_status(&self) -> String {
        self.adapter.get_loop_status().as_str().to_string()
    }

    #[zbus(property)]
    fn set_loop_status(&mut self, value: String) {
        match LoopStatus::parse(&value) {
            Some(status) => self.adapter.set_loop_status(status),
            None => log::warn!("[Mpris] ignoring unknown loop status {:?}", value),
        }
    }

    #[zbus(property)]
    fn rate(&self) -> f64 {
        self.adapter.get_rate()
    }

    #[zbus(property)]
    fn set_rate(&mut self, value: f64) {
        self.adapter.set_rate(value);
    }

    #[zbus(property)]
    fn shuffle(&self) -> bool {
        self.adapter.get_shuffle()
    }

    #[zbus(property)]
    fn set_shuffle(&mut self, value: bool) {
        self.adapter.set_shuffle(value);
    }

    #[zbus(property)]
    fn metadata(&self) -> MetadataMap {
        metadata_map(&self.adapter.metadata())
    }

    #[zbus(property)]
    fn volume(&self) -> f64 {
        self.adapter.get_volume()
    }

    #[zbus(property)]
    fn set_volume(&mut self, value: f64) {
        self.adapter.set_volume(value);
    }

    #[zbus(property(emits_changed_signal = "false"))]
    fn position(&self) -> i64 {
        self.adapter.get_current_position()
    }

    #[zbus(property)]
    fn minimum_rate(&self) -> f64 {
        MIN_RATE
    }

    #[zbus(property)]
    fn maximum_rate(&self) -> f64 {
        MAX_RATE
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        self.adapter.can_play_next()
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        self.adapter.can_play_prev()
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        self.adapter.can_play()
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        self.adapter.can_pause()
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        self.adapter.can_seek()
    }

    #[zbus(property(emits_changed_signal = "const"))]
    fn can_control(&self) -> bool {
        self.adapter.can_control()
    }
}

struct TrackListInterface {
    adapter: Arc<DeviceAdapter>,
}

#[interface(name = "org.mpris.MediaPlayer2.TrackList")]
impl TrackListInterface {
    fn get_tracks_metadata(&self, track_ids: Vec<OwnedObjectPath>) -> Vec<MetadataMap> {
        self.adapter
            .get_tracks()
            .iter()
            .filter(|track| track_ids.iter().any(|id| id.as_str() == track.track_id))
            .map(metadata_map)
            .collect()
    }

    fn add_track(
        &self,
        uri: String,
        after_track: OwnedObjectPath,
        set_as_current: bool,
    ) -> fdo::Result<()> {
        self.adapter
            .add_track(&uri, after_track.as_str(), set_as_current)
            .map_err(Into::into)
    }

    fn remove_track(&self, track_id: OwnedObjectPath) -> fdo::Result<()> {
        self.adapter
            .remove_track(track_id.as_str())
            .map_err(Into::into)
    }

    fn go_to(&self, track_id: OwnedObjectPath) {
        log::debug!("[Mpris] ignoring GoTo {}", track_id.as_str());
    }

    #[zbus(property)]
    fn tracks(&self) -> Vec<OwnedObjectPath> {
        self.adapter
            .get_tracks()
            .iter()
            .map(|track| OwnedObjectPath::from(object_path(&track.track_id)))
            .collect()
    }

    #[zbus(property)]
    fn can_edit_tracks(&self) -> bool {
        self.adapter.can_edit_tracks()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Signal forwarding
// ─────────────────────────────────────────────────────────────────────────────

/// Drains change batches and emits the matching bus signals until the
/// emitter side is dropped or the task is aborted.
async fn forward_changes(
    player: InterfaceRef<PlayerInterface>,
    tracklist: InterfaceRef<TrackListInterface>,
    mut rx: mpsc::UnboundedReceiver<PropertyChanges>,
) {
    while let Some(changes) = rx.recv().await {
        if let Err(e) = emit_batch(&player, &tracklist, &changes).await {
            log::warn!("[Mpris] failed to emit property changes: {}", e);
        }
    }
    log::debug!("[Mpris] change forwarding stopped");
}

async fn emit_batch(
    player: &InterfaceRef<PlayerInterface>,
    tracklist: &InterfaceRef<TrackListInterface>,
    changes: &PropertyChanges,
) -> zbus::Result<()> {
    let ctxt = player.signal_context();
    let iface = player.get().await;

    for property in &changes.properties {
        match property {
            PlayerProperty::PlaybackStatus => iface.playback_status_changed(ctxt).await?,
            PlayerProperty::LoopStatus => iface.loop_status_changed(ctxt).await?,
            PlayerProperty::Rate => iface.rate_changed(ctxt).await?,
            PlayerProperty::Shuffle => iface.shuffle_changed(ctxt).await?,
            PlayerProperty::Metadata => iface.metadata_changed(ctxt).await?,
            PlayerProperty::Volume => iface.volume_changed(ctxt).await?,
            PlayerProperty::CanGoNext => iface.can_go_next_changed(ctxt).await?,
            PlayerProperty::CanGoPrevious => iface.can_go_previous_changed(ctxt).await?,
            PlayerProperty::CanPlay => iface.can_play_changed(ctxt).await?,
            PlayerProperty::CanPause => iface.can_pause_changed(ctxt).await?,
            PlayerProperty::CanSeek => iface.can_seek_changed(ctxt).await?,
            PlayerProperty::Tracks => {
                let tracks = tracklist.get().await;
                tracks.tracks_changed(tracklist.signal_context()).await?;
            }
        }
    }

    if let Some(position) = changes.seeked {
        PlayerInterface::seeked(ctxt, position).await?;
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Publisher
// ─────────────────────────────────────────────────────────────────────────────

/// Publishes adapters on the session bus.
#[derive(Debug, Default)]
pub struct MprisPublisher;

impl MprisPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BusPublisher for MprisPublisher {
    async fn publish(
        &self,
        device_name: &str,
        adapter: Arc<DeviceAdapter>,
    ) -> BusResult<Box<dyn Publication>> {
        let name = bus_name_for(device_name);
        log::info!("[Mpris] publishing {} as {}", device_name, name);

        let connection = connection::Builder::session()?
            .name(name.clone())
            .map_err(|_| BusError::InvalidName(name.clone()))?
            .serve_at(
                MPRIS_OBJECT_PATH,
                RootInterface {
                    adapter: Arc::clone(&adapter),
                },
            )?
            .serve_at(
                MPRIS_OBJECT_PATH,
                PlayerInterface {
                    adapter: Arc::clone(&adapter),
                },
            )?
            .serve_at(MPRIS_OBJECT_PATH, TrackListInterface { adapter })?
            .build()
            .await?;

        let (player, tracklist) = {
            let server = connection.object_server();
            let player = server
                .interface::<_, PlayerInterface>(MPRIS_OBJECT_PATH)
                .await?;
            let tracklist = server
                .interface::<_, TrackListInterface>(MPRIS_OBJECT_PATH)
                .await?;
            (player, tracklist)
        };

        let (emitter, rx) = ChannelPropertyEmitter::channel();
        let forwarder = tokio::spawn(forward_changes(player, tracklist, rx));

        Ok(Box::new(MprisPublication {
            name,
            emitter: Arc::new(emitter),
            live: Mutex::new(Some(LivePublication {
                connection,
                forwarder,
            })),
        }))
    }
}

struct LivePublication {
    connection: Connection,
    forwarder: JoinHandle<()>,
}

struct MprisPublication {
    name: String,
    emitter: Arc<ChannelPropertyEmitter>,
    live: Mutex<Option<LivePublication>>,
}

#[async_trait]
impl Publication for MprisPublication {
    fn emitter(&self) -> Arc<dyn PropertyEmitter> {
        self.emitter.clone()
    }

    async fn unpublish(&self) {
        let Some(live) = self.live.lock().take() else {
            return;
        };

        live.forwarder.abort();

        let server = live.connection.object_server();
        for removed in [
            server.remove::<PlayerInterface, _>(MPRIS_OBJECT_PATH).await,
            server.remove::<TrackListInterface, _>(MPRIS_OBJECT_PATH).await,
            server.remove::<RootInterface, _>(MPRIS_OBJECT_PATH).await,
        ] {
            if let Err(e) = removed {
                log::debug!("[Mpris] failed to remove interface: {}", e);
            }
        }

        match live.connection.release_name(self.name.as_str()).await {
            Ok(_) => log::info!("[Mpris] released {}", self.name),
            Err(e) => log::warn!("[Mpris] failed to release {}: {}", self.name, e),
        }
    }
}

impl Drop for MprisPublication {
    fn drop(&mut self) {
        if let Some(live) = self.live.get_mut().take() {
            live.forwarder.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_name_keeps_plain_names() {
        assert_eq!(
            bus_name_for("Kitchen"),
            "org.mpris.MediaPlayer2.cast_control.Kitchen"
        );
    }

    #[test]
    fn bus_name_replaces_invalid_characters() {
        assert_eq!(
            bus_name_for("Living Room TV (2)"),
            "org.mpris.MediaPlayer2.cast_control.Living_Room_TV__2_"
        );
        assert_eq!(
            bus_name_for("Café-Speaker"),
            "org.mpris.MediaPlayer2.cast_control.Caf__Speaker"
        );
    }

    #[test]
    fn bus_name_never_starts_element_with_digit() {
        assert_eq!(
            bus_name_for("2nd Floor"),
            "org.mpris.MediaPlayer2.cast_control._2nd_Floor"
        );
        assert_eq!(bus_name_for("  "), "org.mpris.MediaPlayer2.cast_control.device");
    }

    #[test]
    fn generated_bus_names_are_valid() {
        for name in ["Kitchen", "2nd Floor", "Café-Speaker", "", "a.b.c"] {
            let bus_name = bus_name_for(name);
            assert!(
                zbus::names::WellKnownName::try_from(bus_name.as_str()).is_ok(),
                "{} is not a valid bus name",
                bus_name
            );
        }
    }

    #[test]
    fn metadata_map_uses_mpris_keys() {
        let metadata = Metadata {
            track_id: "/org/cast_control/track/3".into(),
            title: "Song".into(),
            artist: Some("Artist".into()),
            album: None,
            art_url: Some("file:///icon.svg".into()),
            length_us: Some(90_000_000),
            url: None,
            track_number: Some(4),
            disc_number: 1,
        };

        let map = metadata_map(&metadata);

        assert!(map.contains_key("mpris:trackid"));
        assert!(map.contains_key("xesam:title"));
        assert!(map.contains_key("xesam:artist"));
        assert!(map.contains_key("mpris:artUrl"));
        assert!(map.contains_key("mpris:length"));
        assert!(map.contains_key("xesam:trackNumber"));
        assert!(map.contains_key("xesam:discNumber"));
        assert!(!map.contains_key("xesam:album"));
        assert!(!map.contains_key("xesam:url"));
    }

    #[test]
    fn invalid_track_id_falls_back_to_no_track() {
        assert_eq!(object_path("not a path").as_str(), MPRIS_NO_TRACK);
    }

    #[test]
    fn adapter_errors_map_to_dbus_errors() {
        let err: fdo::Error = AdapterError::NotCapable("editing the track list").into();
        assert!(matches!(err, fdo::Error::NotSupported(_)));

        let err: fdo::Error = AdapterError::InvalidArgument("ftp://x".into()).into();
        assert!(matches!(err, fdo::Error::InvalidArgs(_)));
    }
}

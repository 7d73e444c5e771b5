//! `rust_cast`-backed device session.
//!
//! `rust_cast` talks to the device over a blocking TLS socket, so each
//! session owns one worker thread that holds the [`CastDevice`]. Once per
//! heartbeat interval the worker pings the device and reads every message up
//! to the matching pong: device pings are answered and pushed receiver and
//! media status is applied. Commands arrive on a channel between heartbeats
//! and are followed by a status request. Status changes are stored in shared
//! state and delivered to listeners from the worker thread. Any I/O failure
//! ends the worker with [`ConnectionStatus::Lost`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rust_cast::channels::heartbeat::HeartbeatResponse;
use rust_cast::channels::media::{self as cast_media, Media, MediaResponse, Metadata, StreamType};
use rust_cast::channels::receiver::{self as cast_receiver, CastDeviceApp, ReceiverResponse};
use rust_cast::{CastDevice, ChannelMessage};
use tokio::sync::oneshot;

use crate::error::{DeviceError, DeviceResult};
use crate::protocol_constants::{media_commands, HEARTBEAT_INTERVAL_MS, RECEIVER_DESTINATION_ID};

use super::listeners::ListenerRegistry;
use super::traits::{DeviceSession, ListenerId, StatusListener};
use super::types::{
    CastInfo, CastStatus, CastTarget, ConnectionStatus, DeviceEvent, EventCategory, MediaCommand,
    MediaInfo, MediaStatus, PlayerState, SupportedCommands,
};

/// Namespace an application must expose for media status requests.
const MEDIA_NAMESPACE: &str = "urn:x-cast:com.google.cast.media";

/// Advertised commands this session cannot send: `rust_cast` has no
/// QUEUE_UPDATE request.
const UNSENDABLE_COMMANDS: u32 = media_commands::QUEUE_NEXT
    | media_commands::QUEUE_PREV
    | media_commands::QUEUE_SHUFFLE
    | media_commands::QUEUE_REPEAT_ALL
    | media_commands::QUEUE_REPEAT_ONE;

enum WorkerMessage {
    Command(MediaCommand),
    Disconnect,
}

/// State shared between the session handle and its worker thread.
#[derive(Default)]
struct Shared {
    cast: RwLock<CastStatus>,
    media: RwLock<MediaStatus>,
    connection: RwLock<ConnectionStatus>,
    listeners: ListenerRegistry,
    closed: AtomicBool,
}

impl Shared {
    fn update_cast(&self, status: CastStatus) {
        if replace_if_changed(&self.cast, &status) {
            self.listeners.dispatch(&DeviceEvent::Cast(status));
        }
    }

    fn update_media(&self, status: MediaStatus) {
        if replace_if_changed(&self.media, &status) {
            self.listeners.dispatch(&DeviceEvent::Media(status));
        }
    }

    fn update_connection(&self, status: ConnectionStatus) {
        if replace_if_changed(&self.connection, &status) {
            self.listeners.dispatch(&DeviceEvent::Connection(status));
        }
    }
}

/// Stores `value` and reports whether it differed from the previous one.
/// The write lock is released before listeners run.
fn replace_if_changed<T: Clone + PartialEq>(slot: &RwLock<T>, value: &T) -> bool {
    let mut current = slot.write();
    if *current == *value {
        return false;
    }
    *current = value.clone();
    true
}

/// A live connection to one cast device.
pub struct CastSession {
    name: String,
    uuid: Option<String>,
    shared: Arc<Shared>,
    commands: Mutex<Option<mpsc::Sender<WorkerMessage>>>,
}

impl CastSession {
    /// Opens a session to `target`. Returns once the receiver channel is
    /// connected and the first status request has completed.
    pub async fn connect(target: CastTarget) -> DeviceResult<Self> {
        let shared = Arc::new(Shared::default());
        *shared.connection.write() = ConnectionStatus::Connecting;

        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let worker_shared = Arc::clone(&shared);
        let worker_target = target.clone();
        thread::Builder::new()
            .name(format!("cast-{}", target.host))
            .spawn(move || run_worker(worker_target, worker_shared, rx, ready_tx))
            .map_err(|e| DeviceError::Connection(e.to_string()))?;

        ready_rx.await.map_err(|_| DeviceError::SessionClosed)??;

        log::info!(
            "[CastSession] connected to {} at {}:{}",
            target.name,
            target.host,
            target.port
        );

        Ok(Self {
            name: target.name,
            uuid: target.uuid,
            shared,
            commands: Mutex::new(Some(tx)),
        })
    }
}

impl DeviceSession for CastSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    fn cast_status(&self) -> CastStatus {
        self.shared.cast.read().clone()
    }

    fn connection_status(&self) -> ConnectionStatus {
        self.shared.connection.read().clone()
    }

    fn media_status(&self) -> MediaStatus {
        self.shared.media.read().clone()
    }

    fn send(&self, command: MediaCommand) -> DeviceResult<()> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(DeviceError::SessionClosed);
        }
        let commands = self.commands.lock();
        let sender = commands.as_ref().ok_or(DeviceError::SessionClosed)?;
        sender
            .send(WorkerMessage::Command(command))
            .map_err(|_| DeviceError::SessionClosed)
    }

    fn subscribe(
        &self,
        categories: &[EventCategory],
        listener: Arc<dyn StatusListener>,
    ) -> ListenerId {
        self.shared.listeners.subscribe(categories, listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.shared.listeners.unsubscribe(id);
    }

    fn disconnect(&self) {
        self.shared.listeners.clear();
        if let Some(sender) = self.commands.lock().take() {
            log::debug!("[CastSession] disconnecting from {}", self.name);
            let _ = sender.send(WorkerMessage::Disconnect);
        }
    }
}

impl Drop for CastSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound messages
// ─────────────────────────────────────────────────────────────────────────────

/// Inbound side of a device connection.
trait MessageLink {
    fn receive(&self) -> DeviceResult<ChannelMessage>;
    fn pong(&self) -> DeviceResult<()>;
}

impl MessageLink for CastDevice<'_> {
    fn receive(&self) -> DeviceResult<ChannelMessage> {
        CastDevice::receive(self).map_err(protocol_error)
    }

    fn pong(&self) -> DeviceResult<()> {
        self.heartbeat.pong().map_err(protocol_error)
    }
}

/// Status the device pushed without being asked.
enum Broadcast {
    Receiver(cast_receiver::Status),
    Media(cast_media::Status),
}

/// Reads messages until a pong arrives, answering device pings and keeping
/// pushed status. Returns how many messages were consumed.
///
/// `rust_cast` parks messages that arrive while it waits for a reply, and
/// `receive` hands those back first, so each call also empties that buffer.
fn drain_until_pong(link: &impl MessageLink, pushed: &mut Vec<Broadcast>) -> DeviceResult<usize> {
    let mut consumed = 0;
    loop {
        let message = link.receive()?;
        consumed += 1;
        match message {
            ChannelMessage::Heartbeat(HeartbeatResponse::Pong) => return Ok(consumed),
            ChannelMessage::Heartbeat(HeartbeatResponse::Ping) => link.pong()?,
            ChannelMessage::Receiver(ReceiverResponse::Status(status)) => {
                pushed.push(Broadcast::Receiver(status));
            }
            ChannelMessage::Media(MediaResponse::Status(status)) => {
                pushed.push(Broadcast::Media(status));
            }
            other => log::trace!("[CastSession] ignoring {:?}", other),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker
// ─────────────────────────────────────────────────────────────────────────────

/// Running receiver application.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunningApp {
    session_id: String,
    transport_id: String,
    has_media: bool,
}

struct Worker {
    device: CastDevice<'static>,
    shared: Arc<Shared>,
    app: Option<RunningApp>,
    media_session_id: Option<i32>,
}

fn protocol_error(e: rust_cast::errors::Error) -> DeviceError {
    DeviceError::Protocol(e.to_string())
}

fn open_device(target: &CastTarget) -> DeviceResult<CastDevice<'static>> {
    let device = CastDevice::connect_without_host_verification(target.host.clone(), target.port)
        .map_err(|e| DeviceError::Connection(e.to_string()))?;
    device
        .connection
        .connect(RECEIVER_DESTINATION_ID)
        .map_err(|e| DeviceError::Connection(e.to_string()))?;
    Ok(device)
}

fn run_worker(
    target: CastTarget,
    shared: Arc<Shared>,
    rx: mpsc::Receiver<WorkerMessage>,
    ready: oneshot::Sender<DeviceResult<()>>,
) {
    let device = match open_device(&target) {
        Ok(device) => device,
        Err(e) => {
            *shared.connection.write() = ConnectionStatus::Failed {
                reason: Some(e.to_string()),
            };
            shared.closed.store(true, Ordering::SeqCst);
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut worker = Worker {
        device,
        shared,
        app: None,
        media_session_id: None,
    };

    if let Err(e) = worker.refresh() {
        worker.shared.closed.store(true, Ordering::SeqCst);
        let _ = ready.send(Err(e));
        return;
    }
    *worker.shared.connection.write() = ConnectionStatus::Connected;
    if ready.send(Ok(())).is_err() {
        return;
    }

    let interval = Duration::from_millis(HEARTBEAT_INTERVAL_MS);
    let mut next_heartbeat = Instant::now() + interval;

    loop {
        let timeout = next_heartbeat.saturating_duration_since(Instant::now());
        let result = match rx.recv_timeout(timeout) {
            Ok(WorkerMessage::Command(command)) => {
                log::debug!("[CastSession] {} <- {:?}", target.name, command);
                match worker.execute(command) {
                    // Pick up the effect right away.
                    Ok(()) => worker.refresh(),
                    Err(e) => {
                        log::warn!("[CastSession] command failed on {}: {}", target.name, e);
                        Ok(())
                    }
                }
            }
            Ok(WorkerMessage::Disconnect) | Err(RecvTimeoutError::Disconnected) => {
                worker.close(ConnectionStatus::Disconnected { reason: None });
                break;
            }
            Err(RecvTimeoutError::Timeout) => Ok(()),
        };

        let result = result.and_then(|()| {
            if Instant::now() < next_heartbeat {
                return Ok(());
            }
            next_heartbeat = Instant::now() + interval;
            worker.heartbeat()
        });

        if let Err(e) = result {
            log::warn!("[CastSession] lost {}: {}", target.name, e);
            worker.close(ConnectionStatus::Lost {
                reason: Some(e.to_string()),
            });
            break;
        }
    }

    log::debug!("[CastSession] worker for {} exited", target.name);
}

impl Worker {
    fn close(&self, status: ConnectionStatus) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.update_connection(status);
        self.shared.listeners.clear();
    }

    /// Pings the device and applies whatever it pushed since the last beat.
    fn heartbeat(&mut self) -> DeviceResult<()> {
        self.device.heartbeat.ping().map_err(protocol_error)?;

        let mut pushed = Vec::new();
        let consumed = drain_until_pong(&self.device, &mut pushed)?;
        log::trace!("[CastSession] heartbeat read {} messages", consumed);

        for broadcast in pushed {
            match broadcast {
                Broadcast::Receiver(status) => self.apply_receiver(&status)?,
                Broadcast::Media(status) => self.apply_media(&status),
            }
        }
        Ok(())
    }

    /// Requests receiver and media status and publishes changes.
    fn refresh(&mut self) -> DeviceResult<()> {
        let status = self.device.receiver.get_status().map_err(protocol_error)?;
        self.apply_receiver(&status)?;
        self.refresh_media()
    }

    fn refresh_media(&mut self) -> DeviceResult<()> {
        match &self.app {
            Some(app) if app.has_media => {
                let status = self
                    .device
                    .media
                    .get_status(app.transport_id.clone(), None)
                    .map_err(protocol_error)?;
                self.apply_media(&status);
            }
            Some(_) => self.shared.update_media(MediaStatus::Idle),
            None => self.shared.update_media(MediaStatus::Unknown),
        }
        Ok(())
    }

    fn apply_receiver(&mut self, status: &cast_receiver::Status) -> DeviceResult<()> {
        let application = status.applications.first();
        let app_changed = self.track_app(application)?;
        self.shared.update_cast(cast_status_from(status, application));
        if app_changed {
            self.refresh_media()?;
        }
        Ok(())
    }

    fn apply_media(&mut self, status: &cast_media::Status) {
        if !self.app.as_ref().is_some_and(|app| app.has_media) {
            return;
        }
        let entry = status.entries.first();
        self.media_session_id = entry.map(|e| e.media_session_id);

        let media = match entry {
            Some(entry) => {
                let previous = self.shared.media.read().clone();
                media_status_from(entry, previous.info())
            }
            None => MediaStatus::Idle,
        };
        self.shared.update_media(media);
    }

    /// Connects to a newly started application's transport. Returns whether
    /// the running application changed.
    fn track_app(&mut self, application: Option<&cast_receiver::Application>) -> DeviceResult<bool> {
        let running = application.map(|app| RunningApp {
            session_id: app.session_id.clone(),
            transport_id: app.transport_id.clone(),
            has_media: app.namespaces.iter().any(|ns| ns == MEDIA_NAMESPACE),
        });

        if running == self.app {
            return Ok(false);
        }
        if let Some(app) = &running {
            self.device
                .connection
                .connect(app.transport_id.clone())
                .map_err(protocol_error)?;
        }
        self.app = running;
        self.media_session_id = None;
        Ok(true)
    }

    fn media_target(&self) -> DeviceResult<(String, i32)> {
        match (&self.app, self.media_session_id) {
            (Some(app), Some(id)) => Ok((app.transport_id.clone(), id)),
            _ => Err(DeviceError::Protocol("no active media session".into())),
        }
    }

    fn execute(&mut self, command: MediaCommand) -> DeviceResult<()> {
        match command {
            MediaCommand::Play => {
                let (transport, id) = self.media_target()?;
                self.device.media.play(transport, id).map_err(protocol_error)?;
            }
            MediaCommand::Pause => {
                let (transport, id) = self.media_target()?;
                self.device.media.pause(transport, id).map_err(protocol_error)?;
            }
            MediaCommand::Stop => {
                let (transport, id) = self.media_target()?;
                self.device.media.stop(transport, id).map_err(protocol_error)?;
            }
            MediaCommand::Seek(secs) => {
                let (transport, id) = self.media_target()?;
                self.device
                    .media
                    .seek(transport, id, Some(secs as f32), None)
                    .map_err(protocol_error)?;
            }
            MediaCommand::SetVolume(level) => {
                self.device
                    .receiver
                    .set_volume(level as f32)
                    .map_err(protocol_error)?;
            }
            MediaCommand::SetMuted(muted) => {
                self.device
                    .receiver
                    .set_volume(muted)
                    .map_err(protocol_error)?;
            }
            MediaCommand::QuitApp => {
                if let Some(app) = &self.app {
                    self.device
                        .receiver
                        .stop_app(app.session_id.clone())
                        .map_err(protocol_error)?;
                }
            }
            MediaCommand::Load { uri, content_type } => {
                let app = self
                    .device
                    .receiver
                    .launch_app(&CastDeviceApp::DefaultMediaReceiver)
                    .map_err(protocol_error)?;
                self.device
                    .connection
                    .connect(app.transport_id.clone())
                    .map_err(protocol_error)?;
                let media = Media {
                    content_id: uri,
                    content_type,
                    stream_type: StreamType::Buffered,
                    duration: None,
                    metadata: None,
                };
                self.device
                    .media
                    .load(app.transport_id.clone(), app.session_id.clone(), &media)
                    .map_err(protocol_error)?;
            }
            // `rust_cast` has no request for these.
            MediaCommand::Next
            | MediaCommand::Previous
            | MediaCommand::SetShuffle(_)
            | MediaCommand::SetRepeat(_)
            | MediaCommand::SetRate(_) => {
                return Err(DeviceError::Unsupported(format!("{:?}", command)));
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Status mapping
// ─────────────────────────────────────────────────────────────────────────────

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn cast_status_from(
    status: &cast_receiver::Status,
    application: Option<&cast_receiver::Application>,
) -> CastStatus {
    CastStatus::Known(CastInfo {
        volume_level: status.volume.level.map(f64::from).unwrap_or(0.0),
        volume_muted: status.volume.muted.unwrap_or(false),
        app_id: application.and_then(|app| non_empty(&app.app_id)),
        app_display_name: application.and_then(|app| non_empty(&app.display_name)),
        icon_url: None,
    })
}

fn player_state_from(state: &cast_media::PlayerState) -> PlayerState {
    match state {
        cast_media::PlayerState::Idle => PlayerState::Idle,
        cast_media::PlayerState::Buffering => PlayerState::Buffering,
        cast_media::PlayerState::Playing => PlayerState::Playing,
        cast_media::PlayerState::Paused => PlayerState::Paused,
    }
}

/// Keeps only the advertised commands this session can carry out.
fn supported_commands_from(bits: u32) -> SupportedCommands {
    SupportedCommands(bits & !UNSENDABLE_COMMANDS)
}

/// Maps a media status entry. Receivers omit the `media` object once it has
/// been sent, so item fields carry over from `previous` when it is absent.
fn media_status_from(entry: &cast_media::StatusEntry, previous: Option<&MediaInfo>) -> MediaStatus {
    let mut info = MediaInfo {
        player_state: player_state_from(&entry.player_state),
        current_time: entry.current_time.map(f64::from),
        playback_rate: f64::from(entry.playback_rate),
        supported_commands: supported_commands_from(entry.supported_media_commands),
        ..Default::default()
    };

    match (&entry.media, previous) {
        (Some(media), _) => {
            info.content_id = non_empty(&media.content_id);
            info.content_type = non_empty(&media.content_type);
            info.duration = media.duration.map(f64::from);
            if let Some(metadata) = &media.metadata {
                apply_metadata(&mut info, metadata);
            }
        }
        (None, Some(previous)) => carry_item(&mut info, previous),
        (None, None) => {}
    }

    MediaStatus::Loaded(info)
}

/// Copies the item description (not the playback state) from `previous`.
fn carry_item(info: &mut MediaInfo, previous: &MediaInfo) {
    info.content_id = previous.content_id.clone();
    info.content_type = previous.content_type.clone();
    info.duration = previous.duration;
    info.title = previous.title.clone();
    info.series_title = previous.series_title.clone();
    info.subtitle = previous.subtitle.clone();
    info.artist = previous.artist.clone();
    info.album = previous.album.clone();
    info.track_number = previous.track_number;
    info.images = previous.images.clone();
}

fn apply_metadata(info: &mut MediaInfo, metadata: &Metadata) {
    let urls = |images: &[cast_media::Image]| images.iter().map(|i| i.url.clone()).collect();

    match metadata {
        Metadata::Generic(m) => {
            info.title = m.title.clone();
            info.subtitle = m.subtitle.clone();
            info.images = urls(&m.images);
        }
        Metadata::Movie(m) => {
            info.title = m.title.clone();
            info.subtitle = m.subtitle.clone();
            info.images = urls(&m.images);
        }
        Metadata::TvShow(m) => {
            info.title = m.episode_title.clone();
            info.series_title = m.series_title.clone();
            info.images = urls(&m.images);
        }
        Metadata::MusicTrack(m) => {
            info.title = m.title.clone();
            info.artist = m.artist.clone().or_else(|| m.album_artist.clone());
            info.album = m.album_name.clone();
            info.track_number = m.track_number;
            info.images = urls(&m.images);
        }
        Metadata::Photo(m) => {
            info.title = m.title.clone();
            info.artist = m.artist.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Recorder {
        events: PlMutex<Vec<DeviceEvent>>,
    }

    impl StatusListener for Recorder {
        fn on_event(&self, event: DeviceEvent) {
            self.events.lock().push(event);
        }
    }

    /// Scripted inbound messages; runs dry with an error like a closed socket.
    #[derive(Default)]
    struct ScriptedLink {
        inbox: PlMutex<VecDeque<ChannelMessage>>,
        pongs_sent: PlMutex<usize>,
    }

    impl ScriptedLink {
        fn with(messages: Vec<ChannelMessage>) -> Self {
            Self {
                inbox: PlMutex::new(messages.into()),
                ..Default::default()
            }
        }

        fn remaining(&self) -> usize {
            self.inbox.lock().len()
        }
    }

    impl MessageLink for ScriptedLink {
        fn receive(&self) -> DeviceResult<ChannelMessage> {
            self.inbox
                .lock()
                .pop_front()
                .ok_or_else(|| DeviceError::Protocol("connection closed".into()))
        }

        fn pong(&self) -> DeviceResult<()> {
            *self.pongs_sent.lock() += 1;
            Ok(())
        }
    }

    fn ping() -> ChannelMessage {
        ChannelMessage::Heartbeat(HeartbeatResponse::Ping)
    }

    fn pong() -> ChannelMessage {
        ChannelMessage::Heartbeat(HeartbeatResponse::Pong)
    }

    #[test]
    fn heartbeat_consumes_everything_up_to_the_pong() {
        let link = ScriptedLink::with(vec![ping(), ping(), pong(), ping()]);
        let mut pushed = Vec::new();

        let consumed = drain_until_pong(&link, &mut pushed).unwrap();

        assert_eq!(consumed, 3);
        assert_eq!(*link.pongs_sent.lock(), 2);
        assert_eq!(link.remaining(), 1);
        assert!(pushed.is_empty());
    }

    #[test]
    fn leftover_messages_are_read_on_the_next_beat() {
        let link = ScriptedLink::with(vec![pong(), ping(), pong()]);
        let mut pushed = Vec::new();

        assert_eq!(drain_until_pong(&link, &mut pushed).unwrap(), 1);
        assert_eq!(drain_until_pong(&link, &mut pushed).unwrap(), 2);
        assert_eq!(link.remaining(), 0);
        assert_eq!(*link.pongs_sent.lock(), 1);
    }

    #[test]
    fn closed_link_fails_the_heartbeat() {
        let link = ScriptedLink::with(vec![ping()]);
        let mut pushed = Vec::new();

        assert!(drain_until_pong(&link, &mut pushed).is_err());
        assert_eq!(*link.pongs_sent.lock(), 1);
    }

    #[test]
    fn queue_commands_are_never_advertised() {
        let all = media_commands::PAUSE
            | media_commands::SEEK
            | media_commands::QUEUE_NEXT
            | media_commands::QUEUE_PREV
            | media_commands::QUEUE_SHUFFLE;
        let commands = supported_commands_from(all);

        assert!(commands.pause());
        assert!(commands.seek());
        assert!(!commands.queue_next());
        assert!(!commands.queue_prev());
    }

    #[test]
    fn item_fields_carry_over_when_media_is_omitted() {
        let previous = MediaInfo {
            content_id: Some("http://media/a.mp3".into()),
            title: Some("A".into()),
            duration: Some(120.0),
            images: vec!["http://img/a.jpg".into()],
            player_state: PlayerState::Playing,
            ..Default::default()
        };
        let mut info = MediaInfo {
            player_state: PlayerState::Paused,
            ..Default::default()
        };

        carry_item(&mut info, &previous);

        assert_eq!(info.content_id, previous.content_id);
        assert_eq!(info.title, previous.title);
        assert_eq!(info.duration, Some(120.0));
        assert_eq!(info.images, previous.images);
        assert_eq!(info.player_state, PlayerState::Paused);
    }

    #[test]
    fn unchanged_status_is_not_redispatched() {
        let shared = Shared::default();
        let recorder = Arc::new(Recorder::default());
        shared.listeners.subscribe(&EventCategory::ALL, recorder.clone());

        shared.update_media(MediaStatus::Idle);
        shared.update_media(MediaStatus::Idle);
        shared.update_connection(ConnectionStatus::Lost { reason: None });

        assert_eq!(
            *recorder.events.lock(),
            vec![
                DeviceEvent::Media(MediaStatus::Idle),
                DeviceEvent::Connection(ConnectionStatus::Lost { reason: None }),
            ]
        );
    }

    #[test]
    fn blank_strings_are_dropped() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty(" Netflix "), Some("Netflix".into()));
    }

    #[test]
    fn player_states_map_one_to_one() {
        assert_eq!(
            player_state_from(&cast_media::PlayerState::Buffering),
            PlayerState::Buffering
        );
        assert_eq!(
            player_state_from(&cast_media::PlayerState::Paused),
            PlayerState::Paused
        );
    }
}

//! Fakes for the voice layer, resolver and notifier used across tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::mpsc, time::timeout};

use crate::{
    audio::{
        notify::{Notifier, PlaybackEvent},
        player::AudioPlayer,
        queue::QueueStore,
        voice::{OnComplete, VoiceSession},
    },
    error::MusicError,
    sources::{MediaResolver, ResolvedTrack, StreamHandle},
};

pub const VOICE_CHANNEL: ChannelId = ChannelId::new(100);

#[derive(Default)]
pub struct FakeVoice {
    channels: Mutex<HashMap<GuildId, ChannelId>>,
    active: Mutex<HashMap<GuildId, OnComplete>>,
    paused: Mutex<HashSet<GuildId>>,
    started: Mutex<Vec<(GuildId, String)>>,
    rejected: Mutex<HashSet<String>>,
    overlapping: AtomicUsize,
}

impl FakeVoice {
    pub fn connected_to(guilds: &[GuildId]) -> Arc<Self> {
        let voice = Self::default();
        for guild in guilds {
            voice.channels.lock().insert(*guild, VOICE_CHANNEL);
        }
        Arc::new(voice)
    }

    pub fn reject(&self, url: &str) {
        self.rejected.lock().insert(url.to_string());
    }

    /// Termina el stream activo como lo haría el motor de voz
    pub fn finish(&self, guild_id: GuildId, error: Option<&str>) -> bool {
        let callback = self.active.lock().remove(&guild_id);
        self.paused.lock().remove(&guild_id);
        match callback {
            Some(callback) => {
                callback(error.map(str::to_string));
                true
            }
            None => false,
        }
    }

    pub fn started(&self) -> Vec<(GuildId, String)> {
        self.started.lock().clone()
    }

    pub fn started_in(&self, guild_id: GuildId) -> Vec<String> {
        self.started
            .lock()
            .iter()
            .filter(|(guild, _)| *guild == guild_id)
            .map(|(_, url)| url.clone())
            .collect()
    }

    pub fn overlapping_starts(&self) -> usize {
        self.overlapping.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceSession for FakeVoice {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError> {
        self.channels.lock().insert(guild_id, channel_id);
        Ok(())
    }

    async fn move_to(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError> {
        self.channels.lock().insert(guild_id, channel_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), MusicError> {
        self.channels.lock().remove(&guild_id);
        self.active.lock().remove(&guild_id);
        Ok(())
    }

    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.channels.lock().get(&guild_id).copied()
    }

    async fn start_stream(
        &self,
        guild_id: GuildId,
        stream: StreamHandle,
        on_complete: OnComplete,
    ) -> Result<(), MusicError> {
        if self.rejected.lock().contains(&stream.url) {
            return Err(MusicError::StreamStart(format!("rejected {}", stream.url)));
        }

        let mut active = self.active.lock();
        if active.contains_key(&guild_id) {
            self.overlapping.fetch_add(1, Ordering::SeqCst);
            return Err(MusicError::StreamStart("already streaming".into()));
        }
        active.insert(guild_id, on_complete);
        self.started.lock().push((guild_id, stream.url));
        Ok(())
    }

    async fn stop_stream(&self, guild_id: GuildId) {
        self.finish(guild_id, None);
    }

    async fn pause_stream(&self, guild_id: GuildId) -> Result<(), MusicError> {
        if !self.active.lock().contains_key(&guild_id) {
            return Err(MusicError::Voice("nothing playing".into()));
        }
        self.paused.lock().insert(guild_id);
        Ok(())
    }

    async fn resume_stream(&self, guild_id: GuildId) -> Result<(), MusicError> {
        self.paused.lock().remove(&guild_id);
        Ok(())
    }

    async fn is_playing(&self, guild_id: GuildId) -> bool {
        self.active.lock().contains_key(&guild_id) && !self.paused.lock().contains(&guild_id)
    }

    async fn is_paused(&self, guild_id: GuildId) -> bool {
        self.paused.lock().contains(&guild_id)
    }
}

/// Resuelve cada query a sí misma; el stream es `stream://<query>`.
#[derive(Default)]
pub struct StubResolver {
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, queries: &[&str]) -> Self {
        self.failing.extend(queries.iter().map(|q| q.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaResolver for StubResolver {
    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, MusicError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(query) {
            return Err(MusicError::resolution(query, "video unavailable"));
        }

        Ok(ResolvedTrack {
            source_ref: query.to_string(),
            title: query.to_string(),
            stream: StreamHandle::new(format!("stream://{}", query)),
        })
    }
}

pub struct RecordingNotifier {
    sender: mpsc::UnboundedSender<(GuildId, PlaybackEvent)>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, guild_id: GuildId, event: PlaybackEvent) {
        let _ = self.sender.send((guild_id, event));
    }
}

pub struct EventLog(mpsc::UnboundedReceiver<(GuildId, PlaybackEvent)>);

impl EventLog {
    pub async fn next(&mut self) -> (GuildId, PlaybackEvent) {
        timeout(Duration::from_secs(2), self.0.recv())
            .await
            .expect("timed out waiting for a playback event")
            .expect("notifier dropped")
    }

    pub async fn assert_quiet(&mut self) {
        if let Ok(event) = timeout(Duration::from_millis(100), self.0.recv()).await {
            panic!("unexpected playback event: {:?}", event);
        }
    }
}

pub fn recording_notifier() -> (Arc<RecordingNotifier>, EventLog) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Arc::new(RecordingNotifier { sender }), EventLog(receiver))
}

pub fn parts(
    guilds: &[GuildId],
) -> (Arc<QueueStore>, Arc<FakeVoice>, Arc<RecordingNotifier>, EventLog) {
    let (notifier, events) = recording_notifier();
    (
        Arc::new(QueueStore::new()),
        FakeVoice::connected_to(guilds),
        notifier,
        events,
    )
}

pub struct Harness {
    pub queue: Arc<QueueStore>,
    pub voice: Arc<FakeVoice>,
    pub player: Arc<AudioPlayer>,
    pub events: EventLog,
}

/// Reproductor con driver de completions, voz conectada en `guilds`
pub fn harness(resolver: Arc<dyn MediaResolver>, guilds: &[GuildId]) -> Harness {
    let (queue, voice, notifier, events) = parts(guilds);
    let player = AudioPlayer::spawn(queue.clone(), resolver, voice.clone(), notifier);

    Harness {
        queue,
        voice,
        player,
        events,
    }
}

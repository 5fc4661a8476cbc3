use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Weak,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        notify::{Notifier, PlaybackEvent},
        queue::QueueStore,
        voice::{OnComplete, VoiceSession},
    },
    error::MusicError,
    sources::MediaResolver,
};

/// Estado de reproducción de un guild.
///
/// El token identifica la corrida de `advance` (o el stream) dueña del
/// estado; una completion sólo continúa la cola si trae el token vigente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Resolving(u64),
    Playing(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// A stream was started for this title.
    Started { title: String },
    /// The queue was drained; the guild is idle.
    QueueEnded,
    /// Another run owns the guild (resolving or playing).
    Busy,
    /// No voice connection; the guild is idle and the queue untouched.
    Disconnected,
    /// The guild was reset while this run was in flight.
    Superseded,
}

/// Fin de stream entregado desde el contexto del motor de voz.
#[derive(Debug)]
pub struct Completion {
    guild_id: GuildId,
    token: u64,
    error: Option<String>,
}

pub type CompletionReceiver = mpsc::UnboundedReceiver<Completion>;

type GuildStates = Arc<DashMap<GuildId, PlaybackState>>;

/// Per-guild playback orchestrator.
///
/// For every guild at most one run is in flight: it pops the next track,
/// resolves it, starts the stream and parks in `Playing`. The stream's
/// completion is sent back over a channel and continues the same guild
/// from the orchestrator's own tasks.
pub struct AudioPlayer {
    queue: Arc<QueueStore>,
    resolver: Arc<dyn MediaResolver>,
    voice: Arc<dyn VoiceSession>,
    notifier: Arc<dyn Notifier>,
    states: GuildStates,
    tokens: AtomicU64,
    completions: mpsc::UnboundedSender<Completion>,
}

impl AudioPlayer {
    /// Creates the player and hands back the completion receiver.
    ///
    /// Most callers want [`AudioPlayer::spawn`], which also starts the
    /// task that consumes completions.
    pub fn new(
        queue: Arc<QueueStore>,
        resolver: Arc<dyn MediaResolver>,
        voice: Arc<dyn VoiceSession>,
        notifier: Arc<dyn Notifier>,
    ) -> (Arc<Self>, CompletionReceiver) {
        let (completions, receiver) = mpsc::unbounded_channel();

        let player = Arc::new(Self {
            queue,
            resolver,
            voice,
            notifier,
            states: Arc::new(DashMap::new()),
            tokens: AtomicU64::new(1),
            completions,
        });

        (player, receiver)
    }

    pub fn spawn(
        queue: Arc<QueueStore>,
        resolver: Arc<dyn MediaResolver>,
        voice: Arc<dyn VoiceSession>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let (player, receiver) = Self::new(queue, resolver, voice, notifier);
        tokio::spawn(run_completions(Arc::downgrade(&player), receiver));
        player
    }

    /// Starts the next queued track if the guild is idle.
    ///
    /// Returns [`AdvanceOutcome::Busy`] without touching the queue when a
    /// track is already resolving or playing.
    pub async fn advance(&self, guild_id: GuildId) -> AdvanceOutcome {
        let token = self.next_token();

        if !transition(
            &self.states,
            guild_id,
            PlaybackState::Idle,
            PlaybackState::Resolving(token),
        ) {
            debug!("⏳ Guild {} ocupado, advance ignorado", guild_id);
            return AdvanceOutcome::Busy;
        }

        self.drain(guild_id, token).await
    }

    /// `advance` sin esperar el resultado (la resolución puede tardar)
    pub fn advance_in_background(self: &Arc<Self>, guild_id: GuildId) {
        let player = self.clone();
        tokio::spawn(async move {
            let outcome = player.advance(guild_id).await;
            debug!("advance en guild {}: {:?}", guild_id, outcome);
        });
    }

    pub fn state(&self, guild_id: GuildId) -> PlaybackState {
        self.states
            .get(&guild_id)
            .map(|state| *state)
            .unwrap_or(PlaybackState::Idle)
    }

    /// Vuelve el guild a `Idle`; completions y corridas en vuelo quedan obsoletas
    pub fn reset(&self, guild_id: GuildId) {
        self.states.insert(guild_id, PlaybackState::Idle);
        info!("⏹️ Reproducción reiniciada en guild {}", guild_id);
    }

    async fn on_completion(&self, completion: Completion) -> Option<AdvanceOutcome> {
        let Completion {
            guild_id,
            token,
            error,
        } = completion;

        if let Some(err) = &error {
            error!("❌ Error de reproducción en guild {}: {}", guild_id, err);
        }

        let next = self.next_token();
        if !transition(
            &self.states,
            guild_id,
            PlaybackState::Playing(token),
            PlaybackState::Resolving(next),
        ) {
            debug!("Completion obsoleta en guild {} (token {})", guild_id, token);
            return None;
        }

        debug!("🎵 Track terminado en guild {}, siguiente...", guild_id);
        Some(self.drain(guild_id, next).await)
    }

    // Cada vuelta consume una entrada de la cola, así que el loop está
    // acotado por el largo de la cola aunque todas las pistas fallen.
    async fn drain(&self, guild_id: GuildId, mut token: u64) -> AdvanceOutcome {
        loop {
            let resolving = PlaybackState::Resolving(token);
            let playing = PlaybackState::Playing(token);

            if !self.voice.is_connected(guild_id).await {
                transition(&self.states, guild_id, resolving, PlaybackState::Idle);
                debug!("🔌 Guild {} sin conexión de voz", guild_id);
                return AdvanceOutcome::Disconnected;
            }

            let Some(track) = self.queue.dequeue_next(guild_id) else {
                if !transition(&self.states, guild_id, resolving, PlaybackState::Idle) {
                    return AdvanceOutcome::Superseded;
                }

                // Un play pudo encolar después del dequeue y ver el guild ocupado
                if !self.queue.is_empty(guild_id) {
                    let next = self.next_token();
                    if !transition(
                        &self.states,
                        guild_id,
                        PlaybackState::Idle,
                        PlaybackState::Resolving(next),
                    ) {
                        return AdvanceOutcome::Busy;
                    }
                    debug!("🔁 Pista encolada durante el cierre en guild {}", guild_id);
                    token = next;
                    continue;
                }

                info!("📭 Cola terminada en guild {}", guild_id);
                self.notifier
                    .notify(guild_id, PlaybackEvent::QueueEnded)
                    .await;
                return AdvanceOutcome::QueueEnded;
            };

            let resolved = match self.resolver.resolve(&track.source_ref).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("⏭️ Saltando {}: {}", track.title, e);
                    if self.state(guild_id) != resolving {
                        return AdvanceOutcome::Superseded;
                    }
                    self.notify_failure(guild_id, &track.title).await;
                    continue;
                }
            };

            // Un leave durante la resolución invalida este resultado
            if !transition(&self.states, guild_id, resolving, playing) {
                debug!("Resolución de {} descartada, guild reiniciado", track.title);
                return AdvanceOutcome::Superseded;
            }

            let on_complete = self.completion_hook(guild_id, token);
            match self
                .voice
                .start_stream(guild_id, resolved.stream, on_complete)
                .await
            {
                Ok(()) => {
                    info!("🎵 Reproduciendo en guild {}: {}", guild_id, track.title);
                    self.notifier
                        .notify(
                            guild_id,
                            PlaybackEvent::NowPlaying {
                                title: track.title.clone(),
                            },
                        )
                        .await;
                    return AdvanceOutcome::Started { title: track.title };
                }
                Err(e) => {
                    warn!("⏭️ Saltando {}: {}", track.title, e);
                    if !transition(&self.states, guild_id, playing, resolving) {
                        return AdvanceOutcome::Superseded;
                    }
                    self.notify_failure(guild_id, &track.title).await;
                }
            }
        }
    }

    async fn notify_failure(&self, guild_id: GuildId, title: &str) {
        self.notifier
            .notify(
                guild_id,
                PlaybackEvent::CouldNotPlay {
                    title: title.to_string(),
                },
            )
            .await;
    }

    /// Callback registrado en el motor de voz.
    ///
    /// Sólo envía un mensaje: nunca bloquea el hilo del motor. Si el envío
    /// falla, el guild queda en `Idle` para que un próximo play lo reactive.
    fn completion_hook(&self, guild_id: GuildId, token: u64) -> OnComplete {
        let sender = self.completions.clone();
        let states = self.states.clone();

        Box::new(move |error| {
            let completion = Completion {
                guild_id,
                token,
                error,
            };

            if let Err(mpsc::error::SendError(lost)) = sender.send(completion) {
                let err = MusicError::Handoff {
                    guild: guild_id,
                    reason: "completion receiver is closed".to_string(),
                };
                error!("🚨 {} (error de reproducción: {:?})", err, lost.error);
                transition(
                    &states,
                    guild_id,
                    PlaybackState::Playing(token),
                    PlaybackState::Idle,
                );
            }
        })
    }

    fn next_token(&self) -> u64 {
        self.tokens.fetch_add(1, Ordering::Relaxed)
    }
}

/// Consume completions y continúa cada guild en su propia tarea
async fn run_completions(player: Weak<AudioPlayer>, mut receiver: CompletionReceiver) {
    while let Some(completion) = receiver.recv().await {
        let Some(player) = player.upgrade() else {
            break;
        };

        tokio::spawn(async move {
            if let Some(outcome) = player.on_completion(completion).await {
                debug!("Continuación tras completion: {:?}", outcome);
            }
        });
    }

    debug!("Driver de completions terminado");
}

fn transition(
    states: &DashMap<GuildId, PlaybackState>,
    guild_id: GuildId,
    from: PlaybackState,
    to: PlaybackState,
) -> bool {
    let mut state = states.entry(guild_id).or_insert(PlaybackState::Idle);
    if *state == from {
        *state = to;
        true
    } else {
        false
    }
}

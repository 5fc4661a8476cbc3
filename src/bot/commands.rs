use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    audio::{
        player::{AudioPlayer, PlaybackState},
        queue::{QueueStore, TrackDescriptor},
        voice::VoiceSession,
    },
    error::MusicError,
    sources::MediaResolver,
};

/// Comandos de texto soportados (con sus alias)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play { query: String },
    Pause,
    Resume,
    Skip,
    Queue,
    Leave,
}

impl Command {
    /// Parsea un mensaje como `<prefix><nombre> [argumentos]`.
    ///
    /// Devuelve `None` para mensajes que no son comandos del bot.
    pub fn parse(prefix: &str, content: &str) -> Option<Self> {
        let body = content.trim().strip_prefix(prefix)?;
        let (name, args) = body
            .split_once(char::is_whitespace)
            .unwrap_or((body, ""));

        let command = match name.to_lowercase().as_str() {
            "play" | "p" => Self::Play {
                query: args.trim().to_string(),
            },
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "skip" | "s" => Self::Skip,
            "queue" | "q" => Self::Queue,
            "leave" | "disconnect" | "dc" => Self::Leave,
            _ => return None,
        };

        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Play { .. } => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Skip => "skip",
            Self::Queue => "queue",
            Self::Leave => "leave",
        }
    }
}

/// Thin mapping from user commands to the queue, player and voice layer.
///
/// Every command yields a short status line for the invoking channel.
pub struct CommandSurface {
    queue: Arc<QueueStore>,
    player: Arc<AudioPlayer>,
    voice: Arc<dyn VoiceSession>,
    resolver: Arc<dyn MediaResolver>,
    prefix: String,
}

impl CommandSurface {
    pub fn new(
        queue: Arc<QueueStore>,
        player: Arc<AudioPlayer>,
        voice: Arc<dyn VoiceSession>,
        resolver: Arc<dyn MediaResolver>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            player,
            voice,
            resolver,
            prefix: prefix.into(),
        }
    }

    /// Ejecuta un comando. `caller_channel` es el canal de voz del autor.
    pub async fn execute(
        &self,
        guild_id: GuildId,
        caller_channel: Option<ChannelId>,
        command: Command,
    ) -> String {
        let result = match command {
            Command::Play { query } => self.play(guild_id, caller_channel, &query).await,
            Command::Pause => Ok(self.pause(guild_id).await),
            Command::Resume => Ok(self.resume(guild_id).await),
            Command::Skip => Ok(self.skip(guild_id).await),
            Command::Queue => Ok(self.show_queue(guild_id)),
            Command::Leave => self.leave(guild_id).await,
        };

        result.unwrap_or_else(|e| reply_for(&e))
    }

    /// El bot fue desconectado por fuera de `leave`: limpiar estado
    pub fn handle_disconnect(&self, guild_id: GuildId) {
        self.queue.clear(guild_id);
        self.player.reset(guild_id);
    }

    async fn play(
        &self,
        guild_id: GuildId,
        caller_channel: Option<ChannelId>,
        query: &str,
    ) -> Result<String, MusicError> {
        if query.is_empty() {
            return Ok(format!("Usage: `{}play <url or search terms>`", self.prefix));
        }

        let channel_id = caller_channel.ok_or(MusicError::NotInVoiceChannel)?;

        // Conectar o mover al canal del usuario
        match self.voice.current_channel(guild_id).await {
            None => self.voice.connect(guild_id, channel_id).await?,
            Some(current) if current != channel_id => {
                self.voice.move_to(guild_id, channel_id).await?
            }
            Some(_) => {}
        }

        let resolved = self.resolver.resolve(query).await?;
        let title = resolved.title.clone();

        self.queue.enqueue(
            guild_id,
            TrackDescriptor::new(resolved.source_ref, resolved.title),
        );

        // Si nada se está reproduciendo, iniciar
        if self.player.state(guild_id) == PlaybackState::Idle {
            self.player.advance_in_background(guild_id);
        }

        Ok(format!("➕ Added to queue: **{}**", title))
    }

    async fn pause(&self, guild_id: GuildId) -> String {
        if !self.voice.is_playing(guild_id).await {
            return "Nothing is playing right now.".to_string();
        }

        match self.voice.pause_stream(guild_id).await {
            Ok(()) => {
                info!("⏸️ Reproducción pausada en guild {}", guild_id);
                "⏸ Paused".to_string()
            }
            Err(e) => reply_for(&e),
        }
    }

    async fn resume(&self, guild_id: GuildId) -> String {
        if !self.voice.is_paused(guild_id).await {
            return "Nothing is paused.".to_string();
        }

        match self.voice.resume_stream(guild_id).await {
            Ok(()) => {
                info!("▶️ Reproducción reanudada en guild {}", guild_id);
                "▶ Resumed".to_string()
            }
            Err(e) => reply_for(&e),
        }
    }

    // El stop dispara el callback de fin ya registrado, que avanza la cola
    async fn skip(&self, guild_id: GuildId) -> String {
        if !self.voice.is_playing(guild_id).await {
            return "Nothing to skip.".to_string();
        }

        self.voice.stop_stream(guild_id).await;
        info!("⏭️ Track saltado en guild {}", guild_id);
        "⏭ Skipped".to_string()
    }

    fn show_queue(&self, guild_id: GuildId) -> String {
        let tracks = self.queue.snapshot(guild_id);
        if tracks.is_empty() {
            return "🧺 The queue is empty.".to_string();
        }

        let lines: Vec<String> = tracks
            .iter()
            .enumerate()
            .map(|(i, track)| format!("{}. {}", i + 1, track.title))
            .collect();

        format!("📜 **Current queue:**\n{}", lines.join("\n"))
    }

    async fn leave(&self, guild_id: GuildId) -> Result<String, MusicError> {
        if !self.voice.is_connected(guild_id).await {
            return Ok("I'm not in a voice channel.".to_string());
        }

        self.handle_disconnect(guild_id);
        self.voice.stop_stream(guild_id).await;
        self.voice.disconnect(guild_id).await?;

        info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        Ok("👋 Left the voice channel.".to_string())
    }
}

fn reply_for(error: &MusicError) -> String {
    match error {
        MusicError::NotInVoiceChannel => error.to_string(),
        MusicError::Resolution { .. } => {
            warn!("🔍 Búsqueda fallida: {}", error);
            "❌ Something went wrong while searching/downloading.".to_string()
        }
        MusicError::Voice(_) => {
            warn!("🔊 Error de voz: {}", error);
            "❌ Could not join your voice channel.".to_string()
        }
        MusicError::StreamStart(_) | MusicError::Handoff { .. } => {
            warn!("Error inesperado en comando: {}", error);
            "❌ Something went wrong.".to_string()
        }
    }
}

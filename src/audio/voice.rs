use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;

use crate::{error::MusicError, sources::StreamHandle};

/// Callback de fin de stream. Recibe el error de reproducción, si lo hubo.
///
/// Puede invocarse desde cualquier contexto de ejecución del motor de voz.
pub type OnComplete = Box<dyn FnOnce(Option<String>) + Send + 'static>;

/// The live voice connection of each guild.
///
/// At most one stream is active per guild. `start_stream` must arrange
/// for `on_complete` to run exactly once when that stream ends for any
/// reason: natural end, playback error or `stop_stream`.
#[async_trait]
pub trait VoiceSession: Send + Sync {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError>;

    async fn move_to(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError>;

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), MusicError>;

    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId>;

    async fn is_connected(&self, guild_id: GuildId) -> bool {
        self.current_channel(guild_id).await.is_some()
    }

    async fn start_stream(
        &self,
        guild_id: GuildId,
        stream: StreamHandle,
        on_complete: OnComplete,
    ) -> Result<(), MusicError>;

    async fn stop_stream(&self, guild_id: GuildId);

    async fn pause_stream(&self, guild_id: GuildId) -> Result<(), MusicError>;

    async fn resume_stream(&self, guild_id: GuildId) -> Result<(), MusicError>;

    async fn is_playing(&self, guild_id: GuildId) -> bool;

    async fn is_paused(&self, guild_id: GuildId) -> bool;
}

/// Take-once holder for an [`OnComplete`].
///
/// Voice backends that report the end of a stream through several events
/// register the same slot on all of them; only the first firing reaches
/// the callback.
#[derive(Clone)]
pub struct CompletionSlot(Arc<Mutex<Option<OnComplete>>>);

impl CompletionSlot {
    pub fn new(on_complete: OnComplete) -> Self {
        Self(Arc::new(Mutex::new(Some(on_complete))))
    }

    /// Devuelve `false` si el callback ya se había disparado.
    pub fn fire(&self, error: Option<String>) -> bool {
        // Soltar el lock antes de invocar el callback
        let callback = self.0.lock().take();
        match callback {
            Some(callback) => {
                callback(error);
                true
            }
            None => false,
        }
    }
}

use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input},
    tracks::{PlayMode, TrackHandle},
    Event, Songbird,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, warn};

use crate::{
    audio::voice::{CompletionSlot, OnComplete, VoiceSession},
    bot::events::TrackCompletionHandler,
    error::MusicError,
    sources::StreamHandle,
};

/// Sesiones de voz sobre Songbird: una `Call` y a lo sumo un track por guild.
pub struct SongbirdVoice {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    tracks: DashMap<GuildId, TrackHandle>,
}

impl SongbirdVoice {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self {
            manager,
            http,
            tracks: DashMap::new(),
        }
    }

    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError> {
        self.manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::Voice(e.to_string()))?;

        info!("🔊 Conectado al canal {} en guild {}", channel_id, guild_id);
        Ok(())
    }

    fn track(&self, guild_id: GuildId) -> Option<TrackHandle> {
        self.tracks.get(&guild_id).map(|t| t.clone())
    }

    async fn play_mode(&self, guild_id: GuildId) -> Option<PlayMode> {
        let track = self.track(guild_id)?;
        track.get_info().await.ok().map(|info| info.playing)
    }
}

#[async_trait]
impl VoiceSession for SongbirdVoice {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError> {
        self.join(guild_id, channel_id).await
    }

    // Songbird mueve la llamada existente al volver a hacer join
    async fn move_to(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError> {
        self.join(guild_id, channel_id).await
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), MusicError> {
        self.tracks.remove(&guild_id);

        if self.manager.get(guild_id).is_some() {
            self.manager
                .remove(guild_id)
                .await
                .map_err(|e| MusicError::Voice(e.to_string()))?;
        }

        info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        Ok(())
    }

    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let call = self.manager.get(guild_id)?;
        let call = call.lock().await;
        call.current_channel().map(|channel| ChannelId::from(channel.0))
    }

    async fn start_stream(
        &self,
        guild_id: GuildId,
        stream: StreamHandle,
        on_complete: OnComplete,
    ) -> Result<(), MusicError> {
        let call = self
            .manager
            .get(guild_id)
            .ok_or_else(|| MusicError::StreamStart("no voice connection".into()))?;

        let headers = header_map(&stream.headers);
        let input: Input =
            HttpRequest::new_with_headers(self.http.clone(), stream.url, headers).into();

        let handle = {
            let mut call = call.lock().await;
            call.play_only_input(input)
        };

        let slot = CompletionSlot::new(on_complete);
        for event in TrackCompletionHandler::EVENTS {
            let registered = handle.add_event(
                Event::Track(event),
                TrackCompletionHandler {
                    guild_id,
                    slot: slot.clone(),
                },
            );

            if let Err(e) = registered {
                // El track ya terminó: entregar el fin de inmediato
                warn!("No se pudo registrar {:?} en guild {}: {}", event, guild_id, e);
                slot.fire(Some(e.to_string()));
                break;
            }
        }

        self.tracks.insert(guild_id, handle);
        debug!("▶️ Stream iniciado en guild {}", guild_id);
        Ok(())
    }

    async fn stop_stream(&self, guild_id: GuildId) {
        if let Some((_, track)) = self.tracks.remove(&guild_id) {
            if let Err(e) = track.stop() {
                debug!("Track ya detenido en guild {}: {}", guild_id, e);
            }
        }
    }

    async fn pause_stream(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let track = self
            .track(guild_id)
            .ok_or_else(|| MusicError::Voice("nothing is playing".into()))?;
        track.pause().map_err(|e| MusicError::Voice(e.to_string()))
    }

    async fn resume_stream(&self, guild_id: GuildId) -> Result<(), MusicError> {
        let track = self
            .track(guild_id)
            .ok_or_else(|| MusicError::Voice("nothing is paused".into()))?;
        track.play().map_err(|e| MusicError::Voice(e.to_string()))
    }

    async fn is_playing(&self, guild_id: GuildId) -> bool {
        matches!(self.play_mode(guild_id).await, Some(PlayMode::Play))
    }

    async fn is_paused(&self, guild_id: GuildId) -> bool {
        matches!(self.play_mode(guild_id).await, Some(PlayMode::Pause))
    }
}

// Headers inválidos se descartan: mejor intentar el stream que fallar acá
fn header_map(headers: &HashMap<String, String>) -> HeaderMap {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let parsed = HeaderName::from_bytes(name.as_bytes())
                .ok()
                .zip(HeaderValue::from_str(value).ok());
            if parsed.is_none() {
                debug!("Header descartado: {}", name);
            }
            parsed
        })
        .collect()
}

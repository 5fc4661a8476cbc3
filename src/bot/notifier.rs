use async_trait::async_trait;
use dashmap::DashMap;
use serenity::{
    http::Http,
    model::id::{ChannelId, GuildId},
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::audio::notify::{Notifier, PlaybackEvent};

/// Publica los avisos del reproductor en el último canal de texto
/// desde el que el guild envió un comando.
pub struct ChannelNotifier {
    http: Arc<Http>,
    channels: DashMap<GuildId, ChannelId>,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            channels: DashMap::new(),
        }
    }

    pub fn bind(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.channels.insert(guild_id, channel_id);
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, guild_id: GuildId, event: PlaybackEvent) {
        let Some(channel_id) = self.channels.get(&guild_id).map(|c| *c) else {
            debug!("Sin canal de texto para guild {}: {}", guild_id, event);
            return;
        };

        if let Err(e) = channel_id.say(self.http.as_ref(), event.to_string()).await {
            error!("Error al enviar aviso a {}: {:?}", channel_id, e);
        }
    }
}

use serenity::{async_trait, model::id::GuildId};
use songbird::{
    tracks::PlayMode, Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler,
    TrackEvent,
};
use tracing::debug;

use crate::audio::voice::CompletionSlot;

/// Handler para el fin de un track (End o Error).
///
/// Ambos eventos comparten el mismo slot, así que el callback del
/// reproductor corre una sola vez por stream.
pub struct TrackCompletionHandler {
    pub guild_id: GuildId,
    pub slot: CompletionSlot,
}

impl TrackCompletionHandler {
    pub const EVENTS: [TrackEvent; 2] = [TrackEvent::End, TrackEvent::Error];
}

#[async_trait]
impl VoiceEventHandler for TrackCompletionHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        let error = match ctx {
            EventContext::Track(track_list) => track_list.iter().find_map(|(state, _handle)| {
                match &state.playing {
                    PlayMode::Errored(e) => Some(format!("{:?}", e)),
                    _ => None,
                }
            }),
            _ => None,
        };

        if !self.slot.fire(error) {
            debug!("Completion ya entregada para guild {}", self.guild_id);
        }

        None
    }
}

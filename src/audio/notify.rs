use async_trait::async_trait;
use serenity::model::id::GuildId;
use std::fmt;

/// Avisos que el reproductor emite hacia el guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    NowPlaying { title: String },
    CouldNotPlay { title: String },
    QueueEnded,
}

impl fmt::Display for PlaybackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NowPlaying { title } => write!(f, "🎶 Now playing: **{}**", title),
            Self::CouldNotPlay { title } => write!(f, "Could not play **{}** 😢", title),
            Self::QueueEnded => write!(f, "Queue ended ✅"),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Entrega best-effort; los fallos se registran, nunca se propagan.
    async fn notify(&self, guild_id: GuildId, event: PlaybackEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_messages() {
        let now = PlaybackEvent::NowPlaying { title: "A".into() };
        let fail = PlaybackEvent::CouldNotPlay { title: "B".into() };

        assert_eq!(now.to_string(), "🎶 Now playing: **A**");
        assert_eq!(fail.to_string(), "Could not play **B** 😢");
        assert_eq!(PlaybackEvent::QueueEnded.to_string(), "Queue ended ✅");
    }
}

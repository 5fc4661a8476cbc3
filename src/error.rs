use serenity::model::id::GuildId;
use thiserror::Error;

/// Errores del núcleo de reproducción.
///
/// Ninguno es fatal para el proceso: `NotInVoiceChannel` se devuelve al
/// usuario, `Resolution` y `StreamStart` los absorbe el reproductor
/// saltando la pista, y `Handoff` se registra dejando el guild en reposo.
#[derive(Debug, Clone, Error)]
pub enum MusicError {
    #[error("You need to be in a voice channel first!")]
    NotInVoiceChannel,

    #[error("could not resolve `{query}`: {reason}")]
    Resolution { query: String, reason: String },

    #[error("voice layer rejected the stream: {0}")]
    StreamStart(String),

    #[error("completion hand-off failed for guild {guild}: {reason}")]
    Handoff { guild: GuildId, reason: String },

    #[error("voice connection error: {0}")]
    Voice(String),
}

impl MusicError {
    pub fn resolution(query: impl Into<String>, reason: impl ToString) -> Self {
        Self::Resolution {
            query: query.into(),
            reason: reason.to_string(),
        }
    }
}

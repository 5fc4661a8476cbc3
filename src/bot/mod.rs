//! # Bot Module
//!
//! Discord-facing side of the bot.
//!
//! - [`MusicBot`] implements Serenity's [`EventHandler`]: it parses prefix
//!   commands from guild messages and tracks the bot's own voice state
//! - [`commands`] maps commands to the queue, player and voice layer
//! - [`voice`] and [`events`] adapt Songbird to the voice-session contract
//! - [`notifier`] posts playback events back to the guild's text channel

use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Message, Ready, UserId, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info};

pub mod commands;
pub mod events;
pub mod notifier;
pub mod voice;

use crate::config::Config;
use commands::{Command, CommandSurface};
use notifier::ChannelNotifier;

/// Main Discord event handler.
///
/// Commands from different guilds run concurrently; everything that
/// touches shared guild state goes through [`CommandSurface`].
pub struct MusicBot {
    config: Arc<Config>,
    surface: Arc<CommandSurface>,
    notifier: Arc<ChannelNotifier>,
}

impl MusicBot {
    pub fn new(
        config: Arc<Config>,
        surface: Arc<CommandSurface>,
        notifier: Arc<ChannelNotifier>,
    ) -> Self {
        Self {
            config,
            surface,
            notifier,
        }
    }
}

#[async_trait]
impl EventHandler for MusicBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea! (ID: {})", ready.user.name, ready.user.id);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        let Some(command) = Command::parse(&self.config.command_prefix, &msg.content) else {
            return;
        };

        info!(
            "📝 Comando {} usado por {} en guild {}",
            command.name(),
            msg.author.name,
            guild_id
        );

        self.notifier.bind(guild_id, msg.channel_id);
        let caller_channel = user_voice_channel(&ctx, guild_id, msg.author.id);

        let reply = self.surface.execute(guild_id, caller_channel, command).await;
        if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
            error!("Error al responder comando: {:?}", e);
        }
    }

    /// Limpia el estado del guild si el bot fue sacado del canal de voz.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            self.surface.handle_disconnect(guild_id);
        }
    }
}

// Sin await: la referencia al guild en caché no puede cruzar puntos de suspensión
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

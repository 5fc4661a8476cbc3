use anyhow::Result;
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod health;
mod sources;

use crate::audio::{player::AudioPlayer, queue::QueueStore};
use crate::bot::{commands::CommandSurface, notifier::ChannelNotifier, voice::SongbirdVoice, MusicBot};
use crate::config::Config;
use crate::sources::YtDlpResolver;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guild_queue_bot=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Guild Queue Bot v{}", env!("CARGO_PKG_VERSION"));

    // Sin token no hay arranque
    let config = Arc::new(Config::load()?);
    info!("{}", config.summary());

    let resolver = Arc::new(YtDlpResolver::from_config(&config));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        let version = resolver.verify_binary().await?;
        println!("OK (yt-dlp {})", version);
        return Ok(());
    }

    health::spawn(config.port)?;

    let manager = Songbird::serenity();
    let voice = Arc::new(SongbirdVoice::new(manager.clone(), reqwest::Client::new()));
    let notifier = Arc::new(ChannelNotifier::new(Arc::new(Http::new(&config.discord_token))));
    let queue = Arc::new(QueueStore::new());

    let player = AudioPlayer::spawn(
        queue.clone(),
        resolver.clone(),
        voice.clone(),
        notifier.clone(),
    );
    let surface = Arc::new(CommandSurface::new(
        queue,
        player,
        voice,
        resolver,
        config.command_prefix.clone(),
    ));

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = MusicBot::new(config.clone(), surface, notifier);

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(manager)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

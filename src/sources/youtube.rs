use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};
use tokio::{sync::Semaphore, time::timeout};
use tracing::{debug, info};

use super::{is_direct_link, MediaResolver, ResolvedTrack, StreamHandle};
use crate::{config::Config, error::MusicError};

/// Resolver respaldado por el ejecutable `yt-dlp`.
pub struct YtDlpResolver {
    binary: String,
    // Ancho del pool de resoluciones concurrentes
    permits: Semaphore,
    timeout: Duration,
}

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    http_headers: Option<HashMap<String, String>>,
    entries: Option<Vec<YtDlpInfo>>,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>, workers: usize, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            permits: Semaphore::new(workers.max(1)),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.ytdlp_path.clone(),
            config.resolver_concurrency,
            config.resolve_timeout(),
        )
    }

    /// Verifica que yt-dlp esté instalado
    pub async fn verify_binary(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.binary).arg("--version").output().await?;

        if !output.status.success() {
            anyhow::bail!("{} --version falló", self.binary);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, target: &str) -> Result<String, MusicError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| MusicError::resolution(target, e))?;

        let output = timeout(
            self.timeout,
            Command::new(&self.binary)
                .args([
                    "--dump-single-json",
                    "--no-playlist",
                    "--no-warnings",
                    "-f",
                    "bestaudio/best",
                    target,
                ])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| MusicError::resolution(target, format!("timed out after {:?}", self.timeout)))?
        .map_err(|e| MusicError::resolution(target, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MusicError::resolution(target, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, MusicError> {
        let target = search_target(query);
        debug!("🔍 Resolviendo con yt-dlp: {}", target);

        let stdout = self.run(&target).await?;
        let track = parse_info(query, &stdout)?;

        info!("✅ Resuelto: {} ({})", track.title, track.source_ref);
        Ok(track)
    }
}

/// Links pasan tal cual; el texto libre se busca tomando el primer resultado.
fn search_target(query: &str) -> String {
    let query = query.trim();
    if is_direct_link(query) {
        query.to_string()
    } else {
        format!("ytsearch1:{}", query)
    }
}

fn parse_info(query: &str, raw: &str) -> Result<ResolvedTrack, MusicError> {
    let mut info: YtDlpInfo = serde_json::from_str(raw.trim())
        .map_err(|e| MusicError::resolution(query, format!("invalid yt-dlp output: {}", e)))?;

    // Búsquedas y playlists vienen envueltas en `entries`
    if let Some(entries) = info.entries.take() {
        info = entries
            .into_iter()
            .next()
            .ok_or_else(|| MusicError::resolution(query, "no results"))?;
    }

    let stream_url = info
        .url
        .clone()
        .ok_or_else(|| MusicError::resolution(query, "no playable stream url"))?;

    Ok(ResolvedTrack {
        source_ref: info.webpage_url.unwrap_or_else(|| stream_url.clone()),
        title: info.title.unwrap_or_else(|| "Unknown title".to_string()),
        stream: StreamHandle {
            url: stream_url,
            headers: info.http_headers.unwrap_or_default(),
        },
    })
}

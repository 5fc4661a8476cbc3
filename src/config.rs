use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,

    // Liveness
    pub port: u16,

    // Resolución (yt-dlp)
    pub resolver_concurrency: usize,
    pub resolve_timeout_secs: u64,
    pub ytdlp_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// `load` feeds it the process environment; tests feed it a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            discord_token: var("DISCORD_TOKEN").context("DISCORD_TOKEN env var not set")?,
            command_prefix: var("COMMAND_PREFIX").unwrap_or_else(|| "!".to_string()),

            port: var("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("PORT must be a valid port number")?,

            resolver_concurrency: match var("RESOLVER_CONCURRENCY") {
                Some(val) => val.parse().context("RESOLVER_CONCURRENCY must be a number")?,
                None => num_cpus::get(),
            },
            resolve_timeout_secs: var("RESOLVE_TIMEOUT_SECS")
                .unwrap_or_else(|| "60".to_string())
                .parse()
                .context("RESOLVE_TIMEOUT_SECS must be a number")?,
            ytdlp_path: var("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The command prefix must not be empty
    /// - At least one resolver worker must be allowed
    /// - The resolve timeout must be greater than zero
    pub fn validate(&self) -> Result<()> {
        if self.command_prefix.trim().is_empty() {
            anyhow::bail!("Command prefix must not be empty");
        }

        if self.resolver_concurrency == 0 {
            anyhow::bail!("Resolver concurrency must be greater than 0");
        }

        if self.resolve_timeout_secs == 0 {
            anyhow::bail!("Resolve timeout must be greater than 0");
        }

        Ok(())
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Commands: prefix '{}'\n  \
            Liveness: port {}\n  \
            Resolver: {} ({} workers, {}s timeout)",
            self.command_prefix,
            self.port,
            self.ytdlp_path,
            self.resolver_concurrency,
            self.resolve_timeout_secs,
        )
    }
}

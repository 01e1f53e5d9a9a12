//! Bot-only settings (the pipeline reads its own `Config`)

use reelcore::{AppError, AppResult};
use secrecy::SecretString;
use std::env;

/// Settings needed to connect to Discord
#[derive(Debug)]
pub struct BotSettings {
    /// Bot token (DISCORD_TOKEN)
    pub token: SecretString,
}

impl BotSettings {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Fails when DISCORD_TOKEN is missing or blank.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Config("DISCORD_TOKEN is not set".to_string()))?;

        Ok(Self {
            token: SecretString::from(token),
        })
    }
}

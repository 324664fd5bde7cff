use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::warn;

use crate::provider::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotVersion {
    Lite,
    Full,
}

impl BotVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            BotVersion::Lite => "lite",
            BotVersion::Full => "full",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub authorized_chat_id: i64,
    pub group_chat_id: Option<i64>,
    pub version: BotVersion,
    pub inline_controls: bool,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub media_dir: PathBuf,
    pub http_timeout_seconds: u64,
    pub provider_max_attempts: usize,
    pub provider_backoff_ms: u64,
    pub provider_max_backoff_ms: u64,
    pub format_max_dimension: u32,
    pub format_jpeg_quality: u8,
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.raw(name).unwrap_or_else(|| default.to_string())
    }

    fn bool(&self, name: &str, default: bool) -> bool {
        match self.raw(name) {
            Some(value) => matches!(
                value.to_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            ),
            None => default,
        }
    }

    fn u64(&self, name: &str, default: u64) -> u64 {
        match self.raw(name) {
            Some(value) => value.parse::<u64>().unwrap_or_else(|_| {
                warn!("Invalid {name} value '{value}'; using default {default}");
                default
            }),
            None => default,
        }
    }

    fn chat_id(&self, name: &str) -> Result<Option<i64>> {
        match self.raw(name) {
            Some(value) => value
                .parse::<i64>()
                .map(Some)
                .map_err(|_| anyhow!("Invalid {name} value: {value}")),
            None => Ok(None),
        }
    }
}

fn parse_version<F>(reader: &EnvReader<F>) -> Result<BotVersion>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = reader.raw("BOT_VERSION") {
        return match value.to_lowercase().as_str() {
            "lite" => Ok(BotVersion::Lite),
            "full" => Ok(BotVersion::Full),
            _ => Err(anyhow!("BOT_VERSION must be 'lite' or 'full', got '{value}'")),
        };
    }
    if reader.bool("FULL", false) {
        return Ok(BotVersion::Full);
    }
    Ok(BotVersion::Lite)
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_with(|name| env::var(name).ok())
    }

    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let reader = EnvReader { lookup };

        let telegram_token = reader
            .raw("TELEGRAM_TOKEN")
            .ok_or_else(|| anyhow!("TELEGRAM_TOKEN is required"))?;
        let authorized_chat_id = reader
            .chat_id("TELEGRAM_CHAT_ID")?
            .ok_or_else(|| anyhow!("TELEGRAM_CHAT_ID is required"))?;
        let group_chat_id = reader.chat_id("TELEGRAM_GROUP_CHAT_ID")?;

        Ok(Config {
            telegram_token,
            authorized_chat_id,
            group_chat_id,
            version: parse_version(&reader)?,
            inline_controls: reader.bool("INLINE_CONTROLS", true),
            log_level: reader.string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(reader.string("LOG_DIR", "logs")),
            media_dir: PathBuf::from(reader.string("MEDIA_DIR", "media")),
            http_timeout_seconds: reader.u64("HTTP_TIMEOUT_SECONDS", 30).max(1),
            provider_max_attempts: reader.u64("PROVIDER_MAX_ATTEMPTS", 4).max(1) as usize,
            provider_backoff_ms: reader.u64("PROVIDER_BACKOFF_MS", 500),
            provider_max_backoff_ms: reader.u64("PROVIDER_MAX_BACKOFF_MS", 8000),
            format_max_dimension: reader.u64("FORMAT_MAX_DIMENSION", 4096).min(u32::MAX as u64)
                as u32,
            format_jpeg_quality: reader.u64("FORMAT_JPEG_QUALITY", 90).clamp(1, 100) as u8,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.provider_max_attempts,
            base_delay: Duration::from_millis(self.provider_backoff_ms),
            max_delay: Duration::from_millis(self.provider_max_backoff_ms),
        }
    }

    pub fn is_authorized_chat(&self, chat_id: i64) -> bool {
        self.authorized_chat_id == chat_id
    }
}

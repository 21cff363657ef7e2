use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::layout::PageGeometry;
use crate::preview::{ScaleConfig, SessionSettings};

/// Application configuration loaded from environment variables.
/// Every variable is optional; a value that is present but malformed fails startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Wait after the layout frame before block boxes are read.
    pub settle_delay: Duration,
    /// Frame time of the metric layout backend.
    pub frame_interval: Duration,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            settle_delay: Duration::from_millis(200),
            frame_interval: Duration::from_millis(16),
            min_scale: 0.25,
            max_scale: 1.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let config = Config {
            port: parse_or("PORT", &lookup, defaults.port)?,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
            settle_delay: Duration::from_millis(parse_or("SETTLE_DELAY_MS", &lookup, 200u64)?),
            frame_interval: Duration::from_millis(parse_or("FRAME_INTERVAL_MS", &lookup, 16u64)?),
            min_scale: parse_or("PREVIEW_MIN_SCALE", &lookup, defaults.min_scale)?,
            max_scale: parse_or("PREVIEW_MAX_SCALE", &lookup, defaults.max_scale)?,
        };

        if !(config.min_scale > 0.0 && config.min_scale <= config.max_scale) {
            bail!(
                "PREVIEW_MIN_SCALE ({}) must be positive and not exceed PREVIEW_MAX_SCALE ({})",
                config.min_scale,
                config.max_scale
            );
        }
        Ok(config)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            geometry: PageGeometry::a4(),
            settle_delay: self.settle_delay,
            scale: ScaleConfig {
                min_scale: self.min_scale,
                max_scale: self.max_scale,
                ..ScaleConfig::default()
            },
        }
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

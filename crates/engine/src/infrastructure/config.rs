//! Engine configuration loaded from the environment.
//!
//! The binary loads `.env.local` / `.env` from the repo root before calling
//! [`EngineConfig::from_env`]; variables already set in the process win.

use std::str::FromStr;

use taleweaver_domain::DetectionConfig;

const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// SQLite file for durable state. `None` keeps everything in memory.
    pub database_path: Option<String>,
    pub detection: DetectionConfig,
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            detection: DetectionConfig::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Read process variables. `.env` files are loaded once by the binary
    /// before this runs.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; malformed values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let detection = DetectionConfig {
            pattern_threshold: parse_or(
                &lookup,
                "TRAIT_PATTERN_THRESHOLD",
                defaults.detection.pattern_threshold,
            ),
            significance_threshold: parse_or(
                &lookup,
                "RELATIONSHIP_SIGNIFICANCE",
                defaults.detection.significance_threshold,
            ),
            witness_factor: parse_or(&lookup, "WITNESS_FACTOR", defaults.detection.witness_factor),
        };

        Self {
            database_path: lookup("TALEWEAVER_DB").filter(|p| !p.trim().is_empty()),
            detection,
            event_channel_capacity: parse_or(
                &lookup,
                "EVENT_CHANNEL_CAPACITY",
                defaults.event_channel_capacity,
            )
            .max(1),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "Invalid config value, using default");
            default
        }),
        None => default,
    }
}

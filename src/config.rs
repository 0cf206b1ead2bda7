//! Configuration loading, validation and persistence.
//!
//! Configuration is a JSON document. Every field is optional; command line
//! flags are layered on top by the binary.

use crate::error::{GreenDotError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Shortest keep-alive interval accepted by [`Config::validate`].
pub const MIN_KEEP_ALIVE: Duration = Duration::from_millis(100);

/// Which [`CursorService`](crate::cursor::CursorService) implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Drive the pointer from this process.
    #[default]
    Local,
    /// Forward requests to a `greendot bridge` helper process.
    Bridge,
}

/// What the local cursor service does with a target off the main display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// Pin the target to the nearest on-screen pixel.
    #[default]
    Clamp,
    /// Fail the move with `OutOfBounds`.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: Transport,

    #[serde(default = "default_toggle_hotkey")]
    pub toggle_hotkey: String,

    #[serde(default = "default_true")]
    pub hotkey_enabled: bool,

    #[serde(
        default,
        with = "optional_duration_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub keep_alive: Option<Duration>,

    #[serde(default = "default_keep_alive_step")]
    pub keep_alive_step: i32,

    #[serde(default)]
    pub edge_policy: EdgePolicy,

    #[serde(default)]
    pub verbose: bool,
}

fn default_toggle_hotkey() -> String {
    "ctrl+alt+g".to_string()
}

fn default_true() -> bool {
    true
}

fn default_keep_alive_step() -> i32 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            toggle_hotkey: default_toggle_hotkey(),
            hotkey_enabled: true,
            keep_alive: None,
            keep_alive_step: default_keep_alive_step(),
            edge_policy: EdgePolicy::default(),
            verbose: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| GreenDotError::config_load(path, e.to_string()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| GreenDotError::config_load(path, e.to_string()))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| GreenDotError::config_save(path, e.to_string()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.hotkey_enabled {
            crate::global_hotkey::parse_hotkey(&self.toggle_hotkey)?;
        }

        if let Some(interval) = self.keep_alive {
            if interval < MIN_KEEP_ALIVE {
                return Err(GreenDotError::config_validation(format!(
                    "keep_alive must be at least {}ms, got {}ms",
                    MIN_KEEP_ALIVE.as_millis(),
                    interval.as_millis()
                )));
            }
        }

        if self.keep_alive_step <= 0 {
            return Err(GreenDotError::config_validation(
                "keep_alive_step must be positive",
            ));
        }

        Ok(())
    }
}

/// Parse a duration such as `500ms`, `3s`, `2m` or a bare millisecond count.
///
/// Suffixes are case insensitive and surrounding whitespace is ignored.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(GreenDotError::invalid_duration(value, "empty duration"));
    }

    let (number, unit_ms) = if let Some(n) = trimmed.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = trimmed.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = trimmed.strip_suffix('m') {
        (n, 60_000)
    } else {
        (trimmed.as_str(), 1)
    };

    let amount: u64 = number
        .trim()
        .parse()
        .map_err(|_| GreenDotError::invalid_duration(value, "expected a non-negative integer"))?;

    amount
        .checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| GreenDotError::invalid_duration(value, "duration overflows"))
}

fn format_duration(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

mod optional_duration_serde {
    use super::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_str(&format_duration(*duration)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1500").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_keep_alive_minimum() {
        let config = Config {
            keep_alive: Some(Duration::from_millis(50)),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            keep_alive: Some(MIN_KEEP_ALIVE),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled_hotkey_is_not_parsed() {
        let config = Config {
            toggle_hotkey: "not a hotkey".to_string(),
            hotkey_enabled: false,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::Boundary;
use crate::keymap::{KeyMapError, KeyPool, RemapMode};
use crate::session::RestartPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "keyshuffle_snake.json";

const MOVE_DELAY_RANGE_MS: std::ops::RangeInclusive<u64> = 20..=2000;
const MAX_START_LENGTH: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid key pool: {0}")]
    KeyPool(#[from] KeyMapError),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPoolPreset {
    Letters,
    LettersAndDigits,
}

/// Either a named preset or the literal keys, e.g. `"qwertyuiop"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPoolSetting {
    Preset(KeyPoolPreset),
    Custom(String),
}

impl Default for KeyPoolSetting {
    fn default() -> Self {
        KeyPoolSetting::Preset(KeyPoolPreset::Letters)
    }
}

impl KeyPoolSetting {
    fn build(&self) -> Result<KeyPool, KeyMapError> {
        match self {
            KeyPoolSetting::Preset(KeyPoolPreset::Letters) => Ok(KeyPool::letters()),
            KeyPoolSetting::Preset(KeyPoolPreset::LettersAndDigits) => Ok(KeyPool::letters_and_digits()),
            KeyPoolSetting::Custom(keys) => KeyPool::new(keys.chars()),
        }
    }
}

/// Game settings as stored on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub boundary: Boundary,
    pub remap: RemapMode,
    pub restart: RestartPolicy,
    pub key_pool: KeyPoolSetting,
    pub start_length: u32,
    pub move_delay_ms: u64,
    pub volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            boundary: Boundary::Wrap,
            remap: RemapMode::PerKey,
            restart: RestartPolicy::Space,
            key_pool: KeyPoolSetting::default(),
            start_length: 6,
            move_delay_ms: 100,
            volume: 1.0,
        }
    }
}

/// Validated settings the session runs with.
#[derive(Clone, Debug, PartialEq)]
pub struct Rules {
    pub boundary: Boundary,
    pub remap: RemapMode,
    pub restart: RestartPolicy,
    pub pool: KeyPool,
    pub start_length: usize,
    pub move_delay: Duration,
    pub volume: f32,
}

impl Settings {
    /// Reads settings from `path`. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn resolve(&self) -> Result<Rules, ConfigError> {
        let pool = self.key_pool.build()?;
        match self.remap {
            RemapMode::PerKey if !pool.supports_remap() => {
                return Err(ConfigError::Invalid(format!(
                    "per-key remapping needs more than 4 keys in the pool, got {}",
                    pool.len()
                )));
            }
            RemapMode::Whole if pool.len() < 4 => {
                return Err(KeyMapError::PoolTooSmall(pool.len()).into());
            }
            _ => {}
        }

        if !(1..=MAX_START_LENGTH).contains(&self.start_length) {
            return Err(ConfigError::Invalid(format!(
                "start_length must be between 1 and {}, got {}",
                MAX_START_LENGTH, self.start_length
            )));
        }
        if !MOVE_DELAY_RANGE_MS.contains(&self.move_delay_ms) {
            return Err(ConfigError::Invalid(format!(
                "move_delay_ms must be between {} and {}, got {}",
                MOVE_DELAY_RANGE_MS.start(),
                MOVE_DELAY_RANGE_MS.end(),
                self.move_delay_ms
            )));
        }
        if !self.volume.is_finite() {
            return Err(ConfigError::Invalid("volume must be a number".to_string()));
        }

        Ok(Rules {
            boundary: self.boundary,
            remap: self.remap,
            restart: self.restart,
            pool,
            start_length: self.start_length as usize,
            move_delay: Duration::from_millis(self.move_delay_ms),
            volume: self.volume.clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve() {
        let rules = Settings::default().resolve().unwrap();
        assert_eq!(rules.boundary, Boundary::Wrap);
        assert_eq!(rules.remap, RemapMode::PerKey);
        assert_eq!(rules.restart, RestartPolicy::Space);
        assert_eq!(rules.pool, KeyPool::letters());
        assert_eq!(rules.start_length, 6);
        assert_eq!(rules.move_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
    }

    #[test]
    fn test_parses_all_fields() {
        let settings = Settings::from_json(
            r#"{
                "boundary": "clamp",
                "remap": "whole",
                "restart": "any_key",
                "key_pool": "letters_and_digits",
                "start_length": 3,
                "move_delay_ms": 150,
                "volume": 2.5
            }"#,
        )
        .unwrap();

        let rules = settings.resolve().unwrap();
        assert_eq!(rules.boundary, Boundary::Clamp);
        assert_eq!(rules.remap, RemapMode::Whole);
        assert_eq!(rules.restart, RestartPolicy::AnyKey);
        assert_eq!(rules.pool.len(), 36);
        assert_eq!(rules.start_length, 3);
        assert_eq!(rules.move_delay, Duration::from_millis(150));
        assert_eq!(rules.volume, 1.0);
    }

    #[test]
    fn test_custom_key_pool() {
        let settings = Settings::from_json(r#"{ "key_pool": "QWERTY" }"#).unwrap();
        assert_eq!(settings.key_pool, KeyPoolSetting::Custom("QWERTY".to_string()));
        let rules = settings.resolve().unwrap();
        assert_eq!(rules.pool.keys(), &['q', 'w', 'e', 'r', 't', 'y']);
    }

    #[test]
    fn test_four_key_pool_needs_whole_remap() {
        let per_key = Settings::from_json(r#"{ "key_pool": "wasd" }"#).unwrap();
        assert!(matches!(per_key.resolve(), Err(ConfigError::Invalid(_))));

        let whole = Settings::from_json(r#"{ "key_pool": "wasd", "remap": "whole" }"#).unwrap();
        assert_eq!(whole.resolve().unwrap().pool.len(), 4);

        let tiny = Settings::from_json(r#"{ "key_pool": "was", "remap": "whole" }"#).unwrap();
        assert!(matches!(
            tiny.resolve(),
            Err(ConfigError::KeyPool(KeyMapError::PoolTooSmall(3)))
        ));
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_key = Settings::from_json(r#"{ "key_pool": "abcd-fg" }"#).unwrap();
        assert!(matches!(
            bad_key.resolve(),
            Err(ConfigError::KeyPool(KeyMapError::InvalidKey('-')))
        ));

        let zero_length = Settings { start_length: 0, ..Settings::default() };
        assert!(zero_length.resolve().is_err());

        let too_fast = Settings { move_delay_ms: 5, ..Settings::default() };
        assert!(too_fast.resolve().is_err());

        let nan_volume = Settings { volume: f32::NAN, ..Settings::default() };
        assert!(nan_volume.resolve().is_err());
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(Settings::from_json(r#"{ "grid_width": 80 }"#).is_err());
        assert!(Settings::from_json(r#"{ "boundary": "bounce" }"#).is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = Path::new("definitely/not/here/keyshuffle_snake.json");
        assert_eq!(Settings::load(path).unwrap(), Settings::default());
    }
}

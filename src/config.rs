use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};
use thiserror::Error;

/// Process-wide engine settings, read-only after startup.
///
/// Out-of-range values are rejected by [`EngineConfig::validate`] at load
/// time; request handling never sees an invalid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum wall-clock time a snippet may run, in seconds (1..=120).
    #[serde(default = "default_max_execution_secs")]
    pub max_execution_secs: u64,

    /// Maximum captured output characters returned (100..=100_000).
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,

    /// When off, the static validator always passes.
    #[serde(default = "default_true")]
    pub sandbox_mode: bool,

    /// Comma-separated module names bound into every execution.
    #[serde(default = "default_auto_load")]
    pub auto_load: String,

    /// Comma-separated substrings blocked in sandbox mode.
    #[serde(default = "default_denylist")]
    pub denylist: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be between {min} and {max}, got {got}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
        got: u64,
    },
    #[error("Failed to load config: {0}")]
    Load(String),
}

pub const MIN_EXECUTION_SECS: u64 = 1;
pub const MAX_EXECUTION_SECS: u64 = 120;
pub const MIN_OUTPUT_CHARS: usize = 100;
pub const MAX_OUTPUT_CHARS: usize = 100_000;

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_EXECUTION_SECS..=MAX_EXECUTION_SECS).contains(&self.max_execution_secs) {
            return Err(ConfigError::OutOfRange {
                field: "max_execution_secs",
                min: MIN_EXECUTION_SECS,
                max: MAX_EXECUTION_SECS,
                got: self.max_execution_secs,
            });
        }
        if !(MIN_OUTPUT_CHARS..=MAX_OUTPUT_CHARS).contains(&self.max_output_chars) {
            return Err(ConfigError::OutOfRange {
                field: "max_output_chars",
                min: MIN_OUTPUT_CHARS as u64,
                max: MAX_OUTPUT_CHARS as u64,
                got: self.max_output_chars as u64,
            });
        }
        Ok(())
    }

    pub fn max_execution_time(&self) -> Duration {
        Duration::from_secs(self.max_execution_secs)
    }

    /// Auto-load module names, trimmed, empty entries dropped.
    pub fn auto_load_modules(&self) -> Vec<String> {
        split_list(&self.auto_load)
    }

    /// Denylist entries, trimmed, empty entries dropped.
    pub fn denylist_entries(&self) -> Vec<String> {
        split_list(&self.denylist)
    }

    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|e| ConfigError::Load(e.to_string()))?;
        let reader = BufReader::new(file);
        let config: Self =
            serde_json::from_reader(reader).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// デフォルト値の定義
fn default_max_execution_secs() -> u64 {
    30
}

fn default_max_output_chars() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_auto_load() -> String {
    "math,strings,seq".to_string()
}

fn default_denylist() -> String {
    "__,os.,fs.,net.,exec(,spawn(".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_execution_secs: default_max_execution_secs(),
            max_output_chars: default_max_output_chars(),
            sandbox_mode: default_true(),
            auto_load: default_auto_load(),
            denylist: default_denylist(),
        }
    }
}

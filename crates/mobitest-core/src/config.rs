//! Process-wide settings for mobitest.
//!
//! Settings are a flat key→string table with a handful of typed, well-known
//! keys the core needs (default platform, catalog directories, idle timeout).
//! They can be loaded from a JSON document or from a Java-style
//! `.properties` file, and individual keys can be overridden with
//! `MOBITEST_<KEY>` environment variables.
//!
//! # Example
//!
//! ```
//! use mobitest_core::config::Settings;
//! use mobitest_core::locator::Platform;
//!
//! let settings = Settings::from_properties_str("platform=ios\nidleTimeout=600\nrunLocally=true\n").unwrap();
//! assert_eq!(settings.platform, Platform::Ios);
//! assert_eq!(settings.default_wait().as_secs(), 60);
//! assert_eq!(settings.get("runLocally").as_deref(), Some("true"));
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locator::Platform;

/// Prefix for environment-variable overrides (`MOBITEST_PLATFORM`, ...).
pub const ENV_PREFIX: &str = "MOBITEST_";

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidValue { key: String, value: String },
}

fn default_platform() -> Platform {
    Platform::Android
}

fn default_locator_directory() -> PathBuf {
    PathBuf::from("locators")
}

fn default_test_data_directory() -> PathBuf {
    PathBuf::from("testData")
}

fn default_idle_timeout() -> u64 {
    300
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Platform locators resolve against when none is given.
    #[serde(default = "default_platform")]
    pub platform: Platform,

    /// Directory holding `<Page>.yaml` locator catalogs.
    #[serde(default = "default_locator_directory")]
    pub locator_directory: PathBuf,

    /// Directory holding `<Page>.json` test-data documents.
    #[serde(default = "default_test_data_directory")]
    pub test_data_directory: PathBuf,

    /// Session idle/execution timeout. Element waits default to a tenth of
    /// this value, in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,

    /// Any other keys, kept verbatim for collaborators.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            locator_directory: default_locator_directory(),
            test_data_directory: default_test_data_directory(),
            idle_timeout: default_idle_timeout(),
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Parses a JSON settings document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parses `key=value` (or `key: value`) lines. `#` and `!` start comments.
    pub fn from_properties_str(text: &str) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let split = line
                .find(|c| c == '=' || c == ':')
                .map(|i| (&line[..i], &line[i + 1..]));
            match split {
                Some((key, value)) => settings.set(key.trim(), value.trim())?,
                None => settings.set(line, "")?,
            }
        }
        Ok(settings)
    }

    /// Loads settings from a file, choosing the format by extension
    /// (`.json` → JSON, anything else → properties), then applies
    /// environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text)?,
            _ => Self::from_properties_str(&text)?,
        };
        settings.apply_env(std::env::vars())?;
        Ok(settings)
    }

    /// Applies `MOBITEST_<KEY>` overrides from the given variables.
    ///
    /// The suffix is matched case-insensitively against known keys
    /// (`MOBITEST_LOCATORDIRECTORY` → `locatorDirectory`); unknown suffixes
    /// land in [`extra`](Self::extra) lower-cased.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        const KNOWN: [&str; 4] = [
            "platform",
            "locatorDirectory",
            "testDataDirectory",
            "idleTimeout",
        ];
        for (name, value) in vars {
            let Some(suffix) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let key = KNOWN
                .iter()
                .find(|k| k.eq_ignore_ascii_case(suffix))
                .map(|k| k.to_string())
                .unwrap_or_else(|| suffix.to_ascii_lowercase());
            self.set(&key, &value)?;
        }
        Ok(())
    }

    /// Sets one key, validating typed keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "platform" => self.platform = value.parse().map_err(|_| invalid())?,
            "locatorDirectory" => self.locator_directory = PathBuf::from(value),
            "testDataDirectory" => self.test_data_directory = PathBuf::from(value),
            "idleTimeout" => self.idle_timeout = value.trim().parse().map_err(|_| invalid())?,
            _ => {
                self.extra.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Key→string lookup over every setting, typed or not.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "platform" => Some(self.platform.to_string()),
            "locatorDirectory" => Some(self.locator_directory.display().to_string()),
            "testDataDirectory" => Some(self.test_data_directory.display().to_string()),
            "idleTimeout" => Some(self.idle_timeout.to_string()),
            _ => self.extra.get(key).cloned(),
        }
    }

    /// Default element-wait timeout: a tenth of the idle timeout, in seconds.
    pub fn default_wait(&self) -> Duration {
        Duration::from_secs(self.idle_timeout / 10)
    }

    /// Path of a page's locator catalog.
    pub fn locator_path(&self, page: &str) -> PathBuf {
        self.locator_directory.join(format!("{}.yaml", page))
    }

    /// Path of a page's test-data document.
    pub fn test_data_path(&self, page: &str) -> PathBuf {
        self.test_data_directory.join(format!("{}.json", page))
    }
}

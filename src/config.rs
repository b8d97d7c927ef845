//! Optional YAML settings file.
//!
//! Every field has a default, so a partial file (or no file at all) is valid.
//! Command-line flags are applied on top of whatever is loaded here.
//!
//! ```yaml
//! years: 5
//! window_days: 30
//! batch_size: 30
//! requests_per_minute: 200
//! max_attempts: 3
//! request_timeout_secs: 10
//! base_url: https://data.alpaca.markets
//! keywords:
//!   - GDP
//!   - CPI
//! ```

use crate::api::{DEFAULT_BASE_URL, REQUEST_TIMEOUT};
use crate::fetch::DEFAULT_BATCH_SIZE;
use crate::filter::DEFAULT_KEYWORDS;
use crate::rate_limit::DEFAULT_REQUESTS_PER_MINUTE;
use crate::window::DEFAULT_WINDOW_DAYS;
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Default look-back period in years.
pub const DEFAULT_YEARS: u32 = 5;

/// Default attempts per page request.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Default delay before the first retry, in seconds.
pub const DEFAULT_BASE_DELAY_SECS: u64 = 1;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("keyword vocabulary is empty")]
    NoKeywords,
}

/// Fetch parameters and keyword vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub years: u32,
    pub window_days: u32,
    pub batch_size: u32,
    pub requests_per_minute: u32,
    pub max_attempts: usize,
    pub base_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub base_url: String,
    pub keywords: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            years: DEFAULT_YEARS,
            window_days: DEFAULT_WINDOW_DAYS,
            batch_size: DEFAULT_BATCH_SIZE,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_secs: DEFAULT_BASE_DELAY_SECS,
            request_timeout_secs: REQUEST_TIMEOUT.as_secs(),
            base_url: DEFAULT_BASE_URL.to_string(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML text. Keywords are trimmed and de-duplicated
    /// (first occurrence wins) and the numeric fields are checked.
    pub fn from_yaml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        settings.normalized()
    }

    /// Read and parse the YAML file at `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] if the file cannot be read, [`ConfigError::Parse`]
    /// for malformed YAML, and the validation errors of [`Settings::validate`].
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: origin.clone(),
            source,
        })?;
        let settings = Self::from_yaml(&text, &origin)?;
        info!(keywords = settings.keywords.len(), "Loaded settings");
        debug!(?settings, "Settings");
        Ok(settings)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Trim and de-duplicate keywords, then validate.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        self.keywords = self
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .unique()
            .map(str::to_string)
            .collect();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("years", self.years == 0),
            ("window_days", self.window_days == 0),
            ("batch_size", self.batch_size == 0),
            ("requests_per_minute", self.requests_per_minute == 0),
            ("max_attempts", self.max_attempts == 0),
            ("request_timeout_secs", self.request_timeout_secs == 0),
        ];
        if let Some((field, _)) = checks.iter().find(|(_, zero)| *zero) {
            return Err(ConfigError::Zero { field: *field });
        }
        if self.keywords.is_empty() {
            return Err(ConfigError::NoKeywords);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let settings = Settings::from_yaml("{}", "inline").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.keywords.len(), 18);
        assert_eq!(settings.window_days, 30);
        assert_eq!(settings.requests_per_minute, 200);
        assert_eq!(settings.request_timeout_secs, 10);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let settings = Settings::from_yaml(
            "years: 2\nbatch_size: 50\nkeywords: [GDP, ' CPI ', GDP, '']\n",
            "inline",
        )
        .unwrap();
        assert_eq!(settings.years, 2);
        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.window_days, DEFAULT_WINDOW_DAYS);
        assert_eq!(settings.keywords, vec!["GDP".to_string(), "CPI".to_string()]);
    }

    #[test]
    fn test_zero_values_rejected() {
        let err = Settings::from_yaml("window_days: 0\n", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Zero { field: "window_days" }));

        let err = Settings::from_yaml("keywords: ['  ']\n", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::NoKeywords));
    }

    #[test]
    fn test_bad_yaml_is_parse_error() {
        let err = Settings::from_yaml("years: [1, 2", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let err = Settings::from_yaml("batch_size: lots\n", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url: http://localhost:8080").unwrap();
        let settings = Settings::load_or_default(Some(file.path())).unwrap();
        assert_eq!(settings.base_url, "http://localhost:8080");

        assert_eq!(Settings::load_or_default(None).unwrap(), Settings::default());
        assert!(matches!(
            Settings::load(Path::new("missing/config.yaml")),
            Err(ConfigError::Read { .. })
        ));
    }
}

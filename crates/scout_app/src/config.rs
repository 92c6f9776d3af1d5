//! RON configuration for the scanner.
//!
//! Every section is optional; missing fields fall back to the defaults below.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Weekday};
use chrono_tz::Tz;
use scout_core::ScheduleConfig;
use scout_engine::{
    FetchSettings, ForwardingPath, NormalizerSettings, SourceQuery, DEFAULT_SOURCE_URL,
};
use scout_logging::scout_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const URL_PLACEHOLDERS: [&str; 2] = ["{url}", "{raw_url}"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub source: SourceSection,
    pub forwarding_paths: Vec<PathSection>,
    pub fetch: FetchSection,
    pub normalizer: NormalizerSection,
    pub schedule: ScheduleSection,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            source: SourceSection::default(),
            forwarding_paths: default_paths(),
            fetch: FetchSection::default(),
            normalizer: NormalizerSection::default(),
            schedule: ScheduleSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub base_url: String,
    pub order_by_field: String,
    pub order_by_direction: String,
    pub status: String,
    pub take: u32,
    pub query: String,
}

impl Default for SourceSection {
    fn default() -> Self {
        let query = SourceQuery::default();
        Self {
            base_url: DEFAULT_SOURCE_URL.to_string(),
            order_by_field: query.order_by_field,
            order_by_direction: query.order_by_direction,
            status: query.status,
            take: query.take,
            query: query.query,
        }
    }
}

/// One forwarding path: `{url}` is replaced by the percent-encoded target,
/// `{raw_url}` by the target as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSection {
    pub name: String,
    pub template: String,
}

fn default_paths() -> Vec<PathSection> {
    vec![
        PathSection {
            name: "corsproxy".to_string(),
            template: "https://corsproxy.io/?{url}".to_string(),
        },
        PathSection {
            name: "allorigins".to_string(),
            template: "https://api.allorigins.win/raw?url={url}".to_string(),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_body_bytes: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        let settings = FetchSettings::default();
        Self {
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            redirect_limit: settings.redirect_limit,
            max_body_bytes: settings.max_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerSection {
    pub endpoint: String,
    pub model: String,
    pub max_input_chars: usize,
    pub request_timeout_secs: u64,
    pub event_base_url: String,
    pub fallback_url: String,
    /// IANA zone name, e.g. `America/New_York`.
    pub prompt_timezone: String,
}

impl Default for NormalizerSection {
    fn default() -> Self {
        let settings = NormalizerSettings::default();
        Self {
            endpoint: settings.endpoint,
            model: settings.model,
            max_input_chars: settings.max_input_chars,
            request_timeout_secs: settings.request_timeout.as_secs(),
            event_base_url: settings.event_base_url,
            fallback_url: settings.fallback_url,
            prompt_timezone: settings.prompt_timezone.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    pub reset_day: Weekday,
    pub tick_millis: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            reset_day: Weekday::Sun,
            tick_millis: 1000,
        }
    }
}

impl ScoutConfig {
    /// Read and validate a config file, or return the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        };
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron(&text).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        scout_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text).map_err(|err| ConfigError::Parse {
            path: PathBuf::new(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forwarding_paths.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one forwarding path is required".to_string(),
            ));
        }
        for path in &self.forwarding_paths {
            let placeholders: usize = URL_PLACEHOLDERS
                .iter()
                .map(|p| path.template.matches(p).count())
                .sum();
            if placeholders != 1 {
                return Err(ConfigError::Invalid(format!(
                    "forwarding path '{}' must contain exactly one of {{url}} or {{raw_url}}",
                    path.name
                )));
            }
        }
        if self.forwarding_paths.len() < 2 {
            return Err(ConfigError::Invalid(
                "at least two forwarding paths are required".to_string(),
            ));
        }
        if self.source.take == 0 {
            return Err(ConfigError::Invalid("source.take must be positive".to_string()));
        }
        if self.schedule.tick_millis == 0 {
            return Err(ConfigError::Invalid(
                "schedule.tick_millis must be positive".to_string(),
            ));
        }
        self.prompt_timezone()?;
        Ok(())
    }

    pub fn source_query(&self) -> SourceQuery {
        SourceQuery {
            base_url: self.source.base_url.clone(),
            order_by_field: self.source.order_by_field.clone(),
            order_by_direction: self.source.order_by_direction.clone(),
            status: self.source.status.clone(),
            take: self.source.take,
            query: self.source.query.clone(),
        }
    }

    pub fn forwarding_paths(&self) -> Vec<ForwardingPath> {
        self.forwarding_paths
            .iter()
            .map(|path| ForwardingPath::from_template(path.name.clone(), path.template.clone()))
            .collect()
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            redirect_limit: self.fetch.redirect_limit,
            max_bytes: self.fetch.max_body_bytes,
        }
    }

    pub fn normalizer_settings(&self) -> Result<NormalizerSettings, ConfigError> {
        Ok(NormalizerSettings {
            endpoint: self.normalizer.endpoint.clone(),
            model: self.normalizer.model.clone(),
            max_input_chars: self.normalizer.max_input_chars,
            request_timeout: Duration::from_secs(self.normalizer.request_timeout_secs),
            event_base_url: self.normalizer.event_base_url.clone(),
            fallback_url: self.normalizer.fallback_url.clone(),
            prompt_timezone: self.prompt_timezone()?,
        })
    }

    pub fn schedule_config(&self, utc_offset: FixedOffset) -> ScheduleConfig {
        ScheduleConfig {
            reset_day: self.schedule.reset_day,
            utc_offset,
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.schedule.tick_millis)
    }

    fn prompt_timezone(&self) -> Result<Tz, ConfigError> {
        self.normalizer.prompt_timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Invalid(format!(
                "unknown prompt timezone '{}'",
                self.normalizer.prompt_timezone
            ))
        })
    }
}

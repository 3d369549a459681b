//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;
use uuid::Uuid;

mod cli;

pub use cli::*;

use crate::application::feed::DEFAULT_PAGE_SIZE;
use crate::changefeed::ChangeFeedConfig;
use crate::domain::entities::{FALLBACK_AUTHOR, Operator};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "pressroom";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_UPLOAD_BASE_URL: &str = "http://localhost:3000/uploads/";
const DEFAULT_SITE_URL: &str = "http://localhost:3000";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub uploads: UploadSettings,
    pub feed: FeedSettings,
    pub operator: OperatorSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub directory: PathBuf,
    pub public_base_url: Url,
}

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub page_size: NonZeroUsize,
    pub signal_buffer: NonZeroUsize,
    pub public_site_url: Url,
}

impl FeedSettings {
    pub fn change_feed(&self) -> ChangeFeedConfig {
        ChangeFeedConfig::from(self)
    }
}

#[derive(Debug, Clone)]
pub struct OperatorSettings {
    /// Unset means nobody is signed in; authoring commands refuse to run.
    pub id: Option<Uuid>,
    pub display_name: String,
}

impl OperatorSettings {
    pub fn operator(&self) -> Option<Operator> {
        self.id.map(|id| Operator {
            id,
            display_name: self.display_name.clone(),
        })
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("PRESSROOM").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    uploads: RawUploadSettings,
    feed: RawFeedSettings,
    operator: RawOperatorSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(directory) = overrides.uploads_directory.as_ref() {
            self.uploads.directory = Some(directory.clone());
        }
        if let Some(size) = overrides.feed_page_size {
            self.feed.page_size = Some(size);
        }
        if let Some(id) = overrides.operator_id {
            self.operator.id = Some(id);
        }
        if let Some(name) = overrides.operator_name.as_ref() {
            self.operator.display_name = Some(name.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            uploads,
            feed,
            operator,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            uploads: build_upload_settings(uploads)?,
            feed: build_feed_settings(feed)?,
            operator: build_operator_settings(operator)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = NonZeroU32::new(max).ok_or_else(|| {
        LoadError::invalid("database.max_connections", "must be greater than zero")
    })?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_upload_settings(uploads: RawUploadSettings) -> Result<UploadSettings, LoadError> {
    let directory = uploads
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "uploads.directory",
            "path must not be empty",
        ));
    }

    let public_base_url = parse_url(
        uploads.public_base_url.as_deref(),
        DEFAULT_UPLOAD_BASE_URL,
        "uploads.public_base_url",
    )?;

    Ok(UploadSettings {
        directory,
        public_base_url,
    })
}

fn build_feed_settings(feed: RawFeedSettings) -> Result<FeedSettings, LoadError> {
    let page_size = NonZeroUsize::new(feed.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
        .ok_or_else(|| LoadError::invalid("feed.page_size", "must be greater than zero"))?;

    let signal_buffer = NonZeroUsize::new(
        feed.signal_buffer
            .unwrap_or_else(|| ChangeFeedConfig::default().signal_buffer),
    )
    .ok_or_else(|| LoadError::invalid("feed.signal_buffer", "must be greater than zero"))?;

    let public_site_url = parse_url(
        feed.public_site_url.as_deref(),
        DEFAULT_SITE_URL,
        "feed.public_site_url",
    )?;

    Ok(FeedSettings {
        page_size,
        signal_buffer,
        public_site_url,
    })
}

fn build_operator_settings(operator: RawOperatorSettings) -> Result<OperatorSettings, LoadError> {
    let display_name = operator
        .display_name
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| FALLBACK_AUTHOR.to_string());
    if display_name.is_empty() {
        return Err(LoadError::invalid(
            "operator.display_name",
            "must not be empty",
        ));
    }

    if operator.id.is_some_and(|id| id.is_nil()) {
        return Err(LoadError::invalid(
            "operator.id",
            "must not be the nil uuid",
        ));
    }

    Ok(OperatorSettings {
        id: operator.id,
        display_name,
    })
}

fn parse_url(value: Option<&str>, default: &str, key: &'static str) -> Result<Url, LoadError> {
    let candidate = value.map(str::trim).unwrap_or(default);
    let url = Url::parse(candidate)
        .map_err(|err| LoadError::invalid(key, format!("invalid url `{candidate}`: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(LoadError::invalid(key, "url must be absolute"));
    }
    Ok(url)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUploadSettings {
    directory: Option<PathBuf>,
    public_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFeedSettings {
    page_size: Option<usize>,
    signal_buffer: Option<usize>,
    public_site_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOperatorSettings {
    id: Option<Uuid>,
    display_name: Option<String>,
}

#[cfg(test)]
mod tests;

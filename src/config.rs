//! Runtime configuration
//!
//! Settings come from the command line with environment fallbacks (the
//! binary loads `.env` first). Validation runs before any store is opened,
//! so a bad setting never leaves a half-started run behind.

use crate::harvest::{ListRequest, RetryPolicy, DEFAULT_CONTACT};
use crate::update::{DailySchedule, UpdateOptions, DEFAULT_UPDATE_TIME};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default harvest endpoint
pub const DEFAULT_BASE_URL: &str = "https://oaipmh.arxiv.org/oai";

/// Default corpus root
pub const DEFAULT_CORPUS_DIR: &str = "data/works";

/// Errors in settings; fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid harvest base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid update time: {0}")]
    InvalidSchedule(String),

    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    #[error("metadata prefix must not be empty")]
    EmptyMetadataPrefix,

    #[error("corpus root {0} is not a directory")]
    MissingCorpus(PathBuf),

    #[error("input file {0} does not exist")]
    MissingInput(PathBuf),
}

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Every setting a command may read
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub base_url: String,
    /// Contact for the User-Agent
    pub email: String,
    pub metadata_prefix: String,
    pub set: Option<String>,
    pub corpus_dir: PathBuf,
    /// `None` uses each command's default
    pub batch_size: Option<usize>,
    /// Records per file, for trial runs
    pub limit: Option<usize>,
    /// `HH:MM`, local clock
    pub update_time: String,
    /// `None` retries failed pages forever
    pub max_failures: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            base_url: DEFAULT_BASE_URL.to_string(),
            email: DEFAULT_CONTACT.to_string(),
            metadata_prefix: ListRequest::DEFAULT_METADATA_PREFIX.to_string(),
            set: None,
            corpus_dir: PathBuf::from(DEFAULT_CORPUS_DIR),
            batch_size: None,
            limit: None,
            update_time: DEFAULT_UPDATE_TIME.to_string(),
            max_failures: None,
        }
    }
}

impl Settings {
    /// Checks shared by every command.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == Some(0) {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(())
    }

    /// Checks for commands that talk to the harvest endpoint.
    pub fn validate_harvest(&self) -> ConfigResult<()> {
        self.validate()?;
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: "expected an http(s) URL with a host".to_string(),
            });
        }
        if self.metadata_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyMetadataPrefix);
        }
        Ok(())
    }

    /// Checks for the daemon: harvest settings plus the run time.
    pub fn validate_schedule(&self) -> ConfigResult<DailySchedule> {
        self.validate_harvest()?;
        self.schedule()
    }

    /// Checks for commands that scan the work corpus.
    pub fn validate_corpus(&self) -> ConfigResult<()> {
        self.validate()?;
        if !self.corpus_dir.is_dir() {
            return Err(ConfigError::MissingCorpus(self.corpus_dir.clone()));
        }
        Ok(())
    }

    /// Checks for commands that read one input file.
    pub fn validate_input(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        if !path.is_file() {
            return Err(ConfigError::MissingInput(path.to_path_buf()));
        }
        Ok(())
    }

    pub fn schedule(&self) -> ConfigResult<DailySchedule> {
        self.update_time.parse().map_err(ConfigError::InvalidSchedule)
    }

    pub fn batch_size_or(&self, default: usize) -> usize {
        self.batch_size.unwrap_or(default)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match self.max_failures {
            Some(max) => RetryPolicy::bounded(RetryPolicy::DEFAULT_COOLDOWN, max),
            None => RetryPolicy::default(),
        }
    }

    pub fn update_options(&self, default_batch_size: usize) -> UpdateOptions {
        UpdateOptions {
            metadata_prefix: self.metadata_prefix.clone(),
            set: self.set.clone().filter(|s| !s.is_empty()),
            batch_size: self.batch_size_or(default_batch_size),
            retry: self.retry_policy(),
        }
    }
}

/// Default store path (~/.local/share/paperweave/paperweave.db)
pub fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("paperweave").join("paperweave.db")
}

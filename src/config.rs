//! Store configuration
//!
//! A [`StoreConfig`] can be built in code, read from YAML, or parsed from a
//! storage options string such as `new='yes', update_index_stats='yes'`.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// SQLite journal mode for file-backed stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Wal,
    Delete,
    Memory,
}

impl std::str::FromStr for JournalMode {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wal" => Ok(JournalMode::Wal),
            "delete" => Ok(JournalMode::Delete),
            "memory" => Ok(JournalMode::Memory),
            other => Err(StoreError::Config(format!("unknown journal mode '{}'", other))),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file (None = private in-memory database)
    pub path: Option<PathBuf>,
    /// Create missing tables, indexes and views on open
    #[serde(alias = "new")]
    pub create_schema: bool,
    /// Run ANALYZE after open
    pub update_index_stats: bool,
    /// How long a writer waits for a locked database
    pub busy_timeout_ms: u64,
    /// Entries in the URI -> key cache
    pub resource_cache_capacity: usize,
    /// Prepared statements kept per connection
    pub statement_cache_capacity: usize,
    pub journal_mode: JournalMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            create_schema: true,
            update_index_stats: false,
            busy_timeout_ms: 5_000,
            resource_cache_capacity: 512,
            // enough for the 12 lookups, the dictionary statements and the pattern shapes
            statement_cache_capacity: 128,
            journal_mode: JournalMode::Wal,
        }
    }
}

impl StoreConfig {
    /// In-memory store with default settings
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed store with default settings
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parse YAML configuration
    pub fn from_yaml_str(yaml: &str) -> StoreResult<Self> {
        let config: StoreConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load YAML configuration from a file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&content)?;
        info!("Configuration loaded from {:?}", path.as_ref());
        Ok(config)
    }

    /// Parse a storage options string: `key='value'` pairs separated by commas.
    ///
    /// Recognized keys: `new`, `update_index_stats`, `busy_timeout`,
    /// `cache_size`, `journal_mode`. Unknown keys are ignored.
    pub fn from_options(path: Option<PathBuf>, options: &str) -> StoreResult<Self> {
        let mut config = Self {
            path,
            // an options string opens an existing store unless new='yes'
            create_schema: false,
            ..Self::default()
        };

        for (key, value) in parse_options(options)? {
            match key.as_str() {
                "new" => config.create_schema = parse_flag(&key, &value)?,
                "update_index_stats" => config.update_index_stats = parse_flag(&key, &value)?,
                "busy_timeout" => config.busy_timeout_ms = parse_number(&key, &value)?,
                "cache_size" => config.resource_cache_capacity = parse_number(&key, &value)?,
                "journal_mode" => config.journal_mode = value.parse()?,
                _ => debug!("Ignoring unknown storage option '{}'", key),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> StoreResult<()> {
        if self.resource_cache_capacity == 0 {
            return Err(StoreError::Config(
                "resource_cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_options(options: &str) -> StoreResult<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut chars = options.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }
        let key = key.trim().to_ascii_lowercase();

        if chars.next() != Some('=') {
            return Err(StoreError::Config(format!("option '{}' has no value", key)));
        }
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        match chars.peek().copied() {
            Some(quote @ ('\'' | '"')) => {
                chars.next();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(StoreError::Config(format!(
                        "unterminated value for option '{}'",
                        key
                    )));
                }
            }
            _ => {
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
                value = value.trim().to_string();
            }
        }

        pairs.push((key, value));
    }

    Ok(pairs)
}

fn parse_flag(key: &str, value: &str) -> StoreResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" | "on" => Ok(true),
        "no" | "false" | "0" | "off" => Ok(false),
        other => Err(StoreError::Config(format!(
            "option '{}' expects yes/no, got '{}'",
            key, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> StoreResult<T> {
    value.parse().map_err(|_| {
        StoreError::Config(format!("option '{}' expects a number, got '{}'", key, value))
    })
}

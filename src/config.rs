//! Runtime configuration utilities for relation-miner.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use serde::Deserialize;

use crate::error::ConfigError;

/// Connection parameters for the relational store.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Schema holding the `documents`, `keywords`, `sentences` and `relationships` tables.
    pub schema: String,
}

/// Relation classifier location and tokenizer limits. All `classify` needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    /// Directory holding `model.onnx` and `tokenizer.json`.
    pub model_path: PathBuf,
    /// Tokenizer truncation length.
    pub max_seq_length: usize,
}

impl ModelSettings {
    /// Load only the model settings from `.env` and the environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self::from_lookup(|key| env::var(key).ok())?)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            model_path: PathBuf::from(required(&lookup, "MODEL_PATH")?),
            max_seq_length: optional(&lookup, "MAX_SEQ_LENGTH", 128)?,
        })
    }
}

/// Application configuration resolved from `.env` and the process environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub model: ModelSettings,
    /// Root prepended to every document's `file_location`.
    pub documents_path: String,
    pub database: DatabaseSettings,
    /// First document offset to process.
    pub start_offset: i64,
    /// Last document offset to process (inclusive).
    pub max_offset: i64,
    /// Documents fetched per offset window.
    pub page_size: i64,
    /// Classifier inputs per inference call.
    pub batch_size: usize,
    /// Cores kept free when sizing the worker pool.
    pub reserved_cores: usize,
    /// Root folder for reports and exports.
    pub outputs_dir: PathBuf,
}

impl Settings {
    /// Load configuration from `.env` and the environment, creating the outputs directory.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = Self::from_lookup(|key| env::var(key).ok())?;
        std::fs::create_dir_all(&settings.outputs_dir).with_context(|| {
            format!("creating outputs dir {}", settings.outputs_dir.display())
        })?;
        Ok(settings)
    }

    /// Resolve settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let need = |key: &'static str| required(&lookup, key);

        let schema = need("POSTGRES_SCHEMA")?;
        validate_identifier("POSTGRES_SCHEMA", &schema)?;

        let database = DatabaseSettings {
            host: need("POSTGRES_HOST")?,
            port: optional(&lookup, "POSTGRES_PORT", 5432)?,
            database: need("POSTGRES_DB_NAME")?,
            user: need("POSTGRES_USER")?,
            password: need("POSTGRES_PASSWORD")?,
            schema,
        };

        let start_offset: i64 = parse("START_DOCUMENT_OFFSET", &need("START_DOCUMENT_OFFSET")?)?;
        let max_offset: i64 = parse("MAX_DOCUMENT_OFFSET", &need("MAX_DOCUMENT_OFFSET")?)?;
        if start_offset < 0 {
            return Err(ConfigError::Invalid {
                key: "START_DOCUMENT_OFFSET",
                reason: "must not be negative".into(),
            });
        }

        let page_size: i64 = optional(&lookup, "PAGE_SIZE", 10)?;
        if page_size <= 0 {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                reason: "must be positive".into(),
            });
        }
        let batch_size: usize = optional(&lookup, "BATCH_SIZE", 1024)?;
        if batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "BATCH_SIZE",
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            model: ModelSettings::from_lookup(&lookup)?,
            documents_path: need("DOCUMENTS_PATH")?,
            database,
            start_offset,
            max_offset,
            page_size,
            batch_size,
            reserved_cores: optional(&lookup, "RESERVED_CORES", 3)?,
            outputs_dir: lookup("OUTPUTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./outputs")),
        })
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }

    /// Location of the side-channel report listing unreadable documents.
    pub fn missing_files_report(&self) -> PathBuf {
        self.join_output("missing_txt_files.txt")
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn optional<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => parse(key, &raw),
        _ => Ok(default),
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        reason: err.to_string(),
    })
}

fn validate_identifier(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_head && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            reason: format!("{value:?} is not a plain SQL identifier"),
        })
    }
}

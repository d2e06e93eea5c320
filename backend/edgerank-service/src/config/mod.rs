use chrono::{DateTime, Utc};
use event_store::csv_source::parse_timestamp;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

const ENV_PREFIX: &str = "FEED_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("FEED_AS_OF must look like 2018-05-01 13:45:00, got {0:?}")]
    InvalidAsOf(String),

    #[error("FEED_DATASET_PARTITIONS names no partitions")]
    NoPartitions,
}

/// Runtime settings, read from `FEED_*` environment variables (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Comma-separated CSV file prefixes, loaded in order.
    #[serde(default = "default_dataset_partitions")]
    pub dataset_partitions: String,

    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    #[serde(default)]
    pub load_snapshot: bool,

    #[serde(default = "default_write_snapshot")]
    pub write_snapshot: bool,

    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Fixed reference time for decay; the wall clock when unset.
    #[serde(default)]
    pub as_of: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Config = envy::prefixed(ENV_PREFIX).from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Same as [`Config::from_env`] over explicit pairs, without `.env`.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::prefixed(ENV_PREFIX).from_iter(pairs)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions().is_empty() {
            return Err(ConfigError::NoPartitions);
        }
        self.reference_time().map(|_| ())
    }

    pub fn partitions(&self) -> Vec<String> {
        self.dataset_partitions
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// `FEED_AS_OF` if set, otherwise now.
    pub fn reference_time(&self) -> Result<DateTime<Utc>, ConfigError> {
        match &self.as_of {
            Some(value) => {
                parse_timestamp(value.trim()).map_err(|_| ConfigError::InvalidAsOf(value.clone()))
            }
            None => Ok(Utc::now()),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("dataset")
}

fn default_dataset_partitions() -> String {
    "original,test".to_string()
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

fn default_write_snapshot() -> bool {
    true
}

fn default_result_limit() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_pairs(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("dataset"));
        assert_eq!(config.partitions(), vec!["original", "test"]);
        assert_eq!(config.snapshot_dir, PathBuf::from("snapshots"));
        assert!(!config.load_snapshot);
        assert!(config.write_snapshot);
        assert_eq!(config.result_limit, 10);
        assert!(config.as_of.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_pairs(pairs(&[
            ("FEED_DATA_DIR", "/data"),
            ("FEED_DATASET_PARTITIONS", " test , ,extra"),
            ("FEED_LOAD_SNAPSHOT", "true"),
            ("FEED_RESULT_LIMIT", "3"),
            ("FEED_AS_OF", "2018-05-01 13:45:00"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.partitions(), vec!["test", "extra"]);
        assert!(config.load_snapshot);
        assert_eq!(config.result_limit, 3);
        assert_eq!(
            config.reference_time().unwrap().to_rfc3339(),
            "2018-05-01T13:45:00+00:00"
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::from_pairs(pairs(&[("FEED_AS_OF", "yesterday")])),
            Err(ConfigError::InvalidAsOf(_))
        ));
        assert!(matches!(
            Config::from_pairs(pairs(&[("FEED_DATASET_PARTITIONS", " , ")])),
            Err(ConfigError::NoPartitions)
        ));
        assert!(matches!(
            Config::from_pairs(pairs(&[("FEED_RESULT_LIMIT", "many")])),
            Err(ConfigError::Env(_))
        ));
    }
}

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{EtlError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "movie_etl.toml";
pub const DATABASE_ENV_VAR: &str = "MOVIE_ETL_DATABASE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub inputs: InputConfig,
    pub output: OutputConfig,
}

/// Locations of the three raw inputs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub wiki_movies: PathBuf,
    pub movies_metadata: PathBuf,
    pub ratings: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            wiki_movies: PathBuf::from("wikipedia.movies.json"),
            movies_metadata: PathBuf::from("movies_metadata.csv"),
            ratings: PathBuf::from("ratings.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub database: PathBuf,
    pub movies_table: String,
    pub ratings_table: String,
    /// Rows per append when loading the ratings log.
    pub ratings_chunk_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("movie_data.db"),
            movies_table: "movies".to_string(),
            ratings_table: "ratings".to_string(),
            ratings_chunk_size: 1_000_000,
        }
    }
}

impl Config {
    /// Reads `path` if it exists; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Applies `MOVIE_ETL_DATABASE` if it is set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(db) = std::env::var(DATABASE_ENV_VAR) {
            if !db.trim().is_empty() {
                self.output.database = PathBuf::from(db.trim());
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.output.ratings_chunk_size == 0 {
            return Err(EtlError::Config("ratings_chunk_size must be at least 1".to_string()));
        }
        if self.output.movies_table.trim().is_empty() || self.output.ratings_table.trim().is_empty() {
            return Err(EtlError::Config("table names must not be empty".to_string()));
        }
        if self.output.movies_table == self.output.ratings_table {
            return Err(EtlError::Config(format!(
                "movies and ratings tables must differ (both '{}')",
                self.output.movies_table
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.inputs.ratings, PathBuf::from("ratings.csv"));
        assert_eq!(config.output.movies_table, "movies");
        assert_eq!(config.output.ratings_chunk_size, 1_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            r#"
            [output]
            database = "/tmp/movies.db"
            ratings_chunk_size = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.output.database, PathBuf::from("/tmp/movies.db"));
        assert_eq!(config.output.ratings_chunk_size, 500);
        assert_eq!(config.output.ratings_table, "ratings");
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let mut config = Config::default();
        config.output.ratings_chunk_size = 0;
        assert!(matches!(config.validate(), Err(EtlError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_shared_table_name() {
        let mut config = Config::default();
        config.output.ratings_table = "movies".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/definitely/not/here.toml").unwrap();
        assert_eq!(config.output.database, PathBuf::from("movie_data.db"));
    }
}

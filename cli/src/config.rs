use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use dashkit_core::db::{Database, Schema};

use crate::openweather::DEFAULT_BASE_URL;

pub const DEFAULT_DATA_DIR: &str = "data";

pub struct Config {
    pub data_dir: PathBuf,
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Config {
    /// Resolve settings from the `--data-dir` flag and the environment.
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
        Self::from_lookup(data_dir, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        data_dir: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let data_dir = data_dir
            .or_else(|| lookup("DASHKIT_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let api_key = lookup("OPENWEATHER_API_KEY").filter(|k| !k.trim().is_empty());
        let base_url =
            lookup("OPENWEATHER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        if api_key.is_none() {
            tracing::debug!("OPENWEATHER_API_KEY is not set; weather fetches will fail");
        }

        Ok(Config {
            data_dir,
            api_key,
            base_url,
        })
    }

    pub fn db_path(&self, schema: Schema) -> PathBuf {
        self.data_dir.join(schema.file_name())
    }

    pub fn ensure_data_dir(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.data_dir).with_context(|| {
            format!(
                "Failed to create data directory: {}",
                self.data_dir.display()
            )
        })?;
        Ok(&self.data_dir)
    }

    /// Open (creating if needed) the database file for one app.
    pub fn open_db(&self, schema: Schema) -> Result<Database> {
        self.ensure_data_dir()?;
        let path = self.db_path(schema);
        Database::open(&path, schema)
            .with_context(|| format!("Failed to open database: {}", path.display()))
    }
}

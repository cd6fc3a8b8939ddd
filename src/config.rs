use std::env;
use std::path::PathBuf;

const DEFAULT_DATABASE_URL: &str = "sqlite:data/fourfactors.db";
const DEFAULT_SEASON: &str = "2019";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub season: String,
    pub model_path: PathBuf,
}

impl Config {
    /// Read settings from the environment (after `.env` has been loaded).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let season = lookup("SEASON").unwrap_or_else(|| DEFAULT_SEASON.to_string());
        let model_path = lookup("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_model_path(&season));

        Self {
            database_url,
            season,
            model_path,
        }
    }

    /// Apply a season given on the command line. The model path follows the
    /// season unless `MODEL_PATH` pinned it.
    pub fn with_season(mut self, season: Option<String>) -> Self {
        if let Some(season) = season {
            if self.model_path == default_model_path(&self.season) {
                self.model_path = default_model_path(&season);
            }
            self.season = season;
        }
        self
    }
}

pub fn default_model_path(season: &str) -> PathBuf {
    PathBuf::from(format!("data/model_{}.json", season))
}

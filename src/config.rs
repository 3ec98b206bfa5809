use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
}

/// Server configuration, read once at startup. Provider credentials
/// have no defaults: a missing value aborts the process instead of
/// surfacing later as a per-request failure.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind: String,
    pub db_url: String,
    pub data_dir: String,
    pub llm_endpoint: String,
    pub llm_deployment: String,
    pub llm_api_version: String,
    pub llm_api_key: String,
    pub search_endpoint: String,
    pub search_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind = env::var("WHITEBOARD_BIND").unwrap_or_else(|_| "127.0.0.1:8686".to_string());
        let db_url = env::var("WHITEBOARD_DB_URL")
            .unwrap_or_else(|_| "sqlite://data/whiteboard.db?mode=rwc".to_string());
        let data_dir = env::var("WHITEBOARD_DATA_DIR").unwrap_or_else(|_| "data".to_string());

        Ok(Self {
            bind,
            db_url,
            data_dir,
            llm_endpoint: require("WHITEBOARD_LLM_ENDPOINT")?,
            llm_deployment: require("WHITEBOARD_LLM_DEPLOYMENT")?,
            llm_api_version: require("WHITEBOARD_LLM_API_VERSION")?,
            llm_api_key: require("WHITEBOARD_LLM_API_KEY")?,
            search_endpoint: require("WHITEBOARD_SEARCH_ENDPOINT")?,
            search_key: require("WHITEBOARD_SEARCH_KEY")?,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

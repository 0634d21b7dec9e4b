//! Runtime configuration gathered from the environment and CLI flags.

use crate::error::{QaError, Result};
use crate::llm::LlmClient;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_STORE_DIR: &str = "tabular_store";
pub const DEFAULT_DATA_DIR: &str = "data/dataframes";
pub const DEFAULT_ANNOTATIONS: &str = "data/annotation.json";
pub const DEFAULT_CATALOG_OUT: &str = "catalog.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl LlmConfig {
    /// Read `OPENAI_API_KEY` (required), `OPENAI_MODEL` and `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                QaError::Config(
                    "OPENAI_API_KEY not found. Set it in the environment or a .env file".to_string(),
                )
            })?;

        Ok(Self {
            api_key,
            model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    pub fn client(&self) -> LlmClient {
        LlmClient::new(self.api_key.clone(), self.model.clone(), self.base_url.clone())
    }
}

/// File locations used by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store_dir: PathBuf,
    pub data_dir: PathBuf,
    pub annotations: PathBuf,
    pub catalog_out: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            annotations: PathBuf::from(DEFAULT_ANNOTATIONS),
            catalog_out: PathBuf::from(DEFAULT_CATALOG_OUT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply() {
        let config = LlmConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client().model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_overrides() {
        let config = LlmConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("OPENAI_BASE_URL", "http://localhost:8000/v1"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "http://localhost:8000/v1");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = LlmConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, QaError::Config(_)));
    }
}

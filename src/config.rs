use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Credentials and tunables loaded from a TOML file under the OS config
/// directory, then overridden by environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub provider_a_api_key: Option<String>,
    pub provider_b_api_key: Option<String>,
    pub provider_c_api_key: Option<String>,

    /// Default segments per detection batch.
    pub detect_batch_size: usize,
    /// Default unique texts per translation batch.
    pub translate_batch_size: usize,
    /// Interview-level worker pool size; 1 means strictly sequential.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_a_api_key: None,
            provider_b_api_key: None,
            provider_c_api_key: None,
            detect_batch_size: 50,
            translate_batch_size: 100,
            workers: 1,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str::<Config>(&contents)?;
            }
        }

        if let Ok(key) = std::env::var("PROVIDER_A_API_KEY") {
            config.provider_a_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("PROVIDER_B_API_KEY") {
            config.provider_b_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("PROVIDER_C_API_KEY") {
            config.provider_c_api_key = Some(key);
        }
        if let Ok(n) = std::env::var("SCRIBE_SYNC_DETECT_BATCH_SIZE") {
            if let Ok(n) = n.parse() {
                config.detect_batch_size = n;
            }
        }
        if let Ok(n) = std::env::var("SCRIBE_SYNC_TRANSLATE_BATCH_SIZE") {
            if let Ok(n) = n.parse() {
                config.translate_batch_size = n;
            }
        }
        if let Ok(n) = std::env::var("SCRIBE_SYNC_WORKERS") {
            if let Ok(n) = n.parse() {
                config.workers = n;
            }
        }

        Ok(config)
    }

    /// At least one provider credential must be present; the router decides
    /// per-job whether the available set is capable.
    pub fn validate(&self) -> Result<()> {
        if self.provider_a_api_key.is_none()
            && self.provider_b_api_key.is_none()
            && self.provider_c_api_key.is_none()
        {
            return Err(PipelineError::Config(
                "no provider credentials configured; set at least one of PROVIDER_A_API_KEY, \
                 PROVIDER_B_API_KEY, PROVIDER_C_API_KEY"
                    .to_string(),
            ));
        }

        if self.detect_batch_size == 0 {
            return Err(PipelineError::Config(
                "detect_batch_size must be greater than 0".to_string(),
            ));
        }
        if self.translate_batch_size == 0 {
            return Err(PipelineError::Config(
                "translate_batch_size must be greater than 0".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(PipelineError::Config(
                "workers must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("scribe-sync").join("config.toml"))
    }
}

/// CLI-facing knobs for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub detect_batch_size: usize,
    pub limit: Option<usize>,
    pub start_from: usize,
    pub force_all: bool,
    pub workers: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            detect_batch_size: 50,
            limit: None,
            start_from: 0,
            force_all: false,
            workers: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_credentials() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_passes_with_one_credential() {
        let mut config = Config::default();
        config.provider_c_api_key = Some("key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.provider_a_api_key = Some("key".to_string());
        config.detect_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn batch_options_default_values_are_sensible() {
        let opts = BatchOptions::default();
        assert_eq!(opts.batch_size, 100);
        assert_eq!(opts.detect_batch_size, 50);
        assert_eq!(opts.workers, 1);
    }
}

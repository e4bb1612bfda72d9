//! Analyzer configuration loaded from `code-analyzer.toml`.
//!
//! [`AnalyzerConfig`] holds every tunable. Values missing from the file use
//! sensible defaults. The `DEEPSEEK_API_KEY` environment variable takes
//! precedence over the file; command-line flags are applied on top by
//! `main`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::deepseek::API_BASE_URL;
use crate::error::AnalyzerError;
use crate::retry::RetryPolicy;
use crate::scheduler::SchedulerConfig;

pub const DEFAULT_CONFIG_FILE: &str = "code-analyzer.toml";
pub const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";
const DOTENV_FILE: &str = ".env";
/// Longest accepted retry or pacing delay.
const MAX_DELAY_SECS: f64 = 3600.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
    /// Substitute used once when the server rejects a model name.
    pub fallback_models: HashMap<String, String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub max_delay_secs: f64,
    pub batch_size: usize,
    pub throttle_secs: u64,
    /// Pause between the questions of one conversation.
    pub pacing_secs: f64,
    /// Name of the directory created next to each source file.
    pub output_dir: String,
    pub state_file: PathBuf,
    pub log_file: Option<PathBuf>,
    /// Characters of source code sent before condensing.
    pub max_code_length: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: API_BASE_URL.to_string(),
            model: "deepseek-coder".to_string(),
            fallback_models: HashMap::from([(
                "deepseek-coder-v2".to_string(),
                "deepseek-coder".to_string(),
            )]),
            max_tokens: 4096,
            temperature: 0.2,
            timeout_secs: 60,
            max_attempts: 5,
            base_delay_secs: 2.0,
            max_delay_secs: 60.0,
            batch_size: 5,
            throttle_secs: 5,
            pacing_secs: 1.0,
            output_dir: "docs".to_string(),
            state_file: PathBuf::from("code_analyzer_state.json"),
            log_file: Some(PathBuf::from("code_analyzer.log")),
            max_code_length: 6000,
        }
    }
}

impl AnalyzerConfig {
    /// Load from `path`, or from `code-analyzer.toml` in the working
    /// directory when no path is given. Only an explicitly named file must
    /// exist. The API key comes from the environment, then from `.env`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| dotenv_key(Path::new(DOTENV_FILE)));
        Self::load_with_env(path, env_key)
    }

    fn load_with_env(path: Option<&Path>, env_key: Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(key) = env_key.filter(|k| !k.is_empty()) {
            config.api_key = key;
        }
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = toml::from_str::<AnalyzerConfig>(&contents)
            .map_err(AnalyzerError::from)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if self.batch_size == 0 {
            return Err(AnalyzerError::Config("batch_size must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(AnalyzerError::Config("max_attempts must be at least 1".into()));
        }
        if self.model.trim().is_empty() {
            return Err(AnalyzerError::Config("model must not be empty".into()));
        }
        if self.output_dir.trim().is_empty() || self.output_dir.contains(['/', '\\']) {
            return Err(AnalyzerError::Config(format!(
                "output_dir must be a plain directory name, got {:?}",
                self.output_dir
            )));
        }
        let delays_valid = self.base_delay_secs.is_finite()
            && self.max_delay_secs.is_finite()
            && self.pacing_secs.is_finite()
            && self.base_delay_secs >= 0.0
            && self.max_delay_secs >= 0.0
            && self.pacing_secs >= 0.0;
        if !delays_valid {
            return Err(AnalyzerError::Config("delays must be non-negative".into()));
        }
        let longest = self
            .base_delay_secs
            .max(self.max_delay_secs)
            .max(self.pacing_secs);
        if longest > MAX_DELAY_SECS {
            return Err(AnalyzerError::Config(format!(
                "delays must not exceed {MAX_DELAY_SECS} seconds, got {longest}"
            )));
        }
        Ok(())
    }

    pub fn require_api_key(&self) -> Result<&str, AnalyzerError> {
        if self.api_key.trim().is_empty() {
            Err(AnalyzerError::MissingApiKey)
        } else {
            Ok(&self.api_key)
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs_f64(self.base_delay_secs),
            max_delay: Duration::from_secs_f64(self.max_delay_secs),
            ..RetryPolicy::default()
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            batch_size: self.batch_size,
            throttle: Duration::from_secs(self.throttle_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_secs_f64(self.pacing_secs)
    }
}

/// The API key from a dotenv file, without touching the process environment.
fn dotenv_key(path: &Path) -> Option<String> {
    dotenvy::from_path_iter(path)
        .ok()?
        .filter_map(Result::ok)
        .find(|(key, value)| key == API_KEY_ENV && !value.is_empty())
        .map(|(_, value)| value)
}

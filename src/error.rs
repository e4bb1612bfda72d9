use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Missing DeepSeek API key. Set DEEPSEEK_API_KEY or `api_key` in the config file.")]
    MissingApiKey,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to write artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_mentions_env_var() {
        let err = AnalyzerError::MissingApiKey;
        assert!(err.to_string().contains("DEEPSEEK_API_KEY"));
    }

    #[test]
    fn artifact_error_names_path() {
        let err = AnalyzerError::Artifact {
            path: PathBuf::from("docs/a_overview.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to write artifact docs/a_overview.md: denied"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AnalyzerError = io.into();
        assert!(matches!(err, AnalyzerError::Io(_)));
    }
}

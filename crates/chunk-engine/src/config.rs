use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Budgets for post-processing chunks before embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Token budget for method and file chunks
    pub token_budget: usize,

    /// Tokens shared between adjacent method windows
    pub overlap_tokens: usize,

    /// Token budget for class and block chunks (truncated, never windowed)
    pub class_token_budget: usize,

    /// Files larger than this never get a file-level chunk
    pub max_file_bytes: usize,

    /// Smallest window a method split may use, whatever the overlap
    pub min_window_tokens: usize,

    /// Appended on its own line to truncated chunks
    pub truncation_marker: String,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            token_budget: 512,
            overlap_tokens: 64,
            class_token_budget: 1024,
            max_file_bytes: 1024 * 1024,
            min_window_tokens: 32,
            truncation_marker: "... [truncated]".to_string(),
        }
    }
}

impl SplitterConfig {
    /// Create config sized for embedding models (smaller, focused chunks)
    #[must_use]
    pub fn for_embeddings() -> Self {
        Self {
            token_budget: 384,
            overlap_tokens: 48,
            class_token_budget: 512,
            max_file_bytes: 256 * 1024,
            ..Default::default()
        }
    }

    /// Create config sized for LLM context (larger, comprehensive chunks)
    #[must_use]
    pub fn for_llm_context() -> Self {
        Self {
            token_budget: 2048,
            overlap_tokens: 128,
            class_token_budget: 4096,
            max_file_bytes: 4 * 1024 * 1024,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.token_budget == 0 {
            return Err(ChunkerError::invalid_config("token_budget must be > 0"));
        }

        if self.class_token_budget == 0 {
            return Err(ChunkerError::invalid_config("class_token_budget must be > 0"));
        }

        if self.min_window_tokens == 0 {
            return Err(ChunkerError::invalid_config("min_window_tokens must be > 0"));
        }

        if self.overlap_tokens >= self.token_budget {
            return Err(ChunkerError::invalid_config(format!(
                "overlap_tokens ({}) must be smaller than token_budget ({})",
                self.overlap_tokens, self.token_budget
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(SplitterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_preset_configs_valid() {
        assert!(SplitterConfig::for_embeddings().validate().is_ok());
        assert!(SplitterConfig::for_llm_context().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SplitterConfig {
            token_budget: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        // Invalid: overlap swallows the whole budget
        config.token_budget = 100;
        config.overlap_tokens = 100;
        assert!(config.validate().is_err());

        config.overlap_tokens = 10;
        config.min_window_tokens = 0;
        assert!(config.validate().is_err());

        config.min_window_tokens = 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: SplitterConfig = serde_yaml::from_str("token_budget: 256\n").unwrap();
        assert_eq!(config.token_budget, 256);
        assert_eq!(config.overlap_tokens, SplitterConfig::default().overlap_tokens);
        assert!(matches!(
            SplitterConfig {
                class_token_budget: 0,
                ..config
            }
            .validate(),
            Err(ChunkerError::InvalidConfig(_))
        ));
    }
}

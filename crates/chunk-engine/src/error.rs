use std::path::PathBuf;
use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Point at which a cancellation was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStage {
    /// Before the source was handed to the parser; no result exists.
    BeforeParse,
    /// While walking the tree; the partial result is kept.
    DuringWalk,
}

impl std::fmt::Display for CancelStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BeforeParse => f.write_str("before parse"),
            Self::DuringWalk => f.write_str("during walk"),
        }
    }
}

/// Errors that can occur while configuring or running the chunker
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// A language configuration failed validation
    #[error("Invalid language config '{language}': {reason}")]
    ConfigValidation { language: String, reason: String },

    /// The declared grammar has no backing parser
    #[error("Language '{language}' declares unsupported grammar '{grammar}'")]
    UnsupportedGrammar { language: String, grammar: String },

    /// Two configs declared the same extension; the first registration is kept
    #[error("Extension '{extension}' already registered by '{kept}', ignored for '{rejected}'")]
    DuplicateExtension {
        extension: String,
        kept: String,
        rejected: String,
    },

    /// Failed to parse the source code
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Chunking was cancelled
    #[error("Chunking cancelled {stage}")]
    Cancelled { stage: CancelStage },

    /// Missing or malformed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Registry construction ended with no usable language
    #[error("No language configuration could be loaded ({rejected} rejected)")]
    NoLanguagesLoaded { rejected: usize },

    /// The configuration source could not be read at all
    #[error("Cannot read config source {}: {source}", path.display())]
    ConfigSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A YAML document could not be deserialized
    #[error("Malformed YAML in {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Invalid splitter configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),
}

impl ChunkerError {
    /// Create a config validation error
    pub fn validation(language: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigValidation {
            language: language.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }

    /// Whether this error is a cancellation, at any stage
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

//! # Context Chunk Engine
//!
//! Hierarchical, content-addressed code chunks for indexing and embedding-based retrieval.
//!
//! ## Philosophy
//!
//! One data-driven walker serves every language:
//! - Node kinds are mapped to chunk levels by declarative YAML rules
//! - Grammar quirks live in small, named special-form hooks
//! - Chunk ids depend only on path, span, name and level, so re-chunking is stable
//!
//! ## Architecture
//!
//! ```text
//! SourceFile
//!     │
//!     ├──> ChunkerRegistry (extension → language, else heuristics, else fallback)
//!     │
//!     ├──> LanguageChunker
//!     │    ├─> ParserPool → Tree-sitter Tree
//!     │    └─> ExtractionEngine (LanguageConfig + SpecialForm hooks)
//!     │         └─> ChunkResult: File → Class → Method/Block, parent-linked
//!     │
//!     └──> Splitter (optional)
//!          ├─> File/Class: truncate at a line boundary with a marker
//!          └─> Method: overlapping windows within the token budget
//! ```
//!
//! ## Example
//!
//! ```rust
//! use context_chunk_engine::{ChunkContext, ChunkerRegistry, SourceFile};
//!
//! let registry = ChunkerRegistry::builtin().unwrap();
//!
//! let code = r#"
//! class Greeter:
//!     def greet(self, name):
//!         return f"hello {name}"
//! "#;
//!
//! let result = registry
//!     .chunk(&ChunkContext::new(), &SourceFile::new("greeter.py", code))
//!     .unwrap();
//! for chunk in &result.chunks {
//!     println!("{} {} at lines {}-{}", chunk.level, chunk.name, chunk.start_line, chunk.end_line);
//! }
//! assert_eq!(result.stats().method_chunks, 1);
//! ```

mod chunker;
mod config;
mod engine;
mod error;
mod grammar;
mod heuristics;
mod identity;
mod language_config;
mod parser_pool;
mod registry;
mod special_forms;
mod splitter;
mod types;

pub use chunker::{ChunkContext, Chunker, FallbackChunker, LanguageChunker, FALLBACK_LANGUAGE};
pub use config::SplitterConfig;
pub use engine::ExtractionEngine;
pub use error::{CancelStage, ChunkerError, Result};
pub use grammar::{Grammar, GrammarRegistry};
pub use heuristics::{detect_language, language_from_extension, language_from_shebang};
pub use identity::{chunk_id, content_hash};
pub use language_config::{
    ChunkMappings, DocCommentPosition, ExtractionSection, LanguageConfig, LanguageConfigFile,
    TreeSitterSection,
};
pub use parser_pool::{ParserPool, DEFAULT_MAX_IDLE_PARSERS};
pub use registry::ChunkerRegistry;
pub use special_forms::{
    AssignmentDeclaration, DecoratedUnwrap, Expansion, ExportUnwrap, FormContext, ImplTargetName,
    MultiSpecUnwrap, SpecialForm,
};
pub use splitter::{HeuristicEstimator, Splitter, TokenEstimator};
pub use tokio_util::sync::CancellationToken;
pub use types::{signature_of, Chunk, ChunkLevel, ChunkResult, ChunkingStats, SourceFile};

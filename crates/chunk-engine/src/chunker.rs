use crate::engine::ExtractionEngine;
use crate::error::{CancelStage, ChunkerError, Result};
use crate::grammar::Grammar;
use crate::language_config::LanguageConfig;
use crate::parser_pool::{ParserPool, DEFAULT_MAX_IDLE_PARSERS};
use crate::types::{Chunk, ChunkLevel, ChunkResult, SourceFile};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Language id stamped on fallback chunks
pub const FALLBACK_LANGUAGE: &str = "text";

/// Per-call context carrying the cancellation signal
#[derive(Debug, Clone, Default)]
pub struct ChunkContext {
    cancel: CancellationToken,
}

impl ChunkContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context observing an existing token (e.g. a child of a request-wide token)
    #[must_use]
    pub fn with_cancel_token(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Request cancellation of every call sharing this context
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Turns one source file into a chunk result
pub trait Chunker: Send + Sync {
    /// Chunk a file. Cancellation before parsing is an error; cancellation mid-walk yields a
    /// truncated result.
    fn chunk(&self, ctx: &ChunkContext, file: &SourceFile) -> Result<ChunkResult>;

    /// Language id this chunker stamps on its chunks
    fn language_id(&self) -> &str;
}

/// Chunker for one configured language: a parser pool feeding the extraction engine
#[derive(Debug)]
pub struct LanguageChunker {
    engine: ExtractionEngine,
    parsers: ParserPool,
}

impl LanguageChunker {
    /// Bind a validated config to its grammar
    pub fn new(config: Arc<LanguageConfig>, grammar: &Grammar) -> Result<Self> {
        if config.grammar_id != grammar.id() {
            return Err(ChunkerError::UnsupportedGrammar {
                language: config.language_id.clone(),
                grammar: config.grammar_id.clone(),
            });
        }
        let parsers = ParserPool::new(
            config.language_id.clone(),
            grammar.language().clone(),
            DEFAULT_MAX_IDLE_PARSERS,
        )?;
        Ok(Self {
            engine: ExtractionEngine::new(config, grammar.special_forms()),
            parsers,
        })
    }

    #[must_use]
    pub fn config(&self) -> &LanguageConfig {
        self.engine.config()
    }
}

impl Chunker for LanguageChunker {
    fn chunk(&self, ctx: &ChunkContext, file: &SourceFile) -> Result<ChunkResult> {
        if ctx.is_cancelled() {
            return Err(ChunkerError::Cancelled {
                stage: CancelStage::BeforeParse,
            });
        }
        if file.content.is_empty() {
            return Ok(ChunkResult::new(file.display_path(), self.language_id()));
        }

        let tree = self.parsers.parse(&file.content)?;
        let result = self.engine.extract(&tree, file, ctx);
        log::debug!("{}: {}", result.source_file, result.stats());
        Ok(result)
    }

    fn language_id(&self) -> &str {
        &self.engine.config().language_id
    }
}

/// Chunker for files no configured language claims: one file chunk with the whole content
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackChunker;

impl Chunker for FallbackChunker {
    fn chunk(&self, ctx: &ChunkContext, file: &SourceFile) -> Result<ChunkResult> {
        if ctx.is_cancelled() {
            return Err(ChunkerError::Cancelled {
                stage: CancelStage::BeforeParse,
            });
        }

        let mut result = ChunkResult::new(file.display_path(), FALLBACK_LANGUAGE);
        let chunk = Chunk::from_source_bytes(
            result.source_file.clone(),
            ChunkLevel::File,
            file.file_name(),
            FALLBACK_LANGUAGE,
            1,
            file.line_count(),
            &file.content,
        )
        .with_last_modified(file.last_modified);
        result.chunks.push(chunk);
        Ok(result)
    }

    fn language_id(&self) -> &str {
        FALLBACK_LANGUAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarRegistry;
    use pretty_assertions::assert_eq;

    fn python_chunker() -> LanguageChunker {
        let config = LanguageConfig::from_yaml_str(
            include_str!("../languages/python.yaml"),
            "python.yaml",
        )
        .unwrap();
        let grammars = GrammarRegistry::builtin();
        LanguageChunker::new(Arc::new(config), grammars.get("python").unwrap()).unwrap()
    }

    #[test]
    fn test_language_chunker_basic() {
        let chunker = python_chunker();
        let file = SourceFile::new("src/app.py", "def main():\n    return 1\n");
        let result = chunker.chunk(&ChunkContext::new(), &file).unwrap();

        assert_eq!(result.language, "python");
        assert_eq!(result.chunks.len(), 2);
        assert_eq!(result.chunks[0].name, "app.py");
        assert_eq!(result.chunks[1].name, "main");
        assert!(result.non_fatal_errors.is_empty());
    }

    #[test]
    fn test_cancel_before_parse_is_error() {
        let chunker = python_chunker();
        let ctx = ChunkContext::new();
        ctx.cancel();
        let err = chunker
            .chunk(&ctx, &SourceFile::new("a.py", "x = 1\n"))
            .unwrap_err();
        assert!(matches!(
            err,
            ChunkerError::Cancelled {
                stage: CancelStage::BeforeParse
            }
        ));
    }

    #[test]
    fn test_child_token_cancellation_propagates() {
        let parent = CancellationToken::new();
        let ctx = ChunkContext::with_cancel_token(parent.child_token());
        assert!(!ctx.is_cancelled());
        parent.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_mismatched_grammar_rejected() {
        let config = LanguageConfig::from_yaml_str(
            include_str!("../languages/rust.yaml"),
            "rust.yaml",
        )
        .unwrap();
        let grammars = GrammarRegistry::builtin();
        let err = LanguageChunker::new(Arc::new(config), grammars.get("python").unwrap())
            .unwrap_err();
        assert!(matches!(err, ChunkerError::UnsupportedGrammar { .. }));
    }

    #[test]
    fn test_fallback_empty_file() {
        let result = FallbackChunker
            .chunk(&ChunkContext::new(), &SourceFile::new("notes/empty", ""))
            .unwrap();
        assert_eq!(result.chunks.len(), 1);
        let chunk = &result.chunks[0];
        assert_eq!(chunk.level, ChunkLevel::File);
        assert_eq!((chunk.start_line, chunk.end_line), (1, 1));
        assert_eq!(chunk.content, "");
        assert_eq!(chunk.language, FALLBACK_LANGUAGE);
        assert_eq!(chunk.parent_id, None);
    }

    #[test]
    fn test_fallback_keeps_content() {
        let result = FallbackChunker
            .chunk(
                &ChunkContext::new(),
                &SourceFile::new("README", "line one\nline two\n"),
            )
            .unwrap();
        assert_eq!(result.chunks[0].name, "README");
        assert_eq!(result.chunks[0].end_line, 2);
        assert_eq!(result.chunks[0].content, "line one\nline two\n");
    }

    #[test]
    fn test_fallback_hashes_undecodable_bytes_apart() {
        let chunk = |bytes: &[u8]| {
            FallbackChunker
                .chunk(&ChunkContext::new(), &SourceFile::new("blob.bin", bytes))
                .unwrap()
                .chunks
                .remove(0)
        };
        let (a, b) = (chunk(&[b'x', 0xff]), chunk(&[b'x', 0xfe]));
        assert_eq!(a.content, b.content);
        assert_ne!(a.content_hash, b.content_hash);
    }
}

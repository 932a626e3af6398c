use crate::error::{ChunkerError, Result};
use std::sync::{Mutex, PoisonError};
use tree_sitter::{Parser, Tree};

/// Idle parsers kept per language by default
pub const DEFAULT_MAX_IDLE_PARSERS: usize = 4;

/// Parsers for one language.
///
/// A parser is checked out for exactly one parse and returned afterwards, so concurrent calls for
/// the same language never share an instance. The lock guards only the idle list.
pub struct ParserPool {
    language_id: String,
    language: tree_sitter::Language,
    idle: Mutex<Vec<Parser>>,
    max_idle: usize,
}

impl ParserPool {
    /// Create a pool, failing if the grammar cannot be loaded into a parser
    pub fn new(
        language_id: impl Into<String>,
        language: tree_sitter::Language,
        max_idle: usize,
    ) -> Result<Self> {
        let language_id = language_id.into();
        let first = new_parser(&language_id, &language)?;
        Ok(Self {
            language_id,
            language,
            idle: Mutex::new(vec![first]),
            max_idle: max_idle.max(1),
        })
    }

    /// Parse source bytes with an exclusively held parser
    pub fn parse(&self, source: &[u8]) -> Result<Tree> {
        let mut parser = self.checkout()?;
        let tree = parser.parse(source, None);
        self.checkin(parser);
        tree.ok_or_else(|| {
            ChunkerError::parse(format!("{} parser produced no tree", self.language_id))
        })
    }

    /// Number of parsers currently idle
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn checkout(&self) -> Result<Parser> {
        let pooled = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match pooled {
            Some(parser) => Ok(parser),
            None => {
                log::debug!("Growing parser pool for '{}'", self.language_id);
                new_parser(&self.language_id, &self.language)
            }
        }
    }

    fn checkin(&self, mut parser: Parser) {
        parser.reset();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(parser);
        }
    }
}

impl std::fmt::Debug for ParserPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserPool")
            .field("language_id", &self.language_id)
            .field("idle", &self.idle_count())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

fn new_parser(language_id: &str, language: &tree_sitter::Language) -> Result<Parser> {
    let mut parser = Parser::new();
    parser.set_language(language).map_err(|e| {
        ChunkerError::tree_sitter(format!("Failed to set language for '{language_id}': {e}"))
    })?;
    Ok(parser)
}

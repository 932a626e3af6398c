use crate::chunker::{ChunkContext, Chunker, FallbackChunker, LanguageChunker};
use crate::error::{ChunkerError, Result};
use crate::grammar::GrammarRegistry;
use crate::heuristics;
use crate::language_config::LanguageConfig;
use crate::types::{ChunkResult, SourceFile};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Routes source files to language chunkers.
///
/// Read-only once built, so a single registry can serve any number of threads.
#[derive(Debug)]
pub struct ChunkerRegistry {
    /// Language id -> chunker
    chunkers: HashMap<String, Arc<LanguageChunker>>,
    /// Normalized extension -> language id
    extensions: HashMap<String, String>,
    /// Language ids in registration order
    languages: Vec<String>,
    fallback: FallbackChunker,
    warnings: Vec<ChunkerError>,
}

impl ChunkerRegistry {
    /// Build from candidate configs, in order.
    ///
    /// Rejected candidates become warnings. Fails only when nothing could be loaded.
    pub fn build(
        candidates: impl IntoIterator<Item = Result<LanguageConfig>>,
        grammars: &GrammarRegistry,
    ) -> Result<Self> {
        let mut registry = Self {
            chunkers: HashMap::new(),
            extensions: HashMap::new(),
            languages: Vec::new(),
            fallback: FallbackChunker,
            warnings: Vec::new(),
        };
        let mut rejected = 0;

        for candidate in candidates {
            let outcome = candidate.and_then(|config| registry.register(config, grammars));
            if let Err(e) = outcome {
                log::warn!("Skipping language config: {e}");
                registry.warnings.push(e);
                rejected += 1;
            }
        }

        if registry.languages.is_empty() {
            return Err(ChunkerError::NoLanguagesLoaded { rejected });
        }
        log::debug!(
            "Chunker registry ready: {} languages, {} extensions, {} warnings",
            registry.languages.len(),
            registry.extensions.len(),
            registry.warnings.len()
        );
        Ok(registry)
    }

    /// Registry over the default rule set and grammars
    pub fn builtin() -> Result<Self> {
        Self::build(LanguageConfig::builtin(), &GrammarRegistry::builtin())
    }

    /// Registry over every YAML rule file in `dir`
    pub fn from_config_dir(dir: impl AsRef<Path>, grammars: &GrammarRegistry) -> Result<Self> {
        Self::build(LanguageConfig::load_dir(dir)?, grammars)
    }

    fn register(&mut self, mut config: LanguageConfig, grammars: &GrammarRegistry) -> Result<()> {
        let language_id = config.language_id.clone();
        if self.chunkers.contains_key(&language_id) {
            return Err(ChunkerError::validation(
                language_id,
                "language id already registered",
            ));
        }
        let grammar = grammars.get(&config.grammar_id).ok_or_else(|| {
            ChunkerError::UnsupportedGrammar {
                language: language_id.clone(),
                grammar: config.grammar_id.clone(),
            }
        })?;

        // First registration wins; the newcomer keeps whatever is left.
        let claimed: Vec<(String, String)> = config
            .extensions
            .iter()
            .filter_map(|ext| {
                self.extensions
                    .get(ext)
                    .map(|owner| (ext.clone(), owner.clone()))
            })
            .collect();
        for (extension, kept) in claimed {
            config.extensions.remove(&extension);
            let warning = ChunkerError::DuplicateExtension {
                extension,
                kept,
                rejected: language_id.clone(),
            };
            log::warn!("{warning}");
            self.warnings.push(warning);
        }
        if config.extensions.is_empty() {
            return Err(ChunkerError::validation(
                language_id,
                "every extension is already claimed by another language",
            ));
        }

        let config = Arc::new(config);
        let chunker = LanguageChunker::new(Arc::clone(&config), grammar)?;
        for ext in &config.extensions {
            self.extensions.insert(ext.clone(), language_id.clone());
        }
        self.chunkers.insert(language_id.clone(), Arc::new(chunker));
        self.languages.push(language_id);
        Ok(())
    }

    /// Chunk one file with whichever chunker claims it
    pub fn chunk(&self, ctx: &ChunkContext, file: &SourceFile) -> Result<ChunkResult> {
        if file.path.as_os_str().is_empty() {
            return Err(ChunkerError::invalid_input("source file has no path"));
        }
        self.chunker_for(file).chunk(ctx, file)
    }

    /// The chunker `file` routes to; the fallback when no language claims it
    #[must_use]
    pub fn chunker_for(&self, file: &SourceFile) -> &dyn Chunker {
        match self.language_for(&file.path, &file.content) {
            Some(language) => match self.chunkers.get(language) {
                Some(chunker) => chunker.as_ref(),
                None => &self.fallback,
            },
            None => &self.fallback,
        }
    }

    /// Language id a file routes to, `None` for the fallback
    #[must_use]
    pub fn language_for(&self, path: &Path, content: &[u8]) -> Option<&str> {
        let by_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(LanguageConfig::normalize_extension)
            .and_then(|ext| self.extensions.get(&ext));
        if let Some(language) = by_extension {
            return Some(language.as_str());
        }

        let hint = heuristics::detect_language(path, content)?;
        match self.languages.iter().find(|id| id.as_str() == hint) {
            Some(language) => {
                log::debug!("{}: routed to '{language}' by heuristics", path.display());
                Some(language.as_str())
            }
            None => None,
        }
    }

    /// Chunker for a language id
    #[must_use]
    pub fn get(&self, language_id: &str) -> Option<&LanguageChunker> {
        self.chunkers.get(language_id).map(Arc::as_ref)
    }

    /// Loaded language ids, in registration order
    #[must_use]
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Extensions owned by a language, sorted
    #[must_use]
    pub fn extensions_of(&self, language_id: &str) -> Vec<&str> {
        let mut exts: Vec<&str> = self
            .extensions
            .iter()
            .filter(|(_, owner)| owner.as_str() == language_id)
            .map(|(ext, _)| ext.as_str())
            .collect();
        exts.sort_unstable();
        exts
    }

    /// Problems recorded while building: rejected configs and extension collisions
    #[must_use]
    pub fn warnings(&self) -> &[ChunkerError] {
        &self.warnings
    }
}

use crate::error::{ChunkerError, Result};
use crate::identity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Granularity of an extracted unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkLevel {
    /// Whole source file
    File,
    /// Class, struct, interface, or other type-like container
    Class,
    /// Method or free function
    Method,
    /// Configured block construct
    Block,
}

impl ChunkLevel {
    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Class => "class",
            Self::Method => "method",
            Self::Block => "block",
        }
    }

    /// Whether chunks at this level scope the chunks nested inside them
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::File | Self::Class | Self::Block)
    }
}

impl std::fmt::Display for ChunkLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A semantic code chunk.
///
/// `id` and `content_hash` are computed once by [`Chunk::new`]; builder methods only touch
/// fields that take no part in identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Content-addressed identifier (path, lines, name, level)
    pub id: String,

    /// Digest of `content` alone
    pub content_hash: String,

    /// Source file path
    pub file_path: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    pub level: ChunkLevel,

    /// Configured language id (not the grammar id)
    pub language: String,

    /// Verbatim source text
    pub content: String,

    /// Resolved identifier
    pub name: String,

    /// Declaration header: text up to the first `{` or newline
    pub signature: String,

    /// Enclosing chunk; `None` only for the file chunk
    pub parent_id: Option<String>,

    /// Documentation/docstring if available
    #[serde(default)]
    pub documentation: Option<String>,

    /// Chunk this one was split or truncated from
    #[serde(default)]
    pub split_parent_id: Option<String>,

    /// Position within the split sequence
    #[serde(default)]
    pub split_index: Option<usize>,

    /// True when the content is not the whole original chunk
    #[serde(default)]
    pub is_partial: bool,

    /// Propagated from the source file
    #[serde(default)]
    pub last_modified: Option<SystemTime>,
}

impl Chunk {
    /// Create a new chunk, computing its identity and signature
    #[must_use]
    pub fn new(
        file_path: impl Into<String>,
        level: ChunkLevel,
        name: impl Into<String>,
        language: impl Into<String>,
        start_line: usize,
        end_line: usize,
        content: String,
    ) -> Self {
        let file_path = file_path.into();
        let name = name.into();
        let start_line = start_line.max(1);
        let end_line = end_line.max(start_line);

        Self {
            id: identity::chunk_id(&file_path, start_line, end_line, &name, level),
            content_hash: identity::content_hash(&content),
            signature: signature_of(&content),
            file_path,
            start_line,
            end_line,
            level,
            language: language.into(),
            content,
            name,
            parent_id: None,
            documentation: None,
            split_parent_id: None,
            split_index: None,
            is_partial: false,
            last_modified: None,
        }
    }

    /// Create a chunk from a raw source span.
    ///
    /// `content` is the lossy UTF-8 rendering of `raw`, while `content_hash` is taken over `raw`
    /// itself so distinct byte inputs never share a hash.
    #[must_use]
    pub fn from_source_bytes(
        file_path: impl Into<String>,
        level: ChunkLevel,
        name: impl Into<String>,
        language: impl Into<String>,
        start_line: usize,
        end_line: usize,
        raw: &[u8],
    ) -> Self {
        let content = String::from_utf8_lossy(raw).into_owned();
        let mut chunk = Self::new(file_path, level, name, language, start_line, end_line, content);
        chunk.content_hash = identity::content_hash(raw);
        chunk
    }

    /// Builder: set parent chunk id
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Builder: set documentation
    #[must_use]
    pub fn with_documentation(mut self, documentation: Option<String>) -> Self {
        self.documentation = documentation;
        self
    }

    /// Builder: set last modification time
    #[must_use]
    pub const fn with_last_modified(mut self, last_modified: Option<SystemTime>) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Derive a partial chunk covering `start_line..=end_line` of this one.
    ///
    /// Identity is recomputed for the new span; hierarchy and provenance are carried over.
    #[must_use]
    pub fn derive_part(
        &self,
        start_line: usize,
        end_line: usize,
        content: String,
        split_index: usize,
    ) -> Self {
        let mut part = Self::new(
            self.file_path.clone(),
            self.level,
            self.name.clone(),
            self.language.clone(),
            start_line,
            end_line,
            content,
        );
        part.signature = self.signature.clone();
        part.parent_id = self.parent_id.clone();
        part.documentation = self.documentation.clone();
        part.last_modified = self.last_modified;
        part.split_parent_id = Some(self.id.clone());
        part.split_index = Some(split_index);
        part.is_partial = true;
        part
    }

    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Text from the start of `content` up to the first `{` or newline, trimmed.
#[must_use]
pub fn signature_of(content: &str) -> String {
    let end = content.find(&['{', '\n'][..]).unwrap_or(content.len());
    content[..end].trim().to_string()
}

/// An in-memory source file handed to a chunker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: Vec<u8>,
    pub last_modified: Option<SystemTime>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            last_modified: None,
        }
    }

    /// Builder: set last modification time
    #[must_use]
    pub const fn with_last_modified(mut self, last_modified: SystemTime) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Load a file from disk, keeping its modification time
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let last_modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        Ok(Self {
            path: path.to_path_buf(),
            content,
            last_modified,
        })
    }

    /// Path rendered for chunk records
    #[must_use]
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Final path component, used as the file chunk's name
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.display_path())
    }

    /// Number of lines, counting a final unterminated line; at least 1
    #[must_use]
    pub fn line_count(&self) -> usize {
        let newlines = self.content.iter().filter(|&&b| b == b'\n').count();
        if self.content.last().is_some_and(|&b| b != b'\n') {
            newlines + 1
        } else {
            newlines.max(1)
        }
    }
}

/// Output of a single chunking call
#[derive(Debug)]
pub struct ChunkResult {
    /// Path of the chunked file
    pub source_file: String,

    /// Language id the file was routed to
    pub language: String,

    /// Chunks in pre-order
    pub chunks: Vec<Chunk>,

    /// Problems that did not abort the call
    pub non_fatal_errors: Vec<ChunkerError>,

    /// Set when the walk stopped early; `chunks` is then a prefix of the full result
    pub truncated: bool,
}

impl ChunkResult {
    pub fn new(source_file: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            language: language.into(),
            chunks: Vec::new(),
            non_fatal_errors: Vec::new(),
            truncated: false,
        }
    }

    /// The file-level chunk, if any
    #[must_use]
    pub fn file_chunk(&self) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.level == ChunkLevel::File)
    }

    /// Look a chunk up by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.id == id)
    }

    /// Direct children of a chunk, in emission order
    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Chunk> + 'a {
        self.chunks
            .iter()
            .filter(move |c| c.parent_id.as_deref() == Some(id))
    }

    /// Get statistics about this result
    #[must_use]
    pub fn stats(&self) -> ChunkingStats {
        let count = |level| self.chunks.iter().filter(|c| c.level == level).count();
        ChunkingStats {
            total_chunks: self.chunks.len(),
            file_chunks: count(ChunkLevel::File),
            class_chunks: count(ChunkLevel::Class),
            method_chunks: count(ChunkLevel::Method),
            block_chunks: count(ChunkLevel::Block),
            total_lines: self.chunks.iter().map(Chunk::line_count).sum(),
        }
    }
}

/// Statistics about chunking results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub file_chunks: usize,
    pub class_chunks: usize,
    pub method_chunks: usize,
    pub block_chunks: usize,
    pub total_lines: usize,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | File: {} | Class: {} | Method: {} | Block: {} | Lines: {}",
            self.total_chunks,
            self.file_chunks,
            self.class_chunks,
            self.method_chunks,
            self.block_chunks,
            self.total_lines
        )
    }
}

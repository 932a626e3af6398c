//! Declarative per-language extraction rules.
//!
//! Rules arrive as YAML documents ([`LanguageConfigFile`]) and are validated into the immutable
//! [`LanguageConfig`] the extraction engine consumes.

use crate::error::{ChunkerError, Result};
use crate::types::ChunkLevel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::str::FromStr;

const DEFAULT_NAME_FIELD: &str = "name";

const BUILTIN_CONFIGS: &[(&str, &str)] = &[
    ("rust.yaml", include_str!("../languages/rust.yaml")),
    ("python.yaml", include_str!("../languages/python.yaml")),
    ("javascript.yaml", include_str!("../languages/javascript.yaml")),
    ("typescript.yaml", include_str!("../languages/typescript.yaml")),
    ("tsx.yaml", include_str!("../languages/tsx.yaml")),
    ("go.yaml", include_str!("../languages/go.yaml")),
    ("java.yaml", include_str!("../languages/java.yaml")),
    ("csharp.yaml", include_str!("../languages/csharp.yaml")),
];

/// Raw YAML shape of a language rule file.
///
/// Every field defaults so that missing values surface as validation errors with a reason,
/// not as opaque deserialization failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageConfigFile {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub tree_sitter: TreeSitterSection,
    #[serde(default)]
    pub chunk_mappings: ChunkMappings,
    #[serde(default)]
    pub extraction: ExtractionSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeSitterSection {
    #[serde(default)]
    pub grammar: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMappings {
    #[serde(default)]
    pub class: Vec<String>,
    #[serde(default)]
    pub method: Vec<String>,
    #[serde(default)]
    pub block: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionSection {
    #[serde(default)]
    pub name_field: Option<String>,
    #[serde(default)]
    pub doc_comments: Vec<String>,
    #[serde(default)]
    pub doc_comment_position: Option<String>,
    /// Node kinds allowed between a declaration and its preceding comments (attributes)
    #[serde(default)]
    pub doc_comment_skip: Vec<String>,
}

/// Where documentation sits relative to the documented node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocCommentPosition {
    /// Comment siblings directly above the node
    PrecedingSiblings,
    /// First statement of the node's body (docstrings)
    FirstChild,
    /// Leading doc child of the node's parent; documents only the first declaration after it
    ParentFirstChild,
    /// Comment siblings directly after the node
    FollowingSiblings,
}

impl FromStr for DocCommentPosition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "preceding_siblings" => Ok(Self::PrecedingSiblings),
            "first_child" => Ok(Self::FirstChild),
            "parent_first_child" => Ok(Self::ParentFirstChild),
            "following_siblings" => Ok(Self::FollowingSiblings),
            other => Err(format!(
                "invalid doc_comment_position '{other}' (expected preceding_siblings, first_child, parent_first_child or following_siblings)"
            )),
        }
    }
}

/// Validated extraction rules for one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    /// Identifier stamped on chunks (e.g. `csharp`)
    pub language_id: String,
    pub display_name: String,
    /// Lowercase, dot-prefixed
    pub extensions: BTreeSet<String>,
    /// Key into the grammar registry (e.g. `c_sharp`)
    pub grammar_id: String,
    pub class_node_types: HashSet<String>,
    pub method_node_types: HashSet<String>,
    pub block_node_types: HashSet<String>,
    pub name_field: String,
    pub doc_comment_node_types: HashSet<String>,
    pub doc_comment_position: Option<DocCommentPosition>,
    /// Siblings stepped over, not collected, when scanning upward for comments
    pub doc_skip_node_types: HashSet<String>,
}

impl LanguageConfig {
    /// Parse and validate a YAML rule document. `origin` names the source in errors.
    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self> {
        let file: LanguageConfigFile =
            serde_yaml::from_str(yaml).map_err(|source| ChunkerError::Yaml {
                origin: origin.to_string(),
                source,
            })?;
        Self::try_from(file)
    }

    /// The rule set shipped with the crate
    pub fn builtin() -> Vec<Result<Self>> {
        BUILTIN_CONFIGS
            .iter()
            .map(|(origin, yaml)| Self::from_yaml_str(yaml, origin))
            .collect()
    }

    /// Load every `*.yaml`/`*.yml` file in `dir`, sorted by file name.
    ///
    /// The outer error means the directory itself is unreadable; per-file failures are returned
    /// in place so the caller can skip them.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<Result<Self>>> {
        let dir = dir.as_ref();
        let config_source = |source| ChunkerError::ConfigSource {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(config_source)? {
            let path = entry.map_err(config_source)?.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml")
                });
            if is_yaml && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| {
                let origin = path.display().to_string();
                let yaml = std::fs::read_to_string(&path)?;
                Self::from_yaml_str(&yaml, &origin)
            })
            .collect())
    }

    /// Chunk level a node kind maps to, if any
    #[must_use]
    pub fn level_for(&self, kind: &str) -> Option<ChunkLevel> {
        if self.class_node_types.contains(kind) {
            Some(ChunkLevel::Class)
        } else if self.method_node_types.contains(kind) {
            Some(ChunkLevel::Method)
        } else if self.block_node_types.contains(kind) {
            Some(ChunkLevel::Block)
        } else {
            None
        }
    }

    /// Whether a node kind is mapped to any chunk level
    #[must_use]
    pub fn is_chunk_kind(&self, kind: &str) -> bool {
        self.level_for(kind).is_some()
    }

    #[must_use]
    pub fn is_doc_comment(&self, kind: &str) -> bool {
        self.doc_comment_node_types.contains(kind)
    }

    #[must_use]
    pub fn is_doc_skippable(&self, kind: &str) -> bool {
        self.doc_skip_node_types.contains(kind)
    }

    /// Normalize an extension for lookup: lowercase with a leading dot
    #[must_use]
    pub fn normalize_extension(ext: &str) -> String {
        let ext = ext.trim().to_lowercase();
        if ext.starts_with('.') {
            ext
        } else {
            format!(".{ext}")
        }
    }
}

impl TryFrom<LanguageConfigFile> for LanguageConfig {
    type Error = ChunkerError;

    fn try_from(file: LanguageConfigFile) -> Result<Self> {
        let language_id = file.language.trim().to_string();
        if language_id.is_empty() {
            return Err(ChunkerError::validation("<unnamed>", "'language' is required"));
        }
        let invalid = |reason: String| ChunkerError::validation(language_id.clone(), reason);

        if file.extensions.is_empty() {
            return Err(invalid("'extensions' must not be empty".to_string()));
        }
        let mut extensions = BTreeSet::new();
        for raw in &file.extensions {
            let ext = raw.trim().to_lowercase();
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(invalid(format!("extension '{raw}' must start with '.'")));
            }
            extensions.insert(ext);
        }

        let grammar_id = file.tree_sitter.grammar.trim().to_string();
        if grammar_id.is_empty() {
            return Err(invalid("'tree_sitter.grammar' is required".to_string()));
        }

        let class_node_types = node_set(&file.chunk_mappings.class);
        let method_node_types = node_set(&file.chunk_mappings.method);
        let block_node_types = node_set(&file.chunk_mappings.block);
        let overlapping = class_node_types
            .intersection(&method_node_types)
            .chain(class_node_types.intersection(&block_node_types))
            .chain(method_node_types.intersection(&block_node_types))
            .next();
        if let Some(kind) = overlapping {
            return Err(invalid(format!(
                "node type '{kind}' is mapped to more than one chunk level"
            )));
        }
        if class_node_types.is_empty() && method_node_types.is_empty() {
            log::warn!(
                "Language '{language_id}' maps no class or method node types; only file chunks will be produced"
            );
        }

        let doc_comment_position = file
            .extraction
            .doc_comment_position
            .as_deref()
            .map(DocCommentPosition::from_str)
            .transpose()
            .map_err(invalid)?;

        let name_field = file
            .extraction
            .name_field
            .map(|field| field.trim().to_string())
            .filter(|field| !field.is_empty())
            .unwrap_or_else(|| DEFAULT_NAME_FIELD.to_string());

        Ok(Self {
            display_name: file
                .display_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| language_id.clone()),
            language_id,
            extensions,
            grammar_id,
            class_node_types,
            method_node_types,
            block_node_types,
            name_field,
            doc_comment_node_types: node_set(&file.extraction.doc_comments),
            doc_comment_position,
            doc_skip_node_types: node_set(&file.extraction.doc_comment_skip),
        })
    }
}

fn node_set(kinds: &[String]) -> HashSet<String> {
    kinds
        .iter()
        .map(|kind| kind.trim())
        .filter(|kind| !kind.is_empty())
        .map(str::to_string)
        .collect()
}

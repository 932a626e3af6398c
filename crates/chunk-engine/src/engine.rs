use crate::chunker::ChunkContext;
use crate::error::{CancelStage, ChunkerError};
use crate::language_config::{DocCommentPosition, LanguageConfig};
use crate::special_forms::{node_text, Expansion, FormContext, SpecialForm};
use crate::types::{Chunk, ChunkLevel, ChunkResult, SourceFile};
use std::sync::Arc;
use tree_sitter::{Node, Tree};

/// How deep below a node the name search may look
const MAX_NAME_SEARCH_DEPTH: usize = 2;

/// Data-driven AST walker: turns a parsed tree into a parent-linked chunk forest.
///
/// One engine serves every language; behavior comes from the [`LanguageConfig`] sets and the
/// grammar's special-form hooks.
#[derive(Debug, Clone)]
pub struct ExtractionEngine {
    config: Arc<LanguageConfig>,
    special_forms: Arc<[Arc<dyn SpecialForm>]>,
}

/// Pending unit of work with the index of its scope chunk
struct Frame<'t> {
    work: Expansion<'t>,
    scope: usize,
}

impl ExtractionEngine {
    pub fn new(config: Arc<LanguageConfig>, special_forms: Arc<[Arc<dyn SpecialForm>]>) -> Self {
        Self {
            config,
            special_forms,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LanguageConfig {
        &self.config
    }

    /// Walk `tree` (parsed from `file.content`) and emit chunks in pre-order.
    ///
    /// Empty input yields no chunks at all. Cancellation observed mid-walk stops the walk and
    /// marks the result `truncated`.
    pub fn extract(&self, tree: &Tree, file: &SourceFile, ctx: &ChunkContext) -> ChunkResult {
        let mut result = ChunkResult::new(file.display_path(), &self.config.language_id);
        if file.content.is_empty() {
            return result;
        }

        let source = file.content.as_slice();
        let root = tree.root_node();
        if root.has_error() {
            log::debug!(
                "{}: syntax errors present, extracting from recovered tree",
                result.source_file
            );
        }

        let file_chunk = Chunk::from_source_bytes(
            result.source_file.clone(),
            ChunkLevel::File,
            file.file_name(),
            &self.config.language_id,
            1,
            file.line_count(),
            source,
        )
        .with_last_modified(file.last_modified);
        result.chunks.push(file_chunk);

        let cx = FormContext {
            source,
            config: &self.config,
        };
        let mut stack = vec![Frame {
            work: Expansion::Classify(root),
            scope: 0,
        }];

        while let Some(Frame { work, scope }) = stack.pop() {
            if ctx.is_cancelled() {
                log::warn!(
                    "{}: cancelled mid-walk, returning {} chunks",
                    result.source_file,
                    result.chunks.len()
                );
                result.truncated = true;
                result.non_fatal_errors.push(ChunkerError::Cancelled {
                    stage: CancelStage::DuringWalk,
                });
                break;
            }

            let mut pending = Vec::new();
            match work {
                Expansion::Classify(node) => {
                    self.classify(node, scope, &cx, file, &mut result, &mut pending);
                }
                Expansion::Declare {
                    node,
                    name,
                    level,
                    members,
                } => {
                    let index = self.emit(node, name, level, scope, &cx, file, &mut result);
                    if let Some(members) = members.filter(|_| level.is_container()) {
                        push_children(members, index, &mut pending);
                    }
                }
            }
            // Reverse so that the first sibling is popped first.
            stack.extend(pending.into_iter().rev());
        }

        result
    }

    fn classify<'t>(
        &self,
        node: Node<'t>,
        scope: usize,
        cx: &FormContext<'_>,
        file: &SourceFile,
        result: &mut ChunkResult,
        pending: &mut Vec<Frame<'t>>,
    ) {
        let kind = node.kind();

        if let Some(expansions) = self
            .special_forms
            .iter()
            .filter(|form| form.applies_to(kind))
            .find_map(|form| form.expand(node, cx))
        {
            pending.extend(expansions.into_iter().map(|work| Frame { work, scope }));
            return;
        }

        let Some(level) = self.config.level_for(kind) else {
            push_children(node, scope, pending);
            return;
        };

        match (level, self.resolve_name(node, cx)) {
            (ChunkLevel::Method, Some(name)) => {
                // Bodies are never walked: nested closures and local functions stay inside.
                self.emit(node, name, level, scope, cx, file, result);
            }
            (ChunkLevel::Method, None) => {}
            (_, Some(name)) => {
                let index = self.emit(node, name, level, scope, cx, file, result);
                push_children(node, index, pending);
            }
            (ChunkLevel::Block, None) => {
                let index = self.emit(node, kind.to_string(), level, scope, cx, file, result);
                push_children(node, index, pending);
            }
            (_, None) => push_children(node, scope, pending),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        node: Node<'_>,
        name: String,
        level: ChunkLevel,
        scope: usize,
        cx: &FormContext<'_>,
        file: &SourceFile,
        result: &mut ChunkResult,
    ) -> usize {
        let (start_line, end_line) = line_span(node);
        let parent_id = result.chunks[scope].id.clone();

        let chunk = Chunk::from_source_bytes(
            result.source_file.clone(),
            level,
            name,
            &self.config.language_id,
            start_line,
            end_line,
            &cx.source[node.byte_range()],
        )
        .with_parent(parent_id)
        .with_documentation(self.documentation(node, cx))
        .with_last_modified(file.last_modified);

        result.chunks.push(chunk);
        result.chunks.len() - 1
    }

    /// Configured name field, then grammar hooks, then a shallow search of the node's header.
    fn resolve_name(&self, node: Node<'_>, cx: &FormContext<'_>) -> Option<String> {
        if let Some(name) = cx.field_name(node) {
            return Some(name);
        }

        let kind = node.kind();
        if let Some(name) = self
            .special_forms
            .iter()
            .filter(|form| form.applies_to(kind))
            .find_map(|form| form.resolve_name(node, cx))
        {
            return Some(name);
        }

        self.search_descendant_name(node, cx)
    }

    /// Pre-order search below `node` for a node carrying the name field.
    ///
    /// Names live in declaration headers, so member lists, bodies, and nested chunk kinds are not
    /// searched.
    fn search_descendant_name(&self, node: Node<'_>, cx: &FormContext<'_>) -> Option<String> {
        let mut stack: Vec<(Node<'_>, usize)> = named_children(node)
            .into_iter()
            .rev()
            .map(|child| (child, 1))
            .collect();

        while let Some((current, depth)) = stack.pop() {
            let kind = current.kind();
            if self.config.is_chunk_kind(kind) || is_member_container(kind) {
                continue;
            }
            if let Some(name) = cx.field_name(current) {
                return Some(name);
            }
            if depth < MAX_NAME_SEARCH_DEPTH {
                stack.extend(
                    named_children(current)
                        .into_iter()
                        .rev()
                        .map(|child| (child, depth + 1)),
                );
            }
        }

        None
    }

    fn documentation(&self, node: Node<'_>, cx: &FormContext<'_>) -> Option<String> {
        let position = self.config.doc_comment_position?;
        if self.config.doc_comment_node_types.is_empty() {
            return None;
        }

        let config = &self.config;
        let nodes: Vec<Node<'_>> = match position {
            DocCommentPosition::PrecedingSiblings => {
                let mut found = Vec::new();
                let mut next_row = node.start_position().row;
                let mut sibling = node.prev_named_sibling();
                while let Some(current) = sibling {
                    let is_doc = config.is_doc_comment(current.kind());
                    if !is_doc && !config.is_doc_skippable(current.kind()) {
                        break;
                    }
                    // Only comments directly above, no blank line in between.
                    if last_row(current) + 1 < next_row {
                        break;
                    }
                    next_row = current.start_position().row;
                    if is_doc {
                        found.push(current);
                    }
                    sibling = current.prev_named_sibling();
                }
                found.reverse();
                found
            }
            DocCommentPosition::FollowingSiblings => {
                let mut found = Vec::new();
                let mut prev_row = last_row(node);
                let mut sibling = node.next_named_sibling();
                while let Some(current) = sibling.filter(|s| config.is_doc_comment(s.kind())) {
                    if current.start_position().row > prev_row + 1 {
                        break;
                    }
                    prev_row = last_row(current);
                    found.push(current);
                    sibling = current.next_named_sibling();
                }
                found
            }
            DocCommentPosition::FirstChild => {
                let container = node.child_by_field_name("body").unwrap_or(node);
                first_doc_child(container, config).into_iter().collect()
            }
            DocCommentPosition::ParentFirstChild => node
                .parent()
                .and_then(|parent| {
                    let doc = first_doc_child(parent, config)?;
                    let leads = named_children(parent).into_iter().find(|child| {
                        let after_doc = child.start_byte() >= doc.end_byte();
                        after_doc && !config.is_doc_comment(child.kind())
                    })?;
                    (leads.id() == node.id()).then_some(doc)
                })
                .into_iter()
                .collect(),
        };

        let text: Vec<String> = nodes
            .into_iter()
            .filter_map(|n| node_text(n, cx.source))
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text.join("\n"))
        }
    }
}

/// First named child if it is a doc node, looking through a wrapper that spans exactly one doc
/// node (a Python docstring is `expression_statement > string`).
fn first_doc_child<'t>(container: Node<'t>, config: &LanguageConfig) -> Option<Node<'t>> {
    let first = container.named_child(0)?;
    if config.is_doc_comment(first.kind()) {
        return Some(first);
    }
    let inner = first.named_child(0)?;
    let wraps_exactly = first.named_child_count() == 1 && inner.byte_range() == first.byte_range();
    if wraps_exactly && config.is_doc_comment(inner.kind()) {
        Some(inner)
    } else {
        None
    }
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn push_children<'t>(node: Node<'t>, scope: usize, pending: &mut Vec<Frame<'t>>) {
    pending.extend(named_children(node).into_iter().map(|child| Frame {
        work: Expansion::Classify(child),
        scope,
    }));
}

fn is_member_container(kind: &str) -> bool {
    kind.ends_with("_list") || kind.ends_with("body") || kind == "block"
}

/// Last row holding text of `node`; tokens that swallow their newline end at column 0 below.
fn last_row(node: Node<'_>) -> usize {
    let end = node.end_position();
    if end.column == 0 && end.row > node.start_position().row {
        end.row - 1
    } else {
        end.row
    }
}

/// 1-indexed inclusive line span. A node ending at column 0 ends on the previous line.
fn line_span(node: Node<'_>) -> (usize, usize) {
    (node.start_position().row + 1, last_row(node) + 1)
}

//! Grammar constructs that need more than set-membership classification.
//!
//! Each hook is registered per grammar in the [`GrammarRegistry`](crate::GrammarRegistry) and
//! consulted before the class/method/block sets. The set is open: callers can register their own
//! [`SpecialForm`] implementations alongside the built-in ones.

use crate::language_config::LanguageConfig;
use crate::types::ChunkLevel;
use tree_sitter::Node;

/// What the engine should do with a node a hook has taken over
#[derive(Debug, Clone)]
pub enum Expansion<'t> {
    /// Run normal classification on `node`, in the current scope
    Classify(Node<'t>),
    /// Emit a chunk spanning `node` with a name the hook resolved itself.
    ///
    /// When `members` is set and the level is a container, the named children of `members` are
    /// walked with the new chunk as their scope.
    Declare {
        node: Node<'t>,
        name: String,
        level: ChunkLevel,
        members: Option<Node<'t>>,
    },
}

/// Inputs a hook may consult
pub struct FormContext<'a> {
    pub source: &'a [u8],
    pub config: &'a LanguageConfig,
}

impl FormContext<'_> {
    /// Source text of a node, `None` for empty or invalid UTF-8 spans
    #[must_use]
    pub fn text(&self, node: Node<'_>) -> Option<String> {
        node_text(node, self.source)
    }

    /// Text of the configured name field of `node`
    #[must_use]
    pub fn field_name(&self, node: Node<'_>) -> Option<String> {
        node.child_by_field_name(&self.config.name_field)
            .and_then(|name| self.text(name))
    }
}

/// A per-grammar special-form hook
pub trait SpecialForm: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Whether this hook wants to look at nodes of `kind`
    fn applies_to(&self, kind: &str) -> bool;

    /// Expand a node. `None` hands the node back to normal classification.
    fn expand<'t>(&self, node: Node<'t>, cx: &FormContext<'_>) -> Option<Vec<Expansion<'t>>>;

    /// Resolve a name for a node whose configured name field is absent
    fn resolve_name(&self, _node: Node<'_>, _cx: &FormContext<'_>) -> Option<String> {
        None
    }
}

impl std::fmt::Debug for dyn SpecialForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn node_text(node: Node<'_>, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Grouped declarations, e.g. Go `type ( A struct{}; B interface{} )`.
///
/// Each type spec whose `type_field` child is a configured class kind becomes its own class chunk
/// with the type spec's own span and name; the wrapper itself never becomes a chunk.
#[derive(Debug, Clone)]
pub struct MultiSpecUnwrap {
    wrapper: String,
    type_field: String,
}

impl MultiSpecUnwrap {
    pub fn new(wrapper: impl Into<String>, type_field: impl Into<String>) -> Self {
        Self {
            wrapper: wrapper.into(),
            type_field: type_field.into(),
        }
    }
}

impl SpecialForm for MultiSpecUnwrap {
    fn name(&self) -> &'static str {
        "multi_spec_unwrap"
    }

    fn applies_to(&self, kind: &str) -> bool {
        kind == self.wrapper
    }

    fn expand<'t>(&self, node: Node<'t>, cx: &FormContext<'_>) -> Option<Vec<Expansion<'t>>> {
        let mut out = Vec::new();
        for spec in named_children(node) {
            let is_class = spec
                .child_by_field_name(&self.type_field)
                .is_some_and(|ty| cx.config.class_node_types.contains(ty.kind()));
            if !is_class {
                continue;
            }
            if let Some(name) = cx.field_name(spec) {
                out.push(Expansion::Declare {
                    node: spec,
                    name,
                    level: ChunkLevel::Class,
                    members: None,
                });
            }
        }
        Some(out)
    }
}

/// A declaration wrapped by its decorators, e.g. Python `decorated_definition`.
///
/// The wrapped declaration is classified in place; decorators are never chunked.
#[derive(Debug, Clone)]
pub struct DecoratedUnwrap {
    wrapper: String,
    field: String,
}

impl DecoratedUnwrap {
    pub fn new(wrapper: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            wrapper: wrapper.into(),
            field: field.into(),
        }
    }
}

impl SpecialForm for DecoratedUnwrap {
    fn name(&self) -> &'static str {
        "decorated_unwrap"
    }

    fn applies_to(&self, kind: &str) -> bool {
        kind == self.wrapper
    }

    fn expand<'t>(&self, node: Node<'t>, _cx: &FormContext<'_>) -> Option<Vec<Expansion<'t>>> {
        let inner = node.child_by_field_name(&self.field)?;
        Some(vec![Expansion::Classify(inner)])
    }
}

/// `export <declaration>` in JavaScript and TypeScript
#[derive(Debug, Clone)]
pub struct ExportUnwrap {
    wrapper: String,
    field: String,
}

impl ExportUnwrap {
    pub fn new(wrapper: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            wrapper: wrapper.into(),
            field: field.into(),
        }
    }
}

impl SpecialForm for ExportUnwrap {
    fn name(&self) -> &'static str {
        "export_unwrap"
    }

    fn applies_to(&self, kind: &str) -> bool {
        kind == self.wrapper
    }

    fn expand<'t>(&self, node: Node<'t>, _cx: &FormContext<'_>) -> Option<Vec<Expansion<'t>>> {
        let declaration = node.child_by_field_name(&self.field)?;
        Some(vec![Expansion::Classify(declaration)])
    }
}

/// Variable declarations whose value is a function or class, e.g. `const add = (a, b) => a + b;`
#[derive(Debug, Clone)]
pub struct AssignmentDeclaration {
    declarations: Vec<String>,
    declarator: String,
    value_field: String,
    function_values: Vec<String>,
    class_values: Vec<String>,
}

impl AssignmentDeclaration {
    /// Rules shared by the JavaScript and TypeScript grammars
    #[must_use]
    pub fn ecmascript() -> Self {
        Self {
            declarations: vec![
                "lexical_declaration".to_string(),
                "variable_declaration".to_string(),
            ],
            declarator: "variable_declarator".to_string(),
            value_field: "value".to_string(),
            function_values: vec![
                "arrow_function".to_string(),
                "function_expression".to_string(),
                "function".to_string(),
                "generator_function".to_string(),
            ],
            class_values: vec!["class".to_string()],
        }
    }
}

impl SpecialForm for AssignmentDeclaration {
    fn name(&self) -> &'static str {
        "assignment_declaration"
    }

    fn applies_to(&self, kind: &str) -> bool {
        self.declarations.iter().any(|k| k == kind)
    }

    fn expand<'t>(&self, node: Node<'t>, cx: &FormContext<'_>) -> Option<Vec<Expansion<'t>>> {
        let declarators: Vec<_> = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == self.declarator)
            .collect();
        let single = declarators.len() == 1;

        let mut out = Vec::new();
        for declarator in declarators {
            let Some(value) = declarator.child_by_field_name(&self.value_field) else {
                continue;
            };
            let value_kind = value.kind();
            let (level, members) = if self.function_values.iter().any(|k| k == value_kind) {
                (ChunkLevel::Method, None)
            } else if self.class_values.iter().any(|k| k == value_kind) {
                (ChunkLevel::Class, value.child_by_field_name("body"))
            } else {
                continue;
            };
            let Some(name) = cx.field_name(declarator) else {
                continue;
            };
            out.push(Expansion::Declare {
                node: if single { node } else { declarator },
                name,
                level,
                members,
            });
        }

        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

/// Rust `impl` blocks, named after the implemented type
#[derive(Debug, Clone, Default)]
pub struct ImplTargetName;

impl SpecialForm for ImplTargetName {
    fn name(&self) -> &'static str {
        "impl_target_name"
    }

    fn applies_to(&self, kind: &str) -> bool {
        kind == "impl_item"
    }

    fn expand<'t>(&self, _node: Node<'t>, _cx: &FormContext<'_>) -> Option<Vec<Expansion<'t>>> {
        None
    }

    fn resolve_name(&self, node: Node<'_>, cx: &FormContext<'_>) -> Option<String> {
        let mut target = node.child_by_field_name("type")?;
        loop {
            let inner = match target.kind() {
                // impl<T> Wrapper<T>
                "generic_type" => target.child_by_field_name("type"),
                // impl io::Point
                "scoped_type_identifier" => target.child_by_field_name("name"),
                // impl Trait for &'a Point, *const Point
                "reference_type" | "pointer_type" => target.child_by_field_name("type"),
                _ => None,
            };
            match inner {
                Some(inner) => target = inner,
                None => return cx.text(target),
            }
        }
    }
}

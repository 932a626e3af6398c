use crate::special_forms::{
    AssignmentDeclaration, DecoratedUnwrap, ExportUnwrap, ImplTargetName, MultiSpecUnwrap,
    SpecialForm,
};
use std::collections::HashMap;
use std::sync::Arc;

/// A parsing engine plus the special-form hooks that go with its node vocabulary
#[derive(Clone)]
pub struct Grammar {
    id: String,
    language: tree_sitter::Language,
    special_forms: Arc<[Arc<dyn SpecialForm>]>,
}

impl Grammar {
    pub fn new(
        id: impl Into<String>,
        language: tree_sitter::Language,
        special_forms: Vec<Arc<dyn SpecialForm>>,
    ) -> Self {
        Self {
            id: id.into(),
            language,
            special_forms: special_forms.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get Tree-sitter language instance
    #[must_use]
    pub fn language(&self) -> &tree_sitter::Language {
        &self.language
    }

    #[must_use]
    pub fn special_forms(&self) -> Arc<[Arc<dyn SpecialForm>]> {
        Arc::clone(&self.special_forms)
    }
}

impl std::fmt::Debug for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar")
            .field("id", &self.id)
            .field("special_forms", &self.special_forms)
            .finish_non_exhaustive()
    }
}

/// Maps grammar identifiers to parsing engines
#[derive(Debug, Clone, Default)]
pub struct GrammarRegistry {
    grammars: HashMap<String, Grammar>,
}

impl GrammarRegistry {
    /// Registry with no grammars
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every grammar compiled into the crate, with its hooks
    #[must_use]
    pub fn builtin() -> Self {
        let ecmascript = || -> Vec<Arc<dyn SpecialForm>> {
            vec![
                Arc::new(ExportUnwrap::new("export_statement", "declaration")),
                Arc::new(AssignmentDeclaration::ecmascript()),
            ]
        };

        let mut registry = Self::empty();
        registry.register(
            "rust",
            tree_sitter_rust::LANGUAGE.into(),
            vec![Arc::new(ImplTargetName)],
        );
        registry.register(
            "python",
            tree_sitter_python::LANGUAGE.into(),
            vec![Arc::new(DecoratedUnwrap::new(
                "decorated_definition",
                "definition",
            ))],
        );
        registry.register("javascript", tree_sitter_javascript::LANGUAGE.into(), ecmascript());
        registry.register(
            "typescript",
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            ecmascript(),
        );
        registry.register("tsx", tree_sitter_typescript::LANGUAGE_TSX.into(), ecmascript());
        registry.register(
            "go",
            tree_sitter_go::LANGUAGE.into(),
            vec![Arc::new(MultiSpecUnwrap::new("type_declaration", "type"))],
        );
        registry.register("java", tree_sitter_java::LANGUAGE.into(), Vec::new());
        registry.register("c_sharp", tree_sitter_c_sharp::LANGUAGE.into(), Vec::new());
        registry
    }

    /// Register (or replace) a grammar
    pub fn register(
        &mut self,
        id: impl Into<String>,
        language: tree_sitter::Language,
        special_forms: Vec<Arc<dyn SpecialForm>>,
    ) -> &mut Self {
        let id = id.into();
        if self.grammars.contains_key(&id) {
            log::debug!("Replacing grammar '{id}'");
        }
        self.grammars
            .insert(id.clone(), Grammar::new(id, language, special_forms));
        self
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Grammar> {
        self.grammars.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.grammars.contains_key(id)
    }

    /// Registered grammar ids, sorted
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.grammars.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

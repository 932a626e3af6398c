use context_chunk_engine::{
    ChunkContext, ChunkLevel, ChunkResult, Chunker, ChunkerRegistry, FallbackChunker, SourceFile,
};
use pretty_assertions::assert_eq;

fn chunk(path: &str, code: &str) -> ChunkResult {
    ChunkerRegistry::builtin()
        .expect("builtin registry")
        .chunk(&ChunkContext::new(), &SourceFile::new(path, code))
        .expect("chunking failed")
}

/// (level, name, parent name) per chunk, in emission order
fn outline(result: &ChunkResult) -> Vec<(ChunkLevel, &str, Option<&str>)> {
    result
        .chunks
        .iter()
        .map(|c| {
            let parent = c
                .parent_id
                .as_deref()
                .map(|id| result.get(id).expect("parent present").name.as_str());
            (c.level, c.name.as_str(), parent)
        })
        .collect()
}

/// Structural properties every result must satisfy
fn assert_well_formed(result: &ChunkResult, source: &str) {
    let roots: Vec<_> = result.chunks.iter().filter(|c| c.parent_id.is_none()).collect();
    assert_eq!(roots.len(), 1, "exactly one root");
    assert_eq!(roots[0].level, ChunkLevel::File);
    assert_eq!(result.chunks[0].level, ChunkLevel::File);

    let line_count = source.lines().count().max(1);
    for (index, chunk) in result.chunks.iter().enumerate() {
        assert!(chunk.start_line >= 1 && chunk.start_line <= chunk.end_line);
        assert!(chunk.end_line <= line_count, "{} ends past the file", chunk.name);
        if let Some(parent) = chunk.parent_id.as_deref() {
            let parent_index = result
                .chunks
                .iter()
                .position(|c| c.id == parent)
                .expect("parent present");
            assert!(parent_index < index, "parent precedes child");
        }
        if chunk.level != ChunkLevel::File {
            assert!(source.contains(&chunk.content), "{} content is source text", chunk.name);
        }
    }
}

#[test]
fn namespaced_csharp_class() {
    let code = r"namespace Demo
{
    public class Calculator
    {
        public int Add(int a, int b)
        {
            return a + b;
        }
    }
}
";
    let result = chunk("Calculator.cs", code);
    assert_eq!(
        outline(&result),
        vec![
            (ChunkLevel::File, "Calculator.cs", None),
            (ChunkLevel::Class, "Calculator", Some("Calculator.cs")),
            (ChunkLevel::Method, "Add", Some("Calculator")),
        ]
    );
    assert_eq!(result.language, "csharp");
    let add = &result.chunks[2];
    assert_eq!((add.start_line, add.end_line), (5, 8));
    assert_eq!(add.signature, "public int Add(int a, int b)");
    assert_well_formed(&result, code);
}

#[test]
fn sibling_python_classes() {
    let code = r#"class Reader:
    def read(self):
        return 1


class Writer:
    """Writes things."""

    def write(self, value):
        print(value)
"#;
    let result = chunk("io.py", code);
    assert_eq!(
        outline(&result),
        vec![
            (ChunkLevel::File, "io.py", None),
            (ChunkLevel::Class, "Reader", Some("io.py")),
            (ChunkLevel::Method, "read", Some("Reader")),
            (ChunkLevel::Class, "Writer", Some("io.py")),
            (ChunkLevel::Method, "write", Some("Writer")),
        ]
    );
    assert_eq!(
        result.chunks[3].documentation.as_deref(),
        Some(r#""""Writes things.""""#)
    );
    assert_well_formed(&result, code);
}

#[test]
fn python_module_with_function_and_class() {
    let code = r"import os


def helper(path):
    return os.path.basename(path)


class Service:
    def run(self):
        return helper('x')
";
    let result = chunk("service.py", code);
    assert_eq!(
        outline(&result),
        vec![
            (ChunkLevel::File, "service.py", None),
            (ChunkLevel::Method, "helper", Some("service.py")),
            (ChunkLevel::Class, "Service", Some("service.py")),
            (ChunkLevel::Method, "run", Some("Service")),
        ]
    );
    let stats = result.stats();
    assert_eq!((stats.class_chunks, stats.method_chunks), (1, 2));
    assert_well_formed(&result, code);
}

#[test]
fn empty_input_policies_differ() {
    let registry = ChunkerRegistry::builtin().unwrap();
    let ctx = ChunkContext::new();

    let engine = registry.chunk(&ctx, &SourceFile::new("empty.py", "")).unwrap();
    assert!(engine.chunks.is_empty());

    let fallback = FallbackChunker
        .chunk(&ctx, &SourceFile::new("empty.py", ""))
        .unwrap();
    assert_eq!(fallback.chunks.len(), 1);
    assert_eq!(fallback.chunks[0].content, "");
}

#[test]
fn go_grouped_type_declaration() {
    let code = r"package shapes

type (
	Point struct {
		X, Y int
	}
	Shape interface {
		Area() float64
	}
	Meters float64
)

func (p Point) Area() float64 {
	return 0
}
";
    let result = chunk("shapes.go", code);
    assert_eq!(
        outline(&result),
        vec![
            (ChunkLevel::File, "shapes.go", None),
            (ChunkLevel::Class, "Point", Some("shapes.go")),
            (ChunkLevel::Class, "Shape", Some("shapes.go")),
            (ChunkLevel::Method, "Area", Some("shapes.go")),
        ]
    );
    let point = &result.chunks[1];
    assert_eq!((point.start_line, point.end_line), (4, 6));
    assert!(point.content.starts_with("Point struct"));
    assert_well_formed(&result, code);
}

#[test]
fn python_decorators_are_transparent() {
    let code = r"@dataclass
class Config:
    @property
    def name(self):
        return 'x'

    @staticmethod
    @cache
    def build():
        return Config()
";
    let result = chunk("config.py", code);
    assert_eq!(
        outline(&result),
        vec![
            (ChunkLevel::File, "config.py", None),
            (ChunkLevel::Class, "Config", Some("config.py")),
            (ChunkLevel::Method, "name", Some("Config")),
            (ChunkLevel::Method, "build", Some("Config")),
        ]
    );
    // The span is the definition, not the decorators.
    assert_eq!(result.chunks[1].start_line, 2);
    assert!(result.chunks[2].content.starts_with("def name"));
    assert_well_formed(&result, code);
}

#[test]
fn javascript_exports_and_assignments() {
    let code = r"export class Store {
  get(key) {
    return this.items[key];
  }
}

export const add = (a, b) => a + b;

const Widget = class {
  render() {}
};

const limit = 10;

function main() {
  const inner = () => 1;
  return inner();
}
";
    let result = chunk("store.js", code);
    assert_eq!(
        outline(&result),
        vec![
            (ChunkLevel::File, "store.js", None),
            (ChunkLevel::Class, "Store", Some("store.js")),
            (ChunkLevel::Method, "get", Some("Store")),
            (ChunkLevel::Method, "add", Some("store.js")),
            (ChunkLevel::Class, "Widget", Some("store.js")),
            (ChunkLevel::Method, "render", Some("Widget")),
            (ChunkLevel::Method, "main", Some("store.js")),
        ]
    );
    assert_eq!(result.chunks[3].content, "const add = (a, b) => a + b;");
    assert_well_formed(&result, code);
}

#[test]
fn typescript_interfaces_and_signatures() {
    let code = r"/** A repository. */
export interface Repo {
  find(id: string): Item;
}

export abstract class Base {
  abstract load(): void;
}
";
    let result = chunk("repo.ts", code);
    assert_eq!(
        outline(&result),
        vec![
            (ChunkLevel::File, "repo.ts", None),
            (ChunkLevel::Class, "Repo", Some("repo.ts")),
            (ChunkLevel::Method, "find", Some("Repo")),
            (ChunkLevel::Class, "Base", Some("repo.ts")),
            (ChunkLevel::Method, "load", Some("Base")),
        ]
    );
    assert_well_formed(&result, code);
}

#[test]
fn java_class_with_constructor_and_doc() {
    let code = r"package demo;

/** Counts things. */
public class Counter {
    private int n;

    public Counter() {
        n = 0;
    }

    public void inc() {
        n++;
    }
}
";
    let result = chunk("Counter.java", code);
    assert_eq!(
        outline(&result),
        vec![
            (ChunkLevel::File, "Counter.java", None),
            (ChunkLevel::Class, "Counter", Some("Counter.java")),
            (ChunkLevel::Method, "Counter", Some("Counter")),
            (ChunkLevel::Method, "inc", Some("Counter")),
        ]
    );
    assert_eq!(
        result.chunks[1].documentation.as_deref(),
        Some("/** Counts things. */")
    );
    assert_well_formed(&result, code);
}

#[test]
fn rust_traits_and_generic_impls() {
    let code = r"/// Something with an area.
pub trait Shape {
    fn area(&self) -> f64;
}

pub struct Square<T>(T);

impl<T: Into<f64> + Copy> Shape for Square<T> {
    fn area(&self) -> f64 {
        let side: f64 = self.0.into();
        let helper = |x: f64| x * x;
        helper(side)
    }
}
";
    let result = chunk("shape.rs", code);
    assert_eq!(
        outline(&result),
        vec![
            (ChunkLevel::File, "shape.rs", None),
            (ChunkLevel::Class, "Shape", Some("shape.rs")),
            (ChunkLevel::Method, "area", Some("Shape")),
            (ChunkLevel::Class, "Square", Some("shape.rs")),
            (ChunkLevel::Class, "Square", Some("shape.rs")),
            (ChunkLevel::Method, "area", Some("Square")),
        ]
    );
    assert_eq!(
        result.chunks[1].documentation.as_deref(),
        Some("/// Something with an area.")
    );
    let impl_method = &result.chunks[5];
    assert_eq!(impl_method.parent_id.as_deref(), Some(result.chunks[4].id.as_str()));
    assert_well_formed(&result, code);
}

#[test]
fn syntax_errors_are_not_fatal() {
    let code = "def ok():\n    return 1\n\ndef broken(:\n    pass\n";
    let result = chunk("broken.py", code);
    assert_eq!(result.chunks[0].level, ChunkLevel::File);
    assert!(result.chunks.iter().any(|c| c.name == "ok"));
    assert!(!result.truncated);
}

#[test]
fn chunking_is_deterministic() {
    let code = include_str!("../src/chunker.rs");
    let first = chunk("src/chunker.rs", code);
    let second = chunk("src/chunker.rs", code);

    let ids = |r: &ChunkResult| r.chunks.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
    let hashes =
        |r: &ChunkResult| r.chunks.iter().map(|c| c.content_hash.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(hashes(&first), hashes(&second));
    assert!(first.chunks.len() > 5);
}

#[test]
fn content_hash_is_path_independent() {
    let code = "class A:\n    def f(self):\n        pass\n";
    let left = chunk("left/a.py", code);
    let right = chunk("right/a.py", code);

    assert_eq!(left.chunks.len(), right.chunks.len());
    for (l, r) in left.chunks.iter().zip(&right.chunks) {
        assert_eq!(l.content_hash, r.content_hash);
        assert_ne!(l.id, r.id);
    }
}

#[test]
fn fallback_returns_input_verbatim() {
    let content = "plain text\r\nwith CRLF\n\n";
    let result = chunk("notes.unknownext", content);
    assert_eq!(result.language, "text");
    assert_eq!(result.chunks.len(), 1);
    assert_eq!(result.chunks[0].content, content);
}

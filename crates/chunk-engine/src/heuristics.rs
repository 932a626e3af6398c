//! Routing hints for files whose extension no configured language claims.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// `#!/usr/bin/env python3`, `#!/usr/bin/node`, `#!/usr/bin/env -S deno run`
static SHEBANG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#!\s*(?:\S*/)?(?:env\s+(?:-\S+\s+)*)?([A-Za-z][\w.+-]*)")
        .unwrap_or_else(|e| panic!("shebang pattern must compile: {e}"))
});

/// Guess a language id from an extension alias not found in the registry.
///
/// Ids match the built-in language configs; the caller must still check the id is loaded.
#[must_use]
pub fn language_from_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim_start_matches('.').to_lowercase();
    let language = match ext.as_str() {
        "rs" => "rust",
        "py" | "pyw" | "pyi" => "python",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "tsx",
        "go" => "go",
        "java" => "java",
        "cs" | "csx" => "csharp",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => "cpp",
        "rb" => "ruby",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        _ => return None,
    };
    Some(language)
}

/// Guess a language id from a `#!` line at the very start of the content
#[must_use]
pub fn language_from_shebang(content: &[u8]) -> Option<&'static str> {
    let first_line = content.split(|&b| b == b'\n').next()?;
    let first_line = std::str::from_utf8(first_line).ok()?;
    let interpreter = SHEBANG.captures(first_line)?.get(1)?.as_str();

    let language = match interpreter.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.') {
        "python" | "pypy" => "python",
        "node" | "nodejs" | "bun" => "javascript",
        "deno" | "ts-node" | "tsx" => "typescript",
        "ruby" => "ruby",
        _ => return None,
    };
    Some(language)
}

/// Extension alias first, then shebang
#[must_use]
pub fn detect_language(path: &Path, content: &[u8]) -> Option<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(language_from_extension)
        .or_else(|| language_from_shebang(content))
}

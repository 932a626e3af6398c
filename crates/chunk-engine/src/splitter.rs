//! Keeps chunks within an embedding token budget.
//!
//! Containers (file, class, block) are truncated at a line boundary with a marker. Methods are cut
//! into overlapping windows so no body text is lost. Inputs are never mutated; every derived
//! chunk gets its own identity and points back at the original through `split_parent_id`.

use crate::config::SplitterConfig;
use crate::error::Result;
use crate::types::{Chunk, ChunkLevel, ChunkResult};
use unicode_segmentation::UnicodeSegmentation;

/// Approximate token counting, supplied by the embedding side
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;

    /// Characters that roughly fit in `tokens`
    fn max_chars(&self, tokens: usize) -> usize {
        tokens.saturating_mul(4)
    }
}

/// About 4 characters per token, the usual figure for code
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        (text.chars().count() / 4).max(1)
    }
}

/// Applies the truncation and windowing policies
#[derive(Debug, Clone)]
pub struct Splitter<E = HeuristicEstimator> {
    config: SplitterConfig,
    estimator: E,
}

impl Splitter<HeuristicEstimator> {
    pub fn new(config: SplitterConfig) -> Result<Self> {
        Self::with_estimator(config, HeuristicEstimator)
    }
}

impl<E: TokenEstimator> Splitter<E> {
    /// Validates the config up front
    pub fn with_estimator(config: SplitterConfig, estimator: E) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, estimator })
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// File policy: suppressed above `max_file_bytes`, otherwise truncated to `budget`
    #[must_use]
    pub fn handle_file_chunk(
        &self,
        chunk: &Chunk,
        raw_byte_size: usize,
        budget: usize,
    ) -> Option<Chunk> {
        if raw_byte_size > self.config.max_file_bytes {
            log::trace!(
                "{}: {} bytes exceeds file chunk ceiling of {}",
                chunk.file_path,
                raw_byte_size,
                self.config.max_file_bytes
            );
            return None;
        }
        Some(self.truncate(chunk, budget))
    }

    /// Class policy: truncated to `budget`
    #[must_use]
    pub fn handle_class_chunk(&self, chunk: &Chunk, budget: usize) -> Chunk {
        self.truncate(chunk, budget)
    }

    /// Method policy: overlapping windows of whole lines.
    ///
    /// Window starts strictly increase, every window holds at least one line, and the last window
    /// ends on the original `end_line`.
    #[must_use]
    pub fn split_method(&self, chunk: &Chunk, budget: usize, overlap: usize) -> Vec<Chunk> {
        if self.estimator.estimate(&chunk.content) <= budget {
            return vec![chunk.clone()];
        }
        let lines: Vec<&str> = chunk.content.split_inclusive('\n').collect();
        if lines.is_empty() {
            return vec![chunk.clone()];
        }

        let tokens: Vec<usize> = lines.iter().map(|line| self.estimator.estimate(line)).collect();
        let target = budget
            .saturating_sub(overlap)
            .max(self.config.min_window_tokens)
            .max(1);

        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let mut end = start;
            let mut acc = 0;
            while end < lines.len() && (end == start || acc + tokens[end] <= target) {
                acc += tokens[end];
                end += 1;
            }

            let last = end == lines.len();
            let start_line = chunk.start_line + start;
            let end_line = if last {
                chunk.end_line
            } else {
                chunk.start_line + end - 1
            };
            log::trace!(
                "{}: window {} covers lines {start_line}..={end_line} (~{acc} tokens)",
                chunk.name,
                windows.len()
            );
            let content = lines[start..end].concat();
            windows.push(chunk.derive_part(start_line, end_line, content, windows.len()));
            if last {
                break;
            }

            // Walk back from the window end until the overlap is covered, staying past `start`.
            let mut next = end;
            let mut covered = 0;
            while next > start + 1 && covered < overlap {
                next -= 1;
                covered += tokens[next];
            }
            start = next;
        }
        windows
    }

    /// Run every chunk of a result through the policy for its level.
    ///
    /// Files take `token_budget`, classes and blocks `class_token_budget`, methods are windowed.
    ///
    /// `parent_id` is left as extracted. When a container was truncated its output chunk has a
    /// new id, so parents are resolved by matching either `id` or `split_parent_id`.
    #[must_use]
    pub fn split_result(&self, result: &ChunkResult, raw_byte_size: usize) -> Vec<Chunk> {
        let mut out = Vec::with_capacity(result.chunks.len());
        for chunk in &result.chunks {
            match chunk.level {
                ChunkLevel::File => out.extend(self.handle_file_chunk(
                    chunk,
                    raw_byte_size,
                    self.config.token_budget,
                )),
                ChunkLevel::Class | ChunkLevel::Block => {
                    out.push(self.handle_class_chunk(chunk, self.config.class_token_budget));
                }
                ChunkLevel::Method => out.extend(self.split_method(
                    chunk,
                    self.config.token_budget,
                    self.config.overlap_tokens,
                )),
            }
        }
        out
    }

    fn truncate(&self, chunk: &Chunk, budget: usize) -> Chunk {
        if self.estimator.estimate(&chunk.content) <= budget {
            return chunk.clone();
        }
        let max_chars = self.estimator.max_chars(budget);

        let mut kept_chars = 0;
        let mut kept_lines = 0;
        let mut prefix_len = 0;
        for line in chunk.content.split_inclusive('\n') {
            let chars = line.chars().count();
            if kept_chars + chars > max_chars {
                break;
            }
            kept_chars += chars;
            kept_lines += 1;
            prefix_len += line.len();
        }

        let mut content = if kept_lines > 0 {
            chunk.content[..prefix_len].to_string()
        } else {
            // Not even one line fits: cut the first line between graphemes.
            kept_lines = 1;
            cut_graphemes(&chunk.content, max_chars)
        };
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&self.config.truncation_marker);

        let end_line = chunk.start_line + kept_lines - 1;
        log::trace!(
            "{}: truncated to lines {}..={end_line}",
            chunk.name,
            chunk.start_line
        );
        chunk.derive_part(chunk.start_line, end_line, content, 0)
    }
}

/// Longest grapheme prefix within `max_chars` characters, at least one grapheme
fn cut_graphemes(text: &str, max_chars: usize) -> String {
    let mut out = String::new();
    let mut chars = 0;
    for grapheme in text.graphemes(true) {
        let len = grapheme.chars().count();
        if grapheme.contains('\n') || (!out.is_empty() && chars + len > max_chars) {
            break;
        }
        chars += len;
        out.push_str(grapheme);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Every line costs the same, so window arithmetic is exact
    struct PerLine(usize);

    impl TokenEstimator for PerLine {
        fn estimate(&self, text: &str) -> usize {
            text.lines().count().max(1) * self.0
        }

        fn max_chars(&self, tokens: usize) -> usize {
            tokens
        }
    }

    fn chunk(level: ChunkLevel, lines: usize, line_len: usize) -> Chunk {
        let content = (0..lines)
            .map(|i| format!("{:<width$}", format!("l{i}"), width = line_len))
            .collect::<Vec<_>>()
            .join("\n");
        Chunk::new("src/big.rs", level, "big", "rust", 10, 10 + lines - 1, content)
    }

    #[test]
    fn test_small_chunks_pass_through() {
        let splitter = Splitter::new(SplitterConfig::default()).unwrap();
        let method = chunk(ChunkLevel::Method, 3, 10);
        assert_eq!(splitter.split_method(&method, 512, 64), vec![method.clone()]);
        assert_eq!(splitter.handle_class_chunk(&method, 512), method.clone());
        assert_eq!(splitter.handle_file_chunk(&method, 30, 512), Some(method));
    }

    #[test]
    fn test_oversized_file_suppressed() {
        let config = SplitterConfig {
            max_file_bytes: 100,
            ..Default::default()
        };
        let splitter = Splitter::new(config).unwrap();
        let file = chunk(ChunkLevel::File, 2, 5);
        assert_eq!(splitter.handle_file_chunk(&file, 101, 512), None);
    }

    #[test]
    fn test_truncation_keeps_whole_lines() {
        let splitter = Splitter::new(SplitterConfig::default()).unwrap();
        // 40 lines of 39 chars + newline; budget 100 tokens -> 400 chars -> 10 lines.
        let class = chunk(ChunkLevel::Class, 40, 39);
        let truncated = splitter.handle_class_chunk(&class, 100);

        assert!(truncated.is_partial);
        assert_eq!(truncated.split_index, Some(0));
        assert_eq!(truncated.split_parent_id.as_deref(), Some(class.id.as_str()));
        assert_eq!((truncated.start_line, truncated.end_line), (10, 19));
        assert!(truncated.content.ends_with("\n... [truncated]"));
        assert_eq!(truncated.content.lines().count(), 11);
        assert_ne!(truncated.id, class.id);
    }

    #[test]
    fn test_truncation_cuts_single_long_line_on_grapheme() {
        let splitter = Splitter::new(SplitterConfig::default()).unwrap();
        let text = "e\u{301}".repeat(200);
        let class = Chunk::new("a.py", ChunkLevel::Class, "C", "python", 1, 1, text);
        // budget 10 -> 40 chars -> 20 two-char graphemes
        let truncated = splitter.handle_class_chunk(&class, 10);
        let kept = truncated.content.trim_end_matches("\n... [truncated]");
        assert_eq!(kept, "e\u{301}".repeat(20));
        assert_eq!((truncated.start_line, truncated.end_line), (1, 1));
    }

    #[test]
    fn test_method_windows_overlap() {
        let config = SplitterConfig {
            min_window_tokens: 1,
            ..Default::default()
        };
        let splitter = Splitter::with_estimator(config, PerLine(5)).unwrap();
        let method = chunk(ChunkLevel::Method, 1000, 8);
        let windows = splitter.split_method(&method, 500, 50);

        let starts: Vec<usize> = windows.iter().take(3).map(|w| w.start_line - 10).collect();
        assert_eq!(starts, vec![0, 80, 160]);
        assert_eq!(windows[0].line_count(), 90);
        assert_eq!(windows.last().unwrap().end_line, method.end_line);
        for (i, window) in windows.iter().enumerate() {
            assert_eq!(window.split_index, Some(i));
            assert!(window.is_partial);
            assert_eq!(window.signature, method.signature);
            assert!(!window.content.is_empty());
        }
    }

    #[test]
    fn test_window_always_advances_on_huge_lines() {
        let config = SplitterConfig {
            token_budget: 10,
            overlap_tokens: 5,
            min_window_tokens: 1,
            ..Default::default()
        };
        let splitter = Splitter::with_estimator(config, PerLine(100)).unwrap();
        let method = chunk(ChunkLevel::Method, 5, 4);
        let windows = splitter.split_method(&method, 10, 5);

        assert_eq!(windows.len(), 5);
        let starts: Vec<usize> = windows.iter().map(|w| w.start_line).collect();
        assert_eq!(starts, vec![10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_split_result_routes_by_level() {
        let config = SplitterConfig {
            token_budget: 20,
            overlap_tokens: 5,
            class_token_budget: 20,
            max_file_bytes: 10,
            min_window_tokens: 1,
            ..Default::default()
        };
        let splitter = Splitter::with_estimator(config, PerLine(5)).unwrap();
        let mut result = ChunkResult::new("src/big.rs", "rust");
        result.chunks.push(chunk(ChunkLevel::File, 12, 4));
        result.chunks.push(chunk(ChunkLevel::Class, 12, 4));
        result.chunks.push(chunk(ChunkLevel::Method, 12, 4));

        let out = splitter.split_result(&result, 60);
        let levels: Vec<ChunkLevel> = out.iter().map(|c| c.level).collect();
        assert_eq!(levels[0], ChunkLevel::Class);
        assert!(out[0].is_partial);
        assert!(levels[1..].iter().all(|&level| level == ChunkLevel::Method));
        assert!(out.len() > 2);
    }
}

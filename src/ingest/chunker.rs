//! Character chunking with sentence-boundary preference and overlap.

use tracing::debug;

/// Chunks below this size (in characters, after trimming) are discarded.
const MIN_CHUNK_CHARS: usize = 50;

/// Splits text into overlapping chunks for embedding.
///
/// Chunks target `chunk_size` characters, cut back to the nearest sentence
/// end when one falls in the latter half of the window, and carry `overlap`
/// characters into the next chunk.
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker; overlap is clamped below the chunk size.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    /// Split text into chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = trimmed.chars().collect();

        if chars.len() <= self.chunk_size {
            return if chars.len() >= MIN_CHUNK_CHARS {
                vec![trimmed.to_string()]
            } else {
                Vec::new()
            };
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let hard_end = (start + self.chunk_size).min(chars.len());

            let end = if hard_end < chars.len() {
                find_sentence_break(&chars, start, hard_end).unwrap_or(hard_end)
            } else {
                hard_end
            };

            let piece: String = chars[start..end].iter().collect();
            let piece = piece.trim();
            if piece.chars().count() >= MIN_CHUNK_CHARS {
                chunks.push(piece.to_string());
            }

            if end >= chars.len() {
                break;
            }

            // Overlap carries trailing context into the next chunk, but the
            // window must always move forward.
            start = (end.saturating_sub(self.overlap)).max(start + 1);
        }

        debug!("Split {} chars into {} chunks", chars.len(), chunks.len());
        chunks
    }
}

/// Find a cut point just after a sentence end in the latter half of the
/// window, scanning backwards from `hard_end`.
fn find_sentence_break(chars: &[char], start: usize, hard_end: usize) -> Option<usize> {
    let earliest = start + (hard_end - start) / 2;

    for i in (earliest..hard_end).rev() {
        let c = chars[i];
        if c == '\n' {
            return Some(i + 1);
        }
        if matches!(c, '.' | '!' | '?') {
            let next_is_space = chars.get(i + 1).map(|n| n.is_whitespace()).unwrap_or(true);
            if next_is_space {
                return Some(i + 1);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = TextChunker::new(800, 80);
        let text = "This single paragraph is comfortably below the chunk size limit.";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_empty_and_tiny_text_yield_nothing() {
        let chunker = TextChunker::new(800, 80);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n  ").is_empty());
        assert!(chunker.chunk("too short").is_empty());
    }

    #[test]
    fn test_long_text_splits_with_overlap() {
        let chunker = TextChunker::new(100, 20);
        let sentence = "The quick brown fox jumps over the lazy dog near the riverbank. ";
        let text = sentence.repeat(10);

        let chunks = chunker.chunk(&text);
        assert!(chunks.len() > 1);

        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
            assert!(chunk.chars().count() >= 50);
        }

        // Every chunk holds complete sentences thanks to the boundary search.
        for chunk in &chunks {
            assert!(chunk.ends_with('.'), "chunk did not end at a sentence: {chunk:?}");
        }
    }

    #[test]
    fn test_prefers_newline_breaks() {
        let chunker = TextChunker::new(120, 0);
        let text = format!(
            "{}\n{}",
            "First paragraph with enough words to pass the minimum size gate for chunks.",
            "Second paragraph also long enough to pass the minimum size gate for chunks."
        );

        let chunks = chunker.chunk(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("First paragraph"));
        assert!(chunks[1].starts_with("Second paragraph"));
    }

    #[test]
    fn test_handles_multibyte_text() {
        let chunker = TextChunker::new(60, 10);
        let text = "Fotosyntese skjer i grønne blader når sollys treffer dem. ".repeat(5);

        // Must not panic on non-ASCII input and must still cover the text.
        let chunks = chunker.chunk(&text);
        assert!(!chunks.is_empty());
    }
}

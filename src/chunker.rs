//! Page-text normalization and overlapping word-bounded chunking.
//!
//! Splits one page of extracted PDF text into [`ChunkRecord`]s. Chunks are
//! closed when the buffer reaches `max_chunk_chars`, passages shorter than
//! `min_chunk_chars` are discarded, and consecutive chunks share a tail of
//! `overlap_chars / 10` words so that phrases straddling a boundary remain
//! findable.
//!
//! Chunk ids are deterministic: `{document}_p{page}_c{seq}` with a
//! document-wide sequence, so re-ingesting the same bytes yields the same
//! ids.

use crate::config::ChunkingConfig;
use crate::models::ChunkRecord;

/// Normalizes raw page text before chunking.
///
/// Drops characters that are neither printable nor newline/tab, strips
/// standalone numeric lines (page-number artifacts), then collapses all
/// whitespace runs into single spaces and trims.
pub fn clean_page_text(raw: &str) -> String {
    let printable: String = raw
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    let without_page_numbers: Vec<&str> = printable
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit())
        })
        .collect();

    without_page_numbers
        .join("\n")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits cleaned page text into overlapping chunks.
///
/// `start_index` is the next free document-wide chunk index; returned chunks
/// carry contiguous indices from there. Returns an empty vector when the
/// page yields no passage longer than `min_chunk_chars`.
pub fn chunk_page(
    document_id: &str,
    page_number: i64,
    start_index: i64,
    text: &str,
    cfg: &ChunkingConfig,
) -> Vec<ChunkRecord> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let overlap_words = cfg.overlap_chars / 10;
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;
    let mut index = start_index;

    for (i, word) in words.iter().enumerate() {
        buf.push_str(word);
        buf.push(' ');
        buf_chars += word.chars().count() + 1;

        let at_end = i == words.len() - 1;
        if buf_chars >= cfg.max_chunk_chars || at_end {
            let chunk_text = buf.trim();
            if chunk_text.chars().count() > cfg.min_chunk_chars {
                let word_count = chunk_text.split_whitespace().count() as i64;
                chunks.push(ChunkRecord {
                    id: format!("{}_p{}_c{}", document_id, page_number, index),
                    document_id: document_id.to_string(),
                    text: chunk_text.to_string(),
                    page_number,
                    chunk_index: index,
                    word_count,
                });
                index += 1;

                if !at_end {
                    // Seed the next buffer with the closed chunk's tail
                    let tail: Vec<&str> = chunk_text.split_whitespace().collect();
                    let start = tail.len().saturating_sub(overlap_words);
                    let seed = tail[start..].join(" ");
                    buf_chars = seed.chars().count() + 1;
                    buf = seed;
                    buf.push(' ');
                }
            } else {
                buf.clear();
                buf_chars = 0;
            }
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ChunkingConfig {
        ChunkingConfig {
            max_chunk_chars: 1000,
            min_chunk_chars: 50,
            overlap_chars: 200,
        }
    }

    #[test]
    fn clean_collapses_whitespace_and_trims() {
        let cleaned = clean_page_text("  Hello \t world \n\n\n again  ");
        assert_eq!(cleaned, "Hello world again");
    }

    #[test]
    fn clean_strips_numeric_lines() {
        let cleaned = clean_page_text("Intro text\n42\nMore text\n 7 \nEnd");
        assert_eq!(cleaned, "Intro text More text End");
    }

    #[test]
    fn clean_drops_non_printable_characters() {
        let cleaned = clean_page_text("abc\u{0007}def\u{0000} ok");
        assert_eq!(cleaned, "abcdef ok");
    }

    #[test]
    fn short_page_yields_no_chunks() {
        let chunks = chunk_page("doc1", 1, 0, "too short to keep", &cfg());
        assert!(chunks.is_empty());
    }

    #[test]
    fn single_chunk_below_limit() {
        let text = "word ".repeat(30);
        let chunks = chunk_page("doc1", 1, 0, &text, &cfg());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].page_number, 1);
        assert_eq!(chunks[0].word_count, 30);
        assert_eq!(chunks[0].id, "doc1_p1_c0");
    }

    #[test]
    fn long_page_splits_with_overlap() {
        let text = (0..600).map(|i| format!("token{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = chunk_page("doc1", 2, 0, &text, &cfg());
        assert!(chunks.len() > 1);

        // Indices contiguous from start_index
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
        }

        // Each non-first chunk starts with the tail words of its predecessor
        let overlap = cfg().overlap_chars / 10;
        for pair in chunks.windows(2) {
            let prev_words: Vec<&str> = pair[0].text.split_whitespace().collect();
            let next_words: Vec<&str> = pair[1].text.split_whitespace().collect();
            let tail = &prev_words[prev_words.len() - overlap..];
            assert_eq!(&next_words[..overlap], tail);
        }
    }

    #[test]
    fn chunks_respect_max_size_roughly() {
        let text = "alpha ".repeat(2000);
        let chunks = chunk_page("doc1", 1, 0, &text, &cfg());
        for c in &chunks {
            // A chunk may overshoot by at most one word
            assert!(c.text.chars().count() <= cfg().max_chunk_chars + 10);
        }
    }

    #[test]
    fn start_index_continues_across_pages() {
        let text = "word ".repeat(30);
        let chunks = chunk_page("doc1", 3, 7, &text, &cfg());
        assert_eq!(chunks[0].chunk_index, 7);
        assert_eq!(chunks[0].id, "doc1_p3_c7");
    }

    #[test]
    fn deterministic() {
        let text = (0..500).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let a = chunk_page("doc1", 1, 0, &text, &cfg());
        let b = chunk_page("doc1", 1, 0, &text, &cfg());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.text, y.text);
        }
    }
}

//! Chunk ranking, context assembly, and source attribution.
//!
//! One ranking path serves both retrieval modes; the differences (top-N,
//! relevance floor, separator, context cap) live in [`RetrievalParams`]
//! presets built from the config.

use crate::config::RetrievalConfig;
use crate::models::{ChunkRecord, DocumentRecord, ScoredChunk, SourceScore};
use crate::score::score_chunk;

/// Parameters for one context-assembly pass.
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    pub top_n: usize,
    pub relevance_floor: f64,
    pub separator: &'static str,
    pub max_context_chars: Option<usize>,
}

impl RetrievalParams {
    /// Primary pass: few chunks, strict floor, uncapped context.
    pub fn primary(cfg: &RetrievalConfig) -> Self {
        Self {
            top_n: cfg.top_chunks,
            relevance_floor: cfg.context_floor,
            separator: "\n\n",
            max_context_chars: None,
        }
    }

    /// Fallback pass: wider net, looser floor, capped context.
    pub fn fallback(cfg: &RetrievalConfig) -> Self {
        Self {
            top_n: cfg.fallback_top_chunks,
            relevance_floor: cfg.source_floor,
            separator: "\n\n---\n\n",
            max_context_chars: Some(cfg.max_context_chars),
        }
    }

    /// Cross-lingual retry pass: primary width with the looser floor.
    pub fn translation_retry(cfg: &RetrievalConfig) -> Self {
        Self {
            top_n: cfg.top_chunks,
            relevance_floor: cfg.source_floor,
            separator: "\n\n---\n\n",
            max_context_chars: Some(cfg.max_context_chars),
        }
    }
}

/// Assembled grounding context for one question.
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    pub context: String,
    /// Best score among the selected chunks; `0.0` when nothing was selected.
    pub best_score: f64,
    pub selected: Vec<ScoredChunk>,
}

impl RetrievalContext {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Scores every chunk against the question tokens and sorts descending.
///
/// The sort is stable, so equally-scored chunks keep their input order
/// (document listing order, then chunk index).
pub fn rank_chunks(question_tokens: &[String], chunks: Vec<ChunkRecord>) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = chunks
        .into_iter()
        .map(|chunk| {
            let score = score_chunk(question_tokens, &chunk.text);
            ScoredChunk { chunk, score }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}

/// Selects the top chunks above the floor and joins them into a context
/// string, applying the character cap when configured.
pub fn assemble_context(ranked: &[ScoredChunk], params: &RetrievalParams) -> RetrievalContext {
    let mut selected = Vec::new();
    let mut best_score = 0.0;

    for scored in ranked.iter().take(params.top_n) {
        if scored.score > params.relevance_floor {
            if scored.score > best_score {
                best_score = scored.score;
            }
            selected.push(scored.clone());
        }
    }

    if selected.is_empty() {
        return RetrievalContext::default();
    }

    let parts: Vec<&str> = selected.iter().map(|s| s.chunk.text.as_str()).collect();
    let mut context = parts.join(params.separator);
    if let Some(max) = params.max_context_chars {
        truncate_chars(&mut context, max);
    }

    RetrievalContext {
        context,
        best_score,
        selected,
    }
}

/// Ranks completed documents by their best chunk score.
///
/// Documents whose best score does not exceed `floor` are dropped; at most
/// `limit` sources are returned, highest first.
pub fn rank_sources(
    question_tokens: &[String],
    documents: &[(DocumentRecord, Vec<ChunkRecord>)],
    floor: f64,
    limit: usize,
) -> Vec<SourceScore> {
    let mut sources: Vec<SourceScore> = documents
        .iter()
        .filter_map(|(doc, chunks)| {
            let max_score = chunks
                .iter()
                .map(|c| score_chunk(question_tokens, &c.text))
                .fold(0.0f64, f64::max);
            if max_score > floor {
                Some(SourceScore {
                    document_id: doc.id.clone(),
                    filename: doc.original_filename.clone(),
                    score: max_score,
                })
            } else {
                None
            }
        })
        .collect();

    sources.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sources.truncate(limit);
    sources
}

/// Truncates a string to at most `max` characters on a char boundary.
fn truncate_chars(s: &mut String, max: usize) {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::models::DocumentStatus;
    use crate::score::query_tokens;

    fn chunk(id: &str, text: &str) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            document_id: "doc1".to_string(),
            text: text.to_string(),
            page_number: 1,
            chunk_index: 0,
            word_count: text.split_whitespace().count() as i64,
        }
    }

    fn doc(id: &str, filename: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            original_filename: filename.to_string(),
            stored_name: format!("documents/{}/{}", id, filename),
            file_size: 0,
            status: DocumentStatus::Completed,
            chunk_count: 1,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn ranking_is_descending_and_idempotent() {
        let q = query_tokens("capital of France");
        let chunks = vec![
            chunk("a", "Glaciers move slowly."),
            chunk("b", "The capital of France is Paris."),
            chunk("c", "France exports wine."),
        ];
        let ranked = rank_chunks(&q, chunks.clone());
        assert_eq!(ranked[0].chunk.id, "b");
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }

        let again = rank_chunks(&q, chunks);
        let ids: Vec<&str> = ranked.iter().map(|s| s.chunk.id.as_str()).collect();
        let ids2: Vec<&str> = again.iter().map(|s| s.chunk.id.as_str()).collect();
        assert_eq!(ids, ids2);
    }

    #[test]
    fn floor_excludes_weak_chunks() {
        let q = query_tokens("What is the capital of France?");
        let ranked = rank_chunks(
            &q,
            vec![
                chunk("hit", "The capital of France is Paris."),
                chunk("miss", "Bees communicate through dance patterns."),
            ],
        );
        let params = RetrievalParams::primary(&RetrievalConfig::default());
        let ctx = assemble_context(&ranked, &params);
        assert_eq!(ctx.selected.len(), 1);
        assert_eq!(ctx.selected[0].chunk.id, "hit");
        assert!(ctx.context.contains("Paris"));
        assert!(!ctx.context.contains("Bees"));
    }

    #[test]
    fn empty_selection_when_nothing_clears_floor() {
        let q = query_tokens("quantum entanglement experiments");
        let ranked = rank_chunks(&q, vec![chunk("a", "Recipe for sourdough bread.")]);
        let ctx = assemble_context(&ranked, &RetrievalParams::primary(&RetrievalConfig::default()));
        assert!(ctx.is_empty());
        assert_eq!(ctx.best_score, 0.0);
        assert_eq!(ctx.context, "");
    }

    #[test]
    fn top_n_limits_selection() {
        let q = query_tokens("widget");
        let chunks: Vec<ChunkRecord> = (0..10)
            .map(|i| chunk(&format!("c{}", i), "The widget assembly widget manual widget."))
            .collect();
        let ranked = rank_chunks(&q, chunks);
        let params = RetrievalParams::primary(&RetrievalConfig::default());
        let ctx = assemble_context(&ranked, &params);
        assert_eq!(ctx.selected.len(), params.top_n);
    }

    #[test]
    fn fallback_caps_context_length() {
        let cfg = RetrievalConfig {
            max_context_chars: 100,
            ..RetrievalConfig::default()
        };
        let q = query_tokens("widget");
        let long = "widget ".repeat(100);
        let ranked = rank_chunks(&q, vec![chunk("a", &long), chunk("b", &long)]);
        let ctx = assemble_context(&ranked, &RetrievalParams::fallback(&cfg));
        assert!(ctx.context.chars().count() <= 100);
        assert!(!ctx.is_empty());
    }

    #[test]
    fn sources_ranked_by_best_chunk() {
        let q = query_tokens("capital of France");
        let docs = vec![
            (
                doc("d1", "geography.pdf"),
                vec![chunk("a", "The capital of France is Paris.")],
            ),
            (
                doc("d2", "cooking.pdf"),
                vec![chunk("b", "Fold the egg whites gently.")],
            ),
            (
                doc("d3", "travel.pdf"),
                vec![chunk("c", "France has many regions worth visiting.")],
            ),
        ];
        let sources = rank_sources(&q, &docs, 0.1, 5);
        assert_eq!(sources[0].filename, "geography.pdf");
        assert!(sources.iter().all(|s| s.score > 0.1));
        assert!(!sources.iter().any(|s| s.filename == "cooking.pdf"));
    }

    #[test]
    fn source_limit_applies() {
        let q = query_tokens("report");
        let docs: Vec<(DocumentRecord, Vec<ChunkRecord>)> = (0..8)
            .map(|i| {
                (
                    doc(&format!("d{}", i), &format!("report{}.pdf", i)),
                    vec![chunk(&format!("c{}", i), "Annual report findings and report summary.")],
                )
            })
            .collect();
        let sources = rank_sources(&q, &docs, 0.1, 5);
        assert_eq!(sources.len(), 5);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let mut s = "héllo wörld".to_string();
        truncate_chars(&mut s, 7);
        assert_eq!(s, "héllo w");
    }
}

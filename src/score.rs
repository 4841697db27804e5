//! Lexical relevance scoring.
//!
//! A lightweight alternative to embeddings: chunks are ranked against a
//! question using exact-token matches with term-frequency weighting, partial
//! substring matches, an exact-phrase bonus, and a query-coverage reward,
//! damped by query length. Scores are non-negative and deterministic.
//!
//! Partial matching is substring containment in either direction, so short
//! common words can produce spurious hits; the 4-char minimum keeps the
//! worst of that out.

use std::collections::HashMap;

/// Bonus when the normalized chunk contains the whole normalized question.
const PHRASE_BONUS: f64 = 40.0;
/// Minimum normalized-question length for the phrase bonus to apply.
const PHRASE_MIN_CHARS: usize = 8;
/// Base weight for an exact token match.
const EXACT_MATCH_WEIGHT: f64 = 12.0;
/// Extra weight per repeated occurrence of a matched token.
const TF_INCREMENT: f64 = 0.1;
/// Bonus for a partial (substring) token match.
const PARTIAL_BONUS: f64 = 4.0;
/// Minimum query-token length eligible for partial matching.
const PARTIAL_MIN_CHARS: usize = 4;
/// Weight of the query-coverage reward.
const COVERAGE_WEIGHT: f64 = 20.0;
/// Per-query-token damping factor applied to the final score.
const LENGTH_DAMPING: f64 = 0.05;

/// Splits a question into lowercase whitespace-delimited tokens.
pub fn query_tokens(question: &str) -> Vec<String> {
    question
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

/// Folds a handful of common accented Latin characters to ASCII.
fn fold_accent(c: char) -> char {
    match c {
        'ó' => 'o',
        'á' => 'a',
        'é' => 'e',
        'í' => 'i',
        'ú' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ü' => 'u',
        'ö' => 'o',
        'ä' => 'a',
        _ => c,
    }
}

/// Normalizes text for matching: lowercase, accent folding, everything
/// outside `[a-z0-9 ]` replaced by a space, whitespace runs collapsed.
fn normalize(text: &str) -> String {
    let lowered: String = text.to_lowercase().chars().map(fold_accent).collect();
    let filtered: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' ' {
                c
            } else {
                ' '
            }
        })
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scores one chunk against the question tokens.
///
/// Returns `0.0` when either side normalizes to nothing.
pub fn score_chunk(question_tokens: &[String], chunk_text: &str) -> f64 {
    let normalized_chunk = normalize(chunk_text);
    let normalized_question = normalize(&question_tokens.join(" "));

    let chunk_tokens: Vec<&str> = normalized_chunk.split_whitespace().collect();
    let q_tokens: Vec<&str> = normalized_question.split_whitespace().collect();
    if chunk_tokens.is_empty() || q_tokens.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;

    // Exact phrase bonus
    if normalized_question.len() >= PHRASE_MIN_CHARS
        && normalized_chunk.contains(&normalized_question)
    {
        score += PHRASE_BONUS;
    }

    let mut chunk_tf: HashMap<&str, usize> = HashMap::new();
    for t in &chunk_tokens {
        *chunk_tf.entry(t).or_insert(0) += 1;
    }

    let mut covered = 0usize;
    for q in &q_tokens {
        if let Some(&tf) = chunk_tf.get(q) {
            covered += 1;
            score += EXACT_MATCH_WEIGHT * (1.0 + TF_INCREMENT * (tf as f64 - 1.0));
            continue;
        }
        if q.len() >= PARTIAL_MIN_CHARS {
            let partial_hit = chunk_tf
                .keys()
                .any(|token| token.contains(q) || q.contains(token));
            if partial_hit {
                score += PARTIAL_BONUS;
            }
        }
    }

    let coverage = covered as f64 / q_tokens.len() as f64;
    score += COVERAGE_WEIGHT * coverage;

    score / (1.0 + LENGTH_DAMPING * q_tokens.len() as f64)
}

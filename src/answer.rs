//! Answer-gate text: grounding prompts, canned answers, and the
//! insufficient-information marker scan.
//!
//! Prompts and markers exist in English and Persian. The English markers are
//! matched against the lowercased answer; the Persian marker is matched
//! verbatim since lowercasing does not apply.

/// Response language for prompts and canned answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    En,
    Fa,
}

impl Language {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "en" => Some(Language::En),
            "fa" => Some(Language::Fa),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fa => "fa",
        }
    }
}

/// Phrases that signal the model could not answer from the context.
const NO_ANSWER_MARKERS_EN: [&str; 4] = [
    "i don't have that information",
    "i don't have enough information",
    "not found in the provided documents",
    "not available in the context",
];

/// Persian no-answer marker, matched verbatim.
const NO_ANSWER_MARKER_FA: &str = "اطلاعات کافی در متن موجود نیست";

/// Builds the grounding prompt that restricts the model to the context.
pub fn grounding_prompt(language: Language, context: &str, question: &str) -> String {
    match language {
        Language::Fa => format!(
            "فقط با استفاده از اطلاعات «متن زمینه» زیر پاسخ بده. پاسخ باید دقیق، واضح و به زبان فارسی باشد. اگر پاسخ در متن نبود، فقط بگو: «اطلاعات کافی در متن موجود نیست».\n\nمتن زمینه:\n{}\n\nپرسش: {}\n\nپاسخ:",
            context, question
        ),
        Language::En => format!(
            "Answer this question using ONLY the information provided in the context below. Give a direct, specific answer.\n\nCONTEXT:\n{}\n\nQUESTION: {}\n\nANSWER:",
            context, question
        ),
    }
}

/// Builds the prompt used to translate a question to English for the
/// cross-lingual retrieval retry.
pub fn translation_prompt(text: &str) -> String {
    format!(
        "Translate the following text to English. Return only the translation without quotes or extra commentary.\n\nText:\n{}",
        text
    )
}

/// Canned answer when the corpus holds no documents at all.
pub fn no_documents_answer() -> &'static str {
    "I don't have any documents in my knowledge base yet. Please upload some PDF files first."
}

/// Canned answer when documents exist but none has processed chunks.
pub fn no_content_answer() -> &'static str {
    "I don't have any processed content in my knowledge base yet. Please upload some PDF files first."
}

/// Canned answer when no chunk clears the relevance floor.
pub fn no_relevant_answer() -> &'static str {
    "I don't have enough relevant information to answer that question accurately."
}

/// Replacement answer when the model signals insufficient grounding.
pub fn insufficient_answer(language: Language) -> &'static str {
    match language {
        Language::Fa => "این اطلاعات در اسناد موجود نیست.",
        Language::En => "I don't have that information in the provided documents.",
    }
}

/// Detects whether a generated answer admits it cannot be grounded.
pub fn indicates_missing_answer(answer: &str) -> bool {
    if answer.contains(NO_ANSWER_MARKER_FA) {
        return true;
    }
    let lowered = answer.to_lowercase();
    NO_ANSWER_MARKERS_EN.iter().any(|m| lowered.contains(m))
}

/// Clamps a confidence signal into `[0.0, 1.0]`.
pub fn clamp_confidence(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_detection_is_case_insensitive_for_english() {
        assert!(indicates_missing_answer(
            "I'm sorry, but I don't have that information."
        ));
        assert!(indicates_missing_answer(
            "This is NOT FOUND in the provided documents."
        ));
        assert!(!indicates_missing_answer("The capital is Paris."));
    }

    #[test]
    fn persian_marker_matches_verbatim() {
        assert!(indicates_missing_answer(
            "متأسفم، اطلاعات کافی در متن موجود نیست."
        ));
        assert!(!indicates_missing_answer("پایتخت فرانسه پاریس است."));
    }

    #[test]
    fn grounding_prompt_embeds_context_and_question() {
        let p = grounding_prompt(Language::En, "CTX-BODY", "Q-BODY");
        assert!(p.contains("CTX-BODY"));
        assert!(p.contains("Q-BODY"));
        assert!(p.contains("ONLY"));

        let fa = grounding_prompt(Language::Fa, "CTX-BODY", "Q-BODY");
        assert!(fa.contains("CTX-BODY"));
        assert!(fa.contains("Q-BODY"));
        assert!(fa.contains("متن زمینه"));
    }

    #[test]
    fn confidence_clamps_to_unit_interval() {
        assert_eq!(clamp_confidence(37.5), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(0.42), 0.42);
    }

    #[test]
    fn language_parsing() {
        assert_eq!(Language::parse("en"), Some(Language::En));
        assert_eq!(Language::parse("fa"), Some(Language::Fa));
        assert_eq!(Language::parse("de"), None);
    }
}

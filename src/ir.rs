use serde::{Deserialize, Serialize};

/// One aligned source/target segment pair from a translation-memory document.
///
/// Ordering of units matters for chunk membership, never for the meaning of
/// the final term list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationUnit {
    pub source: String,
    pub target: String,
}

impl TranslationUnit {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Document-level metadata shared by every chunk of one extraction run.
#[derive(Clone, Debug, Default)]
pub struct DatasetInfo {
    pub source_lang: String,
    pub target_lang: String,
    /// Free-text description of the dataset, forwarded verbatim to the prompt.
    pub description: String,
}

/// A raw term pair as returned by an extraction backend.
///
/// Fields may be empty or untrimmed. Validation happens in aggregation, not
/// here, so malformed model output is dropped in exactly one place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TermCandidate {
    pub source_term: String,
    pub target_term: String,
}

impl TermCandidate {
    #[must_use]
    pub fn new(source_term: impl Into<String>, target_term: impl Into<String>) -> Self {
        Self {
            source_term: source_term.into(),
            target_term: target_term.into(),
        }
    }
}

/// A validated terminology pair: both fields trimmed and non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPair {
    pub source_term: String,
    pub target_term: String,
}

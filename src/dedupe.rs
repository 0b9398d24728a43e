use std::collections::HashMap;

use crate::ir::{TermCandidate, TermPair};

/// Merges raw per-chunk candidates into the final validated term list.
///
/// Validation drops any candidate whose source or target is empty after
/// trimming. Deduplication groups by lowercased source term; the emitted
/// source keeps the casing of the first candidate seen for the group, and a
/// later target replaces the stored one only when it is strictly longer
/// (longer assumed more complete; equal length keeps the first-seen value).
///
/// Output order is the first-seen order of the groups, so repeated runs on
/// identical input produce identical output.
#[must_use]
pub fn aggregate(candidates: impl IntoIterator<Item = TermCandidate>) -> Vec<TermPair> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, TermPair> = HashMap::new();

    for cand in candidates {
        let src = cand.source_term.trim();
        let tgt = cand.target_term.trim();
        if src.is_empty() || tgt.is_empty() {
            continue;
        }

        let key = src.to_lowercase();
        match by_key.get_mut(&key) {
            None => {
                order.push(key.clone());
                by_key.insert(
                    key,
                    TermPair {
                        source_term: src.to_string(),
                        target_term: tgt.to_string(),
                    },
                );
            }
            Some(existing) => {
                if existing.target_term.len() < tgt.len() {
                    existing.target_term = tgt.to_string();
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}

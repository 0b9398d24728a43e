use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::ir::TermCandidate;

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use openai::OpenAiCompatBackend;

/// Strategy interface over the extraction call.
///
/// The concrete wrappers (OpenAI-compatible chat completions, Anthropic
/// messages) are interchangeable; none of them is trusted to return valid or
/// non-duplicate pairs, so validation stays downstream in aggregation.
pub trait ExtractionBackend {
    fn name(&self) -> &str;

    /// One extraction call: prompt in, raw candidate pairs out. May fail or
    /// return an empty list; the chunk driver owns retries.
    fn extract_terms(&self, prompt: &str) -> anyhow::Result<Vec<TermCandidate>>;
}

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n").expect("fence regex"));

/// Strips a surrounding markdown code fence, if present.
fn cleanup_model_text(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(m) = FENCE_RE.find(s) {
        s = &s[m.end()..];
        if let Some(end) = s.rfind("```") {
            s = &s[..end];
        }
        s = s.trim();
    }
    s
}

/// Parses a model response into raw candidates.
///
/// Accepts either a bare JSON array or an object with a `terms` (or `pairs`)
/// array, optionally wrapped in a code fence or preceded by chatter. Entries
/// that are not objects, or whose term fields are missing or not text, become
/// empty-field candidates so the aggregator can drop them.
pub fn parse_term_candidates(raw: &str) -> anyhow::Result<Vec<TermCandidate>> {
    let cleaned = cleanup_model_text(raw);
    let value = first_json_value(cleaned)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("terms").or_else(|| map.remove("pairs")) {
            Some(Value::Array(items)) => items,
            _ => anyhow::bail!("response object has no terms array"),
        },
        _ => anyhow::bail!("response is not a JSON array or object"),
    };
    Ok(items.into_iter().map(candidate_from_value).collect())
}

/// Finds and parses the first JSON value in free-form model output.
fn first_json_value(text: &str) -> anyhow::Result<Value> {
    let start = text
        .find(|c| c == '{' || c == '[')
        .context("no JSON value in response")?;
    let mut de = serde_json::Deserializer::from_str(&text[start..]);
    let v = Value::deserialize(&mut de).context("malformed JSON in response")?;
    Ok(v)
}

fn candidate_from_value(v: Value) -> TermCandidate {
    match v {
        Value::Object(map) => TermCandidate {
            source_term: text_field(&map, &["sourceTerm", "source_term", "source"]),
            target_term: text_field(&map, &["targetTerm", "target_term", "target"]),
        },
        _ => TermCandidate::default(),
    }
}

fn text_field(map: &serde_json::Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::parse_term_candidates;
    use crate::ir::TermCandidate;

    #[test]
    fn parses_bare_array() {
        let out = parse_term_candidates(
            r#"[{"sourceTerm":"nube","targetTerm":"cloud"},{"sourceTerm":"red","targetTerm":"network"}]"#,
        )
        .expect("parse");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], TermCandidate::new("nube", "cloud"));
    }

    #[test]
    fn parses_terms_object_with_fence_and_chatter() {
        let raw = "```json\nHere are the terms: {\"terms\":[{\"source_term\":\"servidor\",\"target_term\":\"server\"}]}\n```";
        let out = parse_term_candidates(raw).expect("parse");
        assert_eq!(out, vec![TermCandidate::new("servidor", "server")]);
    }

    #[test]
    fn field_aliases_are_accepted() {
        let out =
            parse_term_candidates(r#"[{"source":"base de datos","target":"database"}]"#)
                .expect("parse");
        assert_eq!(out[0], TermCandidate::new("base de datos", "database"));
    }

    #[test]
    fn malformed_entries_become_empty_candidates() {
        let out = parse_term_candidates(
            r#"[{"sourceTerm":"ok","targetTerm":"fine"}, "junk", {"sourceTerm": 42}]"#,
        )
        .expect("parse");
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], TermCandidate::default());
        assert_eq!(out[2].source_term, "");
    }

    #[test]
    fn non_json_response_is_an_error() {
        assert!(parse_term_candidates("I could not find any terms.").is_err());
        assert!(parse_term_candidates(r#"{"notes":"nothing"}"#).is_err());
    }
}

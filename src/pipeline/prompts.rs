use crate::chunker::Chunk;
use crate::ir::DatasetInfo;

/// Built-in extraction prompt. Config may override it with a template file
/// using the same `{{...}}` placeholders.
pub const DEFAULT_EXTRACT_TEMPLATE: &str = r#"You are a terminology extraction tool.
From the aligned translation segments below ({{source_lang}} -> {{target_lang}}),
extract domain terminology pairs: technical terms, product names, recurring
domain expressions, together with the translation actually used in the segments.

Dataset description:
{{dataset_info}}

Rules:
- Only extract terms that appear in the segments; do NOT invent translations.
- Prefer the most complete form of a translation.
- Skip generic words, numbers, and whole sentences.
- Return STRICT JSON only (no markdown, no commentary), exactly:
  {"terms":[{"sourceTerm":"...","targetTerm":"..."}]}
- Return {"terms":[]} if the segments contain no terminology.

SEGMENTS:
{{tu_block}}"#;

pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (k, v) in vars {
        let pat = format!("{{{{{k}}}}}");
        out = out.replace(&pat, v);
    }
    out
}

/// Pure function of chunk data and dataset metadata; no side effects.
#[must_use]
pub fn build_extraction_prompt(chunk: Chunk<'_>, dataset: &DatasetInfo, template: &str) -> String {
    let mut tu_block = String::new();
    for (idx, unit) in chunk.units.iter().enumerate() {
        tu_block.push_str(&format!(
            "[{idx}]\nSRC: {}\nTGT: {}\n",
            unit.source, unit.target
        ));
    }
    let description = if dataset.description.trim().is_empty() {
        "(none)"
    } else {
        dataset.description.trim()
    };
    render_template(
        template,
        &[
            ("source_lang", dataset.source_lang.as_str()),
            ("target_lang", dataset.target_lang.as_str()),
            ("dataset_info", description),
            ("tu_block", tu_block.trim_end()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::{build_extraction_prompt, render_template, DEFAULT_EXTRACT_TEMPLATE};
    use crate::chunker::Chunk;
    use crate::ir::{DatasetInfo, TranslationUnit};

    #[test]
    fn render_replaces_all_occurrences() {
        let out = render_template("{{a}} and {{a}} or {{b}}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and x or y");
    }

    #[test]
    fn prompt_contains_segments_and_metadata() {
        let units = vec![
            TranslationUnit::new("cloud computing", "computación en la nube"),
            TranslationUnit::new("server", "servidor"),
        ];
        let dataset = DatasetInfo {
            source_lang: "en".to_string(),
            target_lang: "es".to_string(),
            description: "IT marketing copy".to_string(),
        };
        let prompt =
            build_extraction_prompt(Chunk { units: &units }, &dataset, DEFAULT_EXTRACT_TEMPLATE);

        assert!(prompt.contains("en -> es"));
        assert!(prompt.contains("IT marketing copy"));
        assert!(prompt.contains("SRC: cloud computing"));
        assert!(prompt.contains("TGT: servidor"));
        assert!(!prompt.contains("{{"));
    }
}

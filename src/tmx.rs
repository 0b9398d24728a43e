use std::path::Path;

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::ir::TranslationUnit;

/// Parse result of a translation-memory file: a language pair plus the
/// ordered aligned segments.
#[derive(Clone, Debug)]
pub struct TmxDocument {
    pub source_lang: String,
    pub target_lang: String,
    pub units: Vec<TranslationUnit>,
}

pub fn parse_tmx(path: &Path) -> anyhow::Result<TmxDocument> {
    let data =
        std::fs::read(path).with_context(|| format!("read tmx: {}", path.display()))?;
    parse_tmx_bytes(&data).with_context(|| format!("parse tmx: {}", path.display()))
}

/// Pulls `<tu>/<tuv xml:lang>/<seg>` pairs out of a TMX body.
///
/// The source language comes from the header `srclang` (falling back to the
/// first variant of the first usable unit); the target language is the first
/// other language seen. A `tu` missing either side is skipped. Inline markup
/// inside `<seg>` is flattened to its text content.
pub fn parse_tmx_bytes(data: &[u8]) -> anyhow::Result<TmxDocument> {
    // No text trimming: whitespace between inline tags inside <seg> is part
    // of the segment.
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(false);

    let mut header_srclang: Option<String> = None;
    let mut units: Vec<TranslationUnit> = Vec::new();
    let mut source_lang = String::new();
    let mut target_lang = String::new();

    // Per-tu state.
    let mut variants: Vec<(String, String)> = Vec::new();
    let mut cur_lang: Option<String> = None;
    let mut in_seg = false;
    let mut seg_text = String::new();

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let ev = reader.read_event_into(&mut buf).context("read tmx event")?;
        match ev {
            Event::Eof => break,
            Event::Start(s) => {
                let name = local_name(s.name().as_ref());
                match name.as_str() {
                    "header" => {
                        header_srclang = attr_value(&s, "srclang")?
                            .filter(|v| !v.trim().is_empty() && v.trim() != "*all*");
                    }
                    "tu" => {
                        variants.clear();
                    }
                    "tuv" => {
                        cur_lang = attr_value(&s, "xml:lang")?
                            .or(attr_value(&s, "lang")?)
                            .map(|v| v.trim().to_string());
                    }
                    "seg" => {
                        in_seg = true;
                        seg_text.clear();
                    }
                    _ => {}
                }
            }
            // Self-closing <seg/> carries no text; an empty variant would be
            // filtered anyway, so only the header matters here.
            Event::Empty(s) => {
                if local_name(s.name().as_ref()) == "header" {
                    header_srclang = attr_value(&s, "srclang")?
                        .filter(|v| !v.trim().is_empty() && v.trim() != "*all*");
                }
            }
            Event::Text(t) if in_seg => {
                seg_text.push_str(&t.unescape().context("unescape seg text")?);
            }
            Event::CData(t) if in_seg => {
                seg_text.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Event::End(e) => {
                let name = local_name(e.name().as_ref());
                match name.as_str() {
                    "seg" => {
                        in_seg = false;
                        if let Some(lang) = cur_lang.clone() {
                            variants.push((lang, seg_text.trim().to_string()));
                        }
                    }
                    "tu" => {
                        if let Some((src, tgt, src_lang, tgt_lang)) =
                            pick_pair(&variants, header_srclang.as_deref())
                        {
                            if source_lang.is_empty() {
                                source_lang = src_lang;
                                target_lang = tgt_lang;
                            }
                            units.push(TranslationUnit::new(src, tgt));
                        }
                        variants.clear();
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    if source_lang.is_empty() {
        source_lang = header_srclang.unwrap_or_default();
    }
    Ok(TmxDocument {
        source_lang,
        target_lang,
        units,
    })
}

/// Picks the (source, target) pair of one `tu` given its language variants.
fn pick_pair(
    variants: &[(String, String)],
    srclang: Option<&str>,
) -> Option<(String, String, String, String)> {
    let usable: Vec<&(String, String)> = variants
        .iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .collect();
    if usable.len() < 2 {
        return None;
    }

    let src_idx = match srclang {
        Some(want) => usable
            .iter()
            .position(|(lang, _)| same_language(lang, want))?,
        None => 0,
    };
    let (src_lang, src_text) = usable[src_idx];
    let (tgt_lang, tgt_text) = usable
        .iter()
        .enumerate()
        .find(|(i, (lang, _))| *i != src_idx && !same_language(lang, src_lang))
        .map(|(_, v)| v)?;

    Some((
        src_text.clone(),
        tgt_text.clone(),
        src_lang.clone(),
        tgt_lang.clone(),
    ))
}

/// Compares language tags by primary subtag: `en-US` matches `en`.
fn same_language(a: &str, b: &str) -> bool {
    let primary = |s: &str| {
        s.split(['-', '_'])
            .next()
            .unwrap_or(s)
            .to_ascii_lowercase()
    };
    primary(a) == primary(b)
}

fn attr_value(
    s: &quick_xml::events::BytesStart<'_>,
    name: &str,
) -> anyhow::Result<Option<String>> {
    for a in s.attributes() {
        let a = a.context("tmx attribute")?;
        if a.key.as_ref() == name.as_bytes() {
            let v = a.unescape_value().context("tmx attribute value")?;
            return Ok(Some(v.into_owned()));
        }
    }
    Ok(None)
}

fn local_name(name: &[u8]) -> String {
    let s = String::from_utf8_lossy(name);
    s.rsplit(':').next().unwrap_or(&s).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::parse_tmx_bytes;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tmx version="1.4">
  <header srclang="en-US" datatype="plaintext"/>
  <body>
    <tu>
      <tuv xml:lang="en-US"><seg>cloud computing</seg></tuv>
      <tuv xml:lang="es-ES"><seg>computaci&#243;n en la nube</seg></tuv>
    </tu>
    <tu>
      <tuv xml:lang="es-ES"><seg>servidor</seg></tuv>
      <tuv xml:lang="en-US"><seg>server <b>farm</b></seg></tuv>
    </tu>
    <tu>
      <tuv xml:lang="en-US"><seg>orphan</seg></tuv>
    </tu>
  </body>
</tmx>"#;

    #[test]
    fn parses_units_and_language_pair() {
        let doc = parse_tmx_bytes(SAMPLE.as_bytes()).expect("parse");
        assert_eq!(doc.source_lang, "en-US");
        assert_eq!(doc.target_lang, "es-ES");
        assert_eq!(doc.units.len(), 2);
        assert_eq!(doc.units[0].source, "cloud computing");
        assert_eq!(doc.units[0].target, "computación en la nube");
    }

    #[test]
    fn source_side_follows_header_srclang_regardless_of_tuv_order() {
        let doc = parse_tmx_bytes(SAMPLE.as_bytes()).expect("parse");
        assert_eq!(doc.units[1].source, "server farm");
        assert_eq!(doc.units[1].target, "servidor");
    }

    #[test]
    fn incomplete_tu_is_skipped() {
        let doc = parse_tmx_bytes(SAMPLE.as_bytes()).expect("parse");
        assert!(doc.units.iter().all(|u| u.source != "orphan"));
    }

    #[test]
    fn empty_body_yields_no_units() {
        let doc =
            parse_tmx_bytes(br#"<tmx version="1.4"><header srclang="en"/><body/></tmx>"#)
                .expect("parse");
        assert!(doc.units.is_empty());
        assert_eq!(doc.source_lang, "en");
    }
}
